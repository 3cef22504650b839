// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration: a `toml` file for deployment defaults, layered under
//! `AGENT_GRID_`-prefixed environment variables which always win — the
//! teacher's file-defaults/env-overrides layering direction, generalized
//! with environment variables as the coordinator's deployment-model
//! priority (env-var-first).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which tracker adapter to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueTrackerType {
    Github,
    Filesystem,
}

impl Default for IssueTrackerType {
    fn default() -> Self {
        Self::Github
    }
}

/// Which deployment surface the daemon exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentMode {
    Local,
    Coordinator,
}

impl Default for DeploymentMode {
    fn default() -> Self {
        Self::Local
    }
}

/// Which compute backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionBackendKind {
    Local,
    Fly,
    Oz,
}

impl Default for ExecutionBackendKind {
    fn default() -> Self {
        Self::Local
    }
}

/// Backend-specific tuning, nested rather than flattened since only one
/// variant's fields apply per deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeBackendTuning {
    pub region: Option<String>,
    pub image: Option<String>,
    pub cpus: Option<u32>,
    pub memory_mb: Option<u32>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// `local` backend only: the command to spawn per launch.
    pub local_command: Option<String>,
    #[serde(default)]
    pub local_args: Vec<String>,
    pub local_workdir: Option<String>,
}

/// The coordinator's single authoritative configuration struct,
/// consolidating the source's several divergent copies (§9 Open
/// Questions). Every field has a literal default matching `config.py`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    pub issue_tracker_type: IssueTrackerType,
    pub issues_directory: Option<String>,

    pub max_concurrent_executions: u32,
    pub execution_timeout_seconds: i64,
    pub max_retries_per_issue: i32,
    pub max_ci_fix_retries: i32,

    pub management_loop_interval_seconds: u64,
    pub webhook_dedup_quiet_period_seconds: i64,
    pub webhook_dedup_poll_interval_seconds: u64,
    /// How often the compute-backend poller checks active executions for
    /// completion (§5's restart-recovery poller).
    pub compute_poll_interval_seconds: u64,

    pub event_bus_max_size: usize,

    pub target_repo: Option<String>,
    pub repo_base_path: Option<String>,
    pub cleanup_on_success: bool,
    pub cleanup_on_failure: bool,

    pub deployment_mode: DeploymentMode,
    pub execution_backend: ExecutionBackendKind,

    pub webhook_bind_addr: String,

    /// Shared secret the webhook ingress HMAC-verifies deliveries against.
    pub github_webhook_secret: String,
    /// Token the GitHub tracker adapter authenticates with.
    pub github_token: Option<String>,
    /// API key for the classifier's Anthropic Messages API calls.
    pub anthropic_api_key: Option<String>,
    /// Classification model, overridable for evals/cost control.
    pub classification_model: String,

    #[serde(default)]
    pub compute_backend: ComputeBackendTuning,

    pub dry_run: bool,
    pub dry_run_output_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/agent_grid".to_string(),
            issue_tracker_type: IssueTrackerType::default(),
            issues_directory: None,
            max_concurrent_executions: 5,
            execution_timeout_seconds: 3600,
            max_retries_per_issue: 2,
            max_ci_fix_retries: 3,
            management_loop_interval_seconds: 3600,
            webhook_dedup_quiet_period_seconds: 30,
            webhook_dedup_poll_interval_seconds: 10,
            compute_poll_interval_seconds: 15,
            event_bus_max_size: 1000,
            target_repo: None,
            repo_base_path: None,
            cleanup_on_success: true,
            cleanup_on_failure: false,
            deployment_mode: DeploymentMode::default(),
            execution_backend: ExecutionBackendKind::default(),
            webhook_bind_addr: "0.0.0.0:8080".to_string(),
            github_webhook_secret: String::new(),
            github_token: None,
            anthropic_api_key: None,
            classification_model: "claude-sonnet-4-5-20250929".to_string(),
            compute_backend: ComputeBackendTuning::default(),
            dry_run: false,
            dry_run_output_file: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
    #[error("invalid value for {field}: {value}")]
    InvalidEnvValue { field: &'static str, value: String },
}

const ENV_PREFIX: &str = "AGENT_GRID_";

impl Config {
    /// Load a `toml` file (if present) as the base, then overlay every
    /// recognized `AGENT_GRID_*` environment variable on top — env vars
    /// always win, matching the coordinator's env-var-first deployment
    /// model.
    pub fn load(toml_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match toml_path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
                toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })?
            }
            _ => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_var("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = env_var("ISSUE_TRACKER_TYPE") {
            self.issue_tracker_type = match v.as_str() {
                "github" => IssueTrackerType::Github,
                "filesystem" => IssueTrackerType::Filesystem,
                _ => return Err(ConfigError::InvalidEnvValue { field: "issue_tracker_type", value: v }),
            };
        }
        if let Some(v) = env_var("ISSUES_DIRECTORY") {
            self.issues_directory = Some(v);
        }
        if let Some(v) = env_u32("MAX_CONCURRENT_EXECUTIONS")? {
            self.max_concurrent_executions = v;
        }
        if let Some(v) = env_i64("EXECUTION_TIMEOUT_SECONDS")? {
            self.execution_timeout_seconds = v;
        }
        if let Some(v) = env_i32("MAX_RETRIES_PER_ISSUE")? {
            self.max_retries_per_issue = v;
        }
        if let Some(v) = env_i32("MAX_CI_FIX_RETRIES")? {
            self.max_ci_fix_retries = v;
        }
        if let Some(v) = env_u64("MANAGEMENT_LOOP_INTERVAL_SECONDS")? {
            self.management_loop_interval_seconds = v;
        }
        if let Some(v) = env_i64("WEBHOOK_DEDUP_QUIET_PERIOD_SECONDS")? {
            self.webhook_dedup_quiet_period_seconds = v;
        }
        if let Some(v) = env_u64("WEBHOOK_DEDUP_POLL_INTERVAL_SECONDS")? {
            self.webhook_dedup_poll_interval_seconds = v;
        }
        if let Some(v) = env_u64("COMPUTE_POLL_INTERVAL_SECONDS")? {
            self.compute_poll_interval_seconds = v;
        }
        if let Some(v) = env_usize("EVENT_BUS_MAX_SIZE")? {
            self.event_bus_max_size = v;
        }
        if let Some(v) = env_var("TARGET_REPO") {
            self.target_repo = Some(v);
        }
        if let Some(v) = env_var("REPO_BASE_PATH") {
            self.repo_base_path = Some(v);
        }
        if let Some(v) = env_bool("CLEANUP_ON_SUCCESS")? {
            self.cleanup_on_success = v;
        }
        if let Some(v) = env_bool("CLEANUP_ON_FAILURE")? {
            self.cleanup_on_failure = v;
        }
        if let Some(v) = env_var("DEPLOYMENT_MODE") {
            self.deployment_mode = match v.as_str() {
                "local" => DeploymentMode::Local,
                "coordinator" => DeploymentMode::Coordinator,
                _ => return Err(ConfigError::InvalidEnvValue { field: "deployment_mode", value: v }),
            };
        }
        if let Some(v) = env_var("EXECUTION_BACKEND") {
            self.execution_backend = match v.as_str() {
                "local" => ExecutionBackendKind::Local,
                "fly" => ExecutionBackendKind::Fly,
                "oz" => ExecutionBackendKind::Oz,
                _ => return Err(ConfigError::InvalidEnvValue { field: "execution_backend", value: v }),
            };
        }
        if let Some(v) = env_var("WEBHOOK_BIND_ADDR") {
            self.webhook_bind_addr = v;
        }
        if let Some(v) = env_var("GITHUB_WEBHOOK_SECRET") {
            self.github_webhook_secret = v;
        }
        if let Some(v) = env_var("GITHUB_TOKEN") {
            self.github_token = Some(v);
        }
        if let Some(v) = env_var("ANTHROPIC_API_KEY") {
            self.anthropic_api_key = Some(v);
        }
        if let Some(v) = env_var("CLASSIFICATION_MODEL") {
            self.classification_model = v;
        }
        if let Some(v) = env_var("COMPUTE_BACKEND_REGION") {
            self.compute_backend.region = Some(v);
        }
        if let Some(v) = env_var("COMPUTE_BACKEND_IMAGE") {
            self.compute_backend.image = Some(v);
        }
        if let Some(v) = env_u32("COMPUTE_BACKEND_CPUS")? {
            self.compute_backend.cpus = Some(v);
        }
        if let Some(v) = env_u32("COMPUTE_BACKEND_MEMORY_MB")? {
            self.compute_backend.memory_mb = Some(v);
        }
        if let Some(v) = env_var("COMPUTE_BACKEND_BASE_URL") {
            self.compute_backend.base_url = Some(v);
        }
        if let Some(v) = env_var("COMPUTE_BACKEND_API_KEY") {
            self.compute_backend.api_key = Some(v);
        }
        if let Some(v) = env_var("COMPUTE_BACKEND_LOCAL_COMMAND") {
            self.compute_backend.local_command = Some(v);
        }
        if let Some(v) = env_var("COMPUTE_BACKEND_LOCAL_ARGS") {
            self.compute_backend.local_args = v.split_whitespace().map(str::to_string).collect();
        }
        if let Some(v) = env_var("COMPUTE_BACKEND_LOCAL_WORKDIR") {
            self.compute_backend.local_workdir = Some(v);
        }
        if let Some(v) = env_bool("DRY_RUN")? {
            self.dry_run = v;
        }
        if let Some(v) = env_var("DRY_RUN_OUTPUT_FILE") {
            self.dry_run_output_file = Some(v);
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}")).ok()
}

fn env_bool(name: &str) -> Result<Option<bool>, ConfigError> {
    match env_var(name) {
        Some(v) => match v.as_str() {
            "1" | "true" | "TRUE" | "yes" => Ok(Some(true)),
            "0" | "false" | "FALSE" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnvValue { field: "bool", value: v }),
        },
        None => Ok(None),
    }
}

fn env_u32(name: &str) -> Result<Option<u32>, ConfigError> {
    env_parse(name)
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
    env_parse(name)
}

fn env_i32(name: &str) -> Result<Option<i32>, ConfigError> {
    env_parse(name)
}

fn env_i64(name: &str) -> Result<Option<i64>, ConfigError> {
    env_parse(name)
}

fn env_usize(name: &str) -> Result<Option<usize>, ConfigError> {
    env_parse(name)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match env_var(name) {
        Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidEnvValue { field: "numeric", value: v }),
        None => Ok(None),
    }
}
