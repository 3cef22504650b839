// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry point for `ojd`: loads configuration, brings up the durable
//! store, the event bus, the pluggable adapters, then starts the webhook
//! ingress, the deduplicator, the scheduler, the control loop, and the
//! admin socket — and tears all of it down cleanly on SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use oj_adapters::{ComputeBackend, FilesystemTracker, GitHubTracker, HttpComputeBackend, IssueTrackerClient, LocalProcessBackend};
use oj_core::{EventBus, SystemClock};
use oj_daemon::webhook;
use oj_engine::config::{ExecutionBackendKind, IssueTrackerType};
use oj_engine::{AnthropicClassifier, AppContext, Config};
use oj_storage::Store;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_logging();

    let config_path = std::env::var("AGENT_GRID_CONFIG_FILE").ok().map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed to load configuration");
        std::process::exit(1);
    });
    let config = Arc::new(config);

    let pool = match oj_storage::pool::connect(&config.database_url).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(error = %err, "failed to connect to the durable store");
            std::process::exit(1);
        }
    };
    if let Err(err) = oj_storage::pool::migrate(&pool).await {
        tracing::error!(error = %err, "failed to run migrations");
        std::process::exit(1);
    }
    let store = Arc::new(Store::new(pool));

    let bus = Arc::new(EventBus::new(config.event_bus_max_size));
    bus.start();

    let tracker: Arc<dyn IssueTrackerClient> = match config.issue_tracker_type {
        IssueTrackerType::Github => Arc::new(GitHubTracker::new(config.github_token.clone().unwrap_or_default())),
        IssueTrackerType::Filesystem => {
            Arc::new(FilesystemTracker::new(config.issues_directory.clone().unwrap_or_else(|| "./issues".to_string())))
        }
    };

    let compute: Arc<dyn ComputeBackend> = match config.execution_backend {
        ExecutionBackendKind::Local => Arc::new(LocalProcessBackend::new(
            config.compute_backend.local_command.clone().unwrap_or_else(|| "true".to_string()),
            config.compute_backend.local_args.clone(),
            config.compute_backend.local_workdir.clone().unwrap_or_else(|| "./runs".to_string()),
        )),
        ExecutionBackendKind::Fly | ExecutionBackendKind::Oz => Arc::new(HttpComputeBackend::new(
            config.compute_backend.base_url.clone().unwrap_or_default(),
            config.compute_backend.api_key.clone().unwrap_or_default(),
        )),
    };

    let classifier = Arc::new(AnthropicClassifier::new(
        config.anthropic_api_key.clone().unwrap_or_default(),
        config.classification_model.clone(),
    ));

    let ctx = AppContext::new(store.clone(), bus.clone(), tracker, compute, classifier, SystemClock, config.clone());

    oj_engine::scheduler::subscribe(ctx.clone());

    let shutdown = CancellationToken::new();

    let control_loop_handle = oj_engine::control_loop::spawn(ctx.clone());
    let poller_handle = oj_engine::poller::spawn(ctx.clone());
    let dedup_handle = webhook::spawn_deduplicator(
        store.clone(),
        bus.clone(),
        config.webhook_dedup_quiet_period_seconds,
        config.webhook_dedup_poll_interval_seconds,
    );

    let ingress_state =
        Arc::new(webhook::ingress::IngressState { store: store.clone(), bus: bus.clone(), webhook_secret: config.github_webhook_secret.clone() });
    let webhook_app = webhook::router(ingress_state);
    let webhook_listener = match tokio::net::TcpListener::bind(&config.webhook_bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, addr = %config.webhook_bind_addr, "failed to bind webhook listener");
            std::process::exit(1);
        }
    };

    let admin_socket_path = admin_socket_path();
    let admin_listener = match oj_daemon::admin::bind(&admin_socket_path) {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, path = %admin_socket_path.display(), "failed to bind admin socket");
            std::process::exit(1);
        }
    };
    let admin_handle = oj_daemon::admin::spawn(admin_listener, ctx.clone(), shutdown.clone());

    tracing::info!(
        webhook_addr = %config.webhook_bind_addr,
        admin_socket = %admin_socket_path.display(),
        deployment_mode = ?config.deployment_mode,
        "coordinator daemon started"
    );

    let webhook_shutdown = shutdown.clone();
    let serve_result = axum::serve(webhook_listener, webhook_app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = wait_for_termination() => {}
                _ = webhook_shutdown.cancelled() => {}
            }
            webhook_shutdown.cancel();
        })
        .await;
    if let Err(err) = serve_result {
        tracing::error!(error = %err, "webhook server exited with an error");
    }

    shutdown.cancel();
    control_loop_handle.abort();
    poller_handle.abort();
    dedup_handle.abort();
    let _ = admin_handle.await;
    if admin_socket_path.exists() {
        let _ = std::fs::remove_file(&admin_socket_path);
    }

    tracing::info!("coordinator daemon stopped");
}

async fn wait_for_termination() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn admin_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var("AGENT_GRID_ADMIN_SOCKET") {
        return PathBuf::from(path);
    }
    std::env::temp_dir().join("agent-grid.sock")
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
