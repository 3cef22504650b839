//! CLI help output specs — verified without a running daemon.

use crate::prelude::*;

#[test]
fn oj_help_shows_usage() {
    let out = stdout_of(cli().arg("--help"));
    assert!(out.contains("Usage:"), "expected usage line, got:\n{out}");
}

#[test]
fn oj_help_lists_subcommands() {
    let out = stdout_of(cli().arg("--help"));
    for sub in ["status", "execution", "issue", "nudge"] {
        assert!(out.contains(sub), "expected `{sub}` subcommand in help, got:\n{out}");
    }
}

#[test]
fn oj_execution_help_shows_subcommands() {
    let out = stdout_of(cli().args(["execution", "--help"]));
    for sub in ["list", "show", "cancel"] {
        assert!(out.contains(sub), "expected `{sub}` in execution help, got:\n{out}");
    }
}

#[test]
fn oj_version_shows_version() {
    cli().arg("--version").assert().success();
}
