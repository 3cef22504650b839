//! With no `ojd` daemon reachable, every stateful subcommand fails fast
//! with a clear message rather than hanging on the socket connect.

use crate::prelude::*;

fn unreachable_socket() -> std::path::PathBuf {
    // A path that cannot have a listening socket bound to it.
    std::env::temp_dir().join(format!("oj-test-no-daemon-{}.sock", std::process::id()))
}

#[test]
fn status_without_daemon_fails_with_hint() {
    let socket = unreachable_socket();
    let output = cli()
        .env("AGENT_GRID_ADMIN_SOCKET", &socket)
        .arg("status")
        .output()
        .expect("oj should spawn");
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("stderr should be utf8");
    assert!(stderr.contains("ojd"), "expected a hint about starting ojd, got:\n{stderr}");
}

#[test]
fn nudge_without_daemon_fails() {
    let socket = unreachable_socket();
    cli()
        .env("AGENT_GRID_ADMIN_SOCKET", &socket)
        .args(["nudge", "42"])
        .assert()
        .failure();
}
