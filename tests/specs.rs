//! Workspace integration tests driving the `oj` binary end-to-end.
//!
//! These exercise the parts of the CLI that don't require a running
//! daemon (help text, argument parsing, and the "no daemon reachable"
//! error path). Scenarios that exercise the scheduler/control-loop
//! invariants (S1-S6) live as `#[ignore]`d, `DATABASE_URL`-gated tests
//! alongside the engine and storage crates they exercise, per the
//! project's test-tooling conventions.

mod prelude {
    pub use assert_cmd::Command;

    pub fn cli() -> Command {
        Command::cargo_bin("oj").expect("oj binary should build")
    }

    /// Run and assert success, returning captured stdout as a `String`.
    pub fn stdout_of(cmd: &mut Command) -> String {
        let output = cmd.output().expect("oj should spawn");
        assert!(output.status.success(), "oj exited with {:?}", output.status);
        String::from_utf8(output.stdout).expect("stdout should be utf8")
    }
}

mod cli;
