// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A thin client over the daemon's local admin socket.
//!
//! One [`oj_wire::Request`] per connection, answered by exactly one
//! [`oj_wire::Response`] — mirrors the framing implemented on the daemon
//! side in `oj-daemon::admin`.

use std::path::PathBuf;

use oj_wire::{read_message, write_message, Request, Response};
use tokio::net::UnixStream;

use crate::exit_error::ExitError;

/// A connection to a running `ojd` daemon.
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    /// Resolve the socket path the same way `ojd` does: the
    /// `AGENT_GRID_ADMIN_SOCKET` environment variable, falling back to a
    /// well-known path under the system temp directory.
    pub fn from_env() -> Self {
        let path = std::env::var("AGENT_GRID_ADMIN_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("agent-grid.sock"));
        Self::new(path)
    }

    pub async fn send(&self, request: Request) -> Result<Response, ExitError> {
        let mut stream = UnixStream::connect(&self.socket_path).await.map_err(|err| {
            ExitError::new(
                1,
                format!(
                    "could not connect to daemon at {}: {err} (is `ojd` running?)",
                    self.socket_path.display()
                ),
            )
        })?;
        write_message(&mut stream, &request)
            .await
            .map_err(|err| ExitError::new(1, format!("failed to send request: {err}")))?;
        read_message(&mut stream)
            .await
            .map_err(|err| ExitError::new(1, format!("failed to read response: {err}")))
    }
}
