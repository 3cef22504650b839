// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The local admin socket: a Unix listener answering one [`oj_wire::Request`]
//! per connection, for the `oj` CLI. Trusted-local-only — unlike the
//! webhook endpoint there is no signature to verify, since anyone able to
//! connect already has filesystem access to the daemon's socket.

mod handlers;

use std::path::Path;

use oj_core::Clock;
use oj_engine::AppContext;
use oj_wire::{read_message, write_message, Request, Response};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Bind a Unix socket at `socket_path`, removing a stale file left behind
/// by a prior crash before binding.
pub fn bind(socket_path: &Path) -> std::io::Result<UnixListener> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }
    UnixListener::bind(socket_path)
}

/// Accept connections until `shutdown` fires, handling each on its own task.
pub fn spawn<C>(listener: UnixListener, ctx: AppContext<C>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()>
where
    C: Clock + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!("admin socket listening");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("admin socket shutting down");
                    return;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let ctx = ctx.clone();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                if let Err(err) = handle_connection(stream, &ctx, &shutdown).await {
                                    warn!(error = %err, "admin connection error");
                                }
                            });
                        }
                        Err(err) => error!(error = %err, "admin socket accept error"),
                    }
                }
            }
        }
    })
}

async fn handle_connection<C: Clock>(
    mut stream: UnixStream,
    ctx: &AppContext<C>,
    shutdown: &CancellationToken,
) -> Result<(), oj_wire::ProtocolError> {
    let request: Request = read_message(&mut stream).await?;
    debug!(request = ?request, "admin request");
    let is_shutdown = matches!(request, Request::Shutdown);
    let response = handlers::handle(ctx, request).await;
    write_message(&mut stream, &response).await?;
    if is_shutdown && matches!(response, Response::Ack) {
        shutdown.cancel();
    }
    Ok(())
}

/// Every handler failure becomes a [`Response::Error`] rather than
/// dropping the connection.
pub(crate) fn error_response(err: impl std::fmt::Display) -> Response {
    Response::Error { message: err.to_string() }
}
