// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::{read_message, write_message, ProtocolError, Request, Response, StatusSummary};

#[tokio::test]
async fn round_trips_a_request_over_an_in_memory_duplex() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    let sent = Request::Status;
    write_message(&mut client, &sent).await.unwrap();
    let received: Request = read_message(&mut server).await.unwrap();
    assert_eq!(received, sent);
}

#[tokio::test]
async fn round_trips_a_response() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    let sent = Response::Status(StatusSummary {
        running_executions: 3,
        pending_nudges: 1,
        dry_run: false,
        deployment_mode: "local".to_string(),
    });
    write_message(&mut server, &sent).await.unwrap();
    let received: Response = read_message(&mut client).await.unwrap();
    assert_eq!(received, sent);
}

#[tokio::test]
async fn rejects_a_length_prefix_above_the_limit() {
    let (mut client, mut server) = tokio::io::duplex(16);
    client.try_write(&(64u32 * 1024 * 1024).to_be_bytes()).unwrap();
    drop(client);
    let err = read_message::<_, Request>(&mut server).await.unwrap_err();
    assert!(matches!(err, ProtocolError::TooLarge(_)));
}
