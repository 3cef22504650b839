// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property: any `Request::TriggerNudge` round-trips through the wire
//! framing unchanged, for arbitrary issue ids and reasons.

use proptest::prelude::*;

use crate::{read_message, write_message, Request};

fn round_trip(sent: Request) -> Request {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    runtime.block_on(async {
        let (mut client, mut server) = tokio::io::duplex(8192);
        write_message(&mut client, &sent).await.unwrap();
        read_message(&mut server).await.unwrap()
    })
}

proptest! {
    #[test]
    fn trigger_nudge_round_trips(issue_id in "[a-zA-Z0-9/_-]{1,40}", reason in proptest::option::of("[ -~]{0,80}")) {
        let sent = Request::TriggerNudge { issue_id, reason };
        prop_assert_eq!(round_trip(sent.clone()), sent);
    }
}
