// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::*;
use crate::assert_err_contains;
use crate::process::is_running;
use crate::progress::NullSink;
use crate::test_support::CollectingSink;

fn script_broker(script: &str) -> AuthBroker {
    AuthBroker::new(OauthConfig::search_console("id", "secret"))
        .expect("broker")
        .with_worker_command(vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()])
        .with_poll_interval(Duration::from_millis(25))
}

#[tokio::test]
async fn clean_worker_output_becomes_a_bundle() -> anyhow::Result<()> {
    let broker = script_broker(
        r#"echo '{"access_token":"tok","refresh_token":"r","expires_at":9999999999}'"#,
    );
    let cancel = CancellationToken::new();
    let progress = CollectingSink::new();

    let bundle = broker.create_new(&cancel, &progress).await?;
    assert_eq!(bundle.access_token, "tok");
    assert_eq!(bundle.refresh_token.as_deref(), Some("r"));

    let updates = progress.updates();
    assert_eq!(updates.first().map(|(f, _)| *f), Some(None), "starts indeterminate");
    assert_eq!(updates.last().map(|(f, _)| *f), Some(Some(1.0)));
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_maps_to_worker_failed() {
    let broker = script_broker("exit 7");
    let cancel = CancellationToken::new();

    let result = broker.create_new(&cancel, &NullSink).await;
    assert!(matches!(result, Err(Error::WorkerFailed { exit_code: 7 })), "got {result:?}");
}

#[tokio::test]
async fn silent_worker_is_malformed_not_a_success() {
    let broker = script_broker("exit 0");
    let cancel = CancellationToken::new();

    assert_err_contains!(
        broker.create_new(&cancel, &NullSink).await,
        "worker produced no credentials"
    );
}

#[tokio::test]
async fn expired_worker_output_is_rejected() {
    // Bundle with no refresh token and an expiry in the past.
    let broker = script_broker(r#"echo '{"access_token":"tok","expires_at":1}'"#);
    let cancel = CancellationToken::new();

    let result = broker.create_new(&cancel, &NullSink).await;
    assert!(matches!(result, Err(Error::CredentialsExpired)), "got {result:?}");
}

#[tokio::test]
async fn cancel_kills_the_whole_worker_tree() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let parent_file = dir.path().join("parent.pid");
    let child_file = dir.path().join("child.pid");
    let script = format!(
        "echo $$ > {parent}; sleep 30 & echo $! > {child}; wait",
        parent = parent_file.display(),
        child = child_file.display(),
    );
    let broker = script_broker(&script);

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        canceller.cancel();
    });

    let result = broker.create_new(&cancel, &NullSink).await;
    assert!(matches!(result, Err(Error::Canceled)), "got {result:?}");

    let parent: u32 = std::fs::read_to_string(&parent_file)?.trim().parse()?;
    let child: u32 = std::fs::read_to_string(&child_file)?.trim().parse()?;
    let deadline = std::time::Instant::now() + Duration::from_secs(3);
    while (is_running(parent) || is_running(child)) && std::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(!is_running(parent), "worker shell survived cancellation");
    assert!(!is_running(child), "worker's background child survived cancellation");
    Ok(())
}

#[tokio::test]
async fn already_canceled_token_short_circuits() {
    let broker = script_broker("sleep 30");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = broker.create_new(&cancel, &NullSink).await;
    assert!(matches!(result, Err(Error::Canceled)));
}
