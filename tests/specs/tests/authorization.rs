// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! End-to-end authorization journey: a scripted worker stands in for the
//! browser flow and a Search Console lookalike serves the API.

use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

use san_specs::MockConsole;
use sancore::client::ConsoleClient;
use sancore::credential::broker::AuthBroker;
use sancore::credential::OauthConfig;
use sancore::port::AuthPort;
use sancore::progress::NullSink;

fn scripted_broker(script: &str) -> anyhow::Result<AuthBroker> {
    let broker = AuthBroker::new(OauthConfig::search_console("client-id", "client-secret"))?
        .with_worker_command(vec!["/bin/sh".to_string(), "-c".to_string(), script.to_string()])
        .with_poll_interval(Duration::from_millis(25));
    Ok(broker)
}

#[tokio::test]
async fn authorize_store_refresh_and_list() -> anyhow::Result<()> {
    let console = MockConsole::start(0).await?;

    // The worker hands back a bundle that expires within the refresh
    // margin, so the first API use forces a refresh against the mock.
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let bundle_json = serde_json::json!({
        "access_token": "worker-access-token",
        "refresh_token": "worker-refresh-token",
        "expires_at": now + 30,
        "token_url": console.token_url(),
        "client_id": "client-id",
        "client_secret": "client-secret",
    })
    .to_string();

    let broker = scripted_broker(&format!("echo '{bundle_json}'"))?;
    let cancel = CancellationToken::new();
    let bundle = broker.create_new(&cancel, &NullSink).await?;
    assert_eq!(bundle.access_token, "worker-access-token");

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state/auth.json");
    AuthPort { credentials: bundle, is_pro: false }.save(&path)?;

    let port = AuthPort::load(&path)?;
    assert!(!port.is_pro);

    let mut client = ConsoleClient::new(reqwest::Client::new(), port.credentials)
        .with_base_url(console.base_url());
    client.ensure_fresh().await?;
    assert_eq!(console.state.token_calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.bundle().access_token, "refreshed-access-token");

    let sites = client.list_sites().await?;
    assert_eq!(sites.len(), 2);
    assert!(sites[0].is_domain_property());
    Ok(())
}

#[tokio::test]
async fn failed_worker_surfaces_its_exit_code() -> anyhow::Result<()> {
    let broker = scripted_broker("exit 9")?;
    let cancel = CancellationToken::new();

    let result = broker.create_new(&cancel, &NullSink).await;
    assert!(matches!(result, Err(sancore::Error::WorkerFailed { exit_code: 9 })), "got {result:?}");
    Ok(())
}

#[tokio::test]
async fn cancelation_stops_a_pending_authorization() -> anyhow::Result<()> {
    let broker = scripted_broker("sleep 30")?;
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let result = broker.create_new(&cancel, &NullSink).await;
    assert!(matches!(result, Err(sancore::Error::Canceled)), "got {result:?}");
    Ok(())
}
