// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Tier policy specs: the free row cap, the upsell warning, and the
//! per-tier inspection concurrency.

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use san_specs::MockConsole;
use sancore::client::ConsoleClient;
use sancore::dispatch::FailureMode;
use sancore::inspect::inspect_all;
use sancore::progress::NullSink;
use sancore::query::{fetch_all, Aggregation, DataState, Dimension, QueryRequest, SearchType};
use sancore::test_support::{fresh_bundle, CollectingSink};

fn client_for(console: &MockConsole) -> ConsoleClient {
    ConsoleClient::new(reqwest::Client::new(), fresh_bundle()).with_base_url(console.base_url())
}

fn request(site: &str) -> anyhow::Result<QueryRequest> {
    Ok(QueryRequest {
        site_url: site.to_string(),
        search_type: SearchType::Web,
        start_date: "2026-01-01".parse()?,
        end_date: "2026-01-31".parse()?,
        dimensions: vec![Dimension::Query],
        data_state: DataState::Final,
        aggregation: Aggregation::Auto,
        row_limit: 0,
    })
}

// -- Query row caps -----------------------------------------------------------

#[tokio::test]
async fn free_tier_caps_the_dataset_and_warns_once() -> anyhow::Result<()> {
    let console = MockConsole::start(120_000).await?;
    let client = client_for(&console);
    let progress = CollectingSink::new();

    let rows = fetch_all(&client, &request("sc-domain:example.com")?, false, &progress).await?;

    assert_eq!(rows.len(), 100_000);
    assert_eq!(console.state.query_calls.load(Ordering::SeqCst), 4);
    assert_eq!(progress.warning_count(), 1);
    assert!(progress.warnings()[0].contains("license key"));
    Ok(())
}

#[tokio::test]
async fn licensed_tier_fetches_the_complete_dataset() -> anyhow::Result<()> {
    let console = MockConsole::start(120_000).await?;
    let client = client_for(&console);
    let progress = CollectingSink::new();

    let rows = fetch_all(&client, &request("sc-domain:example.com")?, true, &progress).await?;

    assert_eq!(rows.len(), 120_000);
    assert_eq!(console.state.query_calls.load(Ordering::SeqCst), 5);
    assert_eq!(progress.warning_count(), 0);
    assert_eq!(rows[0].dimensions["query"], "kw-0");
    assert_eq!(rows[119_999].dimensions["query"], "kw-119999");
    Ok(())
}

// -- Inspection concurrency ---------------------------------------------------

#[tokio::test]
async fn free_tier_inspects_one_url_at_a_time() -> anyhow::Result<()> {
    let console = MockConsole::start_with_delay(0, Duration::from_millis(80)).await?;
    let client = client_for(&console);
    let urls: Vec<String> = (0..4).map(|i| format!("https://example.com/p{i}")).collect();

    let results = inspect_all(
        &client,
        "sc-domain:example.com",
        urls.clone(),
        false,
        FailureMode::Abort,
        &CancellationToken::new(),
        &NullSink,
    )
    .await?;

    assert_eq!(console.state.inspect_calls.load(Ordering::SeqCst), 4);
    assert_eq!(console.state.inspect_peak.load(Ordering::SeqCst), 1);
    for (url, result) in urls.iter().zip(&results) {
        match result {
            Ok(inspected) => assert_eq!(&inspected.url, url),
            Err(e) => anyhow::bail!("inspection of {url} failed: {e}"),
        }
    }
    Ok(())
}

#[tokio::test]
async fn licensed_tier_overlaps_inspections() -> anyhow::Result<()> {
    let console = MockConsole::start_with_delay(0, Duration::from_millis(80)).await?;
    let client = client_for(&console);
    let urls: Vec<String> = (0..4).map(|i| format!("https://example.com/p{i}")).collect();

    let results = inspect_all(
        &client,
        "sc-domain:example.com",
        urls,
        true,
        FailureMode::Abort,
        &CancellationToken::new(),
        &NullSink,
    )
    .await?;

    assert_eq!(results.len(), 4);
    assert!(console.state.inspect_peak.load(Ordering::SeqCst) > 1);
    Ok(())
}
