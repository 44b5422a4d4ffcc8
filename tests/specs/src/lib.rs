// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Test harness for end-to-end specs.
//!
//! Serves a Search Console lookalike on a loopback port so specs can
//! exercise authorization, refresh, fetching and inspection against a
//! server they fully control.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Counters and knobs shared with the mock's handlers.
pub struct ConsoleState {
    /// Rows the analytics endpoint pretends to have.
    pub total_rows: usize,
    /// Pause inside the inspection handler, making overlap observable.
    pub inspect_delay: Duration,
    pub query_calls: AtomicU32,
    pub token_calls: AtomicU32,
    pub inspect_calls: AtomicU32,
    inspect_in_flight: AtomicUsize,
    /// Highest number of inspection requests seen in flight at once.
    pub inspect_peak: AtomicUsize,
}

/// A scripted Search Console lookalike.
pub struct MockConsole {
    addr: SocketAddr,
    pub state: Arc<ConsoleState>,
}

impl MockConsole {
    pub async fn start(total_rows: usize) -> anyhow::Result<Self> {
        Self::start_with_delay(total_rows, Duration::ZERO).await
    }

    pub async fn start_with_delay(
        total_rows: usize,
        inspect_delay: Duration,
    ) -> anyhow::Result<Self> {
        ensure_crypto();
        let state = Arc::new(ConsoleState {
            total_rows,
            inspect_delay,
            query_calls: AtomicU32::new(0),
            token_calls: AtomicU32::new(0),
            inspect_calls: AtomicU32::new(0),
            inspect_in_flight: AtomicUsize::new(0),
            inspect_peak: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/webmasters/v3/sites", get(list_sites))
            .route("/webmasters/v3/sites/{site}/searchAnalytics/query", post(query))
            .route("/v1/urlInspection/index:inspect", post(inspect))
            .route("/token", post(token))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self { addr, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn token_url(&self) -> String {
        format!("http://{}/token", self.addr)
    }
}

async fn list_sites(State(_state): State<Arc<ConsoleState>>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "siteEntry": [
            { "siteUrl": "sc-domain:example.com", "permissionLevel": "siteOwner" },
            { "siteUrl": "https://shop.example.com/", "permissionLevel": "siteUnverifiedUser" },
        ]
    }))
}

async fn query(
    State(state): State<Arc<ConsoleState>>,
    axum::Json(body): axum::Json<serde_json::Value>,
) -> axum::Json<serde_json::Value> {
    state.query_calls.fetch_add(1, Ordering::SeqCst);

    let start = usize::try_from(body["startRow"].as_u64().unwrap_or(0)).unwrap_or(0);
    let limit = usize::try_from(body["rowLimit"].as_u64().unwrap_or(0)).unwrap_or(0);
    let count = state.total_rows.saturating_sub(start).min(limit);

    let rows: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            serde_json::json!({
                "keys": [format!("kw-{}", start + i)],
                "clicks": 1.0,
                "impressions": 2.0,
                "ctr": 0.5,
                "position": 3.0,
            })
        })
        .collect();

    axum::Json(serde_json::json!({ "rows": rows }))
}

async fn inspect(
    State(state): State<Arc<ConsoleState>>,
    axum::Json(body): axum::Json<serde_json::Value>,
) -> axum::Json<serde_json::Value> {
    state.inspect_calls.fetch_add(1, Ordering::SeqCst);
    let current = state.inspect_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.inspect_peak.fetch_max(current, Ordering::SeqCst);
    tokio::time::sleep(state.inspect_delay).await;
    state.inspect_in_flight.fetch_sub(1, Ordering::SeqCst);

    let url = body["inspectionUrl"].as_str().unwrap_or_default();
    axum::Json(serde_json::json!({
        "inspectionResult": {
            "inspectionResultLink":
                format!("https://search.google.com/search-console/inspect?resource_id={url}"),
            "indexStatusResult": {
                "verdict": "PASS",
                "coverageState": "Submitted and indexed",
            },
        }
    }))
}

async fn token(State(state): State<Arc<ConsoleState>>) -> axum::Json<serde_json::Value> {
    state.token_calls.fetch_add(1, Ordering::SeqCst);
    axum::Json(serde_json::json!({
        "access_token": "refreshed-access-token",
        "expires_in": 3600,
    }))
}
