// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Shared helpers for unit and integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;

use crate::credential::{epoch_secs, CredentialBundle};
use crate::progress::ProgressSink;

#[cfg(test)]
static CRYPTO_INIT: std::sync::Once = std::sync::Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
#[cfg(test)]
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Progress sink that records every update and warning.
#[derive(Debug, Default)]
pub struct CollectingSink {
    updates: Mutex<Vec<(Option<f64>, String)>>,
    warnings: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<(Option<f64>, String)> {
        self.updates.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.lock().map(|g| g.len()).unwrap_or(0)
    }
}

impl ProgressSink for CollectingSink {
    fn update(&self, fraction: Option<f64>, message: &str) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push((fraction, message.to_string()));
        }
    }

    fn warn(&self, message: &str) {
        if let Ok(mut warnings) = self.warnings.lock() {
            warnings.push(message.to_string());
        }
    }
}

/// A bundle that is valid and nowhere near expiry.
pub fn fresh_bundle() -> CredentialBundle {
    CredentialBundle {
        access_token: "test-access-token".to_string(),
        refresh_token: Some("test-refresh-token".to_string()),
        expires_at: epoch_secs() + 3600,
        scopes: vec!["https://www.googleapis.com/auth/webmasters.readonly".to_string()],
        token_url: None,
        client_id: None,
        client_secret: None,
    }
}

/// Spawn an HTTP server that answers every request from a response script.
///
/// The nth request gets the nth `(status, body)` pair; past the end the last
/// pair repeats. Returns the bound address and the request counter.
pub async fn scripted_server(
    responses: Vec<(u16, String)>,
) -> anyhow::Result<(SocketAddr, Arc<AtomicU32>)> {
    #[cfg(test)]
    ensure_crypto();
    let call_count = Arc::new(AtomicU32::new(0));
    let count = Arc::clone(&call_count);
    let responses = Arc::new(responses);

    let app = Router::new().fallback(move || {
        let count = Arc::clone(&count);
        let responses = Arc::clone(&responses);
        async move {
            let idx = count.fetch_add(1, Ordering::Relaxed) as usize;
            let (status, body) = responses
                .get(idx)
                .or_else(|| responses.last())
                .cloned()
                .unwrap_or((200, String::new()));
            (StatusCode::from_u16(status).unwrap_or(StatusCode::OK), body).into_response()
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, call_count))
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
