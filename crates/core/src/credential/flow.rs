// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Worker-side local-redirect authorization flow.
//!
//! Binds a loopback callback listener on a randomly probed port, sends the
//! user's browser to the provider, trades the returned code for tokens, and
//! hands back a [`CredentialBundle`]. The first authorization response
//! decides the flow; bare probes (manual refreshes, favicon requests) are
//! answered and ignored.

use std::ops::Range;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::credential::{epoch_secs, pkce, CredentialBundle, OauthConfig};
use crate::error::{Error, Result};

/// Ports are drawn uniformly from this range.
pub const PORT_RANGE: Range<u16> = 10_000..30_000;
/// Probe budget before giving up with [`Error::NoFreePort`].
pub const PORT_ATTEMPTS: u32 = 100;

const SUCCESS_PAGE: &str =
    "Authorization complete. You can close this window and return to the terminal.";
const DENIED_PAGE: &str = "Authorization was not completed. You can close this window.";
const WAITING_PAGE: &str = "Waiting for authorization to complete...";

/// Configuration handed to the worker process over stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    pub oauth: OauthConfig,
    /// Open the system browser automatically. The authorization URL is
    /// always logged as a fallback.
    #[serde(default = "default_true")]
    pub open_browser: bool,
}

fn default_true() -> bool {
    true
}

/// Pick a free loopback port by random probing.
pub fn pick_free_port() -> Result<u16> {
    pick_port_with(PORT_ATTEMPTS, PORT_RANGE, port_is_free)
}

/// Probe-driven port picker.
///
/// The probe releases the port again, so a racing process can still grab it
/// before the caller rebinds; in that case the rebind fails cleanly.
fn pick_port_with(attempts: u32, range: Range<u16>, mut probe: impl FnMut(u16) -> bool) -> Result<u16> {
    let mut rng = rand::rng();
    for _ in 0..attempts {
        let port = rng.random_range(range.clone());
        if probe(port) {
            return Ok(port);
        }
    }
    Err(Error::NoFreePort)
}

fn port_is_free(port: u16) -> bool {
    std::net::TcpListener::bind(("127.0.0.1", port)).is_ok()
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

struct CallbackSlot {
    tx: Mutex<Option<oneshot::Sender<CallbackParams>>>,
}

/// A bound, ready-to-run authorization flow.
pub struct LocalRedirectFlow {
    listener: tokio::net::TcpListener,
    port: u16,
    oauth: OauthConfig,
    state: String,
    code_verifier: String,
}

impl LocalRedirectFlow {
    /// Pick a port and bind the callback listener.
    pub async fn bind(oauth: OauthConfig) -> Result<Self> {
        let port = pick_free_port()?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        Ok(Self {
            listener,
            port,
            oauth,
            state: pkce::generate_state(),
            code_verifier: pkce::generate_code_verifier(),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://127.0.0.1:{}/", self.port)
    }

    /// Full provider URL the user's browser must visit.
    pub fn auth_url(&self) -> String {
        pkce::build_auth_url(
            &self.oauth.auth_url,
            &self.oauth.client_id,
            &self.redirect_uri(),
            &self.oauth.scope(),
            &pkce::compute_code_challenge(&self.code_verifier),
            &self.state,
        )
    }

    /// Serve the callback and trade the returned code for a bundle.
    pub async fn run(self, http: &reqwest::Client) -> Result<CredentialBundle> {
        let redirect_uri = self.redirect_uri();
        let Self { listener, oauth, state, code_verifier, .. } = self;

        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(CallbackSlot { tx: Mutex::new(Some(tx)) });
        let done = CancellationToken::new();

        let app = Router::new().route("/", get(callback)).with_state(Arc::clone(&slot));
        let server = axum::serve(listener, app).with_graceful_shutdown(done.clone().cancelled_owned());
        let server = tokio::spawn(async move {
            if let Err(e) = server.await {
                tracing::debug!(err = %e, "callback listener closed with error");
            }
        });

        let params = rx
            .await
            .map_err(|_| Error::AuthFlow("callback listener closed early".to_string()))?;
        done.cancel();
        let _ = server.await;

        if let Some(error) = params.error {
            return Err(Error::AuthFlow(format!("authorization denied: {error}")));
        }
        if params.state.as_deref() != Some(state.as_str()) {
            return Err(Error::AuthFlow("state parameter mismatch".to_string()));
        }
        let code = params
            .code
            .ok_or_else(|| Error::AuthFlow("callback carried no authorization code".to_string()))?;

        let token = exchange_code(http, &oauth, &code, &code_verifier, &redirect_uri).await?;
        let scopes = match token.scope {
            Some(s) => s.split_whitespace().map(str::to_string).collect(),
            None => oauth.scopes,
        };
        Ok(CredentialBundle {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: epoch_secs() + token.expires_in,
            scopes,
            token_url: Some(oauth.token_url),
            client_id: Some(oauth.client_id),
            client_secret: Some(oauth.client_secret),
        })
    }
}

/// One-shot callback handler. Only a response carrying `code` or `error`
/// consumes the flow's result slot.
async fn callback(
    State(slot): State<Arc<CallbackSlot>>,
    Query(params): Query<CallbackParams>,
) -> &'static str {
    if params.code.is_none() && params.error.is_none() {
        return WAITING_PAGE;
    }
    let denied = params.error.is_some();
    if let Some(tx) = slot.tx.lock().await.take() {
        let _ = tx.send(params);
    }
    if denied {
        DENIED_PAGE
    } else {
        SUCCESS_PAGE
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: u64,
    #[serde(default)]
    scope: Option<String>,
}

/// Trade an authorization code for tokens at the provider's token endpoint.
async fn exchange_code(
    http: &reqwest::Client,
    oauth: &OauthConfig,
    code: &str,
    code_verifier: &str,
    redirect_uri: &str,
) -> Result<TokenResponse> {
    let resp = http
        .post(&oauth.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", oauth.client_id.as_str()),
            ("client_secret", oauth.client_secret.as_str()),
            ("code", code),
            ("code_verifier", code_verifier),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await
        .map_err(|e| Error::AuthFlow(format!("token exchange failed: {e}")))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(Error::AuthFlow(format!("token exchange failed ({status}): {text}")));
    }

    resp.json()
        .await
        .map_err(|e| Error::AuthFlow(format!("malformed token response: {e}")))
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
