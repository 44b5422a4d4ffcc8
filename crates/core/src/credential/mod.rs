// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Credentials and the interactive authorization machinery.
//!
//! [`CredentialBundle`] is the portable result of a completed authorization:
//! everything needed to call the API now (access token) and later (refresh
//! coordinates). Bundles are produced in a separate worker process driven by
//! [`broker::AuthBroker`]; the worker itself runs
//! [`flow::LocalRedirectFlow`].

pub mod broker;
pub mod flow;
pub mod pkce;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// OAuth provider coordinates, injected wherever authorization happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

impl OauthConfig {
    /// Coordinates for the hosted search-console provider.
    pub fn search_console(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            scopes: vec!["https://www.googleapis.com/auth/webmasters.readonly".to_string()],
        }
    }

    /// Space-joined scope string for authorization URLs.
    pub(crate) fn scope(&self) -> String {
        self.scopes.join(" ")
    }
}

/// A completed authorization: token material plus refresh coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry as epoch seconds.
    pub expires_at: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    /// Token endpoint coordinates for refresh. Absent on bundles stripped
    /// down to access-token-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl CredentialBundle {
    /// Parse and validate a bundle from JSON.
    pub fn parse(json: &str) -> Result<Self> {
        let bundle: Self =
            serde_json::from_str(json).map_err(|e| Error::MalformedCredentials(e.to_string()))?;
        bundle.validate()?;
        Ok(bundle)
    }

    /// Structural and expiry validation.
    ///
    /// A bundle with a refresh token can always be made usable again, so
    /// the expiry check only applies to bundles without one: their expiry
    /// must be strictly in the future.
    pub fn validate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            return Err(Error::MalformedCredentials("empty access token".to_string()));
        }
        if self.refresh_token.is_none() && self.expires_at <= epoch_secs() {
            return Err(Error::CredentialsExpired);
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Internal(e.to_string()))
    }

    /// True once the access token's expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= epoch_secs()
    }

    /// Drop the refresh token, pinning the bundle's lifetime to the access
    /// token's expiry. Implements the one-hour expiration policy.
    #[must_use]
    pub fn without_refresh_token(mut self) -> Self {
        self.refresh_token = None;
        self
    }
}

/// Current time as seconds since the Unix epoch.
pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
