// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Authenticated Search Console API client.
//!
//! Wraps a [`CredentialBundle`] and refreshes the access token in place when
//! it is close to expiry. All endpoint paths and wire field names follow the
//! Search Console v3 / URL Inspection v1 APIs.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::credential::{epoch_secs, CredentialBundle};
use crate::error::{Error, Result};
use crate::inspect::{InspectApiRequest, InspectionResponse, InspectionResult};
use crate::property::SiteEntry;
use crate::query::{QueryApiRequest, QueryPage};

pub const DEFAULT_BASE_URL: &str = "https://searchconsole.googleapis.com";
/// Tokens within this margin of expiry are refreshed before use.
pub const REFRESH_MARGIN_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct ConsoleClient {
    http: reqwest::Client,
    base_url: String,
    bundle: CredentialBundle,
}

impl ConsoleClient {
    pub fn new(http: reqwest::Client, bundle: CredentialBundle) -> Self {
        Self { http, base_url: DEFAULT_BASE_URL.to_string(), bundle }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn bundle(&self) -> &CredentialBundle {
        &self.bundle
    }

    /// Refresh the access token if it expires within [`REFRESH_MARGIN_SECS`].
    pub async fn ensure_fresh(&mut self) -> Result<()> {
        if self.bundle.expires_at > epoch_secs() + REFRESH_MARGIN_SECS {
            return Ok(());
        }
        let refresh_token = self
            .bundle
            .refresh_token
            .clone()
            .ok_or(Error::CredentialsExpired)?;
        let (token_url, client_id, client_secret) = match (
            self.bundle.token_url.as_deref(),
            self.bundle.client_id.as_deref(),
            self.bundle.client_secret.as_deref(),
        ) {
            (Some(u), Some(i), Some(s)) => (u.to_string(), i.to_string(), s.to_string()),
            _ => {
                return Err(Error::MalformedCredentials(
                    "refreshable bundle is missing its token endpoint".to_string(),
                ))
            }
        };

        let resp = self
            .http
            .post(&token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format!("token refresh failed: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED
        {
            // A rejected refresh token means reauthorization, not a retry.
            return Err(Error::CredentialsExpired);
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Http(format!("token refresh failed ({status}): {text}")));
        }

        let token: RefreshResponse = resp
            .json()
            .await
            .map_err(|e| Error::Http(format!("malformed refresh response: {e}")))?;
        self.bundle.access_token = token.access_token;
        if let Some(rt) = token.refresh_token {
            self.bundle.refresh_token = Some(rt);
        }
        self.bundle.expires_at = epoch_secs() + token.expires_in;
        tracing::debug!(expires_in = token.expires_in, "access token refreshed");
        Ok(())
    }

    /// One page of a search analytics query.
    pub(crate) async fn query_page(
        &self,
        site_url: &str,
        body: &QueryApiRequest<'_>,
    ) -> Result<QueryPage> {
        let url = self.url(&format!(
            "/webmasters/v3/sites/{}/searchAnalytics/query",
            encode_path_segment(site_url)
        ));
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.bundle.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("api request failed: {e}")))?;
        read_json(resp).await
    }

    /// All properties visible to the authorized account.
    pub async fn list_sites(&self) -> Result<Vec<SiteEntry>> {
        let url = self.url("/webmasters/v3/sites");
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.bundle.access_token)
            .send()
            .await
            .map_err(|e| Error::Http(format!("api request failed: {e}")))?;
        let list: SitesListResponse = read_json(resp).await?;
        Ok(list.site_entry)
    }

    /// Index inspection for a single URL within a property.
    pub async fn inspect_url(&self, site_url: &str, inspection_url: &str) -> Result<InspectionResult> {
        let url = self.url("/v1/urlInspection/index:inspect");
        let body = InspectApiRequest { site_url, inspection_url };
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.bundle.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("api request failed: {e}")))?;
        let wrapper: InspectionResponse = read_json(resp).await?;
        Ok(wrapper.inspection_result)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SitesListResponse {
    #[serde(default)]
    site_entry: Vec<SiteEntry>,
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(Error::Http(format!("status {status}: {text}")));
    }
    resp.json()
        .await
        .map_err(|e| Error::Http(format!("malformed response body: {e}")))
}

/// Percent-encode one path segment. Property URLs like `sc-domain:example.com`
/// and `https://example.com/` must travel as a single segment.
fn encode_path_segment(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len() * 3);
    for &b in s.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push('%');
                out.push(HEX[(b >> 4) as usize] as char);
                out.push(HEX[(b & 0x0f) as usize] as char);
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
