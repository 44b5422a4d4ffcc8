// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Remote license verification gating pro-tier behavior.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default key-check endpoint. Injectable for tests and self-hosting.
pub const DEFAULT_ENDPOINT: &str = "https://keycheck.sanalytics.dev/";

/// Upper bound on one verification round trip.
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(default)]
    ok: bool,
}

/// Check a license key against the key server.
///
/// An empty or whitespace-only key resolves to the free tier without a
/// network call. Every server-side failure is an error, never a silent
/// downgrade to the free tier; the caller decides whether to rerun.
pub async fn verify(http: &reqwest::Client, endpoint: &str, key: &str) -> Result<bool> {
    let key = key.trim();
    if key.is_empty() {
        return Ok(false);
    }

    let resp = http
        .get(endpoint)
        .query(&[("key", key)])
        .timeout(VERIFY_TIMEOUT)
        .send()
        .await
        .map_err(|e| Error::LicenseServerUnreachable(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Error::LicenseServerError(format!("status {status}")));
    }

    let verdict: Verdict = resp
        .json()
        .await
        .map_err(|e| Error::LicenseServerError(format!("invalid verdict body: {e}")))?;

    if !verdict.ok {
        return Err(Error::InvalidLicenseKey);
    }
    tracing::debug!("license key accepted");
    Ok(true)
}

#[cfg(test)]
#[path = "license_tests.rs"]
mod tests;
