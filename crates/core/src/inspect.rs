// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! URL index inspection.
//!
//! The inspection API returns a result object whose sections (index status,
//! mobile usability, AMP, rich results) appear only when the service has
//! something to say. Every section and field is therefore optional, and
//! absent fields stay absent when the result is re-serialized.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::ConsoleClient;
use crate::dispatch::{concurrency_for, dispatch, DispatchOptions, FailureMode};
use crate::error::{Error, Result};
use crate::progress::ProgressSink;

/// The API rejects more inspections than this per property and day.
pub const DAILY_INSPECTION_QUOTA: usize = 2_000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InspectApiRequest<'a> {
    pub site_url: &'a str,
    pub inspection_url: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct InspectionResponse {
    pub inspection_result: InspectionResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection_result_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_status_result: Option<IndexStatusResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_usability_result: Option<MobileUsabilityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amp_result: Option<AmpResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rich_results_result: Option<RichResultsResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexStatusResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots_txt_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexing_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_crawl_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_fetch_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawled_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referring_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitemap: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MobileUsabilityResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<MobileUsabilityIssue>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MobileUsabilityIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmpResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amp_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amp_index_status_verdict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexing_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_crawl_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_fetch_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots_txt_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<AmpIssue>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AmpIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_message: Option<String>,
}

/// Rich results carry a schema that changes with search features, so the
/// detected items are kept as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RichResultsResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_items: Option<Vec<serde_json::Value>>,
}

/// One inspected URL together with its result.
#[derive(Debug, Clone, Serialize)]
pub struct InspectedUrl {
    pub url: String,
    #[serde(flatten)]
    pub result: InspectionResult,
}

/// Inspect a batch of URLs within one property.
///
/// The whole batch is validated up front: blank URLs and batches over
/// [`DAILY_INSPECTION_QUOTA`] are rejected before any request is sent.
pub async fn inspect_all(
    client: &ConsoleClient,
    site_url: &str,
    urls: Vec<String>,
    is_pro: bool,
    failure_mode: FailureMode,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Result<Vec<Result<InspectedUrl>>> {
    if urls.iter().any(|u| u.trim().is_empty()) {
        return Err(Error::InvalidInput("URL list contains empty values".to_string()));
    }
    if urls.len() > DAILY_INSPECTION_QUOTA {
        return Err(Error::InvalidInput(format!(
            "{} URLs exceed the daily inspection quota of {DAILY_INSPECTION_QUOTA} per property",
            urls.len()
        )));
    }

    let options = DispatchOptions::new(concurrency_for(is_pro)).failure_mode(failure_mode);
    let client = Arc::new(client.clone());
    let site = Arc::new(site_url.to_string());
    dispatch(urls, options, cancel, progress, move |_index, url| {
        let client = Arc::clone(&client);
        let site = Arc::clone(&site);
        async move {
            let result = client.inspect_url(&site, &url).await?;
            Ok(InspectedUrl { url, result })
        }
    })
    .await
}

#[cfg(test)]
#[path = "inspect_tests.rs"]
mod tests;
