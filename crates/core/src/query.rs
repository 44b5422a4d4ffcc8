// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Paginated search analytics fetching.
//!
//! The query endpoint serves at most [`API_PAGE_SIZE`] rows per request, so a
//! complete fetch walks `startRow` forward until a short page comes back.
//! Free-tier fetches stop at [`FREE_TIER_ROW_CAP`] rows; licensed fetches
//! stop where the caller says. Pages after the first are spaced out with a
//! linearly growing delay to stay under the API's pacing limits.

use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::client::ConsoleClient;
use crate::error::{Error, Result};
use crate::progress::ProgressSink;

/// Rows requested per API call (the endpoint's maximum).
pub const API_PAGE_SIZE: usize = 25_000;
/// Row cap applied to unlicensed fetches.
pub const FREE_TIER_ROW_CAP: usize = 100_000;

const PAGE_DELAY_STEP: Duration = Duration::from_millis(100);
const PAGE_DELAY_MAX: Duration = Duration::from_secs(1);

fn normalized(s: &str) -> String {
    s.to_lowercase().replace(['-', '_'], "")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchType {
    #[default]
    Web,
    Discover,
    GoogleNews,
    News,
    Image,
    Video,
}

impl FromStr for SearchType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match normalized(s).as_str() {
            "web" => Ok(Self::Web),
            "discover" => Ok(Self::Discover),
            "googlenews" => Ok(Self::GoogleNews),
            "news" => Ok(Self::News),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => anyhow::bail!("unknown search type: {other}"),
        }
    }
}

impl std::fmt::Display for SearchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Web => "web",
            Self::Discover => "discover",
            Self::GoogleNews => "google-news",
            Self::News => "news",
            Self::Image => "image",
            Self::Video => "video",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Date,
    Country,
    Device,
    Page,
    Query,
    SearchAppearance,
}

impl Dimension {
    /// Wire name, also used as the column key in result rows.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Country => "country",
            Self::Device => "device",
            Self::Page => "page",
            Self::Query => "query",
            Self::SearchAppearance => "searchAppearance",
        }
    }
}

impl FromStr for Dimension {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match normalized(s).as_str() {
            "date" => Ok(Self::Date),
            "country" => Ok(Self::Country),
            "device" => Ok(Self::Device),
            "page" => Ok(Self::Page),
            "query" => Ok(Self::Query),
            "searchappearance" => Ok(Self::SearchAppearance),
            other => anyhow::bail!("unknown dimension: {other}"),
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SearchAppearance => "search-appearance",
            other => other.name(),
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataState {
    /// Finalized data only.
    #[default]
    Final,
    /// Include fresh, still-settling data.
    All,
}

impl FromStr for DataState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match normalized(s).as_str() {
            "final" => Ok(Self::Final),
            "all" => Ok(Self::All),
            other => anyhow::bail!("unknown data state: {other}"),
        }
    }
}

impl std::fmt::Display for DataState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Final => write!(f, "final"),
            Self::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Aggregation {
    #[default]
    Auto,
    ByPage,
    ByProperty,
    ByNewsShowcasePanel,
}

impl FromStr for Aggregation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match normalized(s).as_str() {
            "auto" => Ok(Self::Auto),
            "bypage" => Ok(Self::ByPage),
            "byproperty" => Ok(Self::ByProperty),
            "bynewsshowcasepanel" => Ok(Self::ByNewsShowcasePanel),
            other => anyhow::bail!("unknown aggregation type: {other}"),
        }
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Auto => "auto",
            Self::ByPage => "by-page",
            Self::ByProperty => "by-property",
            Self::ByNewsShowcasePanel => "by-news-showcase-panel",
        };
        write!(f, "{s}")
    }
}

/// One full analytics fetch, as the caller specifies it.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub site_url: String,
    pub search_type: SearchType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dimensions: Vec<Dimension>,
    pub data_state: DataState,
    pub aggregation: Aggregation,
    /// Requested row cap; 0 means unlimited.
    pub row_limit: usize,
}

/// Wire form of one page request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryApiRequest<'a> {
    #[serde(rename = "type")]
    pub search_type: SearchType,
    pub start_date: &'a str,
    pub end_date: &'a str,
    pub dimensions: &'a [Dimension],
    pub row_limit: usize,
    pub start_row: usize,
    pub data_state: DataState,
    pub aggregation_type: Aggregation,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueryPage {
    #[serde(default)]
    pub rows: Vec<ApiRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiRow {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub clicks: f64,
    #[serde(default)]
    pub impressions: f64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

/// One result row: dimension values keyed by dimension name, then metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    #[serde(flatten)]
    pub dimensions: IndexMap<String, String>,
    pub clicks: f64,
    pub impressions: f64,
    pub ctr: f64,
    pub position: f64,
}

/// Row cap actually applied to a fetch. 0 means unlimited.
pub fn effective_row_cap(requested: usize, is_pro: bool) -> usize {
    if is_pro {
        return requested;
    }
    if requested == 0 || requested > FREE_TIER_ROW_CAP {
        FREE_TIER_ROW_CAP
    } else {
        requested
    }
}

/// Delay before fetching `page_index` (the first page is never delayed).
pub(crate) fn inter_page_delay(page_index: u64) -> Duration {
    PAGE_DELAY_STEP
        .saturating_mul(u32::try_from(page_index).unwrap_or(u32::MAX))
        .min(PAGE_DELAY_MAX)
}

fn map_row(api: ApiRow, dimensions: &[Dimension]) -> Row {
    let mut dims = IndexMap::new();
    for (dim, key) in dimensions.iter().zip(api.keys) {
        dims.insert(dim.name().to_string(), key);
    }
    Row {
        dimensions: dims,
        clicks: api.clicks,
        impressions: api.impressions,
        ctr: api.ctr,
        position: api.position,
    }
}

/// Fetch every page of a query, subject to the tier's row cap.
///
/// Any page failure discards rows already fetched and returns
/// [`Error::FetchFailed`]; partial datasets are never handed back.
pub async fn fetch_all(
    client: &ConsoleClient,
    request: &QueryRequest,
    is_pro: bool,
    progress: &dyn ProgressSink,
) -> Result<Vec<Row>> {
    let cap = effective_row_cap(request.row_limit, is_pro);
    let start_date = request.start_date.format("%Y-%m-%d").to_string();
    let end_date = request.end_date.format("%Y-%m-%d").to_string();

    let mut rows: Vec<Row> = Vec::new();
    let mut page_index: u64 = 0;
    loop {
        let start_row = page_index as usize * API_PAGE_SIZE;
        if cap != 0 {
            let fraction = (start_row as f64 / cap as f64).min(1.0);
            progress.update(Some(fraction), &format!("fetching rows from {start_row}"));
        } else {
            progress.update(None, &format!("fetched {} rows and counting", rows.len()));
        }

        let body = QueryApiRequest {
            search_type: request.search_type,
            start_date: &start_date,
            end_date: &end_date,
            dimensions: &request.dimensions,
            row_limit: API_PAGE_SIZE,
            start_row,
            data_state: request.data_state,
            aggregation_type: request.aggregation,
        };
        let page = match client.query_page(&request.site_url, &body).await {
            Ok(page) => page,
            Err(Error::Http(message)) => return Err(Error::FetchFailed(message)),
            Err(e) => return Err(e),
        };

        let page_len = page.rows.len();
        rows.extend(page.rows.into_iter().map(|r| map_row(r, &request.dimensions)));
        tracing::debug!(page = page_index, page_rows = page_len, total = rows.len(), "page fetched");

        // Cap check first: a cap landing on a page boundary must not trigger
        // another request.
        if cap != 0 && rows.len() >= cap {
            rows.truncate(cap);
            break;
        }
        if page_len < API_PAGE_SIZE {
            break;
        }
        page_index += 1;
        tokio::time::sleep(inter_page_delay(page_index)).await;
    }

    if !is_pro
        && rows.len() == FREE_TIER_ROW_CAP
        && (request.row_limit == 0 || request.row_limit > FREE_TIER_ROW_CAP)
    {
        progress.warn(
            "stopped at the 100000-row limit; authorize with a license key to fetch complete datasets",
        );
    }
    Ok(rows)
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
