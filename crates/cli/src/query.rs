// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! `san query`: paginated search analytics fetch.

use std::path::PathBuf;

use chrono::{Days, NaiveDate, Utc};
use clap::{Args, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::info;

use sancore::client::ConsoleClient;
use sancore::progress::LogSink;
use sancore::query::{fetch_all, Aggregation, DataState, Dimension, QueryRequest, SearchType};
use sancore::Error;

/// Days the API lags behind realtime; presets end at this horizon.
const FRESHNESS_LAG_DAYS: u64 = 3;

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Property to query, e.g. sc-domain:example.com or https://example.com/.
    #[arg(long)]
    pub property: String,

    /// Search type to report on.
    #[arg(long, default_value_t = SearchType::Web)]
    pub search_type: SearchType,

    /// Date preset counted back from the data freshness horizon.
    #[arg(long, value_enum, default_value_t = Interval::D7)]
    pub interval: Interval,

    /// First day of a custom interval (YYYY-MM-DD).
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day of a custom interval (YYYY-MM-DD).
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Dimensions to group rows by, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub dimensions: Vec<Dimension>,

    /// Include rows that may still change.
    #[arg(long, default_value_t = DataState::Final)]
    pub data_state: DataState,

    /// How rows are aggregated.
    #[arg(long, default_value_t = Aggregation::Auto)]
    pub aggregation: Aggregation,

    /// Stop after this many rows (0 fetches everything the tier allows).
    #[arg(long, default_value_t = 0)]
    pub row_limit: usize,

    /// Read the authorization from this file instead of the state directory.
    #[arg(long)]
    pub port_file: Option<PathBuf>,
}

/// Date presets, all ending at today minus the freshness lag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Interval {
    /// Last 7 days.
    D7,
    /// Last 28 days.
    D28,
    /// Last 90 days.
    D90,
    /// Last 180 days.
    D180,
    /// Last 365 days.
    D365,
    /// Explicit --start and --end.
    Custom,
}

fn date_range(
    interval: Interval,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> sancore::Result<(NaiveDate, NaiveDate)> {
    let days: u64 = match interval {
        Interval::D7 => 7,
        Interval::D28 => 28,
        Interval::D90 => 90,
        Interval::D180 => 180,
        Interval::D365 => 365,
        Interval::Custom => {
            let (Some(start), Some(end)) = (start, end) else {
                return Err(Error::InvalidInput(
                    "a custom interval needs both --start and --end".to_string(),
                ));
            };
            if start > end {
                return Err(Error::InvalidInput(format!(
                    "start date {start} is after end date {end}"
                )));
            }
            return Ok((start, end));
        }
    };
    let end = today - Days::new(FRESHNESS_LAG_DAYS);
    let start = end - Days::new(days - 1);
    Ok((start, end))
}

pub async fn run(args: QueryArgs, shutdown: &CancellationToken) -> anyhow::Result<()> {
    let (start_date, end_date) =
        date_range(args.interval, args.start, args.end, Utc::now().date_naive())?;

    let port = crate::config::load_port(args.port_file.as_deref())?;
    let mut client = ConsoleClient::new(reqwest::Client::new(), port.credentials);
    client.ensure_fresh().await?;

    let request = QueryRequest {
        site_url: args.property,
        search_type: args.search_type,
        start_date,
        end_date,
        dimensions: args.dimensions,
        data_state: args.data_state,
        aggregation: args.aggregation,
        row_limit: args.row_limit,
    };

    let rows = tokio::select! {
        rows = fetch_all(&client, &request, port.is_pro, &LogSink) => rows?,
        () = shutdown.cancelled() => return Err(Error::Canceled.into()),
    };

    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }
    info!(rows = rows.len(), "query complete");
    Ok(())
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
