// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! `san inspect`: index inspection over a batch of URLs.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use sancore::client::ConsoleClient;
use sancore::dispatch::FailureMode;
use sancore::inspect::inspect_all;
use sancore::progress::LogSink;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Property the URLs belong to.
    #[arg(long)]
    pub property: String,

    /// File with one URL per line (stdin when omitted).
    #[arg(long)]
    pub urls_file: Option<PathBuf>,

    /// Keep going when a URL fails and report the failure inline.
    #[arg(long)]
    pub keep_going: bool,

    /// Read the authorization from this file instead of the state directory.
    #[arg(long)]
    pub port_file: Option<PathBuf>,
}

fn parse_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = text.lines().map(|line| line.trim().to_string()).collect();
    // One trailing blank line is an editor artifact, not an input error.
    if urls.last().is_some_and(|url| url.is_empty()) {
        urls.pop();
    }
    urls
}

fn read_urls(path: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("could not read URLs from stdin")?;
            text
        }
    };
    Ok(parse_urls(&text))
}

pub async fn run(args: InspectArgs, shutdown: &CancellationToken) -> anyhow::Result<()> {
    let urls = read_urls(args.urls_file.as_deref())?;
    let port = crate::config::load_port(args.port_file.as_deref())?;
    let mut client = ConsoleClient::new(reqwest::Client::new(), port.credentials);
    client.ensure_fresh().await?;

    let failure_mode = if args.keep_going { FailureMode::Salvage } else { FailureMode::Abort };
    let results = inspect_all(
        &client,
        &args.property,
        urls.clone(),
        port.is_pro,
        failure_mode,
        shutdown,
        &LogSink,
    )
    .await?;

    let mut failed = 0usize;
    for (url, result) in urls.iter().zip(results) {
        match result {
            Ok(inspected) => println!("{}", serde_json::to_string(&inspected)?),
            Err(e) => {
                failed += 1;
                println!("{}", serde_json::json!({ "url": url, "error": e.to_string() }));
            }
        }
    }
    info!(inspected = urls.len() - failed, failed, "inspection complete");
    Ok(())
}

#[cfg(test)]
#[path = "inspect_tests.rs"]
mod tests;
