// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! `san auth-worker`: the isolated browser-flow process.
//!
//! Reads a [`FlowConfig`] as JSON on stdin, runs the local redirect flow
//! and prints the resulting credential bundle on stdout. `san auth`
//! supervises this process and owns its lifetime.

use std::io::Read;

use anyhow::Context;
use tracing::{debug, info};

use sancore::credential::flow::{FlowConfig, LocalRedirectFlow};

pub async fn run() -> anyhow::Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("could not read the flow config from stdin")?;
    let config: FlowConfig =
        serde_json::from_str(&input).context("malformed flow config on stdin")?;

    let flow = LocalRedirectFlow::bind(config.oauth).await?;
    let url = flow.auth_url();
    info!("open this URL to authorize: {url}");
    if config.open_browser {
        open_browser(&url);
    }

    let bundle = flow.run(&reqwest::Client::new()).await?;
    println!("{}", bundle.to_json()?);
    Ok(())
}

/// Best effort; the logged URL above is the fallback.
fn open_browser(url: &str) {
    let program = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
    match std::process::Command::new(program).arg(url).spawn() {
        Ok(_) => {}
        Err(e) => debug!("could not open a browser: {e}"),
    }
}
