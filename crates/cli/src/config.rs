// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! Command-line surface of `san`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use sancore::port::AuthPort;

/// Search Console analytics from the command line.
#[derive(Parser)]
#[command(name = "san", version, about)]
pub struct San {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "SAN_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Log format (json or text).
    #[arg(long, env = "SAN_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Authorize a Search Console account in the browser and store the result.
    Auth(crate::auth::AuthArgs),
    /// Fetch search analytics rows as JSON lines on stdout.
    Query(crate::query::QueryArgs),
    /// Inspect the index status of URLs, one JSON line each.
    Inspect(crate::inspect::InspectArgs),
    /// List the properties the stored authorization can read.
    Properties(crate::properties::PropertiesArgs),
    /// Run the browser flow in a worker process (started by `san auth`).
    #[command(name = "auth-worker", hide = true)]
    AuthWorker,
}

/// Load the stored authorization, defaulting to the state directory.
pub fn load_port(path: Option<&Path>) -> anyhow::Result<AuthPort> {
    let path: PathBuf = match path {
        Some(path) => path.to_path_buf(),
        None => sancore::port::default_port_path(),
    };
    AuthPort::load(&path).with_context(|| {
        format!("no usable authorization at {} (run `san auth` first)", path.display())
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
