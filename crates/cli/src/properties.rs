// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! `san properties`: property listing with type and verification filters.

use std::path::PathBuf;

use clap::Args;

use sancore::client::ConsoleClient;
use sancore::property::{filter_sites, PropertyRow, TypeFilter, VerificationFilter};

#[derive(Debug, Args)]
pub struct PropertiesArgs {
    /// Keep only this property type (any, url-prefix, domain).
    #[arg(long = "type", default_value_t = TypeFilter::Any)]
    pub type_filter: TypeFilter,

    /// Keep only this verification state (any, verified, unverified).
    #[arg(long, default_value_t = VerificationFilter::Any)]
    pub verification: VerificationFilter,

    /// Read the authorization from this file instead of the state directory.
    #[arg(long)]
    pub port_file: Option<PathBuf>,
}

pub async fn run(args: PropertiesArgs) -> anyhow::Result<()> {
    let port = crate::config::load_port(args.port_file.as_deref())?;
    let mut client = ConsoleClient::new(reqwest::Client::new(), port.credentials);
    client.ensure_fresh().await?;

    let sites = client.list_sites().await?;
    for site in filter_sites(sites, args.type_filter, args.verification) {
        println!("{}", serde_json::to_string(&PropertyRow::from(site))?);
    }
    Ok(())
}
