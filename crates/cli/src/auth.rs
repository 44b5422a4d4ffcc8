// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

//! `san auth`: license verification plus the browser authorization flow.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sancore::client::ConsoleClient;
use sancore::credential::broker::AuthBroker;
use sancore::credential::OauthConfig;
use sancore::license;
use sancore::port::AuthPort;
use sancore::progress::LogSink;
use sancore::property::verified_site_urls;

#[derive(Debug, Args)]
pub struct AuthArgs {
    /// License key for licensed limits (omit to stay on the free tier).
    #[arg(long, env = "SAN_LICENSE_KEY")]
    pub license_key: Option<String>,

    /// How long the stored authorization stays usable.
    #[arg(long, value_enum, default_value_t = Expiration::Never)]
    pub expiration: Expiration,

    /// OAuth client ID for the browser flow.
    #[arg(long, env = "SAN_OAUTH_CLIENT_ID")]
    pub client_id: String,

    /// OAuth client secret for the browser flow.
    #[arg(long, env = "SAN_OAUTH_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Store the authorization here instead of the state directory.
    #[arg(long)]
    pub port_file: Option<PathBuf>,

    /// Log the authorization URL instead of opening a browser.
    #[arg(long)]
    pub no_browser: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Expiration {
    /// Drop the refresh token; access ends when the first token expires.
    OneHour,
    /// Keep the refresh token so access can be renewed unattended.
    Never,
}

pub async fn run(args: AuthArgs, shutdown: &CancellationToken) -> anyhow::Result<()> {
    let http = reqwest::Client::new();

    // The license verdict is settled before any browser opens; a license
    // server failure fails the whole command.
    let is_pro = match &args.license_key {
        Some(key) => license::verify(&http, license::DEFAULT_ENDPOINT, key).await?,
        None => false,
    };
    if is_pro {
        info!("license key accepted, licensed limits apply");
    }

    let oauth = OauthConfig::search_console(&args.client_id, &args.client_secret);
    let broker = AuthBroker::new(oauth)?.with_browser(!args.no_browser);
    let bundle = broker.create_new(shutdown, &LogSink).await?;

    let client = ConsoleClient::new(http, bundle.clone());
    match client.list_sites().await {
        Ok(sites) => {
            let verified = verified_site_urls(&sites);
            if verified.is_empty() {
                warn!("the authorized account has no verified properties");
            } else {
                info!(count = verified.len(), "authorization covers verified properties");
            }
        }
        Err(e) => warn!("could not list properties: {e}"),
    }

    let credentials = match args.expiration {
        Expiration::OneHour => bundle.without_refresh_token(),
        Expiration::Never => bundle,
    };
    let path = args.port_file.unwrap_or_else(sancore::port::default_port_path);
    AuthPort { credentials, is_pro }.save(&path)?;
    info!(path = %path.display(), "authorization saved");
    Ok(())
}
