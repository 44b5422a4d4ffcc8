// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2026 The san authors

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use san::config::{Command, San};

#[tokio::main]
async fn main() {
    let cli = San::parse();

    init_tracing(&cli);

    // reqwest is built without a bundled TLS provider; install ring once
    // for the whole process.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    if let Err(e) = run(cli, shutdown).await {
        if matches!(e.downcast_ref::<sancore::Error>(), Some(sancore::Error::Canceled)) {
            info!("canceled");
            std::process::exit(130);
        }
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(cli: &San) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Row output owns stdout; diagnostics go to stderr.
    match cli.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGTERM");
                shutdown.cancel();
            }
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGINT");
                shutdown.cancel();
            }
        }
    });
}

async fn run(cli: San, shutdown: CancellationToken) -> anyhow::Result<()> {
    match cli.command {
        Command::Auth(args) => san::auth::run(args, &shutdown).await,
        Command::Query(args) => san::query::run(args, &shutdown).await,
        Command::Inspect(args) => san::inspect::run(args, &shutdown).await,
        Command::Properties(args) => san::properties::run(args).await,
        Command::AuthWorker => san::worker::run().await,
    }
}
