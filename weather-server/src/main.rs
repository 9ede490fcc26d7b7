//! Binary crate for the `cwa-weather` forecast proxy.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and interactive configuration
//! - Serving the HTTP API on top of `cwa-weather-core`
//! - Logging setup

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod client_ip;
mod error;
mod handlers;
mod routes;
mod shutdown;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cwa_weather=info,cwa_weather_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
