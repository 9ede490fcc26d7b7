use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use cwa_weather_core::{
    CityForecast, Config, DEFAULT_CITY, provider_from_config, resolver_from_config,
};
use inquire::{Password, Text};
use tokio::net::TcpListener;
use tracing::info;

use crate::{routes, shutdown::shutdown_signal, state::AppState};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cwa-weather", version, about = "CWA city forecast proxy")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true, env = "CWA_WEATHER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP service (the default).
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Store the CWA API key and default city in the config file.
    Configure,

    /// Print the forecast for a city.
    Show {
        /// City name as CWA spells it, e.g. 臺北市.
        city: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        let mut config = Config::load_from(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());

        match self.command.unwrap_or(Command::Serve { host: None, port: None }) {
            Command::Serve { host, port } => {
                if let Some(host) = host {
                    config.host = host;
                }
                if let Some(port) = port {
                    config.port = port;
                }
                serve(config).await
            }
            Command::Configure => configure(&path),
            Command::Show { city } => show(&config, &city).await,
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    if config.api_key().is_none() {
        tracing::warn!("CWA_API_KEY is not set; forecast requests will fail with 500");
    }

    let provider = provider_from_config(&config)?;
    let state = AppState {
        provider: Arc::from(provider),
        resolver: Arc::new(resolver_from_config(&config)),
        trust_proxy_headers: config.trust_proxy_headers,
    };

    let app = routes::create_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(environment = %config.environment, "Server listening on http://{addr}");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server shutdown complete");
    Ok(())
}

fn configure(path: &std::path::Path) -> anyhow::Result<()> {
    let mut config = Config::load_from(path)?;

    let api_key = Password::new("CWA API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let current_default = if config.default_city.trim().is_empty() {
        DEFAULT_CITY.to_string()
    } else {
        config.default_city.clone()
    };
    let default_city = Text::new("Default city for unresolved callers:")
        .with_default(&current_default)
        .prompt()
        .context("Failed to read default city")?;

    config.api_key = Some(api_key.trim().to_string());
    config.default_city = default_city.trim().to_string();
    config.save_to(path)?;

    println!("Saved configuration to {}", path.display());
    Ok(())
}

async fn show(config: &Config, city: &str) -> anyhow::Result<()> {
    let provider = provider_from_config(config)?;
    let forecast = provider
        .fetch_forecast(city)
        .await
        .with_context(|| format!("Failed to fetch forecast for {city}"))?;

    print!("{}", render(&forecast));
    Ok(())
}

fn render(forecast: &CityForecast) -> String {
    let mut out = format!("{} ({})\n", forecast.city, forecast.update_time);
    for p in &forecast.forecasts {
        out.push_str(&format!(
            "{} ~ {}  {}  rain {}  {} - {}  {}\n",
            p.start_time, p.end_time, p.weather, p.rain, p.min_temp, p.max_temp, p.comfort
        ));
    }
    out
}
