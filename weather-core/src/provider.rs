use crate::{CityForecast, Config, ForecastError, provider::cwa::CwaProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod cwa;

#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    async fn fetch_forecast(&self, city: &str) -> Result<CityForecast, ForecastError>;
}

/// Construct the CWA provider from config.
///
/// A missing API key is not an error here: it surfaces per request as
/// [`ForecastError::MissingApiKey`] so the service can still start and report it.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn ForecastProvider>> {
    let provider = CwaProvider::new(
        config.api_key().map(str::to_owned),
        config.base_url.clone(),
        config.dataset.clone(),
        config.timeout(),
    )?;

    Ok(Box::new(provider))
}
