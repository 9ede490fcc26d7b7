//! Core library for the CWA weather proxy.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Fetching and flattening CWA city forecasts
//! - Resolving a caller's IP address to a city name
//!
//! It is used by `cwa-weather-server`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod geoip;
pub mod model;
pub mod provider;
pub mod resolver;

pub use config::Config;
pub use error::ForecastError;
pub use geoip::{MaxMindLocator, locator_from_path};
pub use model::{CityForecast, ForecastPeriod};
pub use provider::{ForecastProvider, cwa::CwaProvider, provider_from_config};
pub use resolver::{CityNames, CityResolver, DEFAULT_CITY, GeoLocator, NullLocator};

/// Build the resolver described by `config`: GeoIP database (if any) plus the
/// built-in city table with configured overrides.
pub fn resolver_from_config(config: &Config) -> CityResolver {
    let names = CityNames::taiwan_with(&config.city_names, config.default_city.clone());
    tracing::info!(
        entries = names.len(),
        default_city = names.default_city(),
        "city name table loaded"
    );
    CityResolver::new(locator_from_path(config.geoip_db.as_deref()), names)
}
