//! Shared application state

use std::sync::Arc;

use cwa_weather_core::{CityResolver, ForecastProvider};

/// Read-only per-process state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub provider: Arc<dyn ForecastProvider>,
    pub resolver: Arc<CityResolver>,
    pub trust_proxy_headers: bool,
}
