use serde::{Deserialize, Serialize};

/// One forecast window as returned to API callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    pub start_time: String,
    pub end_time: String,
    pub weather: String,
    /// Probability of precipitation, e.g. `"20%"`.
    pub rain: String,
    /// e.g. `"18°C"`.
    pub min_temp: String,
    pub max_temp: String,
    pub comfort: String,
    pub wind_speed: String,
}

/// Flattened forecast for a single city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityForecast {
    pub city: String,
    pub update_time: String,
    /// Chronological, in upstream order.
    pub forecasts: Vec<ForecastPeriod>,
}
