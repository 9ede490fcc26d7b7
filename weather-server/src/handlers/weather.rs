//! Forecast handlers

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};
use cwa_weather_core::CityForecast;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::{client_ip::ClientIp, error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
pub struct WeatherResponse {
    pub success: bool,
    pub data: CityForecast,
}

/// `GET /api/weather/{city}`
pub async fn city_weather(
    State(state): State<AppState>,
    city: Result<Path<String>, PathRejection>,
) -> Result<Json<WeatherResponse>, ApiError> {
    let Path(city) = city.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected city path segment");
        ApiError::InvalidPath(rejection.body_text())
    })?;
    forecast_for(&state, &city).await
}

/// `GET /api/weather/current`
pub async fn current_weather(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
) -> Result<Json<WeatherResponse>, ApiError> {
    let city = state.resolver.resolve_city(&ip);
    info!(ip = %ip, city = %city, "resolved caller location");

    forecast_for(&state, &city).await
}

async fn forecast_for(state: &AppState, city: &str) -> Result<Json<WeatherResponse>, ApiError> {
    match state.provider.fetch_forecast(city).await {
        Ok(data) => Ok(Json(WeatherResponse { success: true, data })),
        Err(e) => {
            if e.status_code() >= 500 {
                error!(city, error = %e, "Failed to fetch weather data");
            } else {
                warn!(city, error = %e, "Weather request rejected");
            }
            Err(e.into())
        }
    }
}
