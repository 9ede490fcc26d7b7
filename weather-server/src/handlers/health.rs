//! Liveness and capability listing

use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    pub city_weather: String,
    pub current_weather: String,
    pub health: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    pub message: String,
    pub version: String,
    pub endpoints: Endpoints,
}

pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "CWA weather forecast API for cities across Taiwan".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: Endpoints {
            city_weather: "/api/weather/:city (e.g. /api/weather/臺北市)".to_string(),
            current_weather: "/api/weather/current (city inferred from your IP)".to_string(),
            health: "/api/health".to_string(),
        },
    })
}
