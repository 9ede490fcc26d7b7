//! JSON error envelope for the HTTP surface.

use std::any::Any;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cwa_weather_core::ForecastError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Route not found")]
    RouteNotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forecast(e) => StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::InvalidPath(_) => StatusCode::BAD_REQUEST,
            Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorResponse {
        match self {
            Self::Forecast(ForecastError::Upstream { message, body, .. }) => ErrorResponse {
                error: "CWA API error".to_string(),
                message: Some(message.clone()),
                details: Some(body.clone()),
            },
            // Transport and decode failures stay in the logs.
            Self::Forecast(
                e @ (ForecastError::Timeout
                | ForecastError::Transport(_)
                | ForecastError::Decode(_)),
            ) => ErrorResponse {
                error: e.category().to_string(),
                message: Some("Unable to fetch weather data, please try again later".to_string()),
                details: None,
            },
            Self::Forecast(e) => ErrorResponse {
                error: e.category().to_string(),
                message: Some(e.to_string()),
                details: None,
            },
            Self::InvalidPath(msg) => ErrorResponse {
                error: "Invalid parameter".to_string(),
                message: Some(msg.clone()),
                details: None,
            },
            Self::RouteNotFound => ErrorResponse {
                error: "Route not found".to_string(),
                message: None,
                details: None,
            },
            Self::Internal(msg) => ErrorResponse {
                error: "Server error".to_string(),
                message: Some(msg.clone()),
                details: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Converts a handler panic into the generic 500 envelope.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "Unknown panic".to_string()
    };

    tracing::error!(panic = %detail, "request handler panicked");
    ApiError::Internal(detail).into_response()
}
