use thiserror::Error;

/// Failures of a single forecast lookup.
///
/// Every variant is terminal for the request; nothing here is retried.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("No CWA API key configured. Set CWA_API_KEY or run `cwa-weather configure`.")]
    MissingApiKey,

    #[error("A city name is required, e.g. /api/weather/臺北市")]
    MissingCity,

    #[error("No forecast data for {city}; check that the city name is correct")]
    CityNotFound { city: String },

    /// The upstream answered with a non-success status.
    #[error("CWA API request failed with status {status}: {message}")]
    Upstream {
        status: u16,
        message: String,
        body: serde_json::Value,
    },

    #[error("CWA API request timed out")]
    Timeout,

    #[error("Failed to reach CWA API: {0}")]
    Transport(String),

    #[error("Failed to parse CWA API response: {0}")]
    Decode(String),
}

impl ForecastError {
    /// HTTP status the proxy answers with for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingApiKey => 500,
            Self::MissingCity => 400,
            Self::CityNotFound { .. } => 404,
            Self::Upstream { status, .. } => *status,
            Self::Timeout | Self::Transport(_) | Self::Decode(_) => 500,
        }
    }

    /// Short category used as the `error` field of the response envelope.
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingApiKey => "Server configuration error",
            Self::MissingCity => "Invalid parameter",
            Self::CityNotFound { .. } => "No data found",
            Self::Upstream { .. } => "CWA API error",
            Self::Timeout | Self::Transport(_) | Self::Decode(_) => "Server error",
        }
    }

    /// Raw upstream payload, only present for upstream errors.
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Upstream { body, .. } => Some(body),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
