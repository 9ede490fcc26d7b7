use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    error::ForecastError,
    model::{CityForecast, ForecastPeriod},
};

use super::ForecastProvider;

const FALLBACK_UPSTREAM_MESSAGE: &str = "Unable to fetch weather data";

/// Client for the CWA open data `datastore` REST endpoint.
#[derive(Debug, Clone)]
pub struct CwaProvider {
    api_key: Option<String>,
    base_url: String,
    dataset: String,
    http: Client,
}

impl CwaProvider {
    /// `timeout` bounds each outbound request; `Duration::ZERO` means no timeout.
    pub fn new(
        api_key: Option<String>,
        base_url: String,
        dataset: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        // Zero disables the timeout.
        let mut builder = Client::builder();
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            dataset,
            http,
        })
    }

    fn datastore_url(&self) -> String {
        format!("{}/v1/rest/datastore/{}", self.base_url, self.dataset)
    }
}

#[async_trait]
impl ForecastProvider for CwaProvider {
    #[instrument(skip(self))]
    async fn fetch_forecast(&self, city: &str) -> Result<CityForecast, ForecastError> {
        let api_key = self.api_key.as_deref().ok_or(ForecastError::MissingApiKey)?;

        let city = city.trim();
        if city.is_empty() {
            return Err(ForecastError::MissingCity);
        }

        let url = self.datastore_url();
        debug!(url = %url, "Fetching CWA forecast");

        let res = self
            .http
            .get(&url)
            .query(&[("Authorization", api_key), ("locationName", city)])
            .send()
            .await
            .map_err(ForecastError::from_reqwest)?;

        let status = res.status();
        let body = res.text().await.map_err(ForecastError::from_reqwest)?;

        if !status.is_success() {
            return Err(upstream_error(status.as_u16(), &body));
        }

        let parsed: CwaResponse =
            serde_json::from_str(&body).map_err(|e| ForecastError::Decode(e.to_string()))?;

        normalize(parsed.records, city)
    }
}

fn upstream_error(status: u16, body: &str) -> ForecastError {
    let body = serde_json::from_str::<serde_json::Value>(body)
        .unwrap_or_else(|_| serde_json::Value::String(body.to_string()));

    let message = body
        .get("message")
        .and_then(serde_json::Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or(FALLBACK_UPSTREAM_MESSAGE)
        .to_string();

    ForecastError::Upstream { status, message, body }
}

/// Flatten the element/time-series layout into one [`ForecastPeriod`] per time slot.
///
/// The first element's series decides how many periods exist and their time
/// bounds. Other elements contribute the value at the same index; an element
/// with a shorter series simply leaves that field empty.
pub(crate) fn normalize(records: CwaRecords, city: &str) -> Result<CityForecast, ForecastError> {
    let location = records
        .location
        .into_iter()
        .next()
        .ok_or_else(|| ForecastError::CityNotFound { city: city.to_string() })?;

    let elements = &location.weather_element;
    let Some(first) = elements.first() else {
        return Ok(CityForecast {
            city: location.location_name,
            update_time: records.dataset_description,
            forecasts: Vec::new(),
        });
    };

    let forecasts = first
        .time
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            let mut period = ForecastPeriod {
                start_time: slot.start_time.clone(),
                end_time: slot.end_time.clone(),
                ..ForecastPeriod::default()
            };

            for element in elements {
                let Some(entry) = element.time.get(i) else {
                    continue;
                };
                apply_element(&mut period, &element.element_name, &entry.parameter.parameter_name);
            }

            period
        })
        .collect();

    Ok(CityForecast {
        city: location.location_name,
        update_time: records.dataset_description,
        forecasts,
    })
}

fn apply_element(period: &mut ForecastPeriod, code: &str, value: &str) {
    match code {
        "Wx" => period.weather = value.to_string(),
        "PoP" => period.rain = format!("{value}%"),
        "MinT" => period.min_temp = format!("{value}°C"),
        "MaxT" => period.max_temp = format!("{value}°C"),
        "CI" => period.comfort = value.to_string(),
        "WS" => period.wind_speed = value.to_string(),
        _ => {}
    }
}

#[derive(Debug, Deserialize)]
struct CwaResponse {
    records: CwaRecords,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct CwaRecords {
    dataset_description: String,
    location: Vec<CwaLocation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CwaLocation {
    location_name: String,
    weather_element: Vec<CwaElement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CwaElement {
    element_name: String,
    time: Vec<CwaTimeSlot>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CwaTimeSlot {
    start_time: String,
    end_time: String,
    parameter: CwaParameter,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CwaParameter {
    parameter_name: String,
}
