//! OpenWeather current-weather client.
//!
//! Calls the `/data/2.5/weather` endpoint with metric units and maps the
//! response into a [`WeatherSnapshot`]. Provider status codes are folded into
//! the three-way [`FetchError`] taxonomy:
//! - 404 → `NotFound`
//! - 401 → `Unauthorized`
//! - anything else (network, timeout, 5xx, bad JSON) → `Unavailable`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use herald_common::error::FetchError;
use herald_common::types::{Subject, WeatherSnapshot};

use crate::DataFetcher;

/// HTTP client for the OpenWeather API.
#[derive(Clone)]
pub struct OpenWeatherClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(api_url: String, api_key: String, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url,
            api_key,
        })
    }
}

#[async_trait]
impl DataFetcher for OpenWeatherClient {
    async fn fetch(&self, subject: &Subject) -> Result<WeatherSnapshot, FetchError> {
        // Strip the URL from transport errors so the API key never reaches a log line.
        let response = self
            .http
            .get(&self.api_url)
            .query(&[
                ("q", subject.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "en"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Unavailable(e.without_url().to_string()))?;

        let status = response.status();
        if let Some(err) = classify_status(status) {
            tracing::debug!(subject = %subject, status = status.as_u16(), "Weather lookup failed");
            return Err(err);
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Unavailable(e.without_url().to_string()))?;

        parse_current_weather(&body)
    }
}

/// Map a non-success HTTP status to a fetch error. Returns `None` for 2xx.
pub fn classify_status(status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::NOT_FOUND => FetchError::NotFound,
        StatusCode::UNAUTHORIZED => FetchError::Unauthorized,
        other => FetchError::Unavailable(format!("upstream returned HTTP {}", other.as_u16())),
    })
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    name: String,
    #[serde(default)]
    sys: Sys,
    main: Main,
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Wind,
    /// Metres
    visibility: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Sys {
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
    deg: Option<f64>,
}

/// Parse an OpenWeather current-weather JSON body into a snapshot.
pub fn parse_current_weather(body: &str) -> Result<WeatherSnapshot, FetchError> {
    let raw: CurrentWeather = serde_json::from_str(body)
        .map_err(|e| FetchError::Unavailable(format!("malformed weather payload: {e}")))?;

    let condition = raw
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::Unavailable("weather payload has no conditions".to_string()))?;

    Ok(WeatherSnapshot {
        location: raw.name,
        country: raw.sys.country.unwrap_or_default(),
        temperature: raw.main.temp.round() as i32,
        feels_like: raw.main.feels_like.round() as i32,
        description: condition.description,
        humidity: raw.main.humidity,
        pressure: raw.main.pressure,
        wind_speed: raw.wind.speed,
        wind_direction: raw.wind.deg,
        visibility_km: raw.visibility.map(|m| (m / 100.0).round() / 10.0),
        icon: condition.icon,
    })
}
