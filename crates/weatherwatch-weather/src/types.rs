use serde::{Deserialize, Serialize};
use weatherwatch_core::{AppError, ConfigError, NetworkError, ReqwestErrorExt};

use crate::retry::{is_retryable_error, is_retryable_status, RetryDecision};

/// hPa (what the API reports) to millimetres of mercury
pub const HPA_TO_MM_HG: f64 = 0.750_062;

/// One observed snapshot of the weather at a location.
///
/// Fields are private so a reading never changes after it is built;
/// every fetch produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    temperature: f64,
    pressure: f64,
    humidity: f64,
    location: String,
}

impl Reading {
    pub fn new(temperature: f64, pressure: f64, humidity: f64, location: impl Into<String>) -> Self {
        Self {
            temperature,
            pressure,
            humidity,
            location: location.into(),
        }
    }

    /// Temperature in the requested unit system (°C for metric)
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Pressure as reported, in hPa
    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    pub fn pressure_mm_hg(&self) -> f64 {
        self.pressure * HPA_TO_MM_HG
    }

    /// Relative humidity in %
    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Exact comparison of temperature, pressure and humidity; the name is ignored.
    #[allow(clippy::float_cmp)]
    pub fn same_conditions(&self, other: &Reading) -> bool {
        self.temperature == other.temperature
            && self.pressure == other.pressure
            && self.humidity == other.humidity
    }
}

impl From<&WeatherReport> for Reading {
    fn from(report: &WeatherReport) -> Self {
        Self::new(
            report.main.temp,
            report.main.pressure,
            report.main.humidity,
            report.name.clone(),
        )
    }
}

/// Geographic coordinates of the reporting station
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

/// Entry of the `weather` array
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherEntry {
    pub id: i64,
    pub main: String,
    pub description: String,
    pub icon: String,
}

/// The `main` block. The three scalars the poller compares are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainBlock {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub temp_max: Option<f64>,
    pub pressure: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: Option<f64>,
    #[serde(default)]
    pub gust: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rain {
    /// Volume for the last hour, mm
    #[serde(rename = "1h", default)]
    pub one_hour: Option<f64>,
    #[serde(rename = "3h", default)]
    pub three_hours: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Clouds {
    /// Cloudiness, %
    #[serde(default)]
    pub all: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sys {
    #[serde(rename = "type", default)]
    pub kind: Option<i64>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
}

/// Full current-weather response body.
///
/// Only `main` and `name` are required; everything else is shown by the web
/// page when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    #[serde(default)]
    pub coord: Option<Coord>,
    #[serde(default)]
    pub weather: Vec<WeatherEntry>,
    #[serde(default)]
    pub base: Option<String>,
    pub main: MainBlock,
    #[serde(default)]
    pub visibility: Option<u32>,
    #[serde(default)]
    pub wind: Option<Wind>,
    #[serde(default)]
    pub rain: Option<Rain>,
    #[serde(default)]
    pub clouds: Option<Clouds>,
    #[serde(default)]
    pub dt: Option<i64>,
    #[serde(default)]
    pub sys: Option<Sys>,
    #[serde(default)]
    pub timezone: Option<i64>,
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
}

/// Error body, e.g. `{"cod":"404","message":"city not found"}`
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Decode a response body into a [`WeatherReport`].
pub fn decode_report(body: &str) -> Result<WeatherReport, WeatherError> {
    serde_json::from_str(body).map_err(|e| WeatherError::Parse(e.to_string()))
}

/// Decode a response body straight into a [`Reading`].
pub fn decode_reading(body: &str) -> Result<Reading, WeatherError> {
    decode_report(body).map(|report| Reading::from(&report))
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("City not found: {0}")]
    CityNotFound(String),
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid endpoint: {0}")]
    Endpoint(String),
}

impl WeatherError {
    /// Errors that will not go away by asking again: bad credentials, a
    /// city the API does not know, or a malformed endpoint.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidApiKey | Self::CityNotFound(_) | Self::Endpoint(_) => true,
            Self::Api { status, .. } => reqwest::StatusCode::from_u16(*status)
                .map(|s| s.is_client_error() && is_retryable_status(s) == RetryDecision::NoRetry)
                .unwrap_or(false),
            Self::Network(_) | Self::Parse(_) => false,
        }
    }

    /// Whether an immediate retry has a reasonable chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => is_retryable_error(e) == RetryDecision::Retry,
            Self::Api { status, .. } => reqwest::StatusCode::from_u16(*status)
                .map(|s| is_retryable_status(s) == RetryDecision::Retry)
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        use weatherwatch_core::WeatherError as Core;
        match e {
            WeatherError::Network(e) => AppError::Network(e.into_network_error()),
            WeatherError::InvalidApiKey => AppError::Weather(Core::InvalidApiKey),
            WeatherError::CityNotFound(city) => AppError::Weather(Core::CityNotFound(city)),
            WeatherError::Api { status, message } if status >= 500 => {
                AppError::Network(NetworkError::ServerError { status, message })
            }
            WeatherError::Api { status, message } => {
                AppError::Weather(Core::ApiError(format!("{}: {}", status, message)))
            }
            WeatherError::Parse(msg) => AppError::Weather(Core::Decode(msg)),
            WeatherError::Endpoint(msg) => AppError::Config(ConfigError::Invalid(msg)),
        }
    }
}
