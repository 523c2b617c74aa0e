use crate::poller::ReadingSource;
use crate::types::{decode_report, ApiErrorBody, Reading, WeatherError, WeatherReport};
use reqwest::{Client, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use weatherwatch_core::{Units, WeatherConfig};

/// Everything needed to build the endpoint, assembled once at startup.
#[derive(Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: String,
    pub units: Units,
    pub timeout: Duration,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("units", &self.units)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl From<&WeatherConfig> for ProviderSettings {
    fn from(config: &WeatherConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            units: config.units,
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// OpenWeatherMap current-weather client
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    settings: ProviderSettings,
}

impl WeatherProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(settings.timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            settings,
        })
    }

    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        Self::new(ProviderSettings::from(config))
    }

    /// `<base>/weather?q=<city>&units=<units>&appid=<key>`, with the city encoded.
    pub fn endpoint_url(&self, city: &str) -> Result<Url, WeatherError> {
        let base = format!("{}/weather", self.settings.base_url.trim_end_matches('/'));
        Url::parse_with_params(
            &base,
            &[
                ("q", city),
                ("units", self.settings.units.as_query()),
                ("appid", self.settings.api_key.as_str()),
            ],
        )
        .map_err(|e| WeatherError::Endpoint(format!("{}: {}", self.settings.base_url, e)))
    }

    /// Fetch the full current-weather report for `city`.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_report(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let url = self.endpoint_url(city)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(error_for_status(status, city, &body));
        }

        let report = decode_report(&body)?;
        tracing::debug!("Fetched weather for {}: {} °", report.name, report.main.temp);
        Ok(report)
    }

    /// Fetch only the scalars the poller compares.
    pub async fn fetch_reading(&self, city: &str) -> Result<Reading, WeatherError> {
        self.fetch_report(city).await.map(|report| Reading::from(&report))
    }
}

fn error_for_status(status: StatusCode, city: &str, body: &str) -> WeatherError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

    tracing::debug!("Weather API returned {} for {}: {}", status, city, message);

    match status {
        StatusCode::UNAUTHORIZED => WeatherError::InvalidApiKey,
        StatusCode::NOT_FOUND => WeatherError::CityNotFound(city.to_string()),
        _ => WeatherError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// The fixed location the poller watches.
#[derive(Debug, Clone)]
pub struct CityReadingSource {
    provider: WeatherProvider,
    city: String,
}

impl CityReadingSource {
    pub fn new(provider: WeatherProvider, city: impl Into<String>) -> Self {
        Self {
            provider,
            city: city.into(),
        }
    }

    pub fn city(&self) -> &str {
        &self.city
    }
}

impl ReadingSource for CityReadingSource {
    async fn fetch(&self) -> Result<Reading, WeatherError> {
        self.provider.fetch_reading(&self.city).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(base_url: &str) -> WeatherProvider {
        WeatherProvider::new(ProviderSettings {
            api_key: "secret".to_string(),
            base_url: base_url.to_string(),
            units: Units::Metric,
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_url_shape() {
        let url = provider("http://api.openweathermap.org/data/2.5/")
            .endpoint_url("London")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://api.openweathermap.org/data/2.5/weather?q=London&units=metric&appid=secret"
        );
    }

    #[test]
    fn test_endpoint_url_encodes_city() {
        let url = provider("http://localhost").endpoint_url("São Paulo&x=1").unwrap();
        let q: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(q[0], ("q".to_string(), "São Paulo&x=1".to_string()));
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn test_endpoint_url_rejects_garbage_base() {
        let err = provider("not a url").endpoint_url("London").unwrap_err();
        assert!(matches!(err, WeatherError::Endpoint(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_settings_debug_redacts_key() {
        let settings = ProviderSettings::from(&WeatherConfig {
            api_key: "hunter2".to_string(),
            ..WeatherConfig::default()
        });
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }

    #[test]
    fn test_error_for_status_mapping() {
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, "x", ""),
            WeatherError::InvalidApiKey
        ));
        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND, "Atlantis", r#"{"cod":"404","message":"city not found"}"#),
            WeatherError::CityNotFound(ref c) if c == "Atlantis"
        ));
        assert!(matches!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, "x", r#"{"cod":429,"message":"slow down"}"#),
            WeatherError::Api { status: 429, ref message } if message == "slow down"
        ));
        assert!(matches!(
            error_for_status(StatusCode::BAD_GATEWAY, "x", "<html>"),
            WeatherError::Api { status: 502, ref message } if message == "Bad Gateway"
        ));
    }
}
