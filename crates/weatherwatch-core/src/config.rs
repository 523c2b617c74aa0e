use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable that overrides `weather.api_key`.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

const API_KEY_PLACEHOLDER: &str = "YOUR_OPENWEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// OpenWeatherMap access
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Polling loop settings
    #[serde(default)]
    pub poller: PollerConfig,

    /// Web page server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Unit system requested from the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    /// Value of the `units` query parameter
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
            Self::Standard => "standard",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key (can be set via OPENWEATHER_API_KEY)
    pub api_key: String,

    /// Base URL of the API, without the trailing `/weather`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub units: Units,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://api.openweathermap.org/data/2.5".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl WeatherConfig {
    /// Check if the API key is set (not empty, not the placeholder)
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && !key.starts_with("YOUR_")
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: API_KEY_PLACEHOLDER.to_string(),
            base_url: default_base_url(),
            units: Units::Metric,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Seconds between polls (default: 300)
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// First backoff delay after a failed cycle; doubles up to the interval
    #[serde(default = "default_retry_initial")]
    pub retry_initial_secs: u64,

    /// Clear the terminal before each render
    #[serde(default = "default_true")]
    pub clear_screen: bool,

    #[serde(default)]
    pub sound: SoundConfig,
}

fn default_interval() -> u64 {
    300
}

fn default_retry_initial() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            retry_initial_secs: default_retry_initial(),
            clear_screen: true,
            sound: SoundConfig::default(),
        }
    }
}

/// How a change in the weather is announced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SoundMode {
    Off,
    #[default]
    Bell,
    Command,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(default)]
    pub mode: SoundMode,

    /// External player, e.g. "aplay" or "afplay" (mode = "command")
    #[serde(default)]
    pub player: Option<String>,

    /// Sound file handed to the player
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// City shown when the request has no `city` parameter.
    /// Empty means render only the search form.
    #[serde(default)]
    pub default_city: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8090,
            default_city: "London".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there first if it is missing.
    ///
    /// Environment overrides are applied after the file is read.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str::<Config>(&contents).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Wrote default config to {}", path.display());
            config
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply environment overrides. `lookup` is `std::env::var` outside of tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            tracing::debug!("Using API key from {}", API_KEY_ENV);
            self.weather.api_key = key;
        }
    }

    /// Fail on validation errors, log warnings.
    pub fn ensure_valid(&self) -> Result<()> {
        let validation = self.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(())
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if !self.weather.is_configured() {
            result.add_error(
                "weather.api_key",
                format!("API key is not set (edit the config file or set {})", API_KEY_ENV),
            );
        }

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.poller.interval_secs == 0 {
            result.add_error("poller.interval_secs", "Polling interval must be greater than 0");
        } else if self.poller.interval_secs < 60 {
            result.add_warning(
                "poller.interval_secs",
                "Polling more than once a minute may exceed the API quota",
            );
        }

        if self.poller.retry_initial_secs == 0 {
            result.add_error(
                "poller.retry_initial_secs",
                "Retry delay must be greater than 0",
            );
        }

        if self.poller.sound.mode == SoundMode::Command {
            if self.poller.sound.player.as_deref().map_or(true, |p| p.trim().is_empty()) {
                result.add_error("poller.sound.player", "Sound mode \"command\" needs a player");
            }
            match &self.poller.sound.file {
                None => result.add_error("poller.sound.file", "Sound mode \"command\" needs a file"),
                Some(file) if !file.exists() => result.add_warning(
                    "poller.sound.file",
                    format!("File does not exist: {}", file.display()),
                ),
                Some(_) => {}
            }
        }

        if self.server.port == 0 {
            result.add_error("server.port", "Port cannot be 0");
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("weatherwatch");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        let mut config = Config::default();
        config.weather.api_key = "abc123".to_string();
        config
    }

    #[test]
    fn test_configured_default_is_valid() {
        let result = configured().validate();
        assert!(result.is_valid(), "Config should be valid: {:?}", result.errors);
    }

    #[test]
    fn test_placeholder_api_key_is_error() {
        let result = Config::default().validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.api_key"));
    }

    #[test]
    fn test_zero_interval_is_error() {
        let mut config = configured();
        config.poller.interval_secs = 0;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "poller.interval_secs"));
    }

    #[test]
    fn test_short_interval_is_warning() {
        let mut config = configured();
        config.poller.interval_secs = 10;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "poller.interval_secs"));
    }

    #[test]
    fn test_invalid_base_url_scheme() {
        let mut config = configured();
        config.weather.base_url = "ftp://api.example.com".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_command_sound_needs_player_and_file() {
        let mut config = configured();
        config.poller.sound.mode = SoundMode::Command;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "poller.sound.player"));
        assert!(result.errors.iter().any(|e| e.field == "poller.sound.file"));
    }

    #[test]
    fn test_env_override_replaces_api_key() {
        let mut config = Config::default();
        config.apply_env_overrides(|name| {
            (name == API_KEY_ENV).then(|| "from-env".to_string())
        });
        assert_eq!(config.weather.api_key, "from-env");
    }

    #[test]
    fn test_blank_env_override_is_ignored() {
        let mut config = configured();
        config.apply_env_overrides(|_| Some("   ".to_string()));
        assert_eq!(config.weather.api_key, "abc123");
    }

    #[test]
    fn test_load_from_writes_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.poller.interval_secs, 300);
        assert_eq!(config.server.port, 8090);
    }

    #[test]
    fn test_load_from_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[weather]\napi_key = \"k\"\n\n[poller]\ninterval_secs = 120\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.poller.interval_secs, 120);
        assert_eq!(config.poller.retry_initial_secs, 5);
        assert_eq!(config.weather.units, Units::Metric);
        assert_eq!(config.weather.base_url, "http://api.openweathermap.org/data/2.5");
    }

    #[test]
    fn test_load_from_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[poller\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
