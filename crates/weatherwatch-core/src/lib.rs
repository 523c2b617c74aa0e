pub mod config;
pub mod error;

pub use config::{
    Config, PollerConfig, ServerConfig, SoundConfig, SoundMode, Units, ValidationResult,
    WeatherConfig, API_KEY_ENV,
};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt, WeatherError};

use anyhow::Result;

/// Initialize logging for the process.
///
/// Log lines go to stderr so they never interleave with the console display
/// the poller draws on stdout.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Weatherwatch core initialized");
    Ok(())
}
