use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use weatherwatch_core::{AppError, Config, ConfigError};
use weatherwatch_weather::{
    clearer_for_host, notifier_from_config, CityReadingSource, Console, Poller, WeatherProvider,
};
use weatherwatch_web::AppState;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    weatherwatch_core::init()?;

    let args = Cli::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match args.cmd {
        Command::Poll(poll_args) => {
            poll_args.apply(&mut config);
            validate(&config)?;
            poll(config, poll_args.city).await
        }
        Command::Serve(serve_args) => {
            serve_args.apply(&mut config);
            validate(&config)?;
            serve(config).await
        }
    }
}

fn validate(config: &Config) -> Result<()> {
    if let Err(e) = config.ensure_valid() {
        let err = AppError::Config(ConfigError::Invalid(e.to_string()));
        eprintln!("{}", err.user_message());
        return Err(err.into());
    }
    Ok(())
}

async fn poll(config: Config, city: Option<String>) -> Result<()> {
    let city = match city {
        Some(city) if !city.trim().is_empty() => city.trim().to_string(),
        _ => cli::read_city(std::io::stdin().lock(), std::io::stdout())?,
    };

    let provider = WeatherProvider::from_config(&config.weather).map_err(AppError::from)?;
    let source = CityReadingSource::new(provider, city);
    tracing::info!("Watching weather for {}", source.city());

    let mut poller = Poller::new(
        source,
        Console::new(std::io::stdout(), clearer_for_host(config.poller.clear_screen)),
        notifier_from_config(&config.poller.sound),
        Duration::from_secs(config.poller.interval_secs),
        Duration::from_secs(config.poller.retry_initial_secs),
    );

    tokio::select! {
        result = poller.run() => {
            if let Err(e) = result {
                let err = AppError::from(e);
                eprintln!("{}", err.user_message());
                return Err(err.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, exiting");
        }
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let provider = WeatherProvider::from_config(&config.weather).map_err(AppError::from)?;
    let state = AppState::new(provider, config.server.default_city.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    weatherwatch_web::serve(addr, state).await
}
