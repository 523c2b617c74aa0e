use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use weatherwatch_core::{Config, ConfigError};

#[derive(Debug, Parser)]
#[command(about = "Watch the current weather for a city.")]
pub struct Cli {
    /// Config file (default: <config dir>/weatherwatch/config.toml)
    #[arg(env = "WEATHERWATCH_CONFIG", short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll one city and redraw the console when the weather changes
    Poll(PollArgs),
    /// Serve the weather page over HTTP
    Serve(ServeArgs),
}

#[derive(Debug, Parser)]
pub struct PollArgs {
    /// City to watch; read from stdin when omitted
    #[arg(long)]
    pub city: Option<String>,
    /// Seconds between polls
    #[arg(long)]
    pub interval_secs: Option<u64>,
    /// Do not clear the terminal before redrawing
    #[arg(long)]
    pub no_clear: bool,
    /// Do not play a sound on change
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Parser)]
pub struct ServeArgs {
    #[arg(long)]
    pub port: Option<u16>,
    /// City shown when the request has none
    #[arg(long)]
    pub default_city: Option<String>,
}

impl PollArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(secs) = self.interval_secs {
            config.poller.interval_secs = secs;
        }
        if self.no_clear {
            config.poller.clear_screen = false;
        }
        if self.quiet {
            config.poller.sound.mode = weatherwatch_core::SoundMode::Off;
        }
    }
}

impl ServeArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(city) = &self.default_city {
            config.server.default_city = city.clone();
        }
    }
}

/// Prompt for and read the city name, one line.
pub fn read_city<R: BufRead, W: Write>(mut input: R, mut prompt: W) -> Result<String, anyhow::Error> {
    write!(prompt, "City: ")?;
    prompt.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let city = line.trim();
    if city.is_empty() {
        return Err(ConfigError::MissingSetting("city".to_string()).into());
    }
    Ok(city.to_string())
}
