//! Audible notification when the weather changes.
//!
//! Notifications are best effort: the poller logs a [`NotifyError`] and
//! carries on.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use weatherwatch_core::{SoundConfig, SoundMode};

use crate::types::Reading;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to start {player}: {source}")]
    Spawn {
        player: String,
        source: std::io::Error,
    },
    #[error("{player} exited with {status}")]
    PlayerFailed { player: String, status: ExitStatus },
}

pub trait Notifier {
    fn notify(&self, reading: &Reading) -> Result<(), NotifyError>;
}

/// Rings the terminal bell
#[derive(Debug, Clone, Copy, Default)]
pub struct BellNotifier;

impl Notifier for BellNotifier {
    fn notify(&self, _reading: &Reading) -> Result<(), NotifyError> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(b"\x07")?;
        stdout.flush()?;
        Ok(())
    }
}

/// Plays a sound file through an external player, e.g. `aplay alert.wav`
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    player: String,
    file: PathBuf,
}

impl CommandNotifier {
    pub fn new(player: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            player: player.into(),
            file: file.into(),
        }
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, _reading: &Reading) -> Result<(), NotifyError> {
        let status = Command::new(&self.player)
            .arg(&self.file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| NotifyError::Spawn {
                player: self.player.clone(),
                source,
            })?;

        if !status.success() {
            return Err(NotifyError::PlayerFailed {
                player: self.player.clone(),
                status,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _reading: &Reading) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Build the notifier selected in config.
///
/// An incomplete `command` setup falls back to the bell.
pub fn notifier_from_config(config: &SoundConfig) -> Box<dyn Notifier> {
    match config.mode {
        SoundMode::Off => Box::new(SilentNotifier),
        SoundMode::Bell => Box::new(BellNotifier),
        SoundMode::Command => match (&config.player, &config.file) {
            (Some(player), Some(file)) => Box::new(CommandNotifier::new(player.clone(), file.clone())),
            _ => {
                tracing::warn!("Sound mode \"command\" needs player and file; using the bell");
                Box::new(BellNotifier)
            }
        },
    }
}
