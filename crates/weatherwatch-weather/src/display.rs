//! Console rendering of a reading.

use std::io::Write;

use chrono::{DateTime, Local};

use crate::types::Reading;

#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("Failed to write to console: {0}")]
    Io(#[from] std::io::Error),
    #[error("Screen clear command exited with {0}")]
    ClearFailed(std::process::ExitStatus),
}

/// Capability to wipe the terminal before a redraw.
pub trait ScreenClearer {
    fn clear(&self, out: &mut dyn Write) -> Result<(), DisplayError>;
}

/// ANSI erase-display and cursor-home; works on any VT100-style terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiClear;

impl ScreenClearer for AnsiClear {
    fn clear(&self, out: &mut dyn Write) -> Result<(), DisplayError> {
        out.write_all(b"\x1b[2J\x1b[H")?;
        Ok(())
    }
}

/// `cmd /C cls` for the classic Windows console
#[derive(Debug, Clone, Copy, Default)]
pub struct ClsClear;

impl ScreenClearer for ClsClear {
    fn clear(&self, _out: &mut dyn Write) -> Result<(), DisplayError> {
        let status = std::process::Command::new("cmd").args(["/C", "cls"]).status()?;
        if !status.success() {
            return Err(DisplayError::ClearFailed(status));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoClear;

impl ScreenClearer for NoClear {
    fn clear(&self, _out: &mut dyn Write) -> Result<(), DisplayError> {
        Ok(())
    }
}

/// Pick the clear strategy for the host platform. Called once at startup.
pub fn clearer_for_host(enabled: bool) -> Box<dyn ScreenClearer> {
    if !enabled {
        return Box::new(NoClear);
    }

    if cfg!(windows) {
        Box::new(ClsClear)
    } else {
        Box::new(AnsiClear)
    }
}

/// Render the console block for `reading`.
pub fn render(reading: &Reading, updated_at: DateTime<Local>) -> String {
    format!(
        "Weather in {}\n\
         \n\
         Temperature: {} °C\n\
         Pressure: {} hPa ({:.1} mm Hg)\n\
         Humidity: {} %\n\
         \n\
         Last update: {}\n\
         Press Ctrl+C to exit\n",
        reading.location(),
        reading.temperature(),
        reading.pressure(),
        reading.pressure_mm_hg(),
        reading.humidity(),
        updated_at.format("%Y-%m-%d %H:%M:%S"),
    )
}

pub struct Console<W: Write> {
    out: W,
    clearer: Box<dyn ScreenClearer>,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, clearer: Box<dyn ScreenClearer>) -> Self {
        Self { out, clearer }
    }

    /// Clear the screen (best effort) and draw `reading`.
    pub fn show(&mut self, reading: &Reading, updated_at: DateTime<Local>) -> Result<(), DisplayError> {
        if let Err(e) = self.clearer.clear(&mut self.out) {
            tracing::debug!("Screen clear failed: {}", e);
        }

        self.out.write_all(render(reading, updated_at).as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}
