//! Weather fetching and change-watching for weatherwatch
//!
//! Fetches current conditions from the OpenWeatherMap API and runs the
//! poll loop that only announces a reading when it differs from the last
//! one shown.

pub mod display;
pub mod notify;
pub mod poller;
pub mod provider;
pub mod retry;
pub mod types;

pub use display::{clearer_for_host, Console, ScreenClearer};
pub use notify::{notifier_from_config, Notifier, NotifyError};
pub use poller::{Change, ChangeDetector, CycleOutcome, Poller, ReadingSource};
pub use provider::{CityReadingSource, ProviderSettings, WeatherProvider};
pub use retry::Backoff;
pub use types::*;
