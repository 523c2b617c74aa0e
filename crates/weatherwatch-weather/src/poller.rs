//! Fetch, compare, announce, sleep.
//!
//! The poller keeps the last announced reading and only redraws the console
//! and fires the notifier when a fetched reading differs from it.
//! Network and decode failures cost one cycle; the next attempt waits an
//! exponential backoff capped at the regular interval. Only errors that
//! retrying cannot fix end the loop.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use chrono::Local;

use crate::display::Console;
use crate::notify::Notifier;
use crate::retry::Backoff;
use crate::types::{Reading, WeatherError};

/// Something that produces a fresh reading on every call.
pub trait ReadingSource {
    fn fetch(&self) -> impl Future<Output = Result<Reading, WeatherError>>;
}

/// Result of comparing a reading against the last announced one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Changed,
    Unchanged,
}

/// Owns the last announced reading.
///
/// Starts empty, so the first reading always counts as a change, even
/// one where every scalar is zero.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_seen: Option<Reading>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> Option<&Reading> {
        self.last_seen.as_ref()
    }

    /// Compare `reading` with the last announced one and keep it if it differs.
    pub fn observe(&mut self, reading: Reading) -> Change {
        let unchanged = self
            .last_seen
            .as_ref()
            .is_some_and(|prev| prev.same_conditions(&reading));

        if unchanged {
            return Change::Unchanged;
        }

        self.last_seen = Some(reading);
        Change::Changed
    }
}

/// What one cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Reading differed; rendered and notified
    Notified,
    Unchanged,
    /// Recoverable fetch or decode failure
    Failed,
}

pub struct Poller<S, W: Write> {
    source: S,
    console: Console<W>,
    notifier: Box<dyn Notifier>,
    detector: ChangeDetector,
    interval: Duration,
    backoff: Backoff,
    consecutive_failures: u32,
}

impl<S: ReadingSource, W: Write> Poller<S, W> {
    /// `retry_initial` is the first backoff delay; backoff never exceeds `interval`.
    pub fn new(
        source: S,
        console: Console<W>,
        notifier: Box<dyn Notifier>,
        interval: Duration,
        retry_initial: Duration,
    ) -> Self {
        Self {
            source,
            console,
            notifier,
            detector: ChangeDetector::new(),
            interval,
            backoff: Backoff::new(retry_initial.min(interval), interval),
            consecutive_failures: 0,
        }
    }

    pub fn last_seen(&self) -> Option<&Reading> {
        self.detector.last_seen()
    }

    pub fn console(&self) -> &Console<W> {
        &self.console
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Run one fetch-compare-announce step.
    ///
    /// Returns `Err` only for fatal errors (see [`WeatherError::is_fatal`]).
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, WeatherError> {
        let reading = match self.source.fetch().await {
            Ok(reading) => reading,
            Err(e) if e.is_fatal() => {
                tracing::error!("Giving up: {}", e);
                return Err(e);
            }
            Err(e) => {
                self.consecutive_failures += 1;
                tracing::warn!(
                    retryable = e.is_retryable(),
                    failures = self.consecutive_failures,
                    "Weather fetch failed, keeping last reading: {}",
                    e
                );
                return Ok(CycleOutcome::Failed);
            }
        };

        if self.consecutive_failures > 0 {
            tracing::info!("Weather fetch recovered after {} failures", self.consecutive_failures);
            self.consecutive_failures = 0;
        }

        match self.detector.observe(reading) {
            Change::Unchanged => {
                tracing::debug!("Weather unchanged");
                Ok(CycleOutcome::Unchanged)
            }
            Change::Changed => {
                self.announce();
                Ok(CycleOutcome::Notified)
            }
        }
    }

    fn announce(&mut self) {
        let Some(reading) = self.detector.last_seen() else {
            return;
        };

        tracing::info!(
            location = reading.location(),
            temperature = reading.temperature(),
            pressure = reading.pressure(),
            humidity = reading.humidity(),
            "Weather changed"
        );

        if let Err(e) = self.console.show(reading, Local::now()) {
            tracing::warn!("Failed to render weather: {}", e);
        }

        if let Err(e) = self.notifier.notify(reading) {
            tracing::warn!("Notification failed: {}", e);
        }
    }

    /// How long to sleep after a cycle with `outcome`.
    pub fn next_delay(&self, outcome: CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Failed if self.consecutive_failures > 0 => {
                self.backoff.delay_for_attempt(self.consecutive_failures - 1)
            }
            _ => self.interval,
        }
    }

    /// Poll forever. Returns only with a fatal error.
    pub async fn run(&mut self) -> Result<(), WeatherError> {
        tracing::info!("Polling every {:?}", self.interval);

        loop {
            let outcome = self.run_cycle().await?;
            let delay = self.next_delay(outcome);
            tracing::debug!("Next poll in {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::NoClear;
    use crate::notify::NotifyError;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedSource {
        script: RefCell<VecDeque<Result<Reading, WeatherError>>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<Reading, WeatherError>>) -> Self {
            Self {
                script: RefCell::new(script.into()),
            }
        }
    }

    impl ReadingSource for ScriptedSource {
        async fn fetch(&self) -> Result<Reading, WeatherError> {
            self.script
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(WeatherError::Parse("script exhausted".into())))
        }
    }

    #[derive(Clone, Default)]
    struct CountingNotifier {
        count: Arc<AtomicUsize>,
        fail: bool,
    }

    impl Notifier for CountingNotifier {
        fn notify(&self, _reading: &Reading) -> Result<(), NotifyError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(NotifyError::Io(std::io::Error::other("speaker unplugged")));
            }
            Ok(())
        }
    }

    fn reading(t: f64, p: f64, h: f64) -> Reading {
        Reading::new(t, p, h, "London")
    }

    fn poller(
        script: Vec<Result<Reading, WeatherError>>,
        notifier: CountingNotifier,
    ) -> Poller<ScriptedSource, Vec<u8>> {
        Poller::new(
            ScriptedSource::new(script),
            Console::new(Vec::new(), Box::new(NoClear)),
            Box::new(notifier),
            Duration::from_secs(300),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_first_reading_is_a_change() {
        let mut detector = ChangeDetector::new();
        assert_eq!(detector.observe(reading(20.0, 1010.0, 50.0)), Change::Changed);
    }

    #[test]
    fn test_all_zero_first_reading_is_a_change() {
        let mut detector = ChangeDetector::new();
        assert_eq!(detector.observe(reading(0.0, 0.0, 0.0)), Change::Changed);
        assert_eq!(detector.last_seen(), Some(&reading(0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_same_reading_repeated_is_unchanged() {
        let mut detector = ChangeDetector::new();
        detector.observe(reading(20.0, 1010.0, 50.0));
        for _ in 0..5 {
            assert_eq!(detector.observe(reading(20.0, 1010.0, 50.0)), Change::Unchanged);
        }
    }

    #[test]
    fn test_name_change_alone_is_unchanged() {
        let mut detector = ChangeDetector::new();
        detector.observe(Reading::new(20.0, 1010.0, 50.0, "London"));
        assert_eq!(
            detector.observe(Reading::new(20.0, 1010.0, 50.0, "City of London")),
            Change::Unchanged
        );
        assert_eq!(detector.last_seen().map(Reading::location), Some("London"));
    }

    #[test]
    fn test_changed_reading_replaces_last_seen() {
        let mut detector = ChangeDetector::new();
        detector.observe(reading(20.0, 1010.0, 50.0));
        assert_eq!(detector.observe(reading(20.0, 1009.0, 50.0)), Change::Changed);
        assert_eq!(detector.last_seen(), Some(&reading(20.0, 1009.0, 50.0)));
    }

    #[tokio::test]
    async fn test_notify_only_on_transitions() {
        let notifier = CountingNotifier::default();
        let count = notifier.count.clone();
        let mut poller = poller(
            vec![
                Ok(reading(20.0, 1010.0, 50.0)),
                Ok(reading(20.0, 1010.0, 50.0)),
                Ok(reading(20.0, 1010.0, 51.0)),
            ],
            notifier,
        );

        assert_eq!(poller.run_cycle().await.unwrap(), CycleOutcome::Notified);
        assert_eq!(poller.run_cycle().await.unwrap(), CycleOutcome::Unchanged);
        assert_eq!(poller.run_cycle().await.unwrap(), CycleOutcome::Notified);
        assert_eq!(count.load(Ordering::SeqCst), 2);

        let output = String::from_utf8(poller.console().get_ref().clone()).unwrap();
        assert_eq!(output.matches("Weather in London").count(), 2);
        assert!(output.contains("Humidity: 51 %"));
    }

    #[tokio::test]
    async fn test_same_reading_n_times_notifies_once() {
        let notifier = CountingNotifier::default();
        let count = notifier.count.clone();
        let script = (0..6).map(|_| Ok(reading(3.5, 998.0, 90.0))).collect();
        let mut poller = poller(script, notifier);

        for _ in 0..6 {
            poller.run_cycle().await.unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_last_seen() {
        let notifier = CountingNotifier::default();
        let count = notifier.count.clone();
        let mut poller = poller(
            vec![
                Ok(reading(20.0, 1010.0, 50.0)),
                Err(WeatherError::Parse("missing field `main`".into())),
                Ok(reading(20.0, 1010.0, 50.0)),
            ],
            notifier,
        );

        poller.run_cycle().await.unwrap();
        assert_eq!(poller.run_cycle().await.unwrap(), CycleOutcome::Failed);
        assert_eq!(poller.last_seen(), Some(&reading(20.0, 1010.0, 50.0)));
        assert_eq!(poller.consecutive_failures(), 1);

        assert_eq!(poller.run_cycle().await.unwrap(), CycleOutcome::Unchanged);
        assert_eq!(poller.consecutive_failures(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fatal_error_ends_cycle_with_err() {
        let mut poller = poller(vec![Err(WeatherError::InvalidApiKey)], CountingNotifier::default());
        assert!(matches!(poller.run_cycle().await, Err(WeatherError::InvalidApiKey)));
    }

    #[tokio::test]
    async fn test_fatal_error_ends_run() {
        let mut poller = poller(
            vec![
                Ok(reading(20.0, 1010.0, 50.0)),
                Err(WeatherError::CityNotFound("London".into())),
            ],
            CountingNotifier::default(),
        );
        // First cycle sleeps for the full interval; shrink it for the test.
        poller.interval = Duration::from_millis(1);

        let result = poller.run().await;
        assert!(matches!(result, Err(WeatherError::CityNotFound(_))));
    }

    #[tokio::test]
    async fn test_notifier_failure_is_not_fatal() {
        let notifier = CountingNotifier {
            fail: true,
            ..Default::default()
        };
        let mut poller = poller(vec![Ok(reading(20.0, 1010.0, 50.0))], notifier);

        assert_eq!(poller.run_cycle().await.unwrap(), CycleOutcome::Notified);
        assert!(poller.last_seen().is_some());
    }

    #[tokio::test]
    async fn test_backoff_grows_then_caps_at_interval() {
        let failures = (0..8)
            .map(|_| Err(WeatherError::Api { status: 503, message: "down".into() }))
            .collect();
        let mut poller = poller(failures, CountingNotifier::default());

        let mut delays = Vec::new();
        for _ in 0..8 {
            let outcome = poller.run_cycle().await.unwrap();
            delays.push(poller.next_delay(outcome));
        }

        assert_eq!(delays[0], Duration::from_secs(5));
        assert_eq!(delays[1], Duration::from_secs(10));
        assert_eq!(delays[2], Duration::from_secs(20));
        assert_eq!(delays[7], Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_success_uses_regular_interval() {
        let mut poller = poller(vec![Ok(reading(1.0, 2.0, 3.0))], CountingNotifier::default());
        let outcome = poller.run_cycle().await.unwrap();
        assert_eq!(poller.next_delay(outcome), Duration::from_secs(300));
    }
}
