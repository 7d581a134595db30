//! Capture daemon.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::WorkerResult;
use crate::location::{CaptureOutcome, Location};

/// Time left until the next wall-clock minute boundary after `now`.
pub fn until_next_minute(now: DateTime<Utc>) -> Duration {
    let into_minute =
        Duration::from_secs(now.second() as u64) + Duration::from_nanos(now.nanosecond() as u64);
    Duration::from_secs(60).saturating_sub(into_minute)
}

/// Runs one capture cycle for every location at each minute boundary.
pub struct CaptureExecutor {
    locations: Vec<Arc<Location>>,
    shutdown: watch::Sender<bool>,
}

impl CaptureExecutor {
    pub fn new(locations: Vec<Location>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            locations: locations.into_iter().map(Arc::new).collect(),
            shutdown,
        }
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    /// Run until [`shutdown`](Self::shutdown) is called.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(locations = self.locations.len(), "Starting capture executor");

        let mut shutdown_rx = self.shutdown.subscribe();
        if *shutdown_rx.borrow() {
            return Ok(());
        }

        loop {
            let wait = until_next_minute(Utc::now());
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                _ = tokio::time::sleep(wait) => {
                    self.tick().await;
                }
            }
        }

        info!("Capture executor stopped");
        Ok(())
    }

    /// One capture cycle for all locations, concurrently.
    ///
    /// Failures are already logged by each location and never stop the
    /// others. Returns the number of frames stored.
    pub async fn tick(&self) -> usize {
        let results = join_all(self.locations.iter().map(|location| location.process())).await;

        let stored = results
            .iter()
            .filter(|r| matches!(r, Ok(CaptureOutcome::Stored { .. })))
            .count();
        let failed = results.iter().filter(|r| r.is_err()).count();

        debug!(
            locations = self.locations.len(),
            stored,
            failed,
            "Capture tick complete"
        );
        stored
    }

    /// Signal shutdown. Also honoured if `run` has not subscribed yet.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_until_next_minute() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 15).unwrap();
        assert_eq!(until_next_minute(now), Duration::from_secs(45));

        let on_boundary = Utc.with_ymd_and_hms(2024, 6, 1, 12, 1, 0).unwrap();
        assert_eq!(until_next_minute(on_boundary), Duration::from_secs(60));

        let late = now + chrono::Duration::milliseconds(44_500);
        assert_eq!(until_next_minute(late), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_run_returns_after_shutdown() {
        let executor = CaptureExecutor::new(Vec::new());
        executor.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(1), executor.run()).await;
        assert!(matches!(result, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_tick_without_locations() {
        let executor = CaptureExecutor::new(Vec::new());
        assert_eq!(executor.tick().await, 0);
        assert_eq!(executor.location_count(), 0);
    }
}
