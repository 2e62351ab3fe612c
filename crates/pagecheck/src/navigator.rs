//! Navigation with readiness polling under a hard timeout.

use crate::driver::PageDriver;
use crate::result::{HarnessError, HarnessResult};
use crate::wait::{
    PageState, Readiness, ReadinessTracker, WaitStatus, DEFAULT_POLL_INTERVAL_MS,
    PAGE_STATE_SCRIPT,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// How a navigation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationOutcome {
    /// Time from issuing the request to the end of the wait
    pub elapsed_ms: u64,
    /// `false` when an explicit ceiling ended the wait instead of the criterion
    pub readiness_reached: bool,
}

/// Drives a page to a URL and waits for a readiness criterion
#[derive(Debug, Clone, Copy)]
pub struct Navigator {
    poll_interval: Duration,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Navigator {
    /// Navigator with the default 50ms polling interval
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Navigate and wait until `readiness` holds or `timeout` expires
    ///
    /// # Errors
    ///
    /// `NavigationTimeout` when the ceiling is hit before the criterion (or,
    /// for `ExplicitTimeout`, before DOM readiness); driver errors from the
    /// navigation request itself.
    pub async fn navigate<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        url: &str,
        readiness: Readiness,
        timeout: Duration,
    ) -> HarnessResult<NavigationOutcome> {
        let start = Instant::now();
        let timed_out = |elapsed: Duration| HarnessError::NavigationTimeout {
            url: url.to_string(),
            elapsed_ms: millis(elapsed),
            waiting_for: readiness.event_name().to_string(),
        };

        debug!(url, %readiness, timeout_ms = millis(timeout), "navigating");
        match tokio::time::timeout(timeout, driver.navigate(url)).await {
            Ok(result) => result?,
            Err(_) => return Err(timed_out(start.elapsed())),
        }

        let mut tracker = ReadinessTracker::new(readiness);
        loop {
            let remaining = timeout.saturating_sub(start.elapsed());
            let state = match tokio::time::timeout(remaining, driver.evaluate(PAGE_STATE_SCRIPT))
                .await
            {
                Ok(Ok(value)) => serde_json::from_value::<PageState>(value)
                    .unwrap_or_else(|_| PageState::new("loading", 0)),
                Ok(Err(e)) => {
                    // context is replaced while the new document commits
                    trace!(error = %e, "page state unavailable");
                    PageState::new("loading", 0)
                }
                Err(_) => PageState::new("loading", 0),
            };

            let elapsed = start.elapsed();
            let outcome = |readiness_reached| NavigationOutcome {
                elapsed_ms: millis(elapsed),
                readiness_reached,
            };
            match tracker.observe(&state, elapsed) {
                WaitStatus::Ready => {
                    debug!(url, elapsed_ms = millis(elapsed), "page ready");
                    return Ok(outcome(true));
                }
                WaitStatus::CeilingReached => {
                    debug!(url, elapsed_ms = millis(elapsed), "readiness ceiling reached");
                    return Ok(outcome(false));
                }
                WaitStatus::Pending => {}
            }

            if elapsed >= timeout {
                if matches!(tracker.readiness(), Readiness::ExplicitTimeout { .. }) && tracker.dom_ready() {
                    return Ok(outcome(false));
                }
                return Err(timed_out(elapsed));
            }
            tokio::time::sleep(self.poll_interval.min(timeout - elapsed)).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use serde_json::json;

    fn fast() -> Navigator {
        Navigator::new().with_poll_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_loaded_page_is_ready() {
        let mut driver = MockDriver::loaded();
        let outcome = fast()
            .navigate(
                &mut driver,
                "file:///tmp/a.html",
                Readiness::Load,
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert!(outcome.readiness_reached);
        assert!(outcome.elapsed_ms < 2000);
        assert!(driver.was_called("navigate:file:///tmp/a.html"));
    }

    #[tokio::test]
    async fn test_stuck_loading_times_out() {
        let mut driver = MockDriver::new();
        driver.on_script("readyState", json!({"readyState": "loading", "resources": 0}));
        let err = fast()
            .navigate(
                &mut driver,
                "http://localhost:7777/",
                Readiness::DomContentLoaded,
                Duration::from_millis(100),
            )
            .await
            .unwrap_err();
        match err {
            HarnessError::NavigationTimeout {
                elapsed_ms,
                waiting_for,
                ..
            } => {
                assert!(elapsed_ms >= 100);
                assert_eq!(waiting_for, "DOMContentLoaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let mut driver = MockDriver::loaded().with_navigate_delay(Duration::from_secs(5));
        let err = fast()
            .navigate(&mut driver, "x", Readiness::Load, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::NavigationTimeout { .. }));
    }

    #[tokio::test]
    async fn test_explicit_timeout_after_dom_ready_succeeds() {
        let mut driver = MockDriver::new();
        // resource count keeps climbing, as with a polling script
        let samples = (0..200)
            .map(|n| Ok(json!({"readyState": "interactive", "resources": n})))
            .collect();
        driver.on_script_sequence("readyState", samples);

        let outcome = fast()
            .navigate(
                &mut driver,
                "x",
                Readiness::ExplicitTimeout { ms: 60 },
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert!(!outcome.readiness_reached);
        assert!(outcome.elapsed_ms >= 60);
    }

    #[tokio::test]
    async fn test_probe_errors_are_retried() {
        let mut driver = MockDriver::new();
        driver.on_script_sequence(
            "readyState",
            vec![
                Err("Execution context was destroyed".to_string()),
                Ok(json!({"readyState": "complete", "resources": 2})),
            ],
        );
        let outcome = fast()
            .navigate(&mut driver, "x", Readiness::Load, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(outcome.readiness_reached);
    }
}
