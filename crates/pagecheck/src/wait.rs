//! Readiness criteria and the polling state machine behind navigation waits.
//!
//! The tracker is fed samples of `document.readyState` plus the number of
//! Performance API resource entries, and decides when the page counts as
//! ready. It holds no clock of its own; callers pass elapsed time so the
//! logic is testable without a browser.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default hard ceiling for a navigation (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Network idle threshold (500ms without new resource entries)
pub const NETWORK_IDLE_THRESHOLD_MS: u64 = 500;

/// Script returning the current document state
pub const PAGE_STATE_SCRIPT: &str = r"(() => {
  try {
    return {
      readyState: document.readyState,
      resources: performance.getEntriesByType('resource').length
    };
  } catch (e) {
    return { readyState: 'loading', resources: 0 };
  }
})()";

// =============================================================================
// READINESS
// =============================================================================

/// What the navigator waits for before evaluation starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Readiness {
    /// `DOMContentLoaded` has fired (`readyState` is `interactive` or `complete`)
    DomContentLoaded,
    /// The `load` event has fired (`readyState` is `complete`)
    Load,
    /// Load complete and no new resource entries for `quiet_ms`
    NetworkIdle {
        /// Quiet window in milliseconds
        quiet_ms: u64,
    },
    /// DOM ready, then idle if it happens before `ms`; reaching `ms` is success
    ExplicitTimeout {
        /// Ceiling in milliseconds since navigation start
        ms: u64,
    },
}

impl Readiness {
    /// Network idle with the default quiet window
    #[must_use]
    pub const fn network_idle() -> Self {
        Self::NetworkIdle {
            quiet_ms: NETWORK_IDLE_THRESHOLD_MS,
        }
    }

    /// Short name used in logs and timeout errors
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::Load => "load",
            Self::NetworkIdle { .. } => "networkidle",
            Self::ExplicitTimeout { .. } => "timeout",
        }
    }

    /// Parse the CLI spelling (`dom`, `load`, `idle`, `timeout`)
    #[must_use]
    pub fn from_cli(value: &str, timeout_ms: u64) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dom" | "domcontentloaded" => Some(Self::DomContentLoaded),
            "load" => Some(Self::Load),
            "idle" | "networkidle" => Some(Self::network_idle()),
            "timeout" => Some(Self::ExplicitTimeout { ms: timeout_ms }),
            _ => None,
        }
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::network_idle()
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkIdle { quiet_ms } => write!(f, "networkidle ({quiet_ms}ms quiet)"),
            Self::ExplicitTimeout { ms } => write!(f, "timeout ({ms}ms)"),
            other => write!(f, "{}", other.event_name()),
        }
    }
}

// =============================================================================
// PAGE STATE
// =============================================================================

/// One sample of the page's loading state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    /// `document.readyState`
    pub ready_state: String,
    /// Number of Performance API resource entries
    #[serde(default)]
    pub resources: u64,
}

impl PageState {
    /// Create a sample
    #[must_use]
    pub fn new(ready_state: impl Into<String>, resources: u64) -> Self {
        Self {
            ready_state: ready_state.into(),
            resources,
        }
    }

    /// `DOMContentLoaded` has fired
    #[must_use]
    pub fn dom_ready(&self) -> bool {
        matches!(self.ready_state.as_str(), "interactive" | "complete")
    }

    /// `load` has fired
    #[must_use]
    pub fn load_complete(&self) -> bool {
        self.ready_state == "complete"
    }
}

/// Result of feeding one sample to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// Keep polling
    Pending,
    /// Criterion satisfied
    Ready,
    /// Ceiling reached after DOM readiness (only for `ExplicitTimeout`)
    CeilingReached,
}

/// Polling state for one navigation
#[derive(Debug, Clone)]
pub struct ReadinessTracker {
    readiness: Readiness,
    dom_ready: bool,
    last_resources: Option<u64>,
    quiet_since: Duration,
}

impl ReadinessTracker {
    /// Start tracking a criterion
    #[must_use]
    pub const fn new(readiness: Readiness) -> Self {
        Self {
            readiness,
            dom_ready: false,
            last_resources: None,
            quiet_since: Duration::ZERO,
        }
    }

    /// Criterion being tracked
    #[must_use]
    pub const fn readiness(&self) -> Readiness {
        self.readiness
    }

    /// Whether the DOM has been seen ready at least once
    #[must_use]
    pub const fn dom_ready(&self) -> bool {
        self.dom_ready
    }

    /// Feed a sample taken `elapsed` after navigation started
    pub fn observe(&mut self, state: &PageState, elapsed: Duration) -> WaitStatus {
        if state.dom_ready() {
            self.dom_ready = true;
        }

        if self.last_resources != Some(state.resources) {
            self.last_resources = Some(state.resources);
            self.quiet_since = elapsed;
        }
        let quiet_for = elapsed.saturating_sub(self.quiet_since);

        match self.readiness {
            Readiness::DomContentLoaded if self.dom_ready => WaitStatus::Ready,
            Readiness::Load if state.load_complete() => WaitStatus::Ready,
            Readiness::NetworkIdle { quiet_ms }
                if state.load_complete() && quiet_for >= Duration::from_millis(quiet_ms) =>
            {
                WaitStatus::Ready
            }
            Readiness::ExplicitTimeout { ms } if self.dom_ready => {
                let idle = Duration::from_millis(NETWORK_IDLE_THRESHOLD_MS);
                if state.load_complete() && quiet_for >= idle {
                    WaitStatus::Ready
                } else if elapsed >= Duration::from_millis(ms) {
                    WaitStatus::CeilingReached
                } else {
                    WaitStatus::Pending
                }
            }
            _ => WaitStatus::Pending,
        }
    }
}
