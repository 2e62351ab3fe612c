//! Scenarios and their execution stages.

use crate::emulation::{DeviceDescriptor, NetworkProfile, Viewport};
use crate::wait::{Readiness, DEFAULT_NAVIGATION_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One harness run configuration: a target under a viewport and network profile
///
/// Built before the run and never modified while it executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Human-readable name, also used in screenshot file names
    pub name: String,
    /// Raw target as given (path, `localhost:PORT` or URL)
    pub target: String,
    /// Viewport; replaced by the device viewport when a device is set
    pub viewport: Viewport,
    /// Throttling profile, `None` for an unthrottled network
    #[serde(default)]
    pub network: Option<NetworkProfile>,
    /// Device emulation profile
    #[serde(default)]
    pub device: Option<DeviceDescriptor>,
    /// What navigation waits for
    #[serde(default)]
    pub readiness: Readiness,
    /// Hard ceiling for navigation
    #[serde(default = "default_timeout_ms")]
    pub navigation_timeout_ms: u64,
    /// Fixed wait after readiness so transitions and timers settle
    #[serde(default)]
    pub settle_ms: u64,
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_NAVIGATION_TIMEOUT_MS
}

impl Scenario {
    /// Create a scenario with default viewport, no throttling and network-idle readiness
    #[must_use]
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            viewport: Viewport::default(),
            network: None,
            device: None,
            readiness: Readiness::default(),
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            settle_ms: 0,
        }
    }

    /// Set viewport
    #[must_use]
    pub const fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Set network profile
    #[must_use]
    pub fn with_network(mut self, network: Option<NetworkProfile>) -> Self {
        self.network = network;
        self
    }

    /// Set device profile
    #[must_use]
    pub fn with_device(mut self, device: Option<DeviceDescriptor>) -> Self {
        self.device = device;
        self
    }

    /// Set readiness criterion
    #[must_use]
    pub const fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.navigation_timeout_ms = timeout_ms;
        self
    }

    /// Set settle wait
    #[must_use]
    pub const fn with_settle_ms(mut self, settle_ms: u64) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    /// Viewport the page is actually rendered at
    #[must_use]
    pub fn effective_viewport(&self) -> Viewport {
        self.device.as_ref().map_or(self.viewport, |d| d.viewport)
    }

    /// Screenshot file name: `<scenario-slug>-<W>x<H>.png`
    #[must_use]
    pub fn screenshot_name(&self) -> String {
        format!("{}-{}.png", slugify(&self.name), self.effective_viewport().label())
    }
}

/// Lowercase ASCII slug with runs of other characters collapsed to `-`
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("scenario");
    }
    slug
}

/// Stage of a single scenario run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStage {
    /// Not started
    Idle,
    /// Turning the target into a URI
    Resolving,
    /// Applying viewport, device and throttling
    Configuring,
    /// Loading the page and waiting for readiness
    Navigating,
    /// Running checks
    Evaluating,
    /// Capturing screenshots and building the report
    Reporting,
    /// Finished normally
    Done,
    /// Finished on an unrecovered error
    Failed,
}

impl ScenarioStage {
    /// `Done` and `Failed` end the run
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Forward step or failure from any live stage
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Self::Failed)
                | (Self::Idle, Self::Resolving)
                | (Self::Resolving, Self::Configuring)
                | (Self::Configuring, Self::Navigating)
                | (Self::Navigating, Self::Evaluating)
                | (Self::Evaluating, Self::Reporting)
                | (Self::Reporting, Self::Done)
        )
    }
}

impl fmt::Display for ScenarioStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Configuring => "configuring",
            Self::Navigating => "navigating",
            Self::Evaluating => "evaluating",
            Self::Reporting => "reporting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
