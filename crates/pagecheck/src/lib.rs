//! pagecheck: Page Verification Harness
//!
//! Launches a headless browser, configures viewport, device emulation and
//! network throttling, navigates to a target page, evaluates DOM, CSS and
//! Performance API checks inside the page, and records the outcome as
//! screenshots plus a JSON report.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Harness (one browser, scenarios run sequentially)                  │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  Scenario ──► Target ──► Environment ──► Navigator ──► Evaluator    │
//! │               resolve    viewport        readiness     checks       │
//! │                          device          polling       probes       │
//! │                          throttling      timeout                    │
//! │                                                        │            │
//! │                                                        ▼            │
//! │                                         RunReport ──► ReportWriter  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pagecheck::{BrowserConfig, CheckSuite, Harness, Scenario, Viewport};
//!
//! let mut harness = Harness::launch(BrowserConfig::default()).await?;
//! let scenarios: Vec<Scenario> = Viewport::audit_set()
//!     .into_iter()
//!     .map(|vp| Scenario::new(format!("home-{}", vp.label()), "site/index.html").with_viewport(vp))
//!     .collect();
//! let report = harness.run(&scenarios, &CheckSuite::smoke()).await;
//! harness.close().await?;
//! assert!(report.passed());
//! ```

#![warn(missing_docs)]

mod browser;
mod driver;
pub mod emulation;
mod environment;
#[allow(clippy::missing_errors_doc, clippy::float_cmp)]
mod evaluator;
mod harness;
mod navigator;
mod report;
mod result;
mod scenario;
mod suites;
mod target;
pub mod wait;

pub use browser::BrowserConfig;
#[cfg(feature = "browser")]
pub use browser::{ChromiumBrowser, ChromiumPage};
pub use driver::{BrowserSession, DriverCapabilities, MockBrowser, MockDriver, PageDriver};
pub use emulation::{DeviceDescriptor, DeviceEmulator, NetworkProfile, Viewport};
pub use environment::EnvironmentConfigurator;
pub use evaluator::{
    failed_for_scenario, is_loaded, is_visible, AssertionEvaluator, AssertionResult,
    AssertionSpec, ElementObservation, ImageObservation, PageObservation, Predicate, Rect,
    TimingMetric,
};
pub use harness::Harness;
pub use navigator::{NavigationOutcome, Navigator};
pub use report::{
    render_details, render_summary, HarnessReport, PageTimings, ReportWriter, RunReport,
    REPORT_FILE,
};
pub use result::{HarnessError, HarnessResult};
pub use scenario::{slugify, Scenario, ScenarioStage};
pub use suites::{CheckSuite, BUILTIN_SUITES};
pub use target::{resolve_target, Target};
pub use wait::Readiness;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        AssertionSpec, BrowserConfig, CheckSuite, DeviceEmulator, Harness, HarnessError,
        HarnessReport, HarnessResult, NetworkProfile, Predicate, Readiness, ReportWriter,
        Scenario, Viewport,
    };
}
