//! Run reports, console summaries and report persistence.
//!
//! ```text
//! <out>/report.json                         { "scenarios": [RunReport, ...] }
//! <out>/<scenario-slug>-<W>x<H>.png         one screenshot per scenario
//! ```

use crate::emulation::Viewport;
use crate::evaluator::AssertionResult;
use crate::result::{HarnessError, HarnessResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, error};

/// Report file name inside the output directory
pub const REPORT_FILE: &str = "report.json";

/// Performance API timings captured after navigation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTimings {
    /// `DOMContentLoaded` end relative to navigation start
    #[serde(default)]
    pub dom_content_loaded_ms: Option<f64>,
    /// `load` end relative to navigation start
    #[serde(default)]
    pub load_ms: Option<f64>,
    /// First contentful paint
    #[serde(default)]
    pub first_contentful_paint_ms: Option<f64>,
    /// Resource entries recorded
    #[serde(default)]
    pub resource_count: u64,
    /// Bytes transferred for the document and its resources
    #[serde(default)]
    pub transfer_bytes: u64,
}

/// Outcome of one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Scenario name
    pub scenario: String,
    /// Viewport the page was rendered at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
    /// When the scenario started
    pub timestamp_start: DateTime<Utc>,
    /// Wall time of the whole scenario
    pub duration_ms: u64,
    verdict: bool,
    /// One entry per check, in suite order
    pub results: Vec<AssertionResult>,
    /// Screenshots written for this scenario
    #[serde(default)]
    pub screenshot_paths: Vec<PathBuf>,
    /// Performance timings, absent when navigation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timings: Option<PageTimings>,
    /// Scenario-level failure, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    /// Build a report; the verdict is fixed here
    ///
    /// A scenario passes when it has no scenario-level error and every
    /// result passed.
    #[must_use]
    pub fn new(
        scenario: impl Into<String>,
        timestamp_start: DateTime<Utc>,
        duration_ms: u64,
        results: Vec<AssertionResult>,
        error: Option<String>,
    ) -> Self {
        let verdict = error.is_none() && results.iter().all(|r| r.passed);
        Self {
            scenario: scenario.into(),
            viewport: None,
            timestamp_start,
            duration_ms,
            verdict,
            results,
            screenshot_paths: Vec::new(),
            timings: None,
            error,
        }
    }

    /// Record the rendered viewport
    #[must_use]
    pub const fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// Scenario name with its viewport, as shown in summaries
    #[must_use]
    pub fn label(&self) -> String {
        match self.viewport {
            Some(vp) => format!("{} @ {}", self.scenario, vp.label()),
            None => self.scenario.clone(),
        }
    }

    /// Attach screenshot paths
    #[must_use]
    pub fn with_screenshots(mut self, paths: Vec<PathBuf>) -> Self {
        self.screenshot_paths = paths;
        self
    }

    /// Attach timings
    #[must_use]
    pub fn with_timings(mut self, timings: Option<PageTimings>) -> Self {
        self.timings = timings;
        self
    }

    /// Whether every check passed
    #[must_use]
    pub const fn verdict(&self) -> bool {
        self.verdict
    }

    /// Number of passing checks
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Failing checks
    pub fn failures(&self) -> impl Iterator<Item = &AssertionResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

/// The JSON report file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarnessReport {
    /// One report per scenario, in run order
    pub scenarios: Vec<RunReport>,
}

impl HarnessReport {
    /// Wrap scenario reports
    #[must_use]
    pub const fn new(scenarios: Vec<RunReport>) -> Self {
        Self { scenarios }
    }

    /// Aggregate verdict across scenarios
    #[must_use]
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(RunReport::verdict)
    }

    /// Total number of checks
    #[must_use]
    pub fn total_checks(&self) -> usize {
        self.scenarios.iter().map(|s| s.results.len()).sum()
    }

    /// Total number of passing checks
    #[must_use]
    pub fn passed_checks(&self) -> usize {
        self.scenarios.iter().map(RunReport::passed_count).sum()
    }

    /// Read a report file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

// =============================================================================
// RENDERING
// =============================================================================

const fn status(passed: bool) -> &'static str {
    if passed {
        "PASS"
    } else {
        "FAIL"
    }
}

/// Scenario × check table followed by the aggregate verdict
#[must_use]
pub fn render_summary(reports: &[RunReport]) -> String {
    let scenario_width = reports
        .iter()
        .map(|r| r.label().chars().count())
        .chain(std::iter::once("SCENARIO".len()))
        .max()
        .unwrap_or(8);
    let check_width = reports
        .iter()
        .flat_map(|r| r.results.iter().map(|c| c.name.chars().count()))
        .chain(std::iter::once("CHECK".len()))
        .max()
        .unwrap_or(5);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<scenario_width$}  {:<check_width$}  RESULT",
        "SCENARIO", "CHECK"
    );
    for report in reports {
        let label = report.label();
        if report.results.is_empty() {
            let _ = writeln!(
                out,
                "{:<scenario_width$}  {:<check_width$}  {}",
                label,
                "-",
                status(report.verdict)
            );
        }
        for result in &report.results {
            let _ = writeln!(
                out,
                "{:<scenario_width$}  {:<check_width$}  {}",
                label,
                result.name,
                status(result.passed)
            );
        }
        if let Some(ref err) = report.error {
            let _ = writeln!(out, "{:<scenario_width$}  error: {err}", "");
        }
    }

    let total = HarnessReport::new(reports.to_vec());
    let passed_scenarios = reports.iter().filter(|r| r.verdict).count();
    let _ = writeln!(
        out,
        "\nVerdict: {} ({}/{} scenarios, {}/{} checks passed)",
        status(total.passed()),
        passed_scenarios,
        reports.len(),
        total.passed_checks(),
        total.total_checks()
    );
    out
}

/// Per-check messages and observed values
#[must_use]
pub fn render_details(reports: &[RunReport]) -> String {
    let mut out = String::new();
    for report in reports {
        let _ = writeln!(
            out,
            "{} [{}] {}ms",
            report.label(),
            status(report.verdict),
            report.duration_ms
        );
        let failing: Vec<&str> = report.failures().map(|r| r.name.as_str()).collect();
        if !failing.is_empty() {
            let _ = writeln!(out, "  failing: {}", failing.join(", "));
        }
        if let Some(ref timings) = report.timings {
            let fmt_ms = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |ms| format!("{ms:.0}ms"));
            let _ = writeln!(
                out,
                "  timings: dcl={} load={} fcp={} resources={} bytes={}",
                fmt_ms(timings.dom_content_loaded_ms),
                fmt_ms(timings.load_ms),
                fmt_ms(timings.first_contentful_paint_ms),
                timings.resource_count,
                timings.transfer_bytes
            );
        }
        for result in &report.results {
            let _ = writeln!(
                out,
                "  {} {}: {}",
                status(result.passed),
                result.name,
                result.message
            );
            if !result.observed.is_null() {
                let _ = writeln!(out, "       observed: {}", result.observed);
            }
        }
        for path in &report.screenshot_paths {
            let _ = writeln!(out, "  screenshot: {}", path.display());
        }
    }
    out
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Writes screenshots and the JSON report into one directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    out_dir: PathBuf,
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> HarnessError {
    HarnessError::ReportWrite {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

impl ReportWriter {
    /// Writer rooted at `out_dir`; the directory is created on first write
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Output directory
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> HarnessResult<PathBuf> {
        let path = self.out_dir.join(name);
        let result: std::io::Result<()> = async {
            tokio::fs::create_dir_all(&self.out_dir).await?;
            let file = tokio::fs::File::create(&path).await?;
            let mut writer = BufWriter::new(file);
            writer.write_all(bytes).await?;
            writer.flush().await?;
            writer.into_inner().sync_all().await
        }
        .await;

        match result {
            Ok(()) => {
                debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
                Ok(path)
            }
            Err(e) => {
                let err = write_error(&path, e);
                error!(error = %err, "report write failed");
                Err(err)
            }
        }
    }

    /// Write a PNG screenshot under `file_name`
    ///
    /// # Errors
    ///
    /// `ReportWrite` if the file cannot be written.
    pub async fn write_screenshot(&self, file_name: &str, png: &[u8]) -> HarnessResult<PathBuf> {
        self.write_file(file_name, png).await
    }

    /// Write `report.json`
    ///
    /// # Errors
    ///
    /// `ReportWrite` if serialization or the write fails.
    pub async fn write_report(&self, report: &HarnessReport) -> HarnessResult<PathBuf> {
        let json = serde_json::to_vec_pretty(report)
            .map_err(|e| write_error(&self.out_dir.join(REPORT_FILE), e))?;
        self.write_file(REPORT_FILE, &json).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn result(name: &str, passed: bool) -> AssertionResult {
        AssertionResult {
            name: name.to_string(),
            passed,
            observed: json!({ "count": 1 }),
            message: if passed { "ok" } else { "nope" }.to_string(),
        }
    }

    fn report(name: &str, results: Vec<AssertionResult>) -> RunReport {
        RunReport::new(name, Utc::now(), 42, results, None)
    }

    mod verdict_tests {
        use super::*;

        #[test]
        fn test_all_passed() {
            let r = report("home", vec![result("a", true), result("b", true)]);
            assert!(r.verdict());
            assert_eq!(r.passed_count(), 2);
        }

        #[test]
        fn test_one_failure_fails_scenario() {
            let r = report("home", vec![result("a", true), result("b", false)]);
            assert!(!r.verdict());
            assert_eq!(r.failures().count(), 1);
        }

        #[test]
        fn test_scenario_error_fails_even_without_results() {
            let r = RunReport::new("home", Utc::now(), 0, vec![], Some("timed out".to_string()));
            assert!(!r.verdict());
        }

        #[test]
        fn test_harness_verdict() {
            let all = HarnessReport::new(vec![
                report("a", vec![result("x", true)]),
                report("b", vec![result("x", false)]),
            ]);
            assert!(!all.passed());
            assert_eq!(all.passed_checks(), 1);
            assert_eq!(all.total_checks(), 2);
        }

        proptest! {
            #[test]
            fn prop_verdict_is_and_of_results(outcomes in proptest::collection::vec(any::<bool>(), 0..12)) {
                let results = outcomes
                    .iter()
                    .enumerate()
                    .map(|(i, passed)| result(&format!("check-{i}"), *passed))
                    .collect();
                let r = report("prop", results);
                prop_assert_eq!(r.verdict(), outcomes.iter().all(|p| *p));
            }
        }
    }

    mod serialization_tests {
        use super::*;

        #[test]
        fn test_json_round_trip() {
            let original = HarnessReport::new(vec![report(
                "home-375x667",
                vec![result("body visible", true), result("no scroll", false)],
            )
            .with_timings(Some(PageTimings {
                dom_content_loaded_ms: Some(87.5),
                ..PageTimings::default()
            }))]);

            let json = serde_json::to_string(&original).unwrap();
            let back: HarnessReport = serde_json::from_str(&json).unwrap();

            assert_eq!(back, original);
            assert_eq!(back.scenarios[0].scenario, "home-375x667");
            assert_eq!(back.scenarios[0].results.len(), 2);
            assert!(!back.scenarios[0].verdict());
        }

        #[test]
        fn test_field_names() {
            let value = serde_json::to_value(HarnessReport::new(vec![report("s", vec![])])).unwrap();
            let first = &value["scenarios"][0];
            assert!(first.get("timestampStart").is_some());
            assert!(first.get("durationMs").is_some());
            assert!(first.get("screenshotPaths").is_some());
            assert!(first.get("timestamp_start").is_none());
            assert_eq!(first["verdict"], true);
            assert!(first.get("error").is_none());
        }

        #[test]
        fn test_timing_field_names() {
            let timings = PageTimings {
                dom_content_loaded_ms: Some(120.0),
                first_contentful_paint_ms: Some(300.0),
                transfer_bytes: 2048,
                ..PageTimings::default()
            };
            let value = serde_json::to_value(&timings).unwrap();
            assert_eq!(value["domContentLoadedMs"], 120.0);
            assert_eq!(value["firstContentfulPaintMs"], 300.0);
            assert_eq!(value["transferBytes"], 2048);
            assert_eq!(value["resourceCount"], 0);
        }
    }

    mod render_tests {
        use super::*;

        #[test]
        fn test_summary_table() {
            let text = render_summary(&[
                report("mobile-375x667", vec![result("body visible", true)]),
                report("tablet-768x1024", vec![result("body visible", false)]),
            ]);
            assert!(text.contains("SCENARIO"));
            assert!(text.contains("mobile-375x667"));
            assert!(text.contains("Verdict: FAIL (1/2 scenarios, 1/2 checks passed)"));
        }

        #[test]
        fn test_summary_labels_viewport() {
            let r = report("home", vec![result("body visible", true)])
                .with_viewport(Viewport::new(375, 667));
            assert_eq!(r.label(), "home @ 375x667");
            assert!(render_summary(&[r]).contains("home @ 375x667"));
        }

        #[test]
        fn test_summary_shows_scenario_error() {
            let r = RunReport::new(
                "slow",
                Utc::now(),
                30_000,
                vec![result("body visible", false)],
                Some("Navigation timed out".to_string()),
            );
            let text = render_summary(&[r]);
            assert!(text.contains("error: Navigation timed out"));
        }

        #[test]
        fn test_details_include_observed() {
            let text = render_details(&[report("s", vec![result("count", false)])]);
            assert!(text.contains("FAIL count: nope"));
            assert!(text.contains(r#"observed: {"count":1}"#));
        }

        #[test]
        fn test_details_list_failing_checks() {
            let text = render_details(&[
                report(
                    "home",
                    vec![
                        result("body visible", true),
                        result("hero loaded", false),
                        result("tap target", false),
                    ],
                ),
                report("cart", vec![result("body visible", true)]),
            ]);
            assert!(text.contains("  failing: hero loaded, tap target\n"));
            assert_eq!(text.matches("failing:").count(), 1);
        }
    }

    mod writer_tests {
        use super::*;

        #[tokio::test]
        async fn test_writes_report_and_screenshot() {
            let dir = TempDir::new().unwrap();
            let writer = ReportWriter::new(dir.path().join("out"));

            let png = writer
                .write_screenshot("home-375x667.png", b"\x89PNG")
                .await
                .unwrap();
            assert!(png.ends_with("home-375x667.png"));

            let path = writer
                .write_report(&HarnessReport::new(vec![report("home", vec![])]))
                .await
                .unwrap();
            let loaded = HarnessReport::load(&path).unwrap();
            assert_eq!(loaded.scenarios.len(), 1);
        }

        #[tokio::test]
        async fn test_unwritable_dir_is_report_write_error() {
            let dir = TempDir::new().unwrap();
            let blocker = dir.path().join("file");
            std::fs::write(&blocker, "not a dir").unwrap();
            let writer = ReportWriter::new(blocker.join("out"));

            let err = writer.write_screenshot("x.png", b"").await.unwrap_err();
            assert!(matches!(err, HarnessError::ReportWrite { .. }));
        }
    }
}
