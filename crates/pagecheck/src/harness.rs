//! Harness for running scenarios against a shared browser.
//!
//! Scenarios run strictly one after another. Each gets a fresh page context
//! that is closed on every exit path; the browser itself is closed once by
//! [`Harness::close`].

use crate::driver::{BrowserSession, PageDriver};
use crate::environment::EnvironmentConfigurator;
use crate::evaluator::{failed_for_scenario, AssertionEvaluator, AssertionResult};
use crate::navigator::Navigator;
use crate::report::{HarnessReport, PageTimings, ReportWriter, RunReport};
use crate::result::{HarnessError, HarnessResult};
use crate::scenario::{Scenario, ScenarioStage};
use crate::suites::CheckSuite;
use crate::target::resolve_target;
use chrono::Utc;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Tracks one scenario through its stages
#[derive(Debug, Clone)]
struct StageTracker {
    scenario: String,
    stage: ScenarioStage,
    history: Vec<ScenarioStage>,
}

impl StageTracker {
    fn new(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            stage: ScenarioStage::Idle,
            history: vec![ScenarioStage::Idle],
        }
    }

    fn advance(&mut self, next: ScenarioStage) {
        if !self.stage.can_transition_to(next) {
            warn!(scenario = %self.scenario, from = %self.stage, to = %next, "ignoring invalid stage transition");
            return;
        }
        debug!(scenario = %self.scenario, stage = %next, "stage");
        self.stage = next;
        self.history.push(next);
    }
}

struct ScenarioOutput {
    results: Vec<AssertionResult>,
    timings: Option<PageTimings>,
    screenshots: Vec<PathBuf>,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Runs scenarios through resolve, configure, navigate, evaluate and report
#[derive(Debug)]
pub struct Harness<B: BrowserSession> {
    browser: B,
    navigator: Navigator,
    writer: Option<ReportWriter>,
    screenshots: bool,
    stage_log: Vec<(String, Vec<ScenarioStage>)>,
}

impl<B: BrowserSession> Harness<B> {
    /// Harness over an already launched browser
    #[must_use]
    pub fn new(browser: B) -> Self {
        Self {
            browser,
            navigator: Navigator::new(),
            writer: None,
            screenshots: true,
            stage_log: Vec::new(),
        }
    }

    /// Write screenshots through `writer`
    #[must_use]
    pub fn with_writer(mut self, writer: ReportWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Enable or disable screenshots
    #[must_use]
    pub const fn with_screenshots(mut self, enabled: bool) -> Self {
        self.screenshots = enabled;
        self
    }

    /// Replace the navigator (polling interval)
    #[must_use]
    pub const fn with_navigator(mut self, navigator: Navigator) -> Self {
        self.navigator = navigator;
        self
    }

    /// Stages each scenario passed through, in run order
    #[must_use]
    pub fn stage_history(&self) -> &[(String, Vec<ScenarioStage>)] {
        &self.stage_log
    }

    /// Run every scenario against `suite`, in order
    pub async fn run(&mut self, scenarios: &[Scenario], suite: &CheckSuite) -> HarnessReport {
        info!(
            scenarios = scenarios.len(),
            suite = %suite.name,
            checks = suite.checks.len(),
            "starting run"
        );
        let mut reports = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            reports.push(self.run_scenario(scenario, suite).await);
        }
        let report = HarnessReport::new(reports);
        info!(passed = report.passed(), "run finished");
        report
    }

    /// Run one scenario; never fails, problems end up in the report
    pub async fn run_scenario(&mut self, scenario: &Scenario, suite: &CheckSuite) -> RunReport {
        let started = Utc::now();
        let clock = Instant::now();
        let mut stages = StageTracker::new(&scenario.name);
        info!(scenario = %scenario.name, target = %scenario.target, "scenario started");

        let outcome = self.execute(scenario, suite, &mut stages).await;
        let duration_ms = millis(clock.elapsed());

        let report = match outcome {
            Ok(output) => {
                stages.advance(ScenarioStage::Done);
                RunReport::new(&scenario.name, started, duration_ms, output.results, None)
                    .with_viewport(scenario.effective_viewport())
                    .with_timings(output.timings)
                    .with_screenshots(output.screenshots)
            }
            Err(e) => {
                stages.advance(ScenarioStage::Failed);
                if e.is_scenario_local() {
                    warn!(scenario = %scenario.name, kind = e.kind(), error = %e, "scenario failed");
                } else {
                    error!(scenario = %scenario.name, kind = e.kind(), error = %e, "scenario failed");
                }
                let message = e.to_string();
                RunReport::new(
                    &scenario.name,
                    started,
                    duration_ms,
                    failed_for_scenario(&suite.checks, &message),
                    Some(message),
                )
                .with_viewport(scenario.effective_viewport())
            }
        };

        info!(
            scenario = %scenario.name,
            verdict = report.verdict(),
            elapsed_ms = duration_ms,
            "scenario finished"
        );
        self.stage_log.push((scenario.name.clone(), stages.history));
        report
    }

    async fn execute(
        &mut self,
        scenario: &Scenario,
        suite: &CheckSuite,
        stages: &mut StageTracker,
    ) -> HarnessResult<ScenarioOutput> {
        stages.advance(ScenarioStage::Resolving);
        let url = resolve_target(&scenario.target)?;

        stages.advance(ScenarioStage::Configuring);
        let mut page = self.browser.new_page().await?;
        let output = self.drive(&mut page, &url, scenario, suite, stages).await;
        if let Err(e) = page.close().await {
            warn!(scenario = %scenario.name, error = %e, "failed to close page context");
        }
        output
    }

    async fn drive(
        &self,
        page: &mut B::Page,
        url: &str,
        scenario: &Scenario,
        suite: &CheckSuite,
        stages: &mut StageTracker,
    ) -> HarnessResult<ScenarioOutput> {
        EnvironmentConfigurator::apply(page, scenario).await?;

        stages.advance(ScenarioStage::Navigating);
        let timeout = Duration::from_millis(scenario.navigation_timeout_ms);
        let navigation = self
            .navigator
            .navigate(page, url, scenario.readiness, timeout)
            .await?;
        info!(
            scenario = %scenario.name,
            elapsed_ms = navigation.elapsed_ms,
            readiness_reached = navigation.readiness_reached,
            "navigation complete"
        );
        if scenario.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(scenario.settle_ms)).await;
        }

        stages.advance(ScenarioStage::Evaluating);
        let results = AssertionEvaluator::evaluate(&*page, &suite.checks).await;
        let timings = match AssertionEvaluator::collect_timings(&*page).await {
            Ok(timings) => Some(timings),
            Err(e) => {
                debug!(scenario = %scenario.name, error = %e, "timings unavailable");
                None
            }
        };

        stages.advance(ScenarioStage::Reporting);
        let screenshots = self.capture(&*page, scenario).await;

        Ok(ScenarioOutput {
            results,
            timings,
            screenshots,
        })
    }

    async fn capture(&self, page: &B::Page, scenario: &Scenario) -> Vec<PathBuf> {
        let Some(ref writer) = self.writer else {
            return Vec::new();
        };
        if !self.screenshots {
            return Vec::new();
        }
        let png = match page.screenshot().await {
            Ok(png) => png,
            Err(e) => {
                let err = HarnessError::ReportWrite {
                    path: writer.out_dir().join(scenario.screenshot_name()).display().to_string(),
                    message: e.to_string(),
                };
                error!(scenario = %scenario.name, error = %err, "screenshot failed");
                return Vec::new();
            }
        };
        // write errors are logged by the writer and never affect the verdict
        writer
            .write_screenshot(&scenario.screenshot_name(), &png)
            .await
            .map(|path| vec![path])
            .unwrap_or_default()
    }

    /// Close the browser
    ///
    /// # Errors
    ///
    /// Returns the driver error if the browser does not shut down cleanly.
    pub async fn close(mut self) -> HarnessResult<()> {
        self.browser.close().await
    }
}

#[cfg(feature = "browser")]
impl Harness<crate::browser::ChromiumBrowser> {
    /// Launch Chromium and wrap it in a harness
    ///
    /// # Errors
    ///
    /// `BrowserLaunch` if the browser cannot be started; nothing is run.
    pub async fn launch(config: crate::browser::BrowserConfig) -> HarnessResult<Self> {
        let browser = crate::browser::ChromiumBrowser::launch(config).await?;
        Ok(Self::new(browser))
    }
}
