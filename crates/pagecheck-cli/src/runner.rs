//! Turns arguments into scenarios and runs them

use crate::commands::Cli;
use crate::config::{ChecksRef, HarnessConfig};
use crate::error::{CliError, CliResult, EXIT_FAIL, EXIT_PASS};
use crate::output::ProgressReporter;
use pagecheck::wait::DEFAULT_NAVIGATION_TIMEOUT_MS;
use pagecheck::{
    render_details, render_summary, BrowserConfig, BrowserSession, CheckSuite, DeviceEmulator,
    Harness, HarnessReport, NetworkProfile, Readiness, ReportWriter, Scenario, Target, Viewport,
};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::warn;

/// Report directory when neither `--out` nor the config file names one
pub const DEFAULT_OUT_DIR: &str = "pagecheck-report";

/// Everything needed to run, resolved from flags and the config file
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Scenarios in run order
    pub scenarios: Vec<Scenario>,
    /// Checks applied to every scenario
    pub suite: CheckSuite,
    /// Report directory
    pub out_dir: PathBuf,
    /// Capture screenshots
    pub screenshots: bool,
    /// Directory and port for the static server
    pub serve: Option<(PathBuf, u16)>,
    /// Scenarios point at the static server rather than a given target
    pub target_from_server: bool,
    /// Chromium launch settings
    pub browser: BrowserConfig,
}

impl RunPlan {
    /// Merge flags over `file`; flags win
    pub fn build(cli: &Cli, file: HarnessConfig) -> CliResult<Self> {
        let given = cli.target.clone().or(file.target);
        let target_from_server = given.is_none() && cli.serve.is_some();
        let target = given
            .or_else(|| cli.serve.as_ref().map(|_| format!("localhost:{}", cli.port)))
            .ok_or_else(|| {
                CliError::invalid_argument("no target: pass --target, --serve or a config file")
            })?;
        if cli.serve.is_some()
            && !target_from_server
            && !Target::parse(&target).is_ok_and(|t| t.is_local_server())
        {
            warn!(%target, "--serve is running but the target is not a local server");
        }

        let device_name = cli.device.clone().or(file.device);
        let viewport_args = if cli.viewports.is_empty() {
            file.viewports
        } else {
            cli.viewports.clone()
        };
        if device_name.is_some() && !viewport_args.is_empty() {
            return Err(CliError::invalid_argument(
                "--device sets its own viewport; drop --viewport",
            ));
        }
        let device = device_name
            .as_deref()
            .map(DeviceEmulator::require)
            .transpose()?;
        let viewports = parse_viewports(&viewport_args)?;

        let network = match cli.network.as_deref().or(file.network.as_deref()) {
            Some(name) => NetworkProfile::from_name(name)?,
            None => None,
        };

        let timeout_ms = cli
            .timeout
            .or(file.timeout_ms)
            .unwrap_or(DEFAULT_NAVIGATION_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(CliError::invalid_argument("--timeout must be positive"));
        }
        let wait = cli
            .wait_until
            .map(|w| w.as_str().to_string())
            .or(file.wait_until)
            .unwrap_or_else(|| "idle".to_string());
        let readiness = Readiness::from_cli(&wait, timeout_ms).ok_or_else(|| {
            CliError::invalid_argument(format!(
                "unknown wait condition '{wait}' (dom, load, idle, timeout)"
            ))
        })?;
        let settle_ms = cli.settle.or(file.settle_ms).unwrap_or(0);

        let suite = match (cli.checks.as_deref(), file.checks) {
            (Some(value), _) => CheckSuite::resolve(value)?,
            (None, Some(checks)) => checks.resolve()?,
            (None, None) => ChecksRef::Named("smoke".into()).resolve()?,
        };

        let name = scenario_name(&target);
        let scenarios: Vec<Scenario> = viewports
            .into_iter()
            .map(|viewport| {
                Scenario::new(name.clone(), target.clone())
                    .with_viewport(viewport)
                    .with_device(device.clone())
                    .with_network(network.clone())
                    .with_readiness(readiness)
                    .with_timeout_ms(timeout_ms)
                    .with_settle_ms(settle_ms)
            })
            .collect();

        let mut browser = BrowserConfig::default().with_headless(!cli.headed);
        if let Some(largest) = scenarios
            .iter()
            .map(|s| s.viewport)
            .max_by_key(|v| u64::from(v.width) * u64::from(v.height))
        {
            browser = browser.with_window(largest);
        }
        if let Some(path) = &cli.chromium {
            browser = browser.with_chromium_path(path.clone());
        }
        if cli.no_sandbox {
            browser = browser.with_no_sandbox();
        }

        Ok(Self {
            scenarios,
            suite,
            out_dir: cli
                .out
                .clone()
                .or(file.out)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR)),
            screenshots: !cli.no_screenshots && file.screenshots.unwrap_or(true),
            serve: cli.serve.clone().map(|dir| (dir, cli.port)),
            target_from_server,
            browser,
        })
    }

    /// Point every scenario at `target`, renaming them to match
    pub fn retarget(&mut self, target: &str) {
        let name = scenario_name(target);
        for scenario in &mut self.scenarios {
            scenario.target = target.to_string();
            scenario.name.clone_from(&name);
        }
    }
}

/// `all` expands to the audit set; nothing given means the default viewport
fn parse_viewports(values: &[String]) -> CliResult<Vec<Viewport>> {
    if values.is_empty() {
        return Ok(vec![Viewport::default()]);
    }
    let mut viewports = Vec::new();
    for value in values {
        if value.trim().eq_ignore_ascii_case("all") {
            viewports.extend(Viewport::audit_set());
        } else {
            viewports.push(value.parse::<Viewport>()?);
        }
    }
    viewports.dedup();
    Ok(viewports)
}

/// Human-readable scenario name for a target
fn scenario_name(target: &str) -> String {
    let trimmed = target.trim();
    let bare = ["https://", "http://", "file://"]
        .iter()
        .find_map(|scheme| trimmed.strip_prefix(scheme))
        .unwrap_or(trimmed);
    let bare = bare.trim_end_matches('/');
    if bare.is_empty() {
        "page".to_string()
    } else {
        bare.to_string()
    }
}

/// Device and network presets, one per line
#[must_use]
pub fn render_presets() -> String {
    let mut out = String::from("Devices:\n");
    for device in DeviceEmulator::presets() {
        let _ = writeln!(
            out,
            "  {:<20} {:<10} dpr {:.1}{}",
            device.name,
            device.viewport.label(),
            device.device_scale_factor,
            if device.is_mobile { "  mobile" } else { "" }
        );
    }
    out.push_str("\nNetwork profiles:\n");
    for profile in NetworkProfile::presets() {
        let _ = writeln!(out, "  {profile}");
    }
    out.push_str("  none\n\nViewports (--viewport all):\n");
    for viewport in Viewport::audit_set() {
        let orientation = if viewport.is_landscape() {
            "landscape"
        } else if viewport.is_portrait() {
            "portrait"
        } else {
            "square"
        };
        let _ = writeln!(out, "  {:<10} {orientation}", viewport.label());
    }
    out
}

/// Run every scenario in order, reporting progress as each finishes
pub async fn run_scenarios<B: BrowserSession>(
    harness: &mut Harness<B>,
    plan: &RunPlan,
    progress: &mut ProgressReporter,
) -> HarnessReport {
    progress.start_progress(plan.scenarios.len() as u64, &plan.suite.name);
    let mut reports = Vec::with_capacity(plan.scenarios.len());
    for scenario in &plan.scenarios {
        progress.set_message(&scenario.name);
        let report = harness.run_scenario(scenario, &plan.suite).await;
        progress.scenario_done(&report);
        reports.push(report);
    }
    progress.finish();
    HarnessReport::new(reports)
}

/// Print the summary and write `report.json`; returns the exit code
///
/// A failed write is reported but the exit code follows the verdict.
pub async fn finish_run(
    report: &HarnessReport,
    writer: &ReportWriter,
    verbose: bool,
    progress: &ProgressReporter,
) -> u8 {
    print!("{}", render_summary(&report.scenarios));
    if verbose {
        print!("{}", render_details(&report.scenarios));
    }
    match writer.write_report(report).await {
        Ok(path) => progress.info(&format!("report written to {}", path.display())),
        Err(e) => {
            warn!(error = %e, "report.json not written");
            progress.warning(&format!("report not saved: {e}"));
        }
    }
    if report.passed() {
        EXIT_PASS
    } else {
        EXIT_FAIL
    }
}

/// Launch the browser, run the plan and shut everything down
#[cfg(feature = "browser")]
pub async fn execute(mut plan: RunPlan, verbose: bool, mut progress: ProgressReporter) -> CliResult<u8> {
    let server = match plan.serve.clone() {
        Some((dir, port)) => {
            let server = crate::serve::StaticServer::start(&dir, port).await?;
            progress.info(&format!(
                "serving {} on http://{}",
                server.root().display(),
                server.addr()
            ));
            if plan.target_from_server {
                plan.retarget(&server.target());
            }
            Some(server)
        }
        None => None,
    };

    let outcome = drive(&plan, verbose, &mut progress).await;

    if let Some(server) = server {
        server.shutdown().await;
    }
    outcome
}

#[cfg(feature = "browser")]
async fn drive(plan: &RunPlan, verbose: bool, progress: &mut ProgressReporter) -> CliResult<u8> {
    let writer = ReportWriter::new(&plan.out_dir);
    let mut harness = Harness::launch(plan.browser.clone())
        .await?
        .with_writer(writer.clone())
        .with_screenshots(plan.screenshots);
    tracing::info!(
        scenarios = plan.scenarios.len(),
        suite = %plan.suite.name,
        out = %plan.out_dir.display(),
        "running"
    );

    let report = run_scenarios(&mut harness, plan, progress).await;
    if let Err(e) = harness.close().await {
        warn!(error = %e, "browser did not shut down cleanly");
    }
    Ok(finish_run(&report, &writer, verbose, progress).await)
}

/// Without Chromium support nothing can be navigated
#[cfg(not(feature = "browser"))]
pub async fn execute(plan: RunPlan, _verbose: bool, _progress: ProgressReporter) -> CliResult<u8> {
    warn!(
        scenarios = plan.scenarios.len(),
        "rebuild with the `browser` feature to run scenarios"
    );
    Err(CliError::invalid_argument(
        "pagecheck was built without browser support",
    ))
}
