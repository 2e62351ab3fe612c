//! pagecheck: page verification from the command line
//!
//! ## Usage
//!
//! ```bash
//! pagecheck --target site/index.html                  # smoke checks at 1280x800
//! pagecheck --target localhost:8080 --viewport all    # four audit viewports
//! pagecheck --serve dist --checks landing --network 3g
//! pagecheck --target https://shop.example --device "iPhone 13" --checks suite.yaml
//! ```

use clap::Parser;
use pagecheck_cli::{
    execute, logging, render_presets, Cli, CliConfig, CliResult, HarnessConfig, ProgressReporter,
    RunPlan, Verbosity, EXIT_PASS,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(cli.color.clone().into());
    logging::init(config.verbosity, config.color.should_color());

    match run(&cli, config) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            ProgressReporter::new(config.color.should_color(), false).error(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: &Cli, config: CliConfig) -> CliResult<u8> {
    if cli.list_presets {
        print!("{}", render_presets());
        return Ok(EXIT_PASS);
    }

    let file = match &cli.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    let plan = RunPlan::build(cli, file)?;
    let progress = ProgressReporter::new(
        config.color.should_color(),
        config.verbosity.is_quiet(),
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(execute(plan, config.verbosity.is_verbose(), progress))
}
