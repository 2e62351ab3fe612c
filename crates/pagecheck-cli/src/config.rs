//! CLI configuration

use crate::error::{CliError, CliResult};
use pagecheck::CheckSuite;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
    /// Trace - driver level detail
    Trace,
}

impl Verbosity {
    /// From the `-v` count and `-q` flag
    #[must_use]
    pub const fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug | Self::Trace)
    }

    /// Default `tracing` filter directive for this level
    #[must_use]
    pub const fn log_level(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// Console settings shared by every part of the CLI
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }
}

// =============================================================================
// HARNESS CONFIG FILE
// =============================================================================

/// `checks:` in a config file: a suite name/path or an inline suite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChecksRef {
    /// Built-in suite name or suite file path
    Named(String),
    /// Suite declared in place
    Inline(CheckSuite),
}

impl ChecksRef {
    /// Resolve to a concrete suite
    pub fn resolve(&self) -> CliResult<CheckSuite> {
        match self {
            Self::Named(value) => Ok(CheckSuite::resolve(value)?),
            Self::Inline(suite) if suite.checks.is_empty() => Err(CliError::config(format!(
                "inline suite '{}' has no checks",
                suite.name
            ))),
            Self::Inline(suite) => Ok(suite.clone()),
        }
    }
}

/// Run settings loaded from `--config`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Path, `host:port[/path]` or URL
    pub target: Option<String>,
    /// Viewport labels (`375x667`) or `all`
    pub viewports: Vec<String>,
    /// Device preset name
    pub device: Option<String>,
    /// Network profile name or `none`
    pub network: Option<String>,
    /// Check suite
    pub checks: Option<ChecksRef>,
    /// Report directory
    pub out: Option<PathBuf>,
    /// `dom`, `load`, `idle` or `timeout`
    pub wait_until: Option<String>,
    /// Navigation timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Pause between readiness and evaluation
    pub settle_ms: Option<u64>,
    /// Capture screenshots
    pub screenshots: Option<bool>,
}

impl HarnessConfig {
    /// Load from a YAML (`.yaml`/`.yml`) or JSON (`.json`) file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => serde_yaml_ng::from_str(&content)
                .map_err(|e| CliError::config(format!("{}: {e}", path.display()))),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| CliError::config(format!("{}: {e}", path.display()))),
            _ => Err(CliError::config(format!(
                "config file {} must end in .yaml, .yml or .json",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_default_verbosity() {
            assert_eq!(Verbosity::default(), Verbosity::Normal);
        }

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(0, false), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(1, false), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(2, false), Verbosity::Debug);
            assert_eq!(Verbosity::from_flags(7, false), Verbosity::Trace);
            assert_eq!(Verbosity::from_flags(3, true), Verbosity::Quiet);
        }

        #[test]
        fn test_log_levels() {
            assert_eq!(Verbosity::Normal.log_level(), "warn");
            assert_eq!(Verbosity::Verbose.log_level(), "info");
            assert_eq!(Verbosity::Debug.log_level(), "debug");
            assert_eq!(Verbosity::Trace.log_level(), "trace");
        }

        #[test]
        fn test_is_verbose() {
            assert!(!Verbosity::Quiet.is_verbose());
            assert!(!Verbosity::Normal.is_verbose());
            assert!(Verbosity::Verbose.is_verbose());
            assert!(Verbosity::Trace.is_verbose());
            assert!(Verbosity::Quiet.is_quiet());
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_fixed_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }
    }

    mod harness_config_tests {
        use super::*;

        #[test]
        fn test_yaml_config() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("pagecheck.yaml");
            std::fs::write(
                &path,
                r"
target: site/index.html
viewports: [375x667, 1024x768]
network: 3g
checks: landing
wait_until: load
timeout_ms: 15000
screenshots: false
",
            )
            .unwrap();

            let config = HarnessConfig::load(&path).unwrap();
            assert_eq!(config.target.as_deref(), Some("site/index.html"));
            assert_eq!(config.viewports, vec!["375x667", "1024x768"]);
            assert_eq!(config.checks, Some(ChecksRef::Named("landing".into())));
            assert_eq!(config.timeout_ms, Some(15_000));
            assert_eq!(config.screenshots, Some(false));
            assert!(config.device.is_none());
        }

        #[test]
        fn test_inline_suite() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("run.yml");
            std::fs::write(
                &path,
                r"
checks:
  name: header
  checks:
    - name: header visible
      selector: header
      predicate:
        kind: visible
",
            )
            .unwrap();

            let config = HarnessConfig::load(&path).unwrap();
            let suite = config.checks.unwrap().resolve().unwrap();
            assert_eq!(suite.name, "header");
            assert_eq!(suite.checks.len(), 1);
        }

        #[test]
        fn test_json_config() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("run.json");
            std::fs::write(&path, r#"{"target": "https://example.com", "device": "pixel 7"}"#)
                .unwrap();
            let config = HarnessConfig::load(&path).unwrap();
            assert_eq!(config.device.as_deref(), Some("pixel 7"));
        }

        #[test]
        fn test_unknown_field_rejected() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("run.yaml");
            std::fs::write(&path, "targt: typo.html\n").unwrap();
            assert!(matches!(
                HarnessConfig::load(&path).unwrap_err(),
                CliError::Config { .. }
            ));
        }

        #[test]
        fn test_bad_extension() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("run.toml");
            std::fs::write(&path, "target = 'x'").unwrap();
            assert!(HarnessConfig::load(&path).is_err());
        }

        #[test]
        fn test_unknown_named_suite() {
            let checks = ChecksRef::Named("nightly".into());
            assert!(matches!(
                checks.resolve().unwrap_err(),
                CliError::Harness(pagecheck::HarnessError::Config { .. })
            ));
        }
    }
}
