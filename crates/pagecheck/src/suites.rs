//! Check suites: built-in sets and suite files.

use crate::evaluator::{AssertionSpec, Predicate, TimingMetric};
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named, reusable list of checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSuite {
    /// Suite name
    pub name: String,
    /// Checks in evaluation order
    pub checks: Vec<AssertionSpec>,
}

/// Names accepted by [`CheckSuite::builtin`]
pub const BUILTIN_SUITES: [&str; 3] = ["smoke", "landing", "performance"];

impl CheckSuite {
    /// Create a suite
    #[must_use]
    pub fn new(name: impl Into<String>, checks: Vec<AssertionSpec>) -> Self {
        Self {
            name: name.into(),
            checks,
        }
    }

    /// Body visible, no horizontal scroll, all images loaded
    #[must_use]
    pub fn smoke() -> Self {
        Self::new(
            "smoke",
            vec![
                AssertionSpec::element("body visible", "body", Predicate::Visible),
                AssertionSpec::page("no horizontal scroll", Predicate::NoHorizontalScroll),
                AssertionSpec::element("all images loaded", "img", Predicate::AllImagesLoaded),
            ],
        )
    }

    /// Smoke checks plus storefront essentials
    #[must_use]
    pub fn landing() -> Self {
        let mut checks = Self::smoke().checks;
        checks.extend([
            AssertionSpec::element("add to cart visible", ".add-to-cart", Predicate::Visible),
            AssertionSpec::element(
                "add to cart tap target",
                ".add-to-cart",
                Predicate::MinSize {
                    width: 44.0,
                    height: 44.0,
                },
            ),
            AssertionSpec::element("hero image loaded", ".hero img", Predicate::Loaded),
            AssertionSpec::page(
                "DOMContentLoaded under 1s",
                Predicate::TimingBelow {
                    metric: TimingMetric::DomContentLoaded,
                    max_ms: 1000.0,
                },
            ),
        ]);
        Self::new("landing", checks)
    }

    /// Load timing ceilings and a page weight budget
    #[must_use]
    pub fn performance() -> Self {
        let timing = |name: &str, metric, max_ms| {
            AssertionSpec::page(name, Predicate::TimingBelow { metric, max_ms })
        };
        Self::new(
            "performance",
            vec![
                timing(
                    "DOMContentLoaded under 1s",
                    TimingMetric::DomContentLoaded,
                    1000.0,
                ),
                timing("load under 2s", TimingMetric::Load, 2000.0),
                timing(
                    "first contentful paint under 1s",
                    TimingMetric::FirstContentfulPaint,
                    1000.0,
                ),
                AssertionSpec::page(
                    "page weight under 1.5MB",
                    Predicate::TransferBelow {
                        max_bytes: 1_500_000,
                    },
                ),
            ],
        )
    }

    /// Look up a built-in suite
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "smoke" => Some(Self::smoke()),
            "landing" => Some(Self::landing()),
            "performance" | "perf" => Some(Self::performance()),
            _ => None,
        }
    }

    /// Load a suite from a YAML (`.yaml`/`.yml`) or JSON (`.json`) file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, has an unknown
    /// extension or does not parse.
    pub fn from_file(path: &Path) -> HarnessResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let suite: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => serde_yaml_ng::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(HarnessError::config(format!(
                    "suite file {} must end in .yaml, .yml or .json",
                    path.display()
                )))
            }
        };
        if suite.checks.is_empty() {
            return Err(HarnessError::config(format!(
                "suite '{}' has no checks",
                suite.name
            )));
        }
        Ok(suite)
    }

    /// Resolve a `--checks` value: an existing suite file, else a built-in name
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown names.
    pub fn resolve(value: &str) -> HarnessResult<Self> {
        let path = Path::new(value);
        let is_suite_file = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml" | "json")
        );
        if is_suite_file && path.is_file() {
            return Self::from_file(path);
        }
        Self::builtin(value).ok_or_else(|| {
            HarnessError::config(format!(
                "unknown check suite '{value}' (built-in: {})",
                BUILTIN_SUITES.join(", ")
            ))
        })
    }
}
