//! Result and error types for pagecheck.

use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Errors that can occur while verifying a page
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Target could not be turned into a navigable URI
    #[error("Invalid target '{target}': {message}")]
    InvalidTarget {
        /// Target as given by the caller
        target: String,
        /// Error message
        message: String,
    },

    /// Requested emulation is not available in the browser engine
    #[error("Unsupported feature '{feature}': {message}")]
    UnsupportedFeature {
        /// Feature name (e.g. "network throttling")
        feature: String,
        /// Error message
        message: String,
    },

    /// Page did not reach readiness before the hard timeout
    #[error("Navigation to {url} timed out after {elapsed_ms}ms (waiting for {waiting_for})")]
    NavigationTimeout {
        /// URL being loaded
        url: String,
        /// Time spent before giving up
        elapsed_ms: u64,
        /// Readiness criterion that was not met
        waiting_for: String,
    },

    /// A single check threw while being evaluated
    #[error("Check '{check}' failed to execute: {message}")]
    AssertionExecution {
        /// Check name
        check: String,
        /// Error message
        message: String,
    },

    /// Screenshot or report persistence failed
    #[error("Failed to write {path}: {message}")]
    ReportWrite {
        /// Destination path
        path: String,
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page or context error reported by the driver
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Configuration error (suite files, presets)
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HarnessError {
    /// Create an invalid target error
    #[must_use]
    pub fn invalid_target(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported feature error
    #[must_use]
    pub fn unsupported(feature: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedFeature {
            feature: feature.into(),
            message: message.into(),
        }
    }

    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Errors that end a single scenario but let the harness continue
    #[must_use]
    pub const fn is_scenario_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidTarget { .. }
                | Self::UnsupportedFeature { .. }
                | Self::NavigationTimeout { .. }
                | Self::Page { .. }
        )
    }

    /// Short kind label used in reports and logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTarget { .. } => "InvalidTargetError",
            Self::UnsupportedFeature { .. } => "UnsupportedFeatureError",
            Self::NavigationTimeout { .. } => "NavigationTimeoutError",
            Self::AssertionExecution { .. } => "AssertionExecutionError",
            Self::ReportWrite { .. } => "ReportWriteError",
            Self::BrowserLaunch { .. } => "BrowserLaunchError",
            Self::Page { .. } => "PageError",
            Self::Config { .. } => "ConfigError",
            Self::Io(_) => "IoError",
            Self::Json(_) => "JsonError",
            Self::Yaml(_) => "YamlError",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_timeout_message_names_elapsed_time() {
        let err = HarnessError::NavigationTimeout {
            url: "file:///tmp/index.html".to_string(),
            elapsed_ms: 30_000,
            waiting_for: "networkidle".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("30000ms"));
        assert!(msg.contains("networkidle"));
    }

    #[test]
    fn test_scenario_local_errors() {
        assert!(HarnessError::invalid_target("x", "missing").is_scenario_local());
        assert!(HarnessError::unsupported("network throttling", "no").is_scenario_local());
        assert!(!HarnessError::BrowserLaunch {
            message: "no chromium".to_string()
        }
        .is_scenario_local());
        assert!(!HarnessError::config("bad suite").is_scenario_local());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(
            HarnessError::invalid_target("x", "y").kind(),
            "InvalidTargetError"
        );
        assert_eq!(
            HarnessError::unsupported("x", "y").kind(),
            "UnsupportedFeatureError"
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(HarnessError::from(io).kind(), "IoError");
    }
}
