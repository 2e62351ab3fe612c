//! Error types for the CLI

use thiserror::Error;

/// Every check in every scenario passed
pub const EXIT_PASS: u8 = 0;
/// At least one check failed
pub const EXIT_FAIL: u8 = 1;
/// The run could not be carried out
pub const EXIT_FATAL: u8 = 2;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Static server could not start
    #[error("Static server failed: {message}")]
    Serve {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Harness library error
    #[error(transparent)]
    Harness(#[from] pagecheck::HarnessError),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a static server error
    #[must_use]
    pub fn serve(message: impl Into<String>) -> Self {
        Self::Serve {
            message: message.into(),
        }
    }

    /// Process exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Harness(err) if err.is_scenario_local() => EXIT_FAIL,
            _ => EXIT_FATAL,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pagecheck::HarnessError;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("bad arg");
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_harness_error_is_transparent() {
        let err: CliError = HarnessError::BrowserLaunch {
            message: "no chromium".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            HarnessError::BrowserLaunch {
                message: "no chromium".into()
            }
            .to_string()
        );
    }

    #[test]
    fn test_fatal_exit_code() {
        assert_eq!(CliError::serve("port taken").exit_code(), EXIT_FATAL);
        assert_eq!(CliError::config("x").exit_code(), EXIT_FATAL);
    }

    #[test]
    fn test_scenario_local_exit_code() {
        let err: CliError = HarnessError::invalid_target("nowhere.html", "file not found").into();
        assert_eq!(err.exit_code(), EXIT_FAIL);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CliError = io.into();
        assert!(err.to_string().contains("I/O error"));
    }
}
