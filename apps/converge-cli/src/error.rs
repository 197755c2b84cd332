//! CLI error types and exit codes

use thiserror::Error;

use crate::config::ConfigError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General or configuration error
/// - 3: Network error
/// - 4: Validation error (unreadable or invalid document)
/// - 5: Convergence failed (the printed report carries `msg`)
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Convergence failed: {0}")]
    ConvergenceFailed(String),
}

impl CliError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Io(_) => 1,
            CliError::Network(_) => 3,
            CliError::Validation(_) => 4,
            CliError::ConvergenceFailed(_) => 5,
        }
    }

    /// Print the error to stderr.
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Config(format!("JSON error: {e}"))
    }
}

impl From<converge_gsuite::GsuiteError> for CliError {
    fn from(e: converge_gsuite::GsuiteError) -> Self {
        match e {
            converge_gsuite::GsuiteError::InvalidConfig(message) => CliError::Config(message),
            other => CliError::Network(other.to_string()),
        }
    }
}

impl From<converge_scim::ScimClientError> for CliError {
    fn from(e: converge_scim::ScimClientError) -> Self {
        match e {
            converge_scim::ScimClientError::InvalidConfig(message) => CliError::Validation(message),
            other => CliError::Network(other.to_string()),
        }
    }
}

impl From<converge_core::ConvergeError> for CliError {
    fn from(e: converge_core::ConvergeError) -> Self {
        match e {
            converge_core::ConvergeError::InvalidDesiredState(message) => {
                CliError::Validation(message)
            }
            other => CliError::ConvergenceFailed(other.to_string()),
        }
    }
}
