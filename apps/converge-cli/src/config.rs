//! Environment configuration.

use std::time::Duration;

use converge_core::transfer::{DEFAULT_MAX_POLLS, DEFAULT_POLL_INTERVAL};
use converge_core::PollPolicy;
use converge_gsuite::{DEFAULT_DATATRANSFER_URL, DEFAULT_DIRECTORY_URL, DEFAULT_GROUPS_SETTINGS_URL};
use secrecy::SecretString;

/// Runtime configuration for one `converge` invocation.
#[derive(Debug)]
pub struct Config {
    /// OAuth bearer token for the Admin SDK. Only `group` and `user` need it.
    pub gsuite_token: Option<SecretString>,

    pub directory_url: String,
    pub groups_settings_url: String,
    pub datatransfer_url: String,

    /// Per-request HTTP timeout.
    pub http_timeout: Duration,

    pub poll: PollPolicy,

    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// This allows tests to supply variables without mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let gsuite_token = reader("CONVERGE_GSUITE_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(SecretString::from);

        let directory_url =
            reader("CONVERGE_DIRECTORY_URL").unwrap_or_else(|_| DEFAULT_DIRECTORY_URL.to_string());
        let groups_settings_url = reader("CONVERGE_GROUPS_SETTINGS_URL")
            .unwrap_or_else(|_| DEFAULT_GROUPS_SETTINGS_URL.to_string());
        let datatransfer_url = reader("CONVERGE_DATATRANSFER_URL")
            .unwrap_or_else(|_| DEFAULT_DATATRANSFER_URL.to_string());

        let http_timeout_secs = reader("CONVERGE_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidValue("CONVERGE_HTTP_TIMEOUT_SECS".into(), e.to_string())
            })?;

        let poll_secs = match reader("CONVERGE_TRANSFER_POLL_SECS") {
            Ok(value) => value.parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue("CONVERGE_TRANSFER_POLL_SECS".into(), e.to_string())
            })?,
            Err(_) => DEFAULT_POLL_INTERVAL.as_secs(),
        };

        // 0 lifts the bound.
        let max_polls = match reader("CONVERGE_TRANSFER_MAX_POLLS") {
            Ok(value) => value.parse::<u32>().map_err(|e| {
                ConfigError::InvalidValue("CONVERGE_TRANSFER_MAX_POLLS".into(), e.to_string())
            })?,
            Err(_) => DEFAULT_MAX_POLLS,
        };

        let log_filter = reader("CONVERGE_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            gsuite_token,
            directory_url,
            groups_settings_url,
            datatransfer_url,
            http_timeout: Duration::from_secs(http_timeout_secs),
            poll: PollPolicy::new(
                Duration::from_secs(poll_secs),
                (max_polls > 0).then_some(max_polls),
            ),
            log_filter,
        })
    }

    /// The Admin SDK token, or the error naming the variable to set.
    pub fn require_gsuite_token(&self) -> Result<&SecretString, ConfigError> {
        self.gsuite_token
            .as_ref()
            .ok_or_else(|| ConfigError::MissingVar("CONVERGE_GSUITE_TOKEN".into()))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
