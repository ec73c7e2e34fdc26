//! CLI error types with miette diagnostics.
//!
//! Maps `voyager_api::Error` and `ConfigError` into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use voyager_api::{Error as ApiError, NetworkKind};
use voyager_config::ConfigError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach {operation}: {message}")]
    #[diagnostic(
        code(voyager::connection_failed),
        help(
            "Check that the backend is running and the base_url in your config is correct.\n\
             Try: voyager health"
        )
    )]
    ConnectionFailed { operation: String, message: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(voyager::timeout),
        help("Increase timeout_secs for this backend in the config file.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(voyager::auth_failed), help("Run: voyager login"))]
    AuthFailed { message: String },

    #[error("No {what} configured")]
    #[diagnostic(code(voyager::no_credentials), help("{hint}"))]
    NoCredentials { what: String, hint: String },

    #[error("Permission denied: {message}")]
    #[diagnostic(code(voyager::permission))]
    Permission { message: String },

    // ── Backend ──────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(voyager::not_found))]
    NotFound { message: String },

    #[error("{friendly} ({detail})")]
    #[diagnostic(code(voyager::api_error))]
    Api { friendly: String, detail: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(voyager::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(code(voyager::config_exists), help("Pass --force to overwrite it."))]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(voyager::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(voyager::json))]
    Json(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { what, hint } => Self::NoCredentials { what, hint },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network {
                kind: NetworkKind::Timeout,
                ..
            } => Self::Timeout,
            ApiError::Network {
                kind: NetworkKind::ConnectionRefused | NetworkKind::HostUnresolved,
                ref message,
                ..
            } => Self::ConnectionFailed {
                operation: "backend".into(),
                message: message.clone(),
            },
            ApiError::Authentication { .. } => Self::AuthFailed {
                message: err.user_friendly_message(),
            },
            ApiError::Permission { ref message, .. } => Self::Permission {
                message: message.clone(),
            },
            ApiError::NotFound { ref message } => Self::NotFound {
                message: message.clone(),
            },
            ApiError::Validation { ref field, ref message } => Self::Validation {
                field: field.clone(),
                reason: message.clone(),
            },
            other => Self::Api {
                friendly: other.user_friendly_message(),
                detail: other.to_string(),
            },
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Permission { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::ConfigExists { .. } => exit_code::USAGE,
            Self::Api { .. } | Self::Config(_) | Self::Io(_) | Self::Json(_) => exit_code::GENERAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_exit_with_auth_code() {
        let err = CliError::from(ApiError::Authentication {
            message: "token expired".into(),
            expired: true,
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
        assert_eq!(err.to_string(), "Session expired, please log in again");
    }

    #[test]
    fn business_errors_keep_backend_detail() {
        let err = CliError::from(ApiError::Business {
            code: "1".into(),
            message: "register failed: account already exists".into(),
        });
        assert_eq!(err.exit_code(), exit_code::GENERAL);
        assert!(err.to_string().contains("account already exists"));
    }

    #[test]
    fn timeout_maps_to_timeout_code() {
        let err = CliError::from(ApiError::timeout("login"));
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);
    }
}
