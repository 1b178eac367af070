//! Error types for the users API client
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Authentication failures (`Auth`, `Unauthorized`) are kept apart from
//! transport failures (`Http`, `TransportExhausted`): the former mean "fix
//! the credentials", the latter mean "the network misbehaved".

use thiserror::Error;

/// The main error type for the users API client
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Authentication failed: server answered 401: {body}")]
    Unauthorized { body: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed after {attempts} attempts{}", describe_last_status(.last_status))]
    TransportExhausted {
        attempts: u32,
        last_status: Option<u16>,
    },

}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Whether this error means the credentials, not the network, are at fault
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Auth { .. } | Error::Unauthorized { .. })
    }

    /// Whether this error is a transient network condition worth retrying.
    ///
    /// Connection failures, timeouts and interrupted request or body
    /// transfers qualify; builder, redirect and decode errors do not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Http(e) if e.is_connect() || e.is_timeout() || e.is_request() || e.is_body()
        )
    }
}

fn describe_last_status(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" (last status {s})"))
        .unwrap_or_default()
}

/// Result type alias for the users API client
pub type Result<T> = std::result::Result<T, Error>;
