// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Users API Client
//!
//! Client-side core for talking to an OAuth2-protected user-management API.
//!
//! ## Features
//!
//! - **Credential Manager**: client-credentials tokens per scope, cached until
//!   they enter the expiry buffer, with an invalidation state machine for
//!   negative tests
//! - **Scope Policy**: POST/PUT/PATCH/DELETE use the write token, everything
//!   else reads
//! - **Transport Chain**: logging around bounded retry around a plain HTTP
//!   exchange
//! - **Profiles**: YAML configuration per environment with environment
//!   variable overrides
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use users_api_client::{AuthenticatingExecutor, ClientConfig, CredentialManager, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ClientConfig::load_profile("config", None)?;
//!     let credentials = Arc::new(CredentialManager::new(
//!         config.oauth2.clone(),
//!         config.http.timeout(),
//!     )?);
//!     let api = AuthenticatingExecutor::from_config(&config, credentials)?;
//!
//!     let users = api.get("/users").await?;
//!     println!("{} {}", users.status_code, users.body);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  AuthenticatingExecutor                   │
//! │   method → scope → CredentialManager::get_token(scope)    │
//! └─────────────────────────────┬─────────────────────────────┘
//!                               │ Authorization: Bearer …
//! ┌─────────────────────────────┴─────────────────────────────┐
//! │ LoggingTransport → RetryingTransport → HttpTransport      │
//! └───────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the client
pub mod error;

/// Common types and type aliases
pub mod types;

/// Configuration loading and profiles
pub mod config;

/// OAuth2 credential management
pub mod auth;

/// Transport chain and authenticating executor
pub mod http;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use auth::CredentialManager;
pub use config::ClientConfig;
pub use http::{ApiResponse, AuthenticatingExecutor, RequestDescriptor, Transport, TransportChain};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
