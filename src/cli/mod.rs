//! CLI module
//!
//! Command-line interface for exercising the API client.
//!
//! # Commands
//!
//! - `token` - Fetch a bearer token for a scope
//! - `request` - Execute an authenticated API request
//! - `check` - Validate configuration and obtain both tokens

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
