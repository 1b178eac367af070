//! CLI commands and argument parsing

use crate::types::Scope;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Users API client CLI
#[derive(Parser, Debug)]
#[command(name = "users-api-client")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML); overrides profile lookup
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Configuration profile (defaults to $APP_ENV, then "dev")
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    /// Directory holding application-<env>.yaml profiles
    #[arg(long, global = true, default_value = "config")]
    pub config_dir: PathBuf,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a fresh bearer token
    Token {
        /// Token scope (read or write)
        #[arg(short, long, default_value = "read")]
        scope: Scope,
    },

    /// Execute an authenticated request against the API base URL
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...)
        method: String,

        /// Path relative to the API base URL, or an absolute URL
        path: String,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query")]
        query: Vec<String>,
    },

    /// Validate configuration and obtain both tokens
    Check,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_command() {
        let cli = Cli::try_parse_from(["users-api-client", "--env", "test", "token", "--scope", "write"]).unwrap();
        assert_eq!(cli.env.as_deref(), Some("test"));
        assert_eq!(cli.config_dir, PathBuf::from("config"));
        assert!(matches!(cli.command, Commands::Token { scope: Scope::Write }));
    }

    #[test]
    fn test_parse_request_command() {
        let cli = Cli::try_parse_from([
            "users-api-client",
            "request",
            "post",
            "/users",
            "--body",
            r#"{"name":"Ada"}"#,
            "-q",
            "dryRun=true",
            "--format",
            "pretty",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Pretty);
        match cli.command {
            Commands::Request {
                method,
                path,
                body,
                query,
            } => {
                assert_eq!(method, "post");
                assert_eq!(path, "/users");
                assert_eq!(body.as_deref(), Some(r#"{"name":"Ada"}"#));
                assert_eq!(query, vec!["dryRun=true".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_scope() {
        assert!(Cli::try_parse_from(["users-api-client", "token", "--scope", "admin"]).is_err());
    }
}
