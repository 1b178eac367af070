//! CLI runner - executes commands

use crate::auth::{init_global, CredentialManager};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{ClientConfig, EnvSource};
use crate::error::{Error, Result};
use crate::http::AuthenticatingExecutor;
use crate::types::Scope;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Token { scope } => self.token(*scope).await,
            Commands::Request {
                method,
                path,
                body,
                query,
            } => self.request(method, path, body.as_deref(), query).await,
            Commands::Check => self.check().await,
        }
    }

    /// Resolve configuration: explicit file, else profile; environment variables override either
    fn load_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.cli.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::load_profile(&self.cli.config_dir, self.cli.env.as_deref())?,
        };
        config.apply_overrides(&EnvSource::new())?;
        config.validate()?;
        Ok(config)
    }

    fn credentials(config: &ClientConfig) -> Result<Arc<CredentialManager>> {
        init_global(&config.oauth2, config.http.timeout())
    }

    /// Fetch a token
    async fn token(&self, scope: Scope) -> Result<()> {
        let config = self.load_config()?;
        let credentials = Self::credentials(&config)?;
        let token = credentials.fetch(scope).await?;

        self.output_message(&json!({
            "type": "TOKEN",
            "token": {
                "scope": scope,
                "access_token": token
            }
        }));
        Ok(())
    }

    /// Execute an API request
    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
        query: &[String],
    ) -> Result<()> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::invalid_value("method", format!("'{method}': {e}")))?;
        let query = query
            .iter()
            .map(|pair| parse_query_pair(pair))
            .collect::<Result<Vec<_>>>()?;

        let config = self.load_config()?;
        let executor = AuthenticatingExecutor::from_config(&config, Self::credentials(&config)?)?;

        let mut request = executor.request(method, path)?.with_query(query.as_slice());
        if let Some(body) = body {
            let body: Value = serde_json::from_str(body)
                .map_err(|e| Error::config(format!("Invalid body JSON: {e}")))?;
            request = request.with_json(&body)?;
        }

        let started = Instant::now();
        let response = executor.execute(request).await?;
        let body = serde_json::from_str::<Value>(&response.body)
            .unwrap_or_else(|_| Value::String(response.body.clone()));

        self.output_message(&json!({
            "type": "RESPONSE",
            "response": {
                "status": response.status_code,
                "success": response.is_success(),
                "elapsed_ms": started.elapsed().as_millis() as u64,
                "body": body
            }
        }));
        Ok(())
    }

    /// Check configuration and token endpoint
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!("Checking credentials against {}", config.oauth2.token_url)
            }
        }));

        let credentials = Self::credentials(&config)?;
        let mut failures = Vec::new();
        for scope in Scope::ALL {
            if let Err(e) = credentials.get_token(scope).await {
                failures.push(format!("{scope}: {e}"));
            }
        }

        let status = if failures.is_empty() {
            json!({ "status": "SUCCEEDED", "message": "Obtained read and write tokens" })
        } else {
            json!({ "status": "FAILED", "message": failures.join("; ") })
        };
        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": status
        }));

        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

fn parse_query_pair(pair: &str) -> Result<(String, String)> {
    pair.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| Error::invalid_value("query", format!("expected key=value, got '{pair}'")))
}
