//! Client configuration
//!
//! Configuration can come from a YAML file, a per-environment profile
//! (`application-<env>.yaml`), or any flat key/value provider such as a
//! map or the process environment. Values from a key/value provider can
//! also be layered over a loaded file, which is how secrets are usually
//! supplied.

use crate::error::{Error, Result};
use crate::types::{BackoffType, OptionStringExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable selecting the configuration profile
pub const PROFILE_ENV_VAR: &str = "APP_ENV";

/// Profile used when none is requested
pub const DEFAULT_PROFILE: &str = "dev";

/// Flat configuration keys understood by [`ClientConfig::from_source`]
pub mod keys {
    pub const API_BASE_URL: &str = "api.base.url";
    pub const TOKEN_URL: &str = "oauth2.token.url";
    pub const CLIENT_ID: &str = "oauth2.client.id";
    pub const CLIENT_SECRET: &str = "oauth2.client.secret";
    pub const TOKEN_EXPIRY_BUFFER: &str = "oauth2.token.expiry.buffer";
    pub const MAX_RETRIES: &str = "http.max.retries";
    pub const TIMEOUT: &str = "http.timeout";
}

// ============================================================================
// Key/Value Sources
// ============================================================================

/// Read-only key/value configuration provider
pub trait ConfigSource {
    /// Look up a dotted key such as `oauth2.client.id`
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Configuration read from process environment variables.
///
/// A dotted key maps to an upper-case, underscore separated variable:
/// `oauth2.client.id` is read from `OAUTH2_CLIENT_ID`, or from
/// `<PREFIX>_OAUTH2_CLIENT_ID` when a prefix is set.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    prefix: Option<String>,
}

impl EnvSource {
    /// Create a source reading unprefixed variables
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source reading variables with the given prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Environment variable name for a dotted key
    pub fn var_name(&self, key: &str) -> String {
        let name = key.replace(['.', '-'], "_").to_ascii_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}_{name}", prefix.to_ascii_uppercase()),
            None => name,
        }
    }
}

impl ConfigSource for EnvSource {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key)).ok()
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Complete client configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the user-management API (e.g. `http://localhost:8080/api`)
    pub api_base_url: String,

    /// Token endpoint and client credentials
    pub oauth2: OAuth2Settings,

    /// Transport behaviour
    #[serde(default)]
    pub http: HttpSettings,
}

/// OAuth2 client-credentials settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuth2Settings {
    /// Token endpoint URL
    pub token_url: String,

    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Grace period before expiry at which a token is refreshed
    #[serde(default = "default_expiry_buffer_ms")]
    pub token_expiry_buffer_ms: u64,
}

impl OAuth2Settings {
    /// Create settings with the default expiry buffer
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_expiry_buffer_ms: default_expiry_buffer_ms(),
        }
    }

    /// Set the expiry buffer
    #[must_use]
    pub fn expiry_buffer(mut self, buffer: Duration) -> Self {
        self.token_expiry_buffer_ms = buffer.as_millis() as u64;
        self
    }

    /// Expiry buffer as a duration
    pub fn token_expiry_buffer(&self) -> Duration {
        Duration::from_millis(self.token_expiry_buffer_ms)
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Total attempts per request (first try included)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff between attempts
    #[serde(default)]
    pub backoff: BackoffType,

    /// Delay before the second attempt in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for any single delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            backoff: BackoffType::default(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpSettings {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Initial backoff as a duration
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Maximum backoff as a duration
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

fn default_expiry_buffer_ms() -> u64 {
    300_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_user_agent() -> String {
    format!("users-api-client/{}", env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Loading
// ============================================================================

impl ClientConfig {
    /// Create a config builder from the four required values
    pub fn builder(
        api_base_url: impl Into<String>,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: ClientConfig {
                api_base_url: api_base_url.into(),
                oauth2: OAuth2Settings::new(token_url, client_id, client_secret),
                http: HttpSettings::default(),
            },
        }
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Unable to read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load `application-<env>.yaml` from a directory.
    ///
    /// Without an explicit profile the `APP_ENV` variable is consulted,
    /// falling back to `dev`.
    pub fn load_profile(dir: impl AsRef<Path>, env: Option<&str>) -> Result<Self> {
        let env = env
            .map(str::to_string)
            .or_else(|| std::env::var(PROFILE_ENV_VAR).ok().none_if_empty())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        let path = dir.as_ref().join(format!("application-{env}.yaml"));
        if !path.exists() {
            return Err(Error::config(format!(
                "Unable to find {}",
                path.display()
            )));
        }
        tracing::debug!(profile = %env, path = %path.display(), "loading configuration profile");
        Self::load(path)
    }

    /// Build a config entirely from a key/value provider
    pub fn from_source(source: &impl ConfigSource) -> Result<Self> {
        let required = |key: &str| {
            source
                .get(key)
                .none_if_empty()
                .ok_or_else(|| Error::missing_field(key))
        };

        let mut config = ClientConfig {
            api_base_url: required(keys::API_BASE_URL)?,
            oauth2: OAuth2Settings::new(
                required(keys::TOKEN_URL)?,
                required(keys::CLIENT_ID)?,
                required(keys::CLIENT_SECRET)?,
            ),
            http: HttpSettings::default(),
        };
        config.apply_numeric(source)?;
        Ok(config)
    }

    /// Overlay any keys present in `source` onto this config
    pub fn apply_overrides(&mut self, source: &impl ConfigSource) -> Result<()> {
        let set = |key: &str, target: &mut String| {
            if let Some(value) = source.get(key).none_if_empty() {
                *target = value;
            }
        };
        set(keys::API_BASE_URL, &mut self.api_base_url);
        set(keys::TOKEN_URL, &mut self.oauth2.token_url);
        set(keys::CLIENT_ID, &mut self.oauth2.client_id);
        set(keys::CLIENT_SECRET, &mut self.oauth2.client_secret);
        self.apply_numeric(source)
    }

    fn apply_numeric(&mut self, source: &impl ConfigSource) -> Result<()> {
        if let Some(retries) = parse_number::<u32>(source, keys::MAX_RETRIES)? {
            self.http.max_retries = retries;
        }
        if let Some(buffer) = parse_number::<u64>(source, keys::TOKEN_EXPIRY_BUFFER)? {
            self.oauth2.token_expiry_buffer_ms = buffer;
        }
        if let Some(timeout) = parse_number::<u64>(source, keys::TIMEOUT)? {
            self.http.timeout_ms = timeout;
        }
        Ok(())
    }

    /// Check that the config can drive a client
    pub fn validate(&self) -> Result<()> {
        parse_http_url(keys::API_BASE_URL, &self.api_base_url)?;
        parse_http_url(keys::TOKEN_URL, &self.oauth2.token_url)?;

        if self.oauth2.client_id.trim().is_empty() {
            return Err(Error::missing_field(keys::CLIENT_ID));
        }
        if self.oauth2.client_secret.is_empty() {
            return Err(Error::missing_field(keys::CLIENT_SECRET));
        }
        if self.http.max_retries == 0 {
            return Err(Error::invalid_value(
                keys::MAX_RETRIES,
                "at least one attempt is required",
            ));
        }
        Ok(())
    }

    /// Parsed API base URL
    pub fn api_base(&self) -> Result<Url> {
        parse_http_url(keys::API_BASE_URL, &self.api_base_url)
    }
}

fn parse_number<T: std::str::FromStr>(source: &impl ConfigSource, key: &str) -> Result<Option<T>>
where
    T::Err: fmt::Display,
{
    match source.get(key).none_if_empty() {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::invalid_value(key, format!("'{raw}': {e}"))),
        None => Ok(None),
    }
}

fn parse_http_url(field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| Error::invalid_value(field, format!("'{value}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_value(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_base_url", &self.api_base_url)
            .field("oauth2", &self.oauth2)
            .field("http", &self.http)
            .finish()
    }
}

impl fmt::Debug for OAuth2Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Settings")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_expiry_buffer_ms", &self.token_expiry_buffer_ms)
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ClientConfig`]
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set total attempts per request
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.http.max_retries = retries;
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.http.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the token expiry buffer
    #[must_use]
    pub fn expiry_buffer(mut self, buffer: Duration) -> Self {
        self.config.oauth2.token_expiry_buffer_ms = buffer.as_millis() as u64;
        self
    }

    /// Set backoff configuration
    #[must_use]
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.config.http.backoff = backoff_type;
        self.config.http.initial_backoff_ms = initial.as_millis() as u64;
        self.config.http.max_backoff_ms = max.as_millis() as u64;
        self
    }

    /// Disable delays between attempts
    #[must_use]
    pub fn no_backoff(self) -> Self {
        self.backoff(BackoffType::Constant, Duration::ZERO, Duration::ZERO)
    }

    /// Set user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.http.user_agent = agent.into();
        self
    }

    /// Validate and build the config
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn properties() -> HashMap<String, String> {
        [
            (keys::API_BASE_URL, "http://localhost:8080/api"),
            (keys::TOKEN_URL, "http://localhost:8080/oauth/token"),
            (keys::CLIENT_ID, "abc"),
            (keys::CLIENT_SECRET, "xyz"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_from_source_defaults() {
        let config = ClientConfig::from_source(&properties()).unwrap();

        assert_eq!(config.api_base_url, "http://localhost:8080/api");
        assert_eq!(config.oauth2.client_id, "abc");
        assert_eq!(config.oauth2.client_secret, "xyz");
        assert_eq!(config.http.max_retries, 3);
        assert_eq!(
            config.oauth2.token_expiry_buffer(),
            Duration::from_secs(300)
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_from_source_numeric_keys() {
        let mut props = properties();
        props.insert(keys::MAX_RETRIES.to_string(), "5".to_string());
        props.insert(keys::TOKEN_EXPIRY_BUFFER.to_string(), "1000".to_string());
        props.insert(keys::TIMEOUT.to_string(), "2500".to_string());

        let config = ClientConfig::from_source(&props).unwrap();
        assert_eq!(config.http.max_retries, 5);
        assert_eq!(config.oauth2.token_expiry_buffer_ms, 1000);
        assert_eq!(config.http.timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_from_source_missing_field() {
        let mut props = properties();
        props.remove(keys::CLIENT_SECRET);

        let err = ClientConfig::from_source(&props).unwrap_err();
        assert!(matches!(err, Error::MissingConfigField { ref field } if field == keys::CLIENT_SECRET));
    }

    #[test]
    fn test_from_source_bad_number() {
        let mut props = properties();
        props.insert(keys::MAX_RETRIES.to_string(), "three".to_string());

        let err = ClientConfig::from_source(&props).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_from_yaml_with_defaults() {
        let yaml = r"
api_base_url: http://localhost:8080/api
oauth2:
  token_url: http://localhost:8080/oauth/token
  client_id: abc
  client_secret: xyz
";
        let config = ClientConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.http, HttpSettings::default());
        assert_eq!(config.oauth2.token_expiry_buffer_ms, 300_000);
    }

    #[test]
    fn test_from_yaml_full() {
        let yaml = r"
api_base_url: https://api.example.com
oauth2:
  token_url: https://auth.example.com/token
  client_id: abc
  client_secret: xyz
  token_expiry_buffer_ms: 60000
http:
  max_retries: 4
  timeout_ms: 1000
  backoff: linear
  initial_backoff_ms: 10
  max_backoff_ms: 50
  user_agent: tests/1.0
";
        let config = ClientConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.http,
            HttpSettings {
                max_retries: 4,
                timeout_ms: 1000,
                backoff: BackoffType::Linear,
                initial_backoff_ms: 10,
                max_backoff_ms: 50,
                user_agent: "tests/1.0".to_string(),
            }
        );
        assert_eq!(config.oauth2.token_expiry_buffer(), Duration::from_secs(60));
    }

    #[test]
    fn test_load_profile() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("application-qa.yaml")).unwrap();
        writeln!(
            file,
            "api_base_url: http://qa/api\noauth2:\n  token_url: http://qa/token\n  client_id: qa\n  client_secret: s"
        )
        .unwrap();

        let config = ClientConfig::load_profile(dir.path(), Some("qa")).unwrap();
        assert_eq!(config.api_base_url, "http://qa/api");

        let err = ClientConfig::load_profile(dir.path(), Some("prod")).unwrap_err();
        assert!(err.to_string().contains("application-prod.yaml"));
    }

    #[test]
    fn test_load_reports_unreadable_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");

        let err = ClientConfig::load(&missing).unwrap_err();

        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = ClientConfig::from_source(&properties()).unwrap();
        let mut overrides = HashMap::new();
        overrides.insert(keys::CLIENT_SECRET.to_string(), "from-env".to_string());
        overrides.insert(keys::MAX_RETRIES.to_string(), "7".to_string());
        overrides.insert(keys::CLIENT_ID.to_string(), String::new());

        config.apply_overrides(&overrides).unwrap();
        assert_eq!(config.oauth2.client_secret, "from-env");
        assert_eq!(config.oauth2.client_id, "abc");
        assert_eq!(config.http.max_retries, 7);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ClientConfig::builder("not a url", "http://t", "id", "secret").build();
        assert!(matches!(config, Err(Error::InvalidConfigValue { .. })));

        let config = ClientConfig::builder("ftp://x", "http://t", "id", "secret").build();
        assert!(matches!(config, Err(Error::InvalidConfigValue { .. })));

        let config = ClientConfig::builder("http://x", "http://t", " ", "secret").build();
        assert!(matches!(config, Err(Error::MissingConfigField { .. })));

        let config = ClientConfig::builder("http://x", "http://t", "id", "secret")
            .max_retries(0)
            .build();
        assert!(matches!(config, Err(Error::InvalidConfigValue { .. })));
    }

    #[test]
    fn test_env_source_var_name() {
        assert_eq!(EnvSource::new().var_name("oauth2.client.id"), "OAUTH2_CLIENT_ID");
        assert_eq!(
            EnvSource::with_prefix("users").var_name("http.max.retries"),
            "USERS_HTTP_MAX_RETRIES"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ClientConfig::builder("http://x", "http://t", "id", "super-secret")
            .build()
            .unwrap();
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }
}
