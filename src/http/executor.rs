//! Authenticating request executor
//!
//! Picks the scope from the HTTP method, attaches the bearer token and hands
//! the request to the transport chain. Token failures abort before any
//! network traffic; a 401 from the API is surfaced as an authentication
//! error rather than a plain response.

use super::transport::{RequestDescriptor, Transport};
use super::TransportChain;
use crate::auth::CredentialManager;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::types::Scope;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Status code and body of a completed API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Response body as text
    pub body: String,
}

impl ApiResponse {
    /// Create a response
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }

    /// HTTP status code
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Response body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Executes API requests with the right bearer token attached
pub struct AuthenticatingExecutor {
    credentials: Arc<CredentialManager>,
    transport: Arc<dyn Transport>,
    base_url: Option<Url>,
    refresh_on_unauthorized: bool,
}

impl AuthenticatingExecutor {
    /// Create an executor over any transport
    pub fn new(credentials: Arc<CredentialManager>, transport: impl Transport + 'static) -> Self {
        Self {
            credentials,
            transport: Arc::new(transport),
            base_url: None,
            refresh_on_unauthorized: false,
        }
    }

    /// Create an executor with the standard chain and the configured base URL
    pub fn from_config(config: &ClientConfig, credentials: Arc<CredentialManager>) -> Result<Self> {
        config.validate()?;
        let transport = TransportChain::standard(&config.http)?;
        Ok(Self::new(credentials, transport).with_base_url(config.api_base()?))
    }

    /// Resolve relative paths against `base_url`
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Drop the scope's cached token when the API answers 401
    #[must_use]
    pub fn refresh_on_unauthorized(mut self, enabled: bool) -> Self {
        self.refresh_on_unauthorized = enabled;
        self
    }

    /// The credential manager backing this executor
    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    /// Execute a request with the token for its method's scope
    pub async fn execute(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        let scope = Scope::for_method(request.method());
        debug!(%scope, method = %request.method(), url = %request.url(), "authorising request");

        let token = self.credentials.get_token(scope).await?;
        let request = request.with_header(AUTHORIZATION, bearer(&token)?);

        let outcome = self.transport.execute(&request).await?;
        debug!(status = outcome.status, body = %outcome.body, "response body");

        if outcome.status == 401 {
            warn!(%scope, url = %request.url(), "API rejected the bearer token");
            if self.refresh_on_unauthorized {
                self.credentials.evict(scope).await;
            }
            return Err(Error::Unauthorized { body: outcome.body });
        }

        Ok(ApiResponse::new(outcome.status, outcome.body))
    }

    /// Build the absolute URL for `path`.
    ///
    /// Absolute `http(s)` URLs are used as given; anything else is appended
    /// to the base URL.
    pub fn url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }
        let base = self
            .base_url
            .as_ref()
            .ok_or_else(|| Error::config(format!("no base URL to resolve '{path}' against")))?;
        let joined = format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&joined)?)
    }

    /// Start a request for `path`
    pub fn request(&self, method: Method, path: &str) -> Result<RequestDescriptor> {
        Ok(RequestDescriptor::new(method, self.url(path)?))
    }

    /// GET `path`
    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.execute(self.request(Method::GET, path)?).await
    }

    /// GET `path` with query parameters
    pub async fn get_with_query<K, V>(&self, path: &str, query: &[(K, V)]) -> Result<ApiResponse>
    where
        K: AsRef<str> + Sync,
        V: AsRef<str> + Sync,
    {
        self.execute(self.request(Method::GET, path)?.with_query(query))
            .await
    }

    /// POST a JSON body to `path`
    pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.execute(self.request(Method::POST, path)?.with_json(body)?)
            .await
    }

    /// PUT a JSON body to `path`
    pub async fn put<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.execute(self.request(Method::PUT, path)?.with_json(body)?)
            .await
    }

    /// PATCH a JSON body to `path`
    pub async fn patch<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.execute(self.request(Method::PATCH, path)?.with_json(body)?)
            .await
    }

    /// DELETE `path`
    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.execute(self.request(Method::DELETE, path)?).await
    }

    /// DELETE `path` with a JSON body
    pub async fn delete_with<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<ApiResponse> {
        self.execute(self.request(Method::DELETE, path)?.with_json(body)?)
            .await
    }
}

fn bearer(token: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| Error::auth("access token is not a valid header value"))?;
    value.set_sensitive(true);
    Ok(value)
}

impl fmt::Debug for AuthenticatingExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatingExecutor")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("refresh_on_unauthorized", &self.refresh_on_unauthorized)
            .finish_non_exhaustive()
    }
}
