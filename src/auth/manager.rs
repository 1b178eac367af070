//! Credential manager
//!
//! Obtains read and write bearer tokens with the OAuth2 client-credentials
//! grant, caches them until they enter the expiry buffer, and carries the
//! invalidation state machine used by tests to simulate broken credentials.

use super::types::{TokenRecord, TokenResponse, TokenSlot};
use crate::config::OAuth2Settings;
use crate::error::{Error, Result};
use crate::types::{Scope, TokenState};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const INVALIDATED: &str = "tokens invalidated";
const INVALID: &str = "invalid token";

/// Mutable state, guarded by a single manager-wide lock
#[derive(Debug, Default)]
struct CredentialState {
    invalidated: bool,
    read: TokenSlot,
    write: TokenSlot,
}

impl CredentialState {
    fn slot(&self, scope: Scope) -> &TokenSlot {
        match scope {
            Scope::Read => &self.read,
            Scope::Write => &self.write,
        }
    }

    fn slot_mut(&mut self, scope: Scope) -> &mut TokenSlot {
        match scope {
            Scope::Read => &mut self.read,
            Scope::Write => &mut self.write,
        }
    }

    fn clear(&mut self) {
        self.read = TokenSlot::Absent;
        self.write = TokenSlot::Absent;
    }
}

/// Single source of truth for bearer tokens.
///
/// The state lock is held for the whole of a token fetch, so concurrent
/// callers never issue more than one token request at a time and always
/// observe the flag and both slots consistently.
pub struct CredentialManager {
    settings: OAuth2Settings,
    http_client: Client,
    state: Mutex<CredentialState>,
    fetches: AtomicU64,
}

impl CredentialManager {
    /// Create a manager with its own HTTP client
    pub fn new(settings: OAuth2Settings, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(settings, http_client))
    }

    /// Create a manager with a custom HTTP client
    pub fn with_client(settings: OAuth2Settings, http_client: Client) -> Self {
        Self {
            settings,
            http_client,
            state: Mutex::new(CredentialState::default()),
            fetches: AtomicU64::new(0),
        }
    }

    /// Get the OAuth2 settings
    pub fn settings(&self) -> &OAuth2Settings {
        &self.settings
    }

    /// Return a usable token for `scope`, fetching one if needed.
    ///
    /// A cached token is reused while `now < expiry - buffer`. Fails with
    /// an authentication error while the manager is invalidated or the
    /// scope holds the invalid sentinel.
    pub async fn get_token(&self, scope: Scope) -> Result<String> {
        self.obtain(scope, false).await
    }

    /// Fetch a fresh token for `scope` regardless of the cache
    pub async fn fetch(&self, scope: Scope) -> Result<String> {
        self.obtain(scope, true).await
    }

    async fn obtain(&self, scope: Scope, force: bool) -> Result<String> {
        let mut state = self.state.lock().await;

        if state.invalidated {
            warn!(%scope, "token refused: tokens are invalidated");
            return Err(Error::auth(INVALIDATED));
        }

        match state.slot(scope) {
            TokenSlot::Invalid => {
                warn!(%scope, "token refused: token is explicitly invalid");
                return Err(Error::auth(INVALID));
            }
            TokenSlot::Cached(record)
                if !force && !record.is_expired(self.settings.token_expiry_buffer()) =>
            {
                debug!(%scope, "using cached token");
                return Ok(record.value().to_string());
            }
            TokenSlot::Cached(_) if !force => debug!(%scope, "cached token expired, refreshing"),
            TokenSlot::Cached(_) | TokenSlot::Absent => {}
        }

        let record = self.request_token(scope).await?;
        let value = record.value().to_string();
        *state.slot_mut(scope) = TokenSlot::Cached(record);
        Ok(value)
    }

    /// Perform the client-credentials exchange against the token endpoint
    async fn request_token(&self, scope: Scope) -> Result<TokenRecord> {
        info!(%scope, token_url = %self.settings.token_url, "requesting access token");

        let form = [("grant_type", "client_credentials"), ("scope", scope.as_str())];
        let response = self
            .http_client
            .post(&self.settings.token_url)
            .header(AUTHORIZATION, self.basic_credentials())
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::auth(format!("token endpoint unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!(%scope, status, "token request rejected");
            return Err(Error::auth(format!(
                "token request failed with status {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("invalid token response: {e}")))?;
        if token.access_token.is_empty() {
            return Err(Error::auth("token response carried an empty access_token"));
        }

        self.fetches.fetch_add(1, Ordering::Relaxed);
        debug!(%scope, expires_in = ?token.expires_in, "access token obtained");
        Ok(token.into_record(scope))
    }

    /// `Basic base64(client_id:client_secret)`
    fn basic_credentials(&self) -> String {
        let raw = format!("{}:{}", self.settings.client_id, self.settings.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }

    /// Clear both tokens and refuse every token request until [`validate`](Self::validate)
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        state.clear();
        state.invalidated = true;
        info!("tokens have been invalidated");
    }

    /// Force both tokens to the invalid sentinel.
    ///
    /// The invalidated flag is left untouched; subsequent token requests fail
    /// with "invalid token" until [`validate`](Self::validate).
    pub async fn set_invalid(&self) {
        let mut state = self.state.lock().await;
        state.read = TokenSlot::Invalid;
        state.write = TokenSlot::Invalid;
        info!("tokens have been set to invalid");
    }

    /// Return to a clean state; the next demand fetches new tokens
    pub async fn validate(&self) {
        let mut state = self.state.lock().await;
        state.clear();
        state.invalidated = false;
        info!("tokens have been validated");
    }

    /// Drop the cached token of one scope so the next demand refetches.
    ///
    /// The invalid sentinel and the invalidated flag are kept.
    pub async fn evict(&self, scope: Scope) {
        let mut state = self.state.lock().await;
        let slot = state.slot_mut(scope);
        if matches!(slot, TokenSlot::Cached(_)) {
            *slot = TokenSlot::Absent;
            debug!(%scope, "cached token evicted");
        }
    }

    /// Observe the state of one scope
    pub async fn token_state(&self, scope: Scope) -> TokenState {
        let state = self.state.lock().await;
        if state.invalidated {
            return TokenState::Invalidated;
        }
        match state.slot(scope) {
            TokenSlot::Absent => TokenState::Absent,
            TokenSlot::Invalid => TokenState::Invalid,
            TokenSlot::Cached(record) if record.is_expired(self.settings.token_expiry_buffer()) => {
                TokenState::Expired
            }
            TokenSlot::Cached(_) => TokenState::Valid,
        }
    }

    /// Number of successful token fetches since creation
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("settings", &self.settings)
            .field("fetches", &self.fetch_count())
            .finish_non_exhaustive()
    }
}
