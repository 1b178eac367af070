//! Token types
//!
//! These types never leave the auth module: callers only ever see the
//! rendered access token string.

use crate::types::Scope;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Cached access token for one scope
#[derive(Clone)]
pub(crate) struct TokenRecord {
    /// Scope the token was issued for
    pub scope: Scope,
    /// The access token
    value: String,
    /// When the token was obtained
    pub issued_at: DateTime<Utc>,
    /// When the token expires (None = never)
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    /// Create a record that expires `expires_in` seconds from now.
    ///
    /// A lifetime beyond chrono's representable range is kept as
    /// non-expiring.
    pub fn new(scope: Scope, value: String, expires_in: Option<i64>) -> Self {
        let issued_at = Utc::now();
        let expires_at = expires_in
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime));
        Self {
            scope,
            value,
            issued_at,
            expires_at,
        }
    }

    /// The access token value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the token is inside the refresh buffer or past expiry
    pub fn is_expired(&self, buffer: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let millis = i64::try_from(buffer.as_millis()).unwrap_or(i64::MAX);
                // a buffer too large to represent covers any expiry
                TimeDelta::try_milliseconds(millis)
                    .and_then(|buffer| Utc::now().checked_add_signed(buffer))
                    .map_or(true, |refresh_at| refresh_at >= expires_at)
            }
            None => false,
        }
    }
}

impl fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRecord")
            .field("scope", &self.scope)
            .field("value", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Per-scope cache slot
#[derive(Debug, Clone, Default)]
pub(crate) enum TokenSlot {
    /// Nothing cached
    #[default]
    Absent,
    /// A fetched token (possibly past its refresh point)
    Cached(TokenRecord),
    /// Forced to the invalid sentinel
    Invalid,
}

/// OAuth2 token endpoint response
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub fn into_record(self, scope: Scope) -> TokenRecord {
        TokenRecord::new(scope, self.access_token, self.expires_in)
    }
}
