//! Common types used throughout the users API client
//!
//! This module contains shared type definitions and utility types used
//! across the auth, http and config modules.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

// ============================================================================
// OAuth2 Scope
// ============================================================================

/// OAuth2 permission class a bearer token is issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Read-only access (GET, HEAD, OPTIONS)
    Read,
    /// State-mutating access (POST, PUT, PATCH, DELETE)
    Write,
}

impl Scope {
    /// Both scopes, read first
    pub const ALL: [Scope; 2] = [Scope::Read, Scope::Write];

    /// Scope name as sent in the token request
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Read => "read",
            Scope::Write => "write",
        }
    }

    /// Scope a request with the given method must be authorised with.
    ///
    /// Mutating verbs need the write token, everything else reads.
    pub fn for_method(method: &Method) -> Self {
        if *method == Method::POST
            || *method == Method::PUT
            || *method == Method::PATCH
            || *method == Method::DELETE
        {
            Scope::Write
        } else {
            Scope::Read
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "read" => Ok(Scope::Read),
            "write" => Ok(Scope::Write),
            other => Err(Error::invalid_value(
                "scope",
                format!("expected 'read' or 'write', got '{other}'"),
            )),
        }
    }
}

// ============================================================================
// Token State
// ============================================================================

/// Observed state of one scope's cached credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Nothing cached, next demand fetches
    Absent,
    /// Cached and usable
    Valid,
    /// Cached but inside the expiry buffer, next demand refetches
    Expired,
    /// Forced to the invalid sentinel
    Invalid,
    /// Manager-wide invalidation is in effect
    Invalidated,
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.trim().is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.trim().is_empty() {
            None
        } else {
            Some(self)
        }
    }
}
