//! Process-wide credential manager
//!
//! Most callers should construct one [`CredentialManager`] and pass an
//! `Arc` of it around. For wiring that needs a lazily created,
//! process-wide instance, [`CredentialManagerCell`] guarantees the manager
//! is built exactly once even when first access happens concurrently.

use super::manager::CredentialManager;
use crate::config::OAuth2Settings;
use crate::error::Result;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Once-initialised holder of a shared [`CredentialManager`]
#[derive(Debug)]
pub struct CredentialManagerCell {
    cell: OnceCell<Arc<CredentialManager>>,
}

impl CredentialManagerCell {
    /// Create an empty cell
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// The manager, if it has been created
    pub fn get(&self) -> Option<Arc<CredentialManager>> {
        self.cell.get().cloned()
    }

    /// Return the manager, creating it with `init` on first access.
    ///
    /// Concurrent callers block until the winner finishes; `init` runs at
    /// most once unless it fails, in which case the next caller retries.
    pub fn get_or_try_init<F>(&self, init: F) -> Result<Arc<CredentialManager>>
    where
        F: FnOnce() -> Result<CredentialManager>,
    {
        self.cell.get_or_try_init(|| init().map(Arc::new)).cloned()
    }
}

impl Default for CredentialManagerCell {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: CredentialManagerCell = CredentialManagerCell::new();

/// The process-wide manager, if [`init_global`] has run
pub fn global() -> Option<Arc<CredentialManager>> {
    GLOBAL.get()
}

/// Create the process-wide manager, or return the existing one.
///
/// Settings passed after the first successful call are ignored.
pub fn init_global(settings: &OAuth2Settings, timeout: Duration) -> Result<Arc<CredentialManager>> {
    GLOBAL.get_or_try_init(|| {
        info!(token_url = %settings.token_url, "initialising process-wide credential manager");
        CredentialManager::new(settings.clone(), timeout)
    })
}
