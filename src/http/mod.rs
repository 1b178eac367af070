//! HTTP module
//!
//! Request execution as a chain of [`Transport`] stages.
//!
//! # Features
//!
//! - **Leaf transport**: one reqwest exchange per call ([`HttpTransport`])
//! - **Retries**: bounded attempts with backoff on transient failure ([`RetryingTransport`])
//! - **Logging**: method, URL, status and elapsed time ([`LoggingTransport`])
//! - **Authentication**: scope-aware bearer tokens ([`AuthenticatingExecutor`])

mod client;
mod executor;
mod logging;
mod retry;
mod transport;

pub use client::HttpTransport;
pub use executor::{ApiResponse, AuthenticatingExecutor};
pub use logging::LoggingTransport;
pub use retry::{RetryPolicy, RetryingTransport};
pub use transport::{Disposition, RequestDescriptor, ResponseOutcome, Transport};

use crate::config::HttpSettings;
use crate::error::Result;

/// The default stack: logging outermost, then retry, then the network
pub type StandardTransport = LoggingTransport<RetryingTransport<HttpTransport>>;

/// Assembles transport chains from settings
#[derive(Debug, Clone, Copy)]
pub struct TransportChain;

impl TransportChain {
    /// `Logging(Retrying(Http))` configured from `settings`
    pub fn standard(settings: &HttpSettings) -> Result<StandardTransport> {
        let http = HttpTransport::new(settings)?;
        let retrying = RetryingTransport::new(http, RetryPolicy::from_settings(settings));
        Ok(LoggingTransport::new(retrying))
    }
}
