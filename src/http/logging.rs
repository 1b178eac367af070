//! Observability decorator

use super::transport::{RequestDescriptor, ResponseOutcome, Transport};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{info, warn};

/// Records method, URL and outcome around the inner call.
///
/// The outcome is passed through untouched.
#[derive(Debug, Clone)]
pub struct LoggingTransport<T> {
    inner: T,
}

impl<T: Transport> LoggingTransport<T> {
    /// Wrap `inner`
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// The wrapped transport
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: Transport> Transport for LoggingTransport<T> {
    async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseOutcome> {
        let method = request.method();
        let url = request.url();
        info!(%method, %url, "executing request");

        let started = Instant::now();
        let result = self.inner.execute(request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(outcome) => info!(%method, %url, status = outcome.status, elapsed_ms, "received response"),
            Err(e) => warn!(%method, %url, error = %e, elapsed_ms, "request failed"),
        }
        result
    }
}
