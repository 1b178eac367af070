//! Leaf transport: one HTTP exchange over reqwest

use super::transport::{RequestDescriptor, ResponseOutcome, Transport};
use crate::config::HttpSettings;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;

/// Performs a single request/response exchange, nothing more
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport honouring the timeout and user agent settings
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(&settings.user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Create a transport over an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the underlying reqwest client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseOutcome> {
        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.to_string());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(ResponseOutcome::new(status, headers, body))
    }
}
