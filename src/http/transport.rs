//! Transport seam
//!
//! Every stage of the request pipeline implements [`Transport`]: it takes an
//! immutable [`RequestDescriptor`] and produces one [`ResponseOutcome`] per
//! call. Decorators hold the next stage by value and expose the same
//! contract, so stages compose freely.

use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

/// A request as it travels down the transport chain
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<String>,
}

impl RequestDescriptor {
    /// Create a request without headers or body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a request from a URL string
    pub fn parse(method: Method, url: &str) -> Result<Self> {
        Ok(Self::new(method, Url::parse(url)?))
    }

    /// GET request
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// POST request
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// PUT request
    pub fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    /// PATCH request
    pub fn patch(url: Url) -> Self {
        Self::new(Method::PATCH, url)
    }

    /// DELETE request
    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Return a copy with the header set (replacing any previous value)
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Return a copy with a header given as strings
    pub fn try_header(self, name: &str, value: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::invalid_value("header", format!("'{name}': {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| Error::invalid_value("header", format!("'{name}': {e}")))?;
        Ok(self.with_header(header_name, header_value))
    }

    /// Return a copy with query parameters appended
    #[must_use]
    pub fn with_query<K: AsRef<str>, V: AsRef<str>>(mut self, pairs: &[(K, V)]) -> Self {
        if !pairs.is_empty() {
            let mut query = self.url.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(key.as_ref(), value.as_ref());
            }
        }
        self
    }

    /// Return a copy with a raw body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Return a copy with a JSON body and matching content type
    pub fn with_json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        let json = serde_json::to_string(body)?;
        Ok(self
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(json))
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body, if any
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// Whether an outcome ends the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Success or client error, returned as is
    Terminal,
    /// Server error (or anything outside 2xx-4xx), eligible for retry
    Retryable,
}

impl Disposition {
    /// Classify an HTTP status code
    pub fn for_status(status: u16) -> Self {
        if (200..500).contains(&status) {
            Disposition::Terminal
        } else {
            Disposition::Retryable
        }
    }
}

/// Result of a single request attempt
#[derive(Debug, Clone)]
pub struct ResponseOutcome {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as text
    pub body: String,
}

impl ResponseOutcome {
    /// Create an outcome
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Create an outcome without headers
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, HeaderMap::new(), body)
    }

    /// Retry classification of this outcome
    pub fn disposition(&self) -> Disposition {
        Disposition::for_status(self.status)
    }
}

/// One stage of the request pipeline
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a request once (or, for decorators, as their policy dictates)
    async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseOutcome>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseOutcome> {
        (**self).execute(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseOutcome> {
        (**self).execute(request).await
    }
}
