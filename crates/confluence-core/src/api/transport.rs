//! The HTTP seam underneath the gateway.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Url};
use thiserror::Error;
use tracing::{debug, warn};

/// A fully resolved request, ready to hit the wire.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

/// Whatever the server answered, success or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request went out (or tried to) and nothing came back.
    #[error("no response received: {0}")]
    NoResponse(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: OutboundRequest) -> Result<RawResponse, TransportError>;
}

/// `reqwest`-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::NoResponse(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().await;
        debug!(method = %request.method, url = %request.url, status, "Response received");

        read_body(status, body)
    }
}

/// A success whose body can't be read is no response at all. A failure status
/// still counts without its body, so a 401 is acted on even if the body is lost.
fn read_body<E: std::fmt::Display>(
    status: u16,
    body: std::result::Result<String, E>,
) -> Result<RawResponse, TransportError> {
    match body {
        Ok(body) => Ok(RawResponse { status, body }),
        Err(e) if (200..300).contains(&status) => Err(TransportError::NoResponse(format!(
            "failed to read response body: {}",
            e
        ))),
        Err(e) => {
            warn!(status, error = %e, "Failed to read error response body");
            Ok(RawResponse {
                status,
                body: String::new(),
            })
        }
    }
}
