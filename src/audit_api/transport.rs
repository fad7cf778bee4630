//! HTTP seam between the API client and the network.
//!
//! The client only needs `(url, method, headers, body) -> (status, body)`, so
//! that is all [`Transport`] asks for. [`ReqwestTransport`] is the production
//! implementation; tests substitute scripted ones.

use reqwest::{Client, Method};
use std::time::Duration;

/// Outgoing request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Status and body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failure before a response status was received (DNS, connect, TLS, timeout,
/// truncated body). Always treated as transient by the client.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport> Transport for &T {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

/// [`Transport`] backed by a `reqwest` client with explicit deadlines
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration, skip_verify: bool) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .timeout(timeout)
            .danger_accept_invalid_certs(skip_verify)
            .build()?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .body(request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(describe)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(describe)?;

        Ok(HttpResponse { status, body })
    }
}

fn describe(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError(format!("request timed out: {error}"))
    } else if error.is_connect() {
        TransportError(format!("connection failed: {error}"))
    } else {
        TransportError(error.to_string())
    }
}
