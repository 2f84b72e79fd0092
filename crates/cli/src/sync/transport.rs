// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the document API.
//!
//! Provides a trait-based HTTP layer that enables:
//! - Real HTTPS requests for production
//! - Mock transports for unit testing
//!
//! The transport only moves bytes. Status handling, deadlines and retries
//! live in [`RemoteStore`](super::remote::RemoteStore).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use shelf_core::Failure;

/// User agent sent with every request; the GitHub API rejects requests
/// without one.
const USER_AGENT: &str = concat!("shelf/", env!("CARGO_PKG_VERSION"));

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection could not be established or was dropped.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The underlying client gave up waiting.
    #[error("request timed out: {0}")]
    TimedOut(String),

    /// Request could not be built or sent.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Response body could not be read.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionFailed(_) => Failure::Connect(err.to_string()),
            TransportError::TimedOut(_) => Failure::Timeout(err.to_string()),
            TransportError::RequestFailed(_) | TransportError::ReceiveFailed(_) => {
                Failure::Message(err.to_string())
            }
        }
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// HTTP verbs used by the document API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
        }
    }
}

/// A request to the document API.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        HttpRequest { method: Method::Get, url: url.into(), body: None }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        HttpRequest { method: Method::Post, url: url.into(), body: Some(body) }
    }

    pub fn patch(url: impl Into<String>, body: Value) -> Self {
        HttpRequest { method: Method::Patch, url: url.into(), body: Some(body) }
    }
}

/// A response of any status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        HttpResponse { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport trait for request/response communication.
///
/// This trait abstracts over the actual transport mechanism, allowing
/// for easy testing with mock implementations.
pub trait Transport: Send + Sync {
    /// Sends a request and returns the response, whatever its status.
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = TransportResult<HttpResponse>> + Send + '_>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = TransportResult<HttpResponse>> + Send + '_>> {
        (**self).execute(request)
    }
}

/// HTTPS transport implementation using reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
    token: Option<String>,
}

impl HttpTransport {
    /// Creates a transport. `token` is sent as a bearer token when present.
    pub fn new(token: Option<String>) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::RequestFailed(e.to_string()))?;

        Ok(HttpTransport { client, token: token.filter(|t| !t.is_empty()) })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::TimedOut(err.to_string())
    } else if err.is_connect() {
        TransportError::ConnectionFailed(err.to_string())
    } else {
        TransportError::RequestFailed(err.to_string())
    }
}

impl Transport for HttpTransport {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = TransportResult<HttpResponse>> + Send + '_>> {
        Box::pin(async move {
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
                Method::Patch => reqwest::Method::PATCH,
            };

            let mut builder = self
                .client
                .request(method, &request.url)
                .header(reqwest::header::ACCEPT, "application/vnd.github+json");
            if let Some(token) = &self.token {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

            tracing::debug!("{} {} -> {}", request.method.as_str(), request.url, status);
            Ok(HttpResponse { status, body })
        })
    }
}
