//! HTTP transport used by the client.
//!
//! The client only needs "GET this path, give me status, headers and body, or
//! tell me why the request never completed". [`Transport`] is that seam;
//! [`HttpTransport`] is the reqwest-backed implementation used in production.

use std::{error::Error as _, fmt::Debug};

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, HeaderMap, HeaderValue},
};
use thiserror::Error;

use crate::config::ClientConfig;

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Timeout,
    /// Connection refused, reset, or never established.
    Connection,
    Other,
}

/// Why a request never produced a response.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connection, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connection
        } else {
            TransportErrorKind::Other
        };

        // reqwest keeps the useful part ("operation timed out", "connection refused")
        // in the source chain, not in its own Display.
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        if kind == TransportErrorKind::Timeout {
            message = format!("timeout: {message}");
        }

        Self::new(kind, message)
    }
}

#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Issue `GET {base_url}{path}`.
    async fn get(&self, path: &str) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport bound to one base URL.
///
/// Sends `Accept: application/json` and the configured `User-Agent` on
/// every request. The underlying connection pool is built once and reused.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<RawResponse, TransportError> {
        let url = format!("{}{}", self.base_url, path);

        let res = self.http.get(&url).send().await?;

        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let body = res.text().await?;

        tracing::debug!(%url, status, bytes = body.len(), "weather.gov response received");

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
