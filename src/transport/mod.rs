//! HTTP transport capability.
//!
//! The release source and the downloader never talk to an HTTP library
//! directly; they go through [`TransportClient`]. Whether a transport exists at
//! all is decided once, when the orchestrator is built: passing `None` makes
//! every network step fail with
//! [`UpdateError::TransportUnavailable`](crate::core::UpdateError::TransportUnavailable).
//!
//! Implementations must follow redirects themselves and report the status of
//! the final response.

mod reqwest_client;

pub use reqwest_client::ReqwestTransport;

use futures::StreamExt;
use futures::stream::BoxStream;
use std::future::Future;
use thiserror::Error;

/// A request that never produced a response, or a body that broke off mid-stream.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    /// What went wrong, as reported by the transport.
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A GET request with extra headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of header `name` (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Body chunks in arrival order.
pub type BodyStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// Final status and streamed body of a response.
pub struct HttpResponse {
    pub status: u16,
    pub body: BodyStream,
}

impl HttpResponse {
    /// Collect the whole body in memory. Only for small documents such as the release descriptor.
    pub async fn bytes(mut self) -> Result<Vec<u8>, TransportError> {
        let mut data = Vec::new();
        while let Some(chunk) = self.body.next().await {
            data.extend_from_slice(&chunk?);
        }
        Ok(data)
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse").field("status", &self.status).finish_non_exhaustive()
    }
}

/// Something that can perform HTTP GET requests.
pub trait TransportClient: Send + Sync {
    fn get(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}
