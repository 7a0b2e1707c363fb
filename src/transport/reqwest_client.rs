use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, warn};

use super::{HttpRequest, HttpResponse, TransportClient, TransportError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 10;

/// [`TransportClient`] backed by `reqwest` with its default TLS stack.
///
/// Redirects are followed (release assets are served from a CDN behind a 302),
/// so the status seen by callers is always the final one.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| TransportError::new(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Build a transport, or `None` when the TLS backend cannot be initialised.
    pub fn probe(user_agent: &str) -> Option<Self> {
        match Self::new(user_agent) {
            Ok(transport) => Some(transport),
            Err(e) => {
                warn!("Secure transport unavailable: {}", e);
                None
            }
        }
    }
}

impl TransportClient for ReqwestTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!("GET {}", request.url);

        let mut builder = self.client.get(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| TransportError::new(e.to_string()))?;
        let status = response.status().as_u16();
        debug!("GET {} -> {}", response.url(), status);

        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk.map(|bytes| bytes.to_vec()).map_err(|e| TransportError::new(e.to_string()))
            })
            .boxed();

        Ok(HttpResponse { status, body })
    }
}
