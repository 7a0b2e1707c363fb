use futures::{StreamExt, stream};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::transport::{HttpRequest, HttpResponse, TransportClient, TransportError};

/// A canned answer for one URL.
#[derive(Debug, Clone)]
pub struct FakeResponse {
    status: u16,
    chunks: Vec<Vec<u8>>,
    fail_after: Option<usize>,
    unreachable: Option<String>,
}

impl FakeResponse {
    /// Status 200 with `body` as a single chunk.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            chunks: vec![body.into()],
            fail_after: None,
            unreachable: None,
        }
    }

    /// `status` with an empty body.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status,
            chunks: Vec::new(),
            fail_after: None,
            unreachable: None,
        }
    }

    /// The request fails before any response arrives.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            unreachable: Some(reason.into()),
            ..Self::status(0)
        }
    }

    /// Re-split the body into chunks of `size` bytes.
    #[must_use]
    pub fn chunked(mut self, size: usize) -> Self {
        let body: Vec<u8> = self.chunks.concat();
        self.chunks = body.chunks(size.max(1)).map(<[u8]>::to_vec).collect();
        self
    }

    /// Deliver `chunks` chunks, then break the stream with an error.
    #[must_use]
    pub fn fail_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }
}

/// In-memory [`TransportClient`]. Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct FakeTransport {
    responses: HashMap<String, FakeResponse>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_response(mut self, url: impl Into<String>, response: FakeResponse) -> Self {
        self.responses.insert(url.into(), response);
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }

    pub fn was_requested(&self, url: &str) -> bool {
        self.requests().iter().any(|r| r.url == url)
    }
}

impl TransportClient for FakeTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response =
            self.responses.get(&request.url).cloned().unwrap_or_else(|| FakeResponse::status(404));
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        if let Some(reason) = response.unreachable {
            return Err(TransportError::new(reason));
        }

        let mut items: Vec<Result<Vec<u8>, TransportError>> = match response.fail_after {
            Some(n) => response.chunks.into_iter().take(n).map(Ok).collect(),
            None => response.chunks.into_iter().map(Ok).collect(),
        };
        if response.fail_after.is_some() {
            items.push(Err(TransportError::new("connection reset by peer")));
        }

        Ok(HttpResponse {
            status: response.status,
            body: stream::iter(items).boxed(),
        })
    }
}
