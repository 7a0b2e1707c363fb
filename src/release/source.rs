use std::sync::Arc;
use tracing::{debug, info};

use crate::config::validate_repository;
use crate::core::{Result, UpdateError};
use crate::release::ReleaseDescriptor;
use crate::transport::{HttpRequest, TransportClient};

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Fetches the latest release descriptor of a repository.
///
/// Exactly one request is made per call and nothing is retried. A `None`
/// transport turns every call into [`UpdateError::TransportUnavailable`].
#[derive(Debug)]
pub struct ReleaseSource<T> {
    transport: Option<Arc<T>>,
    api_base_url: String,
    user_agent: String,
    token: Option<String>,
}

impl<T: TransportClient> ReleaseSource<T> {
    pub fn new(
        transport: Option<Arc<T>>,
        api_base_url: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            api_base_url: api_base_url.into(),
            user_agent: user_agent.into(),
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// `<api base>/repos/<owner>/<repo>/releases/latest`
    #[must_use]
    pub fn latest_release_url(&self, repository: &str) -> String {
        format!("{}/repos/{}/releases/latest", self.api_base_url.trim_end_matches('/'), repository)
    }

    /// Headers sent with every feed request.
    pub(crate) fn request(&self, url: impl Into<String>) -> HttpRequest {
        let request = HttpRequest::get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION);

        match &self.token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    /// Fetch and decode the latest release of `repository` (`owner/repo`).
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Config`] for a malformed repository id (no request is made)
    /// - [`UpdateError::TransportUnavailable`] without a transport
    /// - [`UpdateError::Transport`] when no response arrives
    /// - [`UpdateError::NetworkError`] for any final status other than 200
    /// - [`UpdateError::ParseError`] when the body is not a release descriptor
    pub async fn fetch_latest(&self, repository: &str) -> Result<ReleaseDescriptor> {
        validate_repository(repository)?;
        let transport = self.transport.as_ref().ok_or(UpdateError::TransportUnavailable)?;

        let url = self.latest_release_url(repository);
        info!("Fetching latest release of {}", repository);

        let transport_error = |e: crate::transport::TransportError| UpdateError::Transport {
            url: url.clone(),
            reason: e.to_string(),
        };

        let response = transport.get(self.request(&url)).await.map_err(transport_error)?;
        if response.status != 200 {
            debug!("Release feed answered {} for {}", response.status, url);
            return Err(UpdateError::NetworkError {
                status: response.status,
            });
        }

        let body = response.bytes().await.map_err(transport_error)?;
        let release: ReleaseDescriptor =
            serde_json::from_slice(&body).map_err(|e| UpdateError::ParseError {
                reason: e.to_string(),
            })?;

        debug!("Latest release is {} with {} asset(s)", release.tag, release.assets.len());
        Ok(release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeResponse, FakeTransport, release_json};

    const API: &str = "https://api.test";
    const LATEST: &str = "https://api.test/repos/acme/widget/releases/latest";

    fn source(transport: FakeTransport) -> (Arc<FakeTransport>, ReleaseSource<FakeTransport>) {
        let transport = Arc::new(transport);
        let source = ReleaseSource::new(Some(transport.clone()), API, "Widget-Updater/0.3.2");
        (transport, source)
    }

    #[tokio::test]
    async fn test_fetch_latest_decodes_release() {
        let (transport, source) = source(FakeTransport::new().with_response(
            LATEST,
            FakeResponse::ok(release_json("v1.2.0", &[("widget.exe", "https://dl.test/widget.exe")])),
        ));

        let release = source.fetch_latest("acme/widget").await.unwrap();
        assert_eq!(release.tag, "v1.2.0");
        assert_eq!(release.assets[0].name, "widget.exe");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, LATEST);
        assert_eq!(requests[0].header_value("user-agent"), Some("Widget-Updater/0.3.2"));
        assert_eq!(requests[0].header_value("Accept"), Some(ACCEPT));
        assert_eq!(requests[0].header_value("Authorization"), None);
    }

    #[tokio::test]
    async fn test_token_sent_as_bearer() {
        let (transport, source) = source(
            FakeTransport::new()
                .with_response(LATEST, FakeResponse::ok(release_json("v1.0.0", &[]))),
        );
        let source = source.with_token(Some("s3cret".to_string()));

        source.fetch_latest("acme/widget").await.unwrap();
        assert_eq!(transport.requests()[0].header_value("Authorization"), Some("Bearer s3cret"));
    }

    #[tokio::test]
    async fn test_non_200_is_network_error() {
        for status in [403, 404, 500] {
            let (_, source) = source(
                FakeTransport::new().with_response(LATEST, FakeResponse::status(status)),
            );
            assert_eq!(
                source.fetch_latest("acme/widget").await.unwrap_err(),
                UpdateError::NetworkError { status }
            );
        }
    }

    #[tokio::test]
    async fn test_bad_json_is_parse_error() {
        let (_, source) =
            source(FakeTransport::new().with_response(LATEST, FakeResponse::ok("<html>")));
        assert!(matches!(
            source.fetch_latest("acme/widget").await,
            Err(UpdateError::ParseError { .. })
        ));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let (_, source) = source(
            FakeTransport::new().with_response(LATEST, FakeResponse::unreachable("connection refused")),
        );
        match source.fetch_latest("acme/widget").await {
            Err(UpdateError::Transport { url, reason }) => {
                assert_eq!(url, LATEST);
                assert!(reason.contains("connection refused"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_transport() {
        let source: ReleaseSource<FakeTransport> = ReleaseSource::new(None, API, "ua");
        assert_eq!(
            source.fetch_latest("acme/widget").await.unwrap_err(),
            UpdateError::TransportUnavailable
        );
    }

    #[tokio::test]
    async fn test_bad_repository_makes_no_request() {
        let (transport, source) = source(FakeTransport::new());
        assert!(matches!(
            source.fetch_latest("not-a-repo").await,
            Err(UpdateError::Config { .. })
        ));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_latest_release_url_trims_slash() {
        let source: ReleaseSource<FakeTransport> =
            ReleaseSource::new(None, "https://ghe.example/api/v3/", "ua");
        assert_eq!(
            source.latest_release_url("acme/widget"),
            "https://ghe.example/api/v3/repos/acme/widget/releases/latest"
        );
    }
}
