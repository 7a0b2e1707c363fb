use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::{Result, UpdateError};
use crate::release::{Asset, ReleaseDescriptor};
use crate::transport::{HttpRequest, TransportClient};
use crate::upgrade::downloader::DownloadSummary;

/// Names of release-wide digest files, checked after `<asset>.sha256`.
const DIGEST_LISTS: &[&str] = &["SHA256SUMS", "SHA256SUMS.txt", "checksums.txt"];

/// Verifies a downloaded artifact against a digest published with the release.
///
/// A release may ship `<asset>.sha256` (a bare hash, or `hash  name`) or a
/// `SHA256SUMS` style list. When neither is present, or the digest cannot be
/// retrieved, verification is skipped with a warning. A digest that is found
/// and does not match is always an error.
#[derive(Debug)]
pub struct ChecksumVerifier<T> {
    transport: Option<Arc<T>>,
    user_agent: String,
}

impl<T: TransportClient> ChecksumVerifier<T> {
    pub fn new(transport: Option<Arc<T>>, user_agent: impl Into<String>) -> Self {
        Self {
            transport,
            user_agent: user_agent.into(),
        }
    }

    /// Check `summary` against the digest for `asset`, if the release has one.
    ///
    /// Returns `Ok(true)` when verified, `Ok(false)` when no digest was available.
    pub async fn verify(
        &self,
        release: &ReleaseDescriptor,
        asset: &Asset,
        summary: &DownloadSummary,
    ) -> Result<bool> {
        let Some(expected) = self.expected_digest(release, asset).await? else {
            warn!("No checksum published for {}, skipping verification", asset.name);
            return Ok(false);
        };

        if !digests_match(&expected, &summary.sha256) {
            return Err(UpdateError::ChecksumMismatch {
                asset: asset.name.clone(),
                expected,
                actual: summary.sha256.clone(),
            });
        }

        info!("Checksum verified for {}", asset.name);
        Ok(true)
    }

    async fn expected_digest(
        &self,
        release: &ReleaseDescriptor,
        asset: &Asset,
    ) -> Result<Option<String>> {
        let Some(digest_asset) = digest_asset_for(release, asset) else {
            return Ok(None);
        };
        let transport = self.transport.as_ref().ok_or(UpdateError::TransportUnavailable)?;

        debug!("Fetching checksum from {}", digest_asset.download_url);
        let request = HttpRequest::get(&digest_asset.download_url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/octet-stream");
        let response = match transport.get(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch checksum file {}: {}", digest_asset.name, e);
                return Ok(None);
            }
        };
        if response.status != 200 {
            warn!(
                "Failed to fetch checksum file {}: HTTP {}",
                digest_asset.name, response.status
            );
            return Ok(None);
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read checksum file {}: {}", digest_asset.name, e);
                return Ok(None);
            }
        };
        let content = String::from_utf8_lossy(&body);
        Ok(parse_digest(&content, &asset.name))
    }
}

/// The digest asset for `asset`: `<name>.sha256` first, then a release-wide list.
#[must_use]
pub fn digest_asset_for<'a>(release: &'a ReleaseDescriptor, asset: &Asset) -> Option<&'a Asset> {
    let own = format!("{}.sha256", asset.name);
    release
        .assets
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case(&own))
        .or_else(|| {
            release
                .assets
                .iter()
                .find(|a| DIGEST_LISTS.iter().any(|list| a.name.eq_ignore_ascii_case(list)))
        })
}

/// Expected hex digest for `asset_name` from a digest file.
///
/// Accepts `<hash>  <name>` and `<hash> *<name>` lines, and a file holding
/// nothing but a single hash.
#[must_use]
pub fn parse_digest(content: &str, asset_name: &str) -> Option<String> {
    let lines: Vec<&str> = content.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    for line in &lines {
        let mut parts = line.split_whitespace();
        let (Some(hash), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        let name = name.trim_start_matches('*');
        if (name == asset_name || name.ends_with(&format!("/{asset_name}"))) && is_sha256_hex(hash)
        {
            return Some(hash.to_lowercase());
        }
    }

    match lines.as_slice() {
        [only] if is_sha256_hex(only) => Some(only.to_lowercase()),
        _ => None,
    }
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn digests_match(expected: &str, actual: &str) -> bool {
    let expected = expected.strip_prefix("sha256:").unwrap_or(expected);
    expected.eq_ignore_ascii_case(actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeResponse, FakeTransport, sha256_hex};

    const HASH: &str = "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f";

    fn asset(name: &str) -> Asset {
        Asset {
            name: name.to_string(),
            size: 0,
            download_url: format!("https://dl.test/{name}"),
        }
    }

    fn release(names: &[&str]) -> ReleaseDescriptor {
        ReleaseDescriptor {
            tag: "v1.0.0".to_string(),
            name: None,
            body: None,
            published_at: None,
            assets: names.iter().map(|n| asset(n)).collect(),
        }
    }

    fn summary(data: &[u8]) -> DownloadSummary {
        DownloadSummary {
            bytes: data.len() as u64,
            sha256: sha256_hex(data),
        }
    }

    #[test]
    fn test_parse_digest_formats() {
        assert_eq!(parse_digest(&format!("{HASH}  app.exe\n"), "app.exe"), Some(HASH.to_string()));
        assert_eq!(parse_digest(&format!("{HASH} *app.exe"), "app.exe"), Some(HASH.to_string()));
        assert_eq!(parse_digest(&format!("{}\n", HASH.to_uppercase()), "app.exe"), Some(HASH.to_string()));
        assert_eq!(parse_digest(&format!("{HASH}  dist/app.exe"), "app.exe"), Some(HASH.to_string()));
    }

    #[test]
    fn test_parse_digest_does_not_match_prefix_names() {
        let content = format!("{HASH}  app.exe-debug\n");
        assert_eq!(parse_digest(&content, "app.exe"), None);
        assert_eq!(parse_digest("not-a-hash  app.exe", "app.exe"), None);
    }

    #[test]
    fn test_digest_asset_preference() {
        let app = asset("app.exe");
        let both = release(&["SHA256SUMS", "app.exe", "app.exe.sha256"]);
        assert_eq!(digest_asset_for(&both, &app).unwrap().name, "app.exe.sha256");

        let list_only = release(&["app.exe", "sha256sums"]);
        assert_eq!(digest_asset_for(&list_only, &app).unwrap().name, "sha256sums");

        assert!(digest_asset_for(&release(&["app.exe"]), &app).is_none());
    }

    #[test]
    fn test_digests_match_ignores_case_and_prefix() {
        assert!(digests_match(&format!("sha256:{}", HASH.to_uppercase()), HASH));
        assert!(!digests_match("00", HASH));
    }

    #[tokio::test]
    async fn test_verify_success() {
        let data = b"payload";
        let transport = FakeTransport::new().with_response(
            "https://dl.test/SHA256SUMS",
            FakeResponse::ok(format!("{}  app.exe\n", sha256_hex(data))),
        );
        let verifier = ChecksumVerifier::new(Some(Arc::new(transport)), "ua");
        let release = release(&["app.exe", "SHA256SUMS"]);

        assert!(verifier.verify(&release, &asset("app.exe"), &summary(data)).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_mismatch() {
        let transport = FakeTransport::new()
            .with_response("https://dl.test/app.exe.sha256", FakeResponse::ok(HASH));
        let verifier = ChecksumVerifier::new(Some(Arc::new(transport)), "ua");
        let release = release(&["app.exe", "app.exe.sha256"]);

        let err = verifier
            .verify(&release, &asset("app.exe"), &summary(b"something else"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::ChecksumMismatch { expected, .. } if expected == HASH));
    }

    #[tokio::test]
    async fn test_verify_skipped_without_digest() {
        let transport = Arc::new(FakeTransport::new());
        let verifier = ChecksumVerifier::new(Some(transport.clone()), "ua");

        let verified = verifier
            .verify(&release(&["app.exe"]), &asset("app.exe"), &summary(b"x"))
            .await
            .unwrap();
        assert!(!verified);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_verify_skipped_when_digest_unreachable() {
        let verifier = ChecksumVerifier::new(Some(Arc::new(FakeTransport::new())), "ua");
        let release = release(&["app.exe", "app.exe.sha256"]);

        let verified = verifier.verify(&release, &asset("app.exe"), &summary(b"x")).await.unwrap();
        assert!(!verified);
    }

    #[tokio::test]
    async fn test_verify_skipped_on_transport_failure() {
        let transport = FakeTransport::new().with_response(
            "https://dl.test/app.exe.sha256",
            FakeResponse::unreachable("connection reset"),
        );
        let verifier = ChecksumVerifier::new(Some(Arc::new(transport)), "ua");
        let release = release(&["app.exe", "app.exe.sha256"]);

        let verified = verifier.verify(&release, &asset("app.exe"), &summary(b"x")).await.unwrap();
        assert!(!verified);
    }

    #[tokio::test]
    async fn test_verify_skipped_when_digest_body_breaks() {
        let transport = FakeTransport::new().with_response(
            "https://dl.test/SHA256SUMS",
            FakeResponse::ok(format!("{HASH}  app.exe\n")).chunked(8).fail_after(1),
        );
        let verifier = ChecksumVerifier::new(Some(Arc::new(transport)), "ua");
        let release = release(&["app.exe", "SHA256SUMS"]);

        let verified = verifier.verify(&release, &asset("app.exe"), &summary(b"x")).await.unwrap();
        assert!(!verified);
    }
}
