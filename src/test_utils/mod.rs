//! Test utilities for appup
//!
//! The update pipeline only reaches the network through
//! [`TransportClient`](crate::transport::TransportClient), so tests run it
//! against [`FakeTransport`]: a table of canned responses keyed by URL that
//! also records every request it receives.
//!
//! # Example
//!
//! ```rust,no_run
//! use appup_cli::test_utils::{FakeResponse, FakeTransport, release_json};
//!
//! let transport = FakeTransport::new()
//!     .with_response(
//!         "https://api.test/repos/acme/widget/releases/latest",
//!         FakeResponse::ok(release_json("v1.2.0", &[("widget.exe", "https://dl.test/widget.exe")])),
//!     )
//!     .with_response("https://dl.test/widget.exe", FakeResponse::ok(vec![0u8; 4096]).chunked(1024));
//! ```

mod transport;

pub use transport::{FakeResponse, FakeTransport};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. `level` wins over `RUST_LOG`; with
/// neither, tests stay silent.
///
/// ```bash
/// RUST_LOG=appup_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// JSON body of a release feed response with the given tag and `(name, url)` assets.
#[must_use]
pub fn release_json(tag: &str, assets: &[(&str, &str)]) -> String {
    let assets: Vec<serde_json::Value> = assets
        .iter()
        .map(|(name, url)| {
            serde_json::json!({
                "name": name,
                "size": 0,
                "content_type": "application/octet-stream",
                "browser_download_url": url,
            })
        })
        .collect();

    serde_json::json!({
        "tag_name": tag,
        "name": format!("Release {tag}"),
        "draft": false,
        "prerelease": false,
        "published_at": "2026-01-15T09:30:00Z",
        "body": "Release notes",
        "assets": assets,
    })
    .to_string()
}

/// Hex SHA-256 of `data`, for building digest assets.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(data))
}
