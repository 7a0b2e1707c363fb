//! Release feed access and asset selection.
//!
//! [`ReleaseSource`] fetches the latest [`ReleaseDescriptor`] of a repository
//! from a GitHub-compatible API, and [`AssetSelector`] picks the one
//! [`Asset`] of that release that should be installed.

pub mod selector;
pub mod source;

pub use selector::AssetSelector;
pub use source::ReleaseSource;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The latest published release, as described by the feed.
///
/// Only the fields the updater uses are decoded; everything else in the
/// feed's JSON is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    /// Release tag, usually `v<major>.<minor>.<patch>`.
    #[serde(rename = "tag_name")]
    pub tag: String,
    /// Human-readable release title.
    #[serde(default)]
    pub name: Option<String>,
    /// Release notes (markdown).
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Downloadable files, in feed order.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    /// Size in bytes as reported by the feed.
    #[serde(default)]
    pub size: u64,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}
