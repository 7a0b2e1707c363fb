use regex::Regex;
use tracing::debug;

use crate::core::{Result, UpdateError};
use crate::release::{Asset, ReleaseDescriptor};

/// Picks the release asset to install by matching names against a pattern.
///
/// The first asset in feed order whose name matches wins; there is no
/// ranking between several matches.
#[derive(Debug, Clone)]
pub struct AssetSelector {
    pattern: Regex,
}

impl AssetSelector {
    /// Compile `pattern`. An invalid regex is a configuration error.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| UpdateError::Config {
            message: format!("invalid asset_pattern '{pattern}': {e}"),
        })?;
        Ok(Self { pattern })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// First matching asset of `release`, or [`UpdateError::AssetNotFound`].
    pub fn select<'a>(&self, release: &'a ReleaseDescriptor) -> Result<&'a Asset> {
        let asset = release
            .assets
            .iter()
            .find(|asset| self.pattern.is_match(&asset.name))
            .ok_or_else(|| UpdateError::AssetNotFound {
                tag: release.tag.clone(),
                pattern: self.pattern.as_str().to_string(),
            })?;

        debug!("Selected asset {} from release {}", asset.name, release.tag);
        Ok(asset)
    }
}
