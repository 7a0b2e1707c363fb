//! Release versions and the persisted version record.
//!
//! A [`Version`] is a `major.minor.patch` triple compared component by
//! component. Missing components default to zero, so `1.2` and `1.2.0` are the
//! same version, and a leading `v` (as found in release tags) is accepted.
//! The string the version was parsed from is kept for display.
//!
//! # Examples
//!
//! ```rust
//! use appup_cli::version::Version;
//!
//! let current: Version = "1.2".parse().unwrap();
//! let latest = Version::from_tag("v1.2.0").unwrap();
//! assert_eq!(current, latest);
//! assert_eq!(latest.to_string(), "v1.2.0");
//! assert_eq!(latest.normalized(), "1.2.0");
//! ```

pub mod store;

pub use store::VersionStore;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// A version string that is not `[v]major[.minor[.patch]]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid version '{input}': expected [v]<major>[.<minor>[.<patch>]]")]
pub struct InvalidVersion {
    /// The rejected input.
    pub input: String,
}

/// A release version ordered by `(major, minor, patch)`.
///
/// Equality and ordering ignore the original formatting: `v1.2`, `1.2.0` and
/// ` 1.2.0 ` are all equal.
#[derive(Debug, Clone)]
pub struct Version {
    /// Major version number.
    pub major: u64,
    /// Minor version number.
    pub minor: u64,
    /// Patch version number.
    pub patch: u64,
    original: String,
}

impl Version {
    /// Create a version from its components.
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            original: format!("{major}.{minor}.{patch}"),
        }
    }

    /// Parse a release tag such as `v1.4.0`. Same as [`str::parse`].
    pub fn from_tag(tag: &str) -> Result<Self, InvalidVersion> {
        tag.parse()
    }

    /// The string this version was parsed from, trimmed.
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// `major.minor.patch` with no prefix; the form stored in the version record.
    #[must_use]
    pub fn normalized(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new(0, 0, 0)
    }
}

impl FromStr for Version {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || InvalidVersion {
            input: s.to_string(),
        };

        let digits = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(invalid());
        }

        let mut components = [0u64; 3];
        for (i, part) in digits.split('.').enumerate() {
            if i >= components.len()
                || part.is_empty()
                || !part.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(invalid());
            }
            components[i] = part.parse().map_err(|_| invalid())?;
        }

        Ok(Self {
            major: components[0],
            minor: components[1],
            patch: components[2],
            original: trimmed.to_string(),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple()
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.triple().hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple().cmp(&other.triple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_missing_components_default_to_zero() {
        assert_eq!(v("1.2").triple(), (1, 2, 0));
        assert_eq!(v("3").triple(), (3, 0, 0));
        assert_eq!(v("1.2").cmp(&v("1.2.0")), Ordering::Equal);
    }

    #[test]
    fn test_ordering() {
        assert_eq!(v("2.0.0").cmp(&v("1.9.9")), Ordering::Greater);
        assert_eq!(v("1.0.0").cmp(&v("1.2.0")), Ordering::Less);
        assert_eq!(v("1.10.0").cmp(&v("1.9.0")), Ordering::Greater);
        assert_eq!(v("0.0.1").cmp(&v("0.0.0")), Ordering::Greater);
    }

    #[test]
    fn test_compare_with_itself_is_equal() {
        for s in ["0", "1.2", "1.2.3", "v10.0.7", " 4.5.6 "] {
            let version = v(s);
            assert_eq!(version.cmp(&version), Ordering::Equal);
            assert_eq!(version, version.clone());
        }
    }

    #[test]
    fn test_equality_is_structural() {
        assert_eq!(v("v1.2.0"), v("1.2"));
        assert_eq!(v(" 1.2.0\t"), v("V1.2.0"));
        assert_ne!(v("1.2.1"), v("1.2"));
    }

    #[test]
    fn test_display_keeps_original() {
        assert_eq!(v("v1.2").to_string(), "v1.2");
        assert_eq!(v("v1.2").normalized(), "1.2.0");
        assert_eq!(Version::new(3, 1, 4).to_string(), "3.1.4");
    }

    #[test]
    fn test_from_tag_strips_prefix() {
        let version = Version::from_tag("v1.9.9").unwrap();
        assert_eq!(version, Version::new(1, 9, 9));
        assert_eq!(version.original(), "v1.9.9");
    }

    #[test]
    fn test_invalid_versions() {
        for s in ["", "v", "1..2", "1.2.3.4", "1.2.x", "abc", "1.2.3-beta", "-1.0"] {
            assert!(s.parse::<Version>().is_err(), "{s:?} should be rejected");
        }
    }

    #[test]
    fn test_invalid_version_message() {
        let err = "nope".parse::<Version>().unwrap_err();
        assert!(err.to_string().contains("'nope'"));
    }
}
