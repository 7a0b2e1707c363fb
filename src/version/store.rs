//! The persisted version record.
//!
//! The record is a small text file next to the installed application:
//!
//! ```text
//! # MyApp version record
//! # Managed by the updater; edit with care.
//! version=1.4.0
//! ```
//!
//! Lines starting with `#` (and any other line that is not the version
//! assignment) are preserved verbatim when the version is rewritten.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::core::{Result, UpdateError};
use crate::utils::fs::atomic_write;
use crate::version::Version;

/// Reads and writes the `version=` record of the installed application.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
    app_name: String,
}

impl VersionStore {
    /// A store backed by the file at `path`. Nothing is touched until a method is called.
    pub fn new(path: impl Into<PathBuf>, app_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            app_name: app_name.into(),
        }
    }

    /// Location of the record.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the record with a template and an empty version if it is missing or empty.
    ///
    /// A record that already has content is left alone, even if it holds no
    /// version line.
    pub async fn ensure_initialized(&self) -> Result<()> {
        match fs::read_to_string(&self.path).await {
            Ok(content) if !content.trim().is_empty() => return Ok(()),
            Ok(_) => debug!("Version record {} is empty, writing template", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Version record {} not found, creating it", self.path.display());
            }
            Err(e) => return Err(UpdateError::version_file(&self.path, e)),
        }

        let template = format!(
            "# {} version record\n# Managed by the updater; edit with care.\nversion=\n",
            self.app_name
        );
        atomic_write(&self.path, template.as_bytes())
            .map_err(|e| UpdateError::version_file(&self.path, e))
    }

    /// The recorded version, or `None` when there is no record or no valid assignment.
    pub async fn read(&self) -> Result<Option<Version>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(parse_record(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(UpdateError::version_file(&self.path, e)),
        }
    }

    /// Record `version`, keeping every other line of the record as it was.
    pub async fn write(&self, version: &Version) -> Result<()> {
        let existing = match fs::read_to_string(&self.path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(UpdateError::version_file(&self.path, e)),
        };

        let content = match existing {
            Some(content) => render_record(&content, version),
            None => format!("# {} version record\nversion={}\n", self.app_name, version.normalized()),
        };

        atomic_write(&self.path, content.as_bytes())
            .map_err(|e| UpdateError::version_file(&self.path, e))?;
        info!("Recorded version {} in {}", version.normalized(), self.path.display());
        Ok(())
    }
}

/// The value of a `version = ...` line, if `line` is one. Comments never match.
fn assignment_value(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("version")?;
    let value = rest.trim_start().strip_prefix('=')?;
    Some(value.trim())
}

/// First line whose value is a dotted-numeric version.
fn parse_record(content: &str) -> Option<Version> {
    content
        .lines()
        .filter_map(assignment_value)
        .filter(|value| value.starts_with(|c: char| c.is_ascii_digit()))
        .find_map(|value| value.parse().ok())
}

/// Replace the first assignment line (valid or not) or append one.
fn render_record(content: &str, version: &Version) -> String {
    let assignment = format!("version={}", version.normalized());
    let mut out = String::with_capacity(content.len() + assignment.len() + 1);
    let mut replaced = false;

    for line in content.split_inclusive('\n') {
        let body = line.trim_end_matches(['\n', '\r']);
        if !replaced && assignment_value(body).is_some() {
            out.push_str(&assignment);
            out.push_str(&line[body.len()..]);
            replaced = true;
        } else {
            out.push_str(line);
        }
    }

    if !replaced {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&assignment);
        out.push('\n');
    }
    out
}
