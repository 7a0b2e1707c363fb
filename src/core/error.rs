//! Error handling for appup
//!
//! The error system follows two rules:
//! 1. **Strongly-typed errors** ([`UpdateError`]) flow through every stage of the
//!    update pipeline, so the orchestrator can decide what to do with each one.
//! 2. **User-friendly messages** ([`ErrorContext`]) are produced only at the CLI
//!    boundary, with a suggestion the user can act on.
//!
//! # Error Categories
//!
//! - **Feed access**: [`UpdateError::TransportUnavailable`], [`UpdateError::NetworkError`],
//!   [`UpdateError::Transport`], [`UpdateError::ParseError`]
//! - **Release content**: [`UpdateError::AssetNotFound`], [`UpdateError::ChecksumMismatch`]
//! - **Local state**: [`UpdateError::DownloadError`], [`UpdateError::BackupError`],
//!   [`UpdateError::FilesystemError`], [`UpdateError::VersionFileError`]
//! - **Control**: [`UpdateError::Cancelled`], [`UpdateError::Config`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use appup_cli::core::{UpdateError, user_friendly_error};
//!
//! let err = anyhow::Error::from(UpdateError::TransportUnavailable);
//! let ctx = user_friendly_error(err);
//! ctx.display(); // colored error with a suggestion
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The step of the pipeline a [`UpdateError::FilesystemError`] happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    /// Creating directories or clearing leftovers before the download.
    Prepare,
    /// Taking the install directory lock.
    Lock,
    /// Opening the temporary download destination.
    OpenDestination,
    /// Writing downloaded bytes to disk.
    WriteDownload,
    /// Removing the currently installed artifact.
    RemoveExisting,
    /// Moving the downloaded artifact to the target path.
    MoveIntoPlace,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Prepare => "preparing the install directory",
            Self::Lock => "locking the install directory",
            Self::OpenDestination => "opening the download destination",
            Self::WriteDownload => "writing the download",
            Self::RemoveExisting => "removing the installed artifact",
            Self::MoveIntoPlace => "moving the new artifact into place",
        };
        f.write_str(stage)
    }
}

/// Every way the update pipeline can fail.
///
/// The variants carry owned strings rather than source errors so that a failure
/// can be stored in the terminal `Failed` state and handed back to the caller
/// verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    /// No transport implementation is bound, so the feed cannot be reached at all.
    #[error("No secure transport is available to reach the release feed")]
    TransportUnavailable,

    /// The release feed answered with a non-200 status.
    #[error("Release feed request failed with HTTP status {status}")]
    NetworkError {
        /// HTTP status code returned by the feed.
        status: u16,
    },

    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("Request to {url} failed: {reason}")]
    Transport {
        /// URL that was requested.
        url: String,
        /// Transport error message.
        reason: String,
    },

    /// The feed returned 200 but the body is not a release descriptor.
    #[error("Failed to parse release descriptor: {reason}")]
    ParseError {
        /// Decoder error message.
        reason: String,
    },

    /// No asset in the release matches the configured pattern.
    #[error("No asset in release '{tag}' matches pattern '{pattern}'")]
    AssetNotFound {
        /// Release tag that was searched.
        tag: String,
        /// Pattern used for matching.
        pattern: String,
    },

    /// The asset download ended with a status other than 200.
    #[error("Download failed with HTTP status {status}")]
    DownloadError {
        /// Final HTTP status code of the download.
        status: u16,
    },

    /// The installed artifact could not be copied to the backup directory.
    #[error("Failed to back up {path}: {reason}")]
    BackupError {
        /// File that was being backed up.
        path: String,
        /// Underlying I/O error message.
        reason: String,
    },

    /// A filesystem operation on the download or install path failed.
    #[error("File system error while {stage} ({path}): {reason}")]
    FilesystemError {
        /// Step that failed.
        stage: InstallStage,
        /// Path involved in the failed operation.
        path: String,
        /// Underlying I/O error message.
        reason: String,
    },

    /// The version record could not be created or rewritten.
    #[error("Cannot update version record {path}: {reason}")]
    VersionFileError {
        /// Path of the version record.
        path: String,
        /// Underlying I/O error message.
        reason: String,
    },

    /// The downloaded bytes do not match the digest published with the release.
    #[error("Checksum mismatch for {asset}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Asset name.
        asset: String,
        /// Digest published with the release.
        expected: String,
        /// Digest of the downloaded file.
        actual: String,
    },

    /// The user interrupted the download.
    #[error("Update cancelled")]
    Cancelled,

    /// The configuration is unusable (bad repository id, invalid pattern...).
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong with the configuration.
        message: String,
    },
}

impl UpdateError {
    pub(crate) fn filesystem(
        stage: InstallStage,
        path: &std::path::Path,
        err: impl fmt::Display,
    ) -> Self {
        Self::FilesystemError {
            stage,
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn version_file(path: &std::path::Path, err: impl fmt::Display) -> Self {
        Self::VersionFileError {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, UpdateError>;

/// An [`UpdateError`] (or any other failure) dressed up for the terminal.
#[derive(Debug)]
pub struct ErrorContext {
    /// One-line description of what went wrong.
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with a suggestion where one is known.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(update_error) = error.downcast_ref::<UpdateError>() {
        return create_error_context(update_error);
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(error.to_string())
            .with_suggestion("Check that you can write to the install directory, or run with elevated permissions");
    }

    if error.downcast_ref::<toml::de::Error>().is_some() {
        return ErrorContext::new(error.to_string())
            .with_suggestion("Check the TOML syntax of your appup configuration file");
    }

    // Generic error - include the full error chain
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(message)
}

fn create_error_context(error: &UpdateError) -> ErrorContext {
    let ctx = ErrorContext::new(error.to_string());
    match error {
        UpdateError::TransportUnavailable => ctx
            .with_suggestion("Install TLS support for this system (OpenSSL or the platform certificate store) and try again")
            .with_details("Retrying will not help: no HTTPS client could be created"),

        UpdateError::NetworkError { status: 403 | 429 } => ctx
            .with_suggestion("The release API rate limit was probably hit. Wait a while or set `token` in the configuration")
            .with_details("Unauthenticated GitHub API access is limited to 60 requests per hour"),

        UpdateError::NetworkError { status: 404 } => ctx
            .with_suggestion("Check the `repository` setting; the repository may be private or have no published release"),

        UpdateError::NetworkError { .. } | UpdateError::Transport { .. } => ctx
            .with_suggestion("Check your internet connection and try again"),

        UpdateError::ParseError { .. } => ctx
            .with_details("The release feed answered, but not with a release descriptor")
            .with_suggestion("Check `api_base_url` in the configuration"),

        UpdateError::AssetNotFound { .. } => ctx
            .with_suggestion("Adjust `asset_pattern` in the configuration to match the artifact name of your platform"),

        UpdateError::DownloadError { .. } => ctx
            .with_details("The partial download has been removed; the installed version is unchanged")
            .with_suggestion("Try again later"),

        UpdateError::BackupError { .. } => ctx
            .with_details("The installed version was left untouched")
            .with_suggestion("Check free space and permissions of `backup_dir`, or set `backup_policy = \"proceed\"`"),

        UpdateError::FilesystemError { stage: InstallStage::RemoveExisting, .. } => ctx
            .with_details("The previously installed artifact is still in place")
            .with_suggestion("Close the application before updating; the file may be in use"),

        UpdateError::FilesystemError { .. } => ctx
            .with_suggestion("Check permissions and free space in the install directory"),

        UpdateError::VersionFileError { .. } => ctx
            .with_suggestion("Check that the version record is writable"),

        UpdateError::ChecksumMismatch { .. } => ctx
            .with_details("The downloaded file was discarded; nothing was installed")
            .with_suggestion("Retry the update; report the release if the mismatch persists"),

        UpdateError::Cancelled => ctx.with_details("Nothing was installed"),

        UpdateError::Config { .. } => ctx
            .with_suggestion("Fix the appup configuration file or the command-line overrides"),
    }
}
