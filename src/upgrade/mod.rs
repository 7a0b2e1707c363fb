//! Update pipeline for the installed application.
//!
//! Given an [`UpdaterConfig`](crate::config::UpdaterConfig), the
//! [`UpdateOrchestrator`] finds out whether the release feed has something
//! newer than the recorded version and, if the user accepts, replaces the
//! installed artifact with it.
//!
//! # Update Process Flow
//!
//! ```text
//! 1. Version check
//!    ├── Read the version record (missing = 0.0.0)
//!    ├── Fetch the latest release
//!    └── Compare, pick the asset, ask the DecisionProvider
//!
//! 2. Download (under the install lock)
//!    ├── Remove a stale partial download
//!    ├── Stream the asset to <install_dir>/.<target>.part
//!    └── Verify against a published SHA-256, when there is one
//!
//! 3. Install
//!    ├── Copy the installed artifact to <backup_dir>/<target>.<YYYYMMDD_HHMMSS>
//!    ├── Remove the installed artifact
//!    ├── Rename the download into place
//!    └── Write the new version to the record
//! ```
//!
//! A failure at any step ends the run in [`UpdateState::Failed`] with the
//! error unchanged. The installed artifact is either fully replaced and
//! recorded, or left as it was.
//!
//! # Module Structure
//!
//! - [`orchestrator`]: the state machine tying the steps together
//! - [`state`]: states and the transition table
//! - [`decision`]: accept/decline providers
//! - [`downloader`]: streaming download with progress and cancellation
//! - [`verification`]: checksum verification against digest assets
//! - [`backup`]: timestamped backups and restore
//! - [`installer`]: the swap itself
//! - [`lock`]: inter-process lock on the install directory

pub mod backup;
pub mod decision;
pub mod downloader;
pub mod installer;
pub mod lock;
pub mod orchestrator;
pub mod state;
pub mod verification;

pub use backup::{BackupManager, BackupOutcome, BackupRecord};
pub use decision::{AutoAccept, Decision, DecisionProvider, ScriptedDecision, UpdateOffer};
pub use downloader::{CancellationFlag, DownloadSummary, Downloader};
pub use installer::{InstallOutcome, Installer};
pub use lock::InstallLock;
pub use orchestrator::{NoProgress, ProgressReporter, UpdateOrchestrator, UpdateReport};
pub use state::{StateKind, UpdateState};
pub use verification::ChecksumVerifier;
