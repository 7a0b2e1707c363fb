//! appup - self-update client for an installed desktop application
//!
//! appup asks a GitHub-style release feed whether a newer release of an
//! application exists. If one does, and the user agrees, it downloads the
//! matching release artifact, keeps a timestamped copy of the installed one and
//! swaps the new artifact into place.
//!
//! # Architecture Overview
//!
//! The library is a pipeline of small components driven by one state machine:
//!
//! ```text
//! VersionStore.read -> ReleaseSource.fetch_latest -> AssetSelector.select
//!   -> DecisionProvider.decide -> InstallLock -> Downloader.download
//!   -> ChecksumVerifier -> BackupManager.backup -> Installer.install
//!   -> VersionStore.write
//! ```
//!
//! Every step returns a typed [`core::UpdateError`]; the
//! [`upgrade::UpdateOrchestrator`] stops at the first one and reports it in the
//! final [`upgrade::UpdateState::Failed`] state.
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line interface (`check`, `status`, `version`, `menu`)
//! - [`config`] - [`config::UpdaterConfig`], loaded once from TOML and flags
//! - [`core`] - Error types and user-facing error formatting
//! - [`release`] - Release feed access and asset selection
//! - [`transport`] - The HTTP capability and its reqwest implementation
//! - [`upgrade`] - Download, backup, install and the orchestrator
//! - [`utils`] - Filesystem helpers and progress display
//! - [`version`] - Version parsing, comparison and the persisted version record
//!
//! # Configuration
//!
//! ```toml
//! repository = "acme/widget-studio"
//! app_name = "WidgetStudio"
//! install_dir = "~/Applications/WidgetStudio"
//! target_name = "widget-studio.exe"
//! ```
//!
//! # Library Use
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use appup_cli::config::UpdaterConfig;
//! use appup_cli::transport::ReqwestTransport;
//! use appup_cli::upgrade::{AutoAccept, CancellationFlag, NoProgress, UpdateOrchestrator};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = UpdaterConfig::load(None).await?.resolve()?;
//! let transport = ReqwestTransport::probe(&config.user_agent()).map(Arc::new);
//! let orchestrator = UpdateOrchestrator::new(config, transport)?;
//!
//! let report = orchestrator.run(&mut AutoAccept, &mut NoProgress, &CancellationFlag::new()).await;
//! println!("finished in state {}", report.state);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod release;
pub mod transport;
pub mod upgrade;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
