//! The update pipeline as one state machine.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::UpdaterConfig;
use crate::core::{InstallStage, Result, UpdateError};
use crate::release::{Asset, AssetSelector, ReleaseDescriptor, ReleaseSource};
use crate::transport::TransportClient;
use crate::upgrade::decision::{Decision, DecisionProvider, UpdateOffer};
use crate::upgrade::downloader::{CancellationFlag, DownloadSummary, Downloader};
use crate::upgrade::installer::{InstallOutcome, Installer};
use crate::upgrade::lock::InstallLock;
use crate::upgrade::state::{StateKind, UpdateState};
use crate::upgrade::verification::ChecksumVerifier;
use crate::utils::fs::ensure_dir;
use crate::version::{Version, VersionStore};

/// Receives download progress. Calls happen in-band with the download, so
/// implementations must be cheap.
pub trait ProgressReporter: Send {
    /// The download is starting; `total` is the expected size when known.
    fn started(&mut self, total: Option<u64>);
    /// `downloaded` bytes have been written so far.
    fn advanced(&mut self, downloaded: u64);
    /// The download ended, successfully or not.
    fn finished(&mut self);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn started(&mut self, _total: Option<u64>) {}
    fn advanced(&mut self, _downloaded: u64) {}
    fn finished(&mut self) {}
}

/// How a run ended and what it went through on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Final state of the run.
    pub state: UpdateState,
    /// Every state entered, starting with `Idle`.
    pub history: Vec<StateKind>,
    /// Installed version before the run (`0.0.0` when none was recorded).
    pub current: Option<Version>,
    pub latest: Option<Version>,
    /// Tag of the latest release.
    pub release_tag: Option<String>,
    pub offer: Option<UpdateOffer>,
    pub download: Option<DownloadSummary>,
    pub checksum_verified: bool,
    pub install: Option<InstallOutcome>,
}

impl UpdateReport {
    fn new() -> Self {
        Self {
            state: UpdateState::Idle,
            history: vec![StateKind::Idle],
            current: None,
            latest: None,
            release_tag: None,
            offer: None,
            download: None,
            checksum_verified: false,
            install: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }

    #[must_use]
    pub fn error(&self) -> Option<&UpdateError> {
        self.state.error()
    }

    fn advance(&mut self, next: UpdateState) {
        let from = self.state.kind();
        let to = next.kind();
        debug_assert!(from.can_transition_to(to), "illegal update transition {from} -> {to}");
        debug!("Update state: {} -> {}", from, to);
        self.history.push(to);
        self.state = next;
    }

    fn fail(mut self, error: UpdateError) -> Self {
        warn!("Update failed: {}", error);
        self.advance(UpdateState::Failed(error));
        self
    }
}

/// What the read-only prefix of a run found.
enum Comparison {
    /// A terminal state was reached (`UpToDate` or `AssetNotFound`).
    Settled,
    Offer {
        release: ReleaseDescriptor,
        asset: Asset,
        latest: Version,
    },
}

/// Sequences version check, release fetch, comparison, decision, download,
/// backup and install.
///
/// Nothing is retried and no failure is swallowed: every error ends the run in
/// [`UpdateState::Failed`] with the error as produced, except a backup failure,
/// which the configured [`BackupPolicy`](crate::config::BackupPolicy) decides on.
pub struct UpdateOrchestrator<T> {
    config: UpdaterConfig,
    version_store: VersionStore,
    source: ReleaseSource<T>,
    selector: AssetSelector,
    downloader: Downloader<T>,
    verifier: ChecksumVerifier<T>,
    installer: Installer,
}

impl<T: TransportClient> UpdateOrchestrator<T> {
    /// Build the pipeline for a resolved configuration.
    ///
    /// `transport` is `None` when no secure transport could be created; the
    /// orchestrator is still usable and every run fails with
    /// [`UpdateError::TransportUnavailable`].
    pub fn new(config: UpdaterConfig, transport: Option<Arc<T>>) -> Result<Self> {
        config.validate()?;

        let user_agent = config.user_agent();
        let source = ReleaseSource::new(transport.clone(), &config.api_base_url, &user_agent)
            .with_token(config.token.clone());
        let selector = AssetSelector::new(&config.asset_pattern)?;
        let downloader = Downloader::new(transport.clone(), &user_agent);
        let verifier = ChecksumVerifier::new(transport, &user_agent);
        let version_store = VersionStore::new(&config.version_file, &config.app_name);
        let installer = Installer::from_config(&config);

        Ok(Self {
            config,
            version_store,
            source,
            selector,
            downloader,
            verifier,
            installer,
        })
    }

    #[must_use]
    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    #[must_use]
    pub fn version_store(&self) -> &VersionStore {
        &self.version_store
    }

    /// Run the read-only part of the pipeline.
    ///
    /// Stops in `UpToDate`, `AssetNotFound`, `AwaitingDecision` (with the
    /// offer filled in) or `Failed`. Nothing is written, not even the version
    /// record template.
    pub async fn check(&self) -> UpdateReport {
        let mut report = UpdateReport::new();
        match self.compare(&mut report).await {
            Ok(_) => report,
            Err(e) => report.fail(e),
        }
    }

    /// Run the whole pipeline.
    pub async fn run<D: DecisionProvider>(
        &self,
        decider: &mut D,
        progress: &mut dyn ProgressReporter,
        cancel: &CancellationFlag,
    ) -> UpdateReport {
        let mut report = UpdateReport::new();

        if let Err(e) = self.version_store.ensure_initialized().await {
            report.advance(UpdateState::CheckingVersion);
            return report.fail(e);
        }

        let (release, asset, latest) = match self.compare(&mut report).await {
            Ok(Comparison::Offer {
                release,
                asset,
                latest,
            }) => (release, asset, latest),
            Ok(Comparison::Settled) => return report,
            Err(e) => return report.fail(e),
        };

        let Some(offer) = report.offer.clone() else {
            return report;
        };
        match decider.decide(&offer).await {
            Decision::Decline => {
                info!("Update to {} declined", latest);
                report.advance(UpdateState::Declined);
                return report;
            }
            Decision::Accept => info!("Update to {} accepted", latest),
        }

        report.advance(UpdateState::Downloading);
        let _lock = match InstallLock::acquire(&self.config.lock_path()).await {
            Ok(lock) => lock,
            Err(e) => return report.fail(e),
        };

        let partial = self.config.partial_download_path();
        match self.fetch_artifact(&release, &asset, progress, cancel).await {
            Ok((summary, verified)) => {
                report.download = Some(summary);
                report.checksum_verified = verified;
            }
            Err(e) => return report.fail(e),
        }

        report.advance(UpdateState::Installing);
        match self.installer.install(&partial, &latest).await {
            Ok(outcome) => {
                report.install = Some(outcome);
                report.advance(UpdateState::Completed);
                info!("Update to {} completed", latest);
                report
            }
            Err(e) => report.fail(e),
        }
    }

    /// `CheckingVersion -> FetchingRelease -> ComparingVersions -> ...`
    async fn compare(&self, report: &mut UpdateReport) -> Result<Comparison> {
        report.advance(UpdateState::CheckingVersion);
        let current = match self.version_store.read().await? {
            Some(version) => version,
            None => {
                debug!("No installed version recorded, assuming 0.0.0");
                Version::default()
            }
        };
        report.current = Some(current.clone());

        report.advance(UpdateState::FetchingRelease);
        let release = self.source.fetch_latest(&self.config.repository).await?;
        report.release_tag = Some(release.tag.clone());

        report.advance(UpdateState::ComparingVersions);
        let latest = Version::from_tag(&release.tag).map_err(|e| UpdateError::ParseError {
            reason: e.to_string(),
        })?;
        report.latest = Some(latest.clone());

        if latest <= current {
            info!("Installed version {} is up to date (latest {})", current, latest);
            report.advance(UpdateState::UpToDate);
            return Ok(Comparison::Settled);
        }

        let asset = match self.selector.select(&release) {
            Ok(asset) => asset.clone(),
            Err(UpdateError::AssetNotFound { tag, pattern }) => {
                warn!("Release {} has no asset matching '{}'", tag, pattern);
                report.advance(UpdateState::AssetNotFound);
                return Ok(Comparison::Settled);
            }
            Err(e) => return Err(e),
        };

        info!("Update available: {} -> {}", current, latest);
        report.offer = Some(UpdateOffer {
            current,
            latest: latest.clone(),
            release_name: release.name.clone(),
            published_at: release.published_at,
            changelog: release.body.clone(),
            asset_name: asset.name.clone(),
            asset_size: asset.size,
        });
        report.advance(UpdateState::AwaitingDecision);

        Ok(Comparison::Offer {
            release,
            asset,
            latest,
        })
    }

    /// Download into the partial path and verify. The partial file is gone
    /// again when this fails.
    async fn fetch_artifact(
        &self,
        release: &ReleaseDescriptor,
        asset: &Asset,
        progress: &mut dyn ProgressReporter,
        cancel: &CancellationFlag,
    ) -> Result<(DownloadSummary, bool)> {
        let partial = self.config.partial_download_path();
        self.prepare(&partial).await?;

        progress.started((asset.size > 0).then_some(asset.size));
        let result = self
            .downloader
            .download(&asset.download_url, &partial, &mut |n| progress.advanced(n), cancel)
            .await;
        progress.finished();
        let summary = result?;

        if !self.config.verify_checksum {
            return Ok((summary, false));
        }
        match self.verifier.verify(release, asset, &summary).await {
            Ok(verified) => Ok((summary, verified)),
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&partial).await {
                    warn!("Failed to remove {}: {}", partial.display(), remove_err);
                }
                Err(e)
            }
        }
    }

    /// Make sure the install directory exists and no stale partial download is in the way.
    async fn prepare(&self, partial: &std::path::Path) -> Result<()> {
        ensure_dir(&self.config.install_dir).map_err(|e| {
            UpdateError::filesystem(InstallStage::Prepare, &self.config.install_dir, e)
        })?;

        match tokio::fs::remove_file(partial).await {
            Ok(()) => info!("Removed stale partial download {}", partial.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(UpdateError::filesystem(InstallStage::Prepare, partial, e)),
        }
        Ok(())
    }
}
