//! Full update runs against a scripted release feed.

use appup_cli::config::{BackupPolicy, UpdaterConfig};
use appup_cli::core::UpdateError;
use appup_cli::test_utils::{FakeResponse, FakeTransport, init_test_logging, release_json, sha256_hex};
use appup_cli::upgrade::{
    AutoAccept, BackupOutcome, CancellationFlag, Decision, NoProgress, ScriptedDecision, StateKind,
    UpdateOrchestrator, UpdateState,
};
use appup_cli::version::Version;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const LATEST: &str = "https://api.test/repos/acme/widget/releases/latest";
const ASSET_URL: &str = "https://dl.test/v1.2.0/widget-win64.exe";
const DIGEST_URL: &str = "https://dl.test/v1.2.0/widget-win64.exe.sha256";

/// An install directory with a record at `installed` and an old artifact.
fn install_dir(installed: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("version.txt"),
        format!("# Widget version record\nversion={installed}\n"),
    )
    .unwrap();
    fs::write(dir.path().join("widget.exe"), b"widget 1.0").unwrap();
    dir
}

/// Loads the configuration the way the CLI does: from a TOML file, then resolved.
async fn load_config(dir: &TempDir, extra: &str) -> UpdaterConfig {
    let path = dir.path().join("appup.toml");
    fs::write(
        &path,
        format!(
            r#"
repository = "acme/widget"
api_base_url = "https://api.test"
app_name = "Widget"
install_dir = "{}"
target_name = "widget.exe"
{extra}
"#,
            dir.path().display().to_string().replace('\\', "/")
        ),
    )
    .unwrap();

    UpdaterConfig::load(Some(&path)).await.unwrap().resolve().unwrap()
}

fn feed(tag: &str, payload: &[u8], digest: Option<String>) -> FakeTransport {
    let mut assets = vec![("widget-linux.tar.gz", "https://dl.test/widget-linux.tar.gz"), ("widget-win64.exe", ASSET_URL)];
    if digest.is_some() {
        assets.push(("widget-win64.exe.sha256", DIGEST_URL));
    }

    let mut transport = FakeTransport::new()
        .with_response(LATEST, FakeResponse::ok(release_json(tag, &assets)))
        .with_response(ASSET_URL, FakeResponse::ok(payload.to_vec()).chunked(32 * 1024));
    if let Some(digest) = digest {
        transport = transport.with_response(DIGEST_URL, FakeResponse::ok(digest));
    }
    transport
}

#[tokio::test]
async fn test_update_with_published_checksum() {
    init_test_logging(None);
    let dir = install_dir("1.0.0");
    let config = load_config(&dir, "").await;
    let payload = b"widget 1.2 build".repeat(10_000);
    let digest = format!("{}  widget-win64.exe\n", sha256_hex(&payload));
    let transport = Arc::new(feed("v1.2.0", &payload, Some(digest)));
    let orchestrator = UpdateOrchestrator::new(config, Some(transport.clone())).unwrap();

    let mut decider = ScriptedDecision::new([Decision::Accept]);
    let report = orchestrator.run(&mut decider, &mut NoProgress, &CancellationFlag::new()).await;

    assert_eq!(report.state, UpdateState::Completed, "{:?}", report.error());
    assert!(report.checksum_verified);
    assert_eq!(decider.offers().len(), 1);
    assert_eq!(decider.offers()[0].current, Version::new(1, 0, 0));
    assert_eq!(decider.offers()[0].latest, Version::new(1, 2, 0));

    assert_eq!(fs::read(dir.path().join("widget.exe")).unwrap(), payload);
    let record = fs::read_to_string(dir.path().join("version.txt")).unwrap();
    assert!(record.starts_with("# Widget version record\n"));
    assert!(record.contains("version=1.2.0"));

    // The previous artifact is kept in the backup directory
    let install = report.install.unwrap();
    let BackupOutcome::Created(backup) = &install.backup else {
        panic!("expected a backup, got {:?}", install.backup);
    };
    assert!(backup.path.starts_with(dir.path().join("backups")));
    assert_eq!(fs::read(&backup.path).unwrap(), b"widget 1.0");

    // Nothing but the expected files remain in the install directory
    let leftovers: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".part") || name.ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
    assert!(transport.was_requested(DIGEST_URL));
}

#[tokio::test]
async fn test_second_run_is_up_to_date() {
    init_test_logging(None);
    let dir = install_dir("1.0.0");
    let config = load_config(&dir, "").await;
    let transport = Arc::new(feed("v1.2.0", b"new build", None));
    let orchestrator = UpdateOrchestrator::new(config, Some(transport.clone())).unwrap();

    let first = orchestrator.run(&mut AutoAccept, &mut NoProgress, &CancellationFlag::new()).await;
    assert_eq!(first.kind(), StateKind::Completed);
    assert!(!first.checksum_verified);

    let second = orchestrator.run(&mut AutoAccept, &mut NoProgress, &CancellationFlag::new()).await;
    assert_eq!(second.kind(), StateKind::UpToDate);
    assert_eq!(second.current, Some(Version::new(1, 2, 0)));

    let downloads = transport.requested_urls().iter().filter(|url| *url == ASSET_URL).count();
    assert_eq!(downloads, 1);
}

#[tokio::test]
async fn test_newer_install_is_not_downgraded() {
    let dir = install_dir("2.0.0");
    let config = load_config(&dir, "").await;
    let transport = Arc::new(feed("v1.9.9", b"older build", None));
    let orchestrator = UpdateOrchestrator::new(config, Some(transport.clone())).unwrap();

    let report = orchestrator.run(&mut AutoAccept, &mut NoProgress, &CancellationFlag::new()).await;

    assert_eq!(report.kind(), StateKind::UpToDate);
    assert!(!transport.was_requested(ASSET_URL));
    assert_eq!(fs::read(dir.path().join("widget.exe")).unwrap(), b"widget 1.0");
}

#[tokio::test]
async fn test_declined_update_touches_nothing() {
    let dir = install_dir("1.0.0");
    let config = load_config(&dir, "").await;
    let transport = Arc::new(feed("v1.2.0", b"new build", None));
    let orchestrator = UpdateOrchestrator::new(config, Some(transport.clone())).unwrap();

    let mut decider = ScriptedDecision::new([Decision::Decline]);
    let report = orchestrator.run(&mut decider, &mut NoProgress, &CancellationFlag::new()).await;

    assert_eq!(report.kind(), StateKind::Declined);
    assert!(!transport.was_requested(ASSET_URL));
    assert_eq!(fs::read(dir.path().join("widget.exe")).unwrap(), b"widget 1.0");
    assert!(!dir.path().join("backups").exists());
}

#[tokio::test]
async fn test_failed_download_leaves_install_untouched() {
    let dir = install_dir("1.0.0");
    let config = load_config(&dir, "").await;
    let partial = config.partial_download_path();
    let transport = feed("v1.2.0", b"", None).with_response(ASSET_URL, FakeResponse::status(404));
    let orchestrator = UpdateOrchestrator::new(config, Some(Arc::new(transport))).unwrap();

    let report = orchestrator.run(&mut AutoAccept, &mut NoProgress, &CancellationFlag::new()).await;

    assert_eq!(report.error(), Some(&UpdateError::DownloadError { status: 404 }));
    assert!(!partial.exists());
    assert_eq!(fs::read(dir.path().join("widget.exe")).unwrap(), b"widget 1.0");
    assert!(fs::read_to_string(dir.path().join("version.txt")).unwrap().contains("version=1.0.0"));
}

#[tokio::test]
async fn test_interrupted_stream_is_cleaned_up() {
    let dir = install_dir("1.0.0");
    let config = load_config(&dir, "").await;
    let partial = config.partial_download_path();
    let transport = feed("v1.2.0", b"", None).with_response(
        ASSET_URL,
        FakeResponse::ok(vec![1u8; 256 * 1024]).chunked(16 * 1024).fail_after(3),
    );
    let orchestrator = UpdateOrchestrator::new(config, Some(Arc::new(transport))).unwrap();

    let report = orchestrator.run(&mut AutoAccept, &mut NoProgress, &CancellationFlag::new()).await;

    assert!(matches!(report.error(), Some(UpdateError::Transport { .. })), "{:?}", report.state);
    assert!(!partial.exists());
    assert_eq!(fs::read(dir.path().join("widget.exe")).unwrap(), b"widget 1.0");
}

#[tokio::test]
async fn test_checksum_mismatch_installs_nothing() {
    let dir = install_dir("1.0.0");
    let config = load_config(&dir, "").await;
    let wrong = format!("{}  widget-win64.exe\n", sha256_hex(b"something else"));
    let transport = Arc::new(feed("v1.2.0", b"tampered build", Some(wrong)));
    let orchestrator = UpdateOrchestrator::new(config, Some(transport)).unwrap();

    let report = orchestrator.run(&mut AutoAccept, &mut NoProgress, &CancellationFlag::new()).await;

    assert!(matches!(report.error(), Some(UpdateError::ChecksumMismatch { .. })));
    assert_eq!(fs::read(dir.path().join("widget.exe")).unwrap(), b"widget 1.0");
    assert!(!dir.path().join("backups").exists() || fs::read_dir(dir.path().join("backups")).unwrap().next().is_none());
}

#[tokio::test]
async fn test_unreachable_checksum_does_not_block_update() {
    let dir = install_dir("1.0.0");
    let config = load_config(&dir, "").await;
    let transport = feed("v1.2.0", b"new build", Some(String::new()))
        .with_response(DIGEST_URL, FakeResponse::unreachable("connection reset"));
    let orchestrator = UpdateOrchestrator::new(config, Some(Arc::new(transport))).unwrap();

    let report = orchestrator.run(&mut AutoAccept, &mut NoProgress, &CancellationFlag::new()).await;

    assert_eq!(report.kind(), StateKind::Completed, "{:?}", report.error());
    assert!(!report.checksum_verified);
    assert_eq!(fs::read(dir.path().join("widget.exe")).unwrap(), b"new build");
}

#[tokio::test]
async fn test_checksum_verification_can_be_disabled() {
    let dir = install_dir("1.0.0");
    let config = load_config(&dir, "verify_checksum = false").await;
    let wrong = format!("{}  widget-win64.exe\n", sha256_hex(b"something else"));
    let transport = Arc::new(feed("v1.2.0", b"new build", Some(wrong)));
    let orchestrator = UpdateOrchestrator::new(config, Some(transport.clone())).unwrap();

    let report = orchestrator.run(&mut AutoAccept, &mut NoProgress, &CancellationFlag::new()).await;

    assert_eq!(report.kind(), StateKind::Completed);
    assert!(!transport.was_requested(DIGEST_URL));
}

#[tokio::test]
async fn test_fresh_install_creates_record_without_backup() {
    let dir = TempDir::new().unwrap();
    let config = load_config(&dir, "backup_policy = \"abort\"").await;
    assert_eq!(config.backup_policy, BackupPolicy::Abort);
    let orchestrator =
        UpdateOrchestrator::new(config, Some(Arc::new(feed("v0.3.0", b"first build", None)))).unwrap();

    let report = orchestrator.run(&mut AutoAccept, &mut NoProgress, &CancellationFlag::new()).await;

    assert_eq!(report.kind(), StateKind::Completed);
    assert_eq!(report.current, Some(Version::default()));
    assert!(matches!(report.install.unwrap().backup, BackupOutcome::NoOp));
    assert_eq!(fs::read(dir.path().join("widget.exe")).unwrap(), b"first build");
    assert_eq!(orchestrator.version_store().read().await.unwrap(), Some(Version::new(0, 3, 0)));
}

#[tokio::test]
async fn test_custom_asset_pattern_without_match() {
    let dir = install_dir("1.0.0");
    let config = load_config(&dir, r#"asset_pattern = "(?i)macos\\.dmg$""#).await;
    let transport = Arc::new(feed("v1.2.0", b"new build", None));
    let orchestrator = UpdateOrchestrator::new(config, Some(transport.clone())).unwrap();

    let report = orchestrator.check().await;

    assert_eq!(report.kind(), StateKind::AssetNotFound);
    assert_eq!(report.release_tag.as_deref(), Some("v1.2.0"));
    assert_eq!(transport.requested_urls(), vec![LATEST.to_string()]);
}
