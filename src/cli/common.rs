//! Helpers shared by the commands: configuration loading, orchestrator
//! construction and report rendering.

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::HumanBytes;
use std::sync::Arc;

use crate::cli::CliConfig;
use crate::config::UpdaterConfig;
use crate::transport::ReqwestTransport;
use crate::upgrade::{BackupOutcome, UpdateOffer, UpdateOrchestrator, UpdateReport, UpdateState};

/// Up to date, updated, or declined.
pub const EXIT_OK: i32 = 0;
/// The update failed.
pub const EXIT_FAILED: i32 = 1;
/// The latest release has no asset matching the pattern.
pub const EXIT_ASSET_NOT_FOUND: i32 = 2;

/// Load the configuration file, apply command-line overrides and resolve paths.
pub async fn load_config(cli: &CliConfig) -> Result<UpdaterConfig> {
    let config = UpdaterConfig::load(cli.config_path.as_deref())
        .await?
        .with_overrides(cli.overrides.clone())
        .resolve()
        .context("Invalid path in configuration")?;
    Ok(config)
}

/// Orchestrator over the reqwest transport. A transport that cannot be built
/// is not an error here; runs then fail with `TransportUnavailable`.
pub fn build_orchestrator(config: UpdaterConfig) -> Result<UpdateOrchestrator<ReqwestTransport>> {
    let transport = ReqwestTransport::probe(&config.user_agent()).map(Arc::new);
    Ok(UpdateOrchestrator::new(config, transport)?)
}

/// Print the outcome of a full run and map it to an exit code.
///
/// A failed run is returned as the error itself, so that it reaches the user
/// through the same error display as every other failure.
pub fn finish_run(report: &UpdateReport, config: &UpdaterConfig) -> Result<i32> {
    match &report.state {
        UpdateState::UpToDate => {
            print_up_to_date(report);
            Ok(EXIT_OK)
        }
        UpdateState::AssetNotFound => {
            print_asset_not_found(report, config);
            Ok(EXIT_ASSET_NOT_FOUND)
        }
        UpdateState::Declined => {
            println!("Update declined; nothing was changed.");
            Ok(EXIT_OK)
        }
        UpdateState::Completed => {
            if let Some(install) = &report.install {
                println!("{}", format!("Updated to {}", install.version).green().bold());
                match &install.backup {
                    BackupOutcome::Created(record) => {
                        println!("Previous version saved to {}", record.path.display());
                    }
                    BackupOutcome::NoOp if install.skipped_backup.is_some() => {
                        println!("{}", "Installed without a backup of the previous version".yellow());
                    }
                    BackupOutcome::NoOp => {}
                }
            }
            if config.verify_checksum && !report.checksum_verified {
                println!("{}", "No checksum was published for this release; download not verified".yellow());
            }
            Ok(EXIT_OK)
        }
        UpdateState::Failed(e) => Err(e.clone().into()),
        other => anyhow::bail!("Update stopped unexpectedly while {other}"),
    }
}

pub(crate) fn print_up_to_date(report: &UpdateReport) {
    let current = report.current.as_ref().map_or_else(|| "unknown".to_string(), |v| v.normalized());
    println!("{}", format!("You are on the latest version ({current})").green());
}

pub(crate) fn print_asset_not_found(report: &UpdateReport, config: &UpdaterConfig) {
    let tag = report.release_tag.as_deref().unwrap_or("latest");
    println!(
        "{}",
        format!("Release {tag} has no download matching '{}'", config.asset_pattern).yellow()
    );
    println!("Adjust `asset_pattern` in the configuration, or pass --asset-pattern");
}

/// Multi-line description of an available update.
#[must_use]
pub fn describe_offer(offer: &UpdateOffer) -> String {
    let mut out = format!(
        "{} {} -> {}\n",
        "Update available:".green().bold(),
        offer.current.normalized(),
        offer.latest
    );

    if let Some(name) = offer.release_name.as_deref().filter(|n| !n.trim().is_empty()) {
        out.push_str(&format!("  Release:   {name}\n"));
    }
    if let Some(published) = offer.published_at {
        out.push_str(&format!("  Published: {}\n", published.format("%Y-%m-%d %H:%M UTC")));
    }
    out.push_str(&format!("  Download:  {} ({})\n", offer.asset_name, HumanBytes(offer.asset_size)));

    if let Some(body) = offer.changelog.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        out.push_str(&format!("\n{}\n", "Changes:".bold()));
        for line in body.lines() {
            out.push_str(&format!("  {line}\n"));
        }
    }
    out
}
