//! `appup status`: compare the installed version with the latest release.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::cli::CliConfig;
use crate::cli::common::{
    EXIT_ASSET_NOT_FOUND, EXIT_OK, build_orchestrator, load_config, print_asset_not_found,
    print_up_to_date,
};
use crate::upgrade::UpdateState;
use crate::utils::progress::{progress_enabled, spinner};

#[derive(Args, Debug, Default)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<i32> {
        let config = load_config(cli).await?;
        let orchestrator = build_orchestrator(config)?;

        let spin = spinner("Checking for updates...", progress_enabled(cli.no_progress));
        let report = orchestrator.check().await;
        spin.finish_and_clear();

        let config = orchestrator.config();
        println!("Repository:        {}", config.repository);
        println!("Installed version: {}", describe(report.current.as_ref()));
        if let Some(latest) = &report.latest {
            println!("Latest release:    {latest}");
        }

        match &report.state {
            UpdateState::UpToDate => {
                print_up_to_date(&report);
                Ok(EXIT_OK)
            }
            UpdateState::AwaitingDecision => {
                println!("{}", "An update is available. Run `appup check` to install it".green());
                Ok(EXIT_OK)
            }
            UpdateState::AssetNotFound => {
                print_asset_not_found(&report, config);
                Ok(EXIT_ASSET_NOT_FOUND)
            }
            UpdateState::Failed(e) => Err(e.clone().into()),
            other => anyhow::bail!("Status check stopped unexpectedly while {other}"),
        }
    }
}

fn describe(version: Option<&crate::version::Version>) -> String {
    match version {
        Some(v) if *v == crate::version::Version::default() => "none recorded".to_string(),
        Some(v) => v.normalized(),
        None => "unknown".to_string(),
    }
}
