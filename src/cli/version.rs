//! `appup version`: show what is installed, without touching the network.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::CliConfig;
use crate::cli::common::{EXIT_OK, load_config};
use crate::config::UpdaterConfig;
use crate::version::VersionStore;

#[derive(Args, Debug, Default)]
pub struct VersionCommand {}

impl VersionCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<i32> {
        let config = load_config(cli).await?;
        show_installed_version(&config).await?;
        Ok(EXIT_OK)
    }
}

pub(crate) async fn show_installed_version(config: &UpdaterConfig) -> Result<()> {
    let store = VersionStore::new(&config.version_file, &config.app_name);
    let installed = store.read().await.context("Failed to read the version record")?;

    match installed {
        Some(version) => println!("{} {}", config.app_name, version.normalized()),
        None => println!("{}: no version recorded", config.app_name),
    }
    println!("Version record: {}", store.path().display());
    println!("Updater:        appup {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
