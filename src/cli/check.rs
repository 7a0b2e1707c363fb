//! `appup check`: look for an update and install it.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::debug;

use crate::cli::CliConfig;
use crate::cli::common::{build_orchestrator, finish_run, load_config};
use crate::cli::console::{Console, ConsoleDecision};
use crate::upgrade::{AutoAccept, CancellationFlag};
use crate::utils::progress::{DownloadProgress, progress_enabled};

#[derive(Args, Debug, Default)]
pub struct CheckCommand {
    /// Install an available update without asking
    #[arg(short, long)]
    pub yes: bool,
}

impl CheckCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<i32> {
        let config = load_config(cli).await?;
        let orchestrator = build_orchestrator(config)?;

        println!("{}", "Checking for updates...".cyan());

        let cancel = CancellationFlag::new();
        let watcher = spawn_interrupt_watcher(cancel.clone());
        let mut progress = DownloadProgress::new("Downloading", progress_enabled(cli.no_progress));

        let report = if self.yes {
            orchestrator.run(&mut AutoAccept, &mut progress, &cancel).await
        } else {
            let mut console = Console::stdin();
            let mut decider = ConsoleDecision::new(&mut console);
            orchestrator.run(&mut decider, &mut progress, &cancel).await
        };
        watcher.abort();

        debug!("Update run visited {:?}", report.history);
        finish_run(&report, orchestrator.config())
    }
}

/// Ctrl-C stops a running download at the next chunk.
pub(crate) fn spawn_interrupt_watcher(cancel: CancellationFlag) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, cancelling...".yellow());
            cancel.cancel();
        }
    })
}
