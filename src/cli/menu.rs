//! Interactive menu: check for updates, show the version, exit.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tokio::io::{BufReader, Stdin};

use crate::cli::{CliConfig, EXIT_FAILED};
use crate::cli::check::spawn_interrupt_watcher;
use crate::cli::common::{EXIT_OK, build_orchestrator, finish_run, load_config};
use crate::cli::console::{Console, ConsoleDecision};
use crate::cli::version::show_installed_version;
use crate::config::UpdaterConfig;
use crate::core::user_friendly_error;
use crate::upgrade::CancellationFlag;
use crate::utils::progress::{DownloadProgress, progress_enabled};

#[derive(Args, Debug, Default)]
pub struct MenuCommand {}

enum Choice {
    Check,
    ShowVersion,
    Exit,
}

fn parse_choice(input: &str) -> Option<Choice> {
    match input.to_ascii_lowercase().as_str() {
        "1" | "c" | "check" => Some(Choice::Check),
        "2" | "v" | "version" => Some(Choice::ShowVersion),
        "3" | "q" | "x" | "exit" | "quit" => Some(Choice::Exit),
        _ => None,
    }
}

impl MenuCommand {
    /// Loop until the user exits. The exit code is that of the last check.
    pub async fn execute(self, cli: &CliConfig) -> Result<i32> {
        let config = load_config(cli).await?;
        let mut console = Console::stdin();
        let mut exit_code = EXIT_OK;

        loop {
            println!();
            println!("{}", format!("{} updater", config.app_name).bold());
            println!("  1) Check for updates");
            println!("  2) Show current version");
            println!("  3) Exit");

            let input = tokio::select! {
                input = console.ask("Select an option: ") => input?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(input) = input else {
                return Ok(exit_code);
            };

            match parse_choice(&input) {
                Some(Choice::Check) => {
                    exit_code = match check_once(cli, config.clone(), &mut console).await {
                        Ok(code) => code,
                        Err(e) => {
                            user_friendly_error(e).display();
                            EXIT_FAILED
                        }
                    };
                }
                Some(Choice::ShowVersion) => {
                    if let Err(e) = show_installed_version(&config).await {
                        user_friendly_error(e).display();
                    }
                }
                Some(Choice::Exit) => return Ok(exit_code),
                None => println!("{}", format!("Unknown option '{input}'").yellow()),
            }
        }
    }
}

async fn check_once(
    cli: &CliConfig,
    config: UpdaterConfig,
    console: &mut Console<BufReader<Stdin>>,
) -> Result<i32> {
    let orchestrator = build_orchestrator(config)?;
    println!("{}", "Checking for updates...".cyan());

    let cancel = CancellationFlag::new();
    let watcher = spawn_interrupt_watcher(cancel.clone());
    let mut progress = DownloadProgress::new("Downloading", progress_enabled(cli.no_progress));
    let mut decider = ConsoleDecision::new(console);
    let report = orchestrator.run(&mut decider, &mut progress, &cancel).await;
    watcher.abort();

    finish_run(&report, orchestrator.config())
}
