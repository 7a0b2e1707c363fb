//! Command-line interface for appup.
//!
//! # Available Commands
//!
//! - `check` - Check for an update and install it after confirmation
//! - `status` - Show installed and latest versions without changing anything
//! - `version` - Show the installed version recorded on disk
//! - `menu` - Interactive menu (the default when no command is given)
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config` / `-c`: configuration file (also `APPUP_CONFIG`)
//! - `--no-progress`: no progress bars or spinners
//! - `--repo`, `--install-dir`, `--asset-pattern`: override configuration values
//!
//! # Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | up to date, updated, or update declined |
//! | 1 | the update failed |
//! | 2 | the latest release has no matching download |
//!
//! # Examples
//!
//! ```bash
//! appup check              # ask before installing
//! appup check --yes        # install without asking
//! appup --repo acme/widget status
//! RUST_LOG=appup_cli=trace appup check
//! ```

mod check;
pub mod common;
mod console;
mod menu;
mod status;
mod version;

pub use common::{EXIT_ASSET_NOT_FOUND, EXIT_FAILED, EXIT_OK};
pub use console::{Console, ConsoleDecision};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::ConfigOverrides;

/// Settings shared by every command, derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,
    pub no_progress: bool,
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

impl CliConfig {
    /// Install the stderr log subscriber. `RUST_LOG` takes precedence over the flags.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "appup",
    about = "Keep an installed application up to date from its release feed",
    version,
    author,
    long_about = "appup checks a GitHub-style release feed for a newer version of an installed \
                  application, downloads the matching artifact, backs up the current one and swaps \
                  the new one into place."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "APPUP_CONFIG")]
    config: Option<PathBuf>,

    /// Disable progress bars and spinners
    #[arg(long, global = true)]
    no_progress: bool,

    /// Release feed repository (`owner/repo`)
    #[arg(long, global = true, value_name = "OWNER/REPO")]
    repo: Option<String>,

    /// Directory of the installed application
    #[arg(long, global = true, value_name = "DIR")]
    install_dir: Option<PathBuf>,

    /// Regex selecting the release asset to install
    #[arg(long, global = true, value_name = "REGEX")]
    asset_pattern: Option<String>,

    /// API token for the release feed
    #[arg(long, global = true, env = "APPUP_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check for an update and install it
    Check(check::CheckCommand),
    /// Show installed and latest versions
    Status(status::StatusCommand),
    /// Show the installed version
    Version(version::VersionCommand),
    /// Interactive menu
    Menu(menu::MenuCommand),
}

impl Cli {
    /// Run the selected command and return the process exit code.
    pub async fn execute(self) -> Result<i32> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "appup_cli=debug,warn"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
            overrides: ConfigOverrides {
                repository: self.repo.clone(),
                install_dir: self.install_dir.clone(),
                asset_pattern: self.asset_pattern.clone(),
                token: self.token.clone(),
            },
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<i32> {
        match self.command {
            Some(Commands::Check(cmd)) => cmd.execute(&config).await,
            Some(Commands::Status(cmd)) => cmd.execute(&config).await,
            Some(Commands::Version(cmd)) => cmd.execute(&config).await,
            Some(Commands::Menu(cmd)) => cmd.execute(&config).await,
            None => menu::MenuCommand::default().execute(&config).await,
        }
    }
}
