//! appup command-line entry point.

use appup_cli::cli::{self, EXIT_FAILED};
use appup_cli::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(EXIT_FAILED);
        }
    }
}
