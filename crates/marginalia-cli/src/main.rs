//! marginalia: highlight text in HTML files and restore highlights later.

use std::process::ExitCode;

use clap::Parser;
use marginalia_cli::{logging, run, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();
    let _log_guard = logging::init_tracing();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(subsystem = "cli", error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
