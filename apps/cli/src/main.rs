//! Lakebridge accelerator CLI.
//!
//! Drives the migration pipeline end to end: installer checks, folder and
//! path setup, preprocessing, then analyze/transpile/format/upload through
//! the databricks CLI.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);

    if let Err(report) = commands::run(cli).await {
        eprintln!("Error: {report:?}");
        if let Some(stderr) = commands::failed_command_stderr(&report) {
            eprintln!("{stderr}");
        }
        std::process::exit(commands::exit_code(&report));
    }
    Ok(())
}
