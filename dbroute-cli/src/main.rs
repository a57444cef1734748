//! dbroute CLI - inspect database connection resolution.

use clap::Parser;

use dbroute_cli::cli::{Cli, Command};
use dbroute_cli::commands;
use dbroute_cli::error::CliResult;
use dbroute_cli::output;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.verbose {
        0 => dbroute::logging::init(),
        1 => dbroute::logging::init_with_level("debug"),
        _ => dbroute::logging::init_with_level("trace"),
    }

    match cli.command {
        Command::Resolve(args) => commands::resolve::run(args).await,
        Command::Candidates(args) => commands::candidates::run(args).await,
        Command::Version => commands::version::run().await,
    }
}
