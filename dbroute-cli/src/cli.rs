//! CLI argument definitions using clap.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// dbroute CLI - resolve database connections from the environment
#[derive(Parser, Debug)]
#[command(name = "dbroute")]
#[command(version)]
#[command(about = "dbroute CLI - resolve database connections from the environment", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the connection descriptor and print it
    Resolve(ResolveArgs),

    /// List PostgreSQL connection candidates without probing
    Candidates(CandidatesArgs),

    /// Display version information
    Version,
}

/// Environment input shared by commands
#[derive(Args, Debug, Clone)]
pub struct EnvArgs {
    /// Dotenv file layered under the process environment
    #[arg(short, long, env = "DBROUTE_ENV_FILE")]
    pub env_file: Option<PathBuf>,
}

/// Arguments for the `resolve` command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub env: EnvArgs,

    /// Probe candidates before choosing (overrides SUPABASE_ENABLE_PROBE)
    #[arg(long, conflicts_with = "no_probe")]
    pub probe: bool,

    /// Never probe (overrides SUPABASE_ENABLE_PROBE)
    #[arg(long)]
    pub no_probe: bool,

    /// Print the descriptor as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not mask passwords and keys
    #[arg(long)]
    pub show_secrets: bool,

    /// Project root for the SQLite database file
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
}

impl ResolveArgs {
    /// Probe override requested on the command line.
    pub fn probe_override(&self) -> Option<bool> {
        match (self.probe, self.no_probe) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Arguments for the `candidates` command
#[derive(Args, Debug)]
pub struct CandidatesArgs {
    #[command(flatten)]
    pub env: EnvArgs,
}
