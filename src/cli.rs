use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vulnlab")]
#[command(version)]
#[command(about = "Provision DVWA security-training labs", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a lab config file (TOML or JSON)
    #[arg(short, long, global = true, env = "VULNLAB_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Provision the DVWA lab end to end
    Install(InstallArgs),

    /// Show per-stage state without changing anything
    Status,

    /// Check prerequisites and host health
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct InstallArgs {
    /// Show what would change without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Comma-separated stage names to run exclusively
    #[arg(long, conflicts_with = "skip")]
    pub only: Option<String>,

    /// Comma-separated stage names to skip
    #[arg(long)]
    pub skip: Option<String>,

    /// List stage names and exit
    #[arg(long)]
    pub list_stages: bool,
}
