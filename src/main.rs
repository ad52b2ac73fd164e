mod cli;
mod commands;
mod config;
mod engine;
mod error;
mod paths;
mod progress;
mod runner;
mod stage;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use error::ProvisionError;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_path: cli.config,
    };

    match dispatch(&ctx, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&format!("{e:#}"));
            // Structured failures carry operator guidance worth a line each.
            if let Some(detail) = e
                .downcast_ref::<ProvisionError>()
                .and_then(ProvisionError::detail)
            {
                for line in detail.lines() {
                    ui::dim(line);
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn dispatch(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Install(args) => commands::install::run(ctx, args),
        Command::Status => commands::status::run(ctx),
        Command::Doctor => commands::doctor::run(ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "vulnlab", &mut io::stdout());
            Ok(())
        }
    }
}
