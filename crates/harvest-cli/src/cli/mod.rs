//! CLI for the harvest collector scheduler.

mod commands;
mod context;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_collect, run_cycle, run_drain, run_due, run_status};
use context::Context;

/// Top-level CLI for the harvest collector scheduler.
#[derive(Debug, Parser)]
#[command(name = "harvest")]
#[command(about = "harvest: cadence-gated scheduler for data collectors", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/harvest/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run one cycle: gate, dispatch and record every enabled job.
    Run {
        /// Only consider these jobs (repeatable).
        #[arg(long = "job", value_name = "NAME")]
        only: Vec<String>,
    },

    /// Show the latest execution report.
    Status,

    /// Show whether each configured job is due.
    Due,

    /// Run a local collector in-process.
    Collect {
        /// Collector name from `[[collectors]]`.
        name: String,
    },

    /// Run queued work items until the queue is empty.
    Drain,
}

impl CliCommand {
    /// Parse args, load config, init logging and dispatch. Returns the exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let ctx = Context::load(cli.config.as_deref())?;
        tracing::debug!("loaded config: {:?}", ctx.cfg);

        let code = match cli.command {
            CliCommand::Run { only } => run_cycle(&ctx, &only).await?,
            CliCommand::Status => run_status(&ctx).await?,
            CliCommand::Due => run_due(&ctx).await?,
            CliCommand::Collect { name } => run_collect(&ctx, &name).await?,
            CliCommand::Drain => run_drain(&ctx).await?,
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests;
