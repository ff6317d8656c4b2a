//! CLI for the BRD bulk report downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use brd_core::config;

use commands::{run_batch_command, run_scan, run_upload};

/// Top-level CLI for the BRD bulk report downloader.
#[derive(Debug, Parser)]
#[command(name = "brd")]
#[command(about = "BRD: batch downloader for report documents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download missing reports and update the status report and metadata ledger.
    Run {
        /// Source table (CSV) with identifiers and candidate URLs. Overrides the config.
        #[arg(long)]
        source: Option<PathBuf>,
        /// Destination directory for downloaded artifacts. Overrides the config.
        #[arg(long)]
        dest: Option<PathBuf>,
        /// Cap on downloads attempted this run. Overrides the config.
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
        /// Run up to N fetches concurrently. Overrides the config.
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// List identifiers that already have a completed artifact.
    Scan {
        /// Destination directory to inspect. Overrides the config.
        #[arg(long)]
        dest: Option<PathBuf>,
    },

    /// Mirror completed artifacts to a remote store, skipping existing names.
    Upload {
        /// Remote store root directory.
        remote: PathBuf,
        /// Destination directory holding the artifacts. Overrides the config.
        #[arg(long)]
        dest: Option<PathBuf>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                source,
                dest,
                limit,
                jobs,
            } => run_batch_command(cfg, source, dest, limit, jobs).await?,
            CliCommand::Scan { dest } => run_scan(&cfg, dest)?,
            CliCommand::Upload { remote, dest } => run_upload(&cfg, &remote, dest)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
