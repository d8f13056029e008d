//! CLI module for metacrawl.
//!
//! Subcommands:
//! - `crawl`: Merge the metadata of a directory tree into one graph
//! - `check`: Validate an N-Triples graph against the ontology
//! - `run`: Crawl, then check the result

mod check;
mod crawl;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// metacrawl - hierarchical metadata crawler
#[derive(Parser)]
#[command(name = "metacrawl")]
#[command(about = "Merges per-directory metadata into one validated graph")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Crawl a directory tree and write the merged graph as N-Triples
    Crawl {
        /// Root of the data tree
        #[arg(long)]
        root: PathBuf,

        /// Directory holding the inventory and secondary metadata files
        #[arg(long)]
        metadata_dir: Option<PathBuf>,

        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate an N-Triples graph
    Check {
        /// Graph to validate
        input: PathBuf,

        /// Write the validation report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Log progress at debug level only
        #[arg(long)]
        quiet_progress: bool,
    },

    /// Crawl a directory tree and validate the result
    Run {
        #[arg(long)]
        root: PathBuf,

        #[arg(long)]
        metadata_dir: Option<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        report: Option<PathBuf>,

        #[arg(long)]
        quiet_progress: bool,
    },
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match &self.command {
            Command::Crawl {
                root,
                metadata_dir,
                output,
            } => {
                self.run_crawl(root, metadata_dir.as_deref(), output.as_deref())
                    .await
            }
            Command::Check {
                input,
                report,
                quiet_progress,
            } => self.run_check(input, report.as_deref(), *quiet_progress).await,
            Command::Run {
                root,
                metadata_dir,
                output,
                report,
                quiet_progress,
            } => {
                self.run_pipeline(
                    root,
                    metadata_dir.as_deref(),
                    output.as_deref(),
                    report.as_deref(),
                    *quiet_progress,
                )
                .await
            }
        }
    }
}
