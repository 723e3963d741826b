pub mod logging;
pub mod progress;

use clap::{Args, Parser, Subcommand};
use dicom_sorter::AppConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dicom-sorter")]
#[command(about = "Sort, deduplicate and summarize DICOM collections", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Move every file under SOURCE_DIR into the path-format hierarchy
    Organize(OrganizeArgs),
    /// Summarize series metadata without moving anything
    Summarize(SummarizeArgs),
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Args)]
pub struct OrganizeArgs {
    /// The source directory containing all the dicoms
    pub source_dir: PathBuf,
    /// Slash-delimited attribute names defining the directory nesting
    #[arg(long)]
    pub path_format: Option<String>,
    /// Number of workers, split between analyzers and movers
    #[arg(long)]
    pub n_jobs: Option<usize>,
    /// Output directory (defaults to the source directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Skip the per-series summary table
    #[arg(long)]
    pub no_summarize: bool,
    #[arg(long)]
    pub summary_output: Option<PathBuf>,
    #[arg(long)]
    pub error_log: Option<PathBuf>,
}

impl OrganizeArgs {
    pub fn apply(self, config: &mut AppConfig) {
        config.source_dir = Some(self.source_dir);
        if let Some(path_format) = self.path_format {
            config.path_format = path_format;
        }
        if let Some(n_jobs) = self.n_jobs {
            config.n_jobs = n_jobs;
        }
        if self.output_dir.is_some() {
            config.output_dir = self.output_dir;
        }
        if self.no_summarize {
            config.summarize = false;
        }
        if let Some(summary_output) = self.summary_output {
            config.summary_output = summary_output;
        }
        if let Some(error_log) = self.error_log {
            config.error_log = error_log;
        }
    }
}

#[derive(Debug, Args)]
pub struct SummarizeArgs {
    /// The source directory containing all the dicoms
    pub source_dir: PathBuf,
    /// Summarize every file, not just the first per directory
    #[arg(long)]
    pub full: bool,
    #[arg(long)]
    pub summary_output: Option<PathBuf>,
    #[arg(long)]
    pub error_log: Option<PathBuf>,
}
