//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Welzijn: prepare the Corona & Welzijn survey for analysis
#[derive(Parser)]
#[command(name = "welzijn")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recode a survey export and write the recoded dataset
    Recode {
        /// Path to the survey export (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Directory for the recoded dataset (default: next to the input)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Codebook JSON file (default: built-in Corona & Welzijn codebook)
        #[arg(long, value_name = "FILE")]
        codebook: Option<PathBuf>,

        /// Pipeline configuration JSON file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Print the wave participation and cross-wave consistency report
    Report {
        /// Path to the survey export (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Write the report to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Codebook JSON file (default: built-in Corona & Welzijn codebook)
        #[arg(long, value_name = "FILE")]
        codebook: Option<PathBuf>,

        /// Pipeline configuration JSON file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Write the built-in codebook as JSON
    Codebook {
        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}
