//! CLI argument parsing for ufconvert
//!
//! Uses clap with global flags: --format, --quiet, --verbose, --log-level,
//! --log-json.

pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use output::OutputFormat;

/// ufconvert - exported user flow to custom policy converter
#[derive(Parser, Debug)]
#[command(name = "ufconvert")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log level filter (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert an exported user flow policy set into custom policies
    Convert {
        /// Path of the exported policy set file
        file: PathBuf,

        /// Remove policy objects nothing references anymore (may take a few
        /// minutes on large sets)
        #[arg(long)]
        remove_unreferenced_objects: bool,

        /// Replace the home tenant with a template token so the output can
        /// be reused across tenants
        #[arg(long)]
        tokenize_tenant_id: bool,

        /// Maximum serialized policy size in bytes before splitting
        #[arg(long)]
        max_policy_size: Option<usize>,

        /// Write the converted set here instead of next to the input
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Inspect a policy set without converting it
    Check {
        /// Path of the exported policy set file
        file: PathBuf,

        /// Budget used for the over-size flag, in bytes
        #[arg(long)]
        max_policy_size: Option<usize>,
    },
}
