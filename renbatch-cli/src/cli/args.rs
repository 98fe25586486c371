use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use super::types::OutputFormat;

/// Validated, cancellable batch file renames from a mapping file
#[derive(Parser, Debug)]
#[command(name = "renbatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Run as if started in <path> instead of the current working directory
    #[arg(short = 'C', global = true, value_name = "PATH")]
    pub directory: Option<PathBuf>,

    /// Log every rename and internal decision to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Rename files as described by a JSON mapping file
    ///
    /// The mapping is a list of {"source", "destination", "category"?} objects.
    /// Relative destinations are resolved next to their source file.
    Rename {
        /// Path to the mapping file
        mapping: PathBuf,

        /// Assume yes for the confirmation prompt
        #[arg(short = 'y', long = "yes", env = "RENBATCH_YES")]
        yes: bool,

        /// Validate the mapping and show the plan without renaming anything
        #[arg(long)]
        dry_run: bool,

        /// Strip characters that are invalid in file names from destinations
        #[arg(long)]
        sanitize: bool,

        /// Milliseconds to wait before showing a progress bar
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,

        /// Output format (defaults to the configured format)
        #[arg(long, value_enum)]
        output: Option<OutputFormat>,
    },

    /// Show rename history
    History {
        /// Number of entries to show
        #[arg(long)]
        limit: Option<usize>,

        /// Output format
        #[arg(long, value_enum, default_value = "summary")]
        output: OutputFormat,
    },

    /// Show the last recorded job and whether a rename is running
    Status {
        /// Output format
        #[arg(long, value_enum, default_value = "summary")]
        output: OutputFormat,
    },

    /// Show version information
    Version {
        /// Output format
        #[arg(long, value_enum, default_value = "summary")]
        output: OutputFormat,
    },
}
