//! CLI parse: clap types for factflow. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// factflow CLI - Tax interview flows over a typed fact graph
#[derive(Parser)]
#[command(name = "factflow")]
#[command(about = "Walk a tax interview flow and edit the facts behind it")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, global = true, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Tax return to operate on
    #[arg(long = "return", global = true, default_value = "default")]
    pub return_id: String,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Enable verbose logging (debug level)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the flow against the fact dictionary
    Validate,
    /// Evaluate a fact, e.g. /formW2s/#A/wages
    Get {
        path: String,
    },
    /// Write a fact from raw input and save
    Set {
        path: String,
        value: String,
        /// Treat VALUE as a persisted JSON value ({"$type": ..., "item": ...})
        #[arg(long)]
        json: bool,
    },
    /// Delete a writable fact and save
    Delete {
        path: String,
    },
    /// Append an item to a collection and save
    AddItem {
        collection: String,
        /// Item id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Remove an item from a collection and save
    RemoveItem {
        collection: String,
        id: String,
    },
    /// Screen that follows a location, e.g. /jobs/wages?collectionId=A
    Next {
        /// Current location; the first screen is shown when omitted
        location: Option<String>,
        /// Apply the current screen's fact actions and save before moving on
        #[arg(long)]
        submit: bool,
    },
    /// Per-subcategory progress
    Checklist,
    /// Write the return's committed facts as JSON
    Export {
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replace the return's facts with a JSON export
    Import {
        file: PathBuf,
    },
    /// List stored returns
    Returns,
    /// Delete a stored return
    Discard,
}
