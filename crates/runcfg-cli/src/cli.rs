//! Command-line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Check LLM training run documents before launching them
#[derive(Parser, Debug)]
#[command(name = "runcfg", author, version, about, long_about = None)]
pub struct Args {
    /// Linter settings file (overrides RUNCFG_CONFIG and ./runcfg.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Log filter directive implied by `-v` / `-q`.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lint run documents
    Check {
        /// Files, directories or glob patterns
        #[arg(required = true)]
        paths: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Do not follow icl_tasks / eval_gauntlet file references
        #[arg(long)]
        no_follow: bool,

        /// Fail on warnings as well as errors
        #[arg(long)]
        deny_warnings: bool,
    },

    /// Print a document with its variables substituted
    Resolve {
        /// Run document
        file: PathBuf,
    },

    /// Print the value at a dotted key
    Get {
        /// Run document
        file: PathBuf,

        /// Dotted key, e.g. model.name or icl_tasks[0].label; quote keys
        /// containing dots: callbacks["speed.monitor"]
        key: String,

        /// Read the document as written, without substituting variables
        #[arg(long)]
        raw: bool,
    },

    /// List lint rules and the level each reports at
    Rules,

    /// Manage the linter settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show which settings file applies
    Path,

    /// Print the settings in effect
    Show,

    /// Write a settings file with the defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Report output format.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// One line per finding
    Text,
    /// A single JSON object
    Json,
}
