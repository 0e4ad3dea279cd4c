//! runcfg CLI
//!
//! Command-line interface for checking LLM training run documents.

#![forbid(unsafe_code)]

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use runcfg_cli::cli::Args;

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level().into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let stdout = std::io::stdout();
    runcfg_cli::run(args, &mut stdout.lock())
}
