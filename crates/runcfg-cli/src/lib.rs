//! # runcfg-cli
//!
//! The `runcfg` command: lint run documents, print them with variables
//! substituted, read single keys, and manage linter settings.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config_handlers;

use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use runcfg_lint::SettingsLocator;

use cli::{Args, Command};
use commands::CheckOptions;

/// Run a parsed command line, writing command output to `out`.
pub fn run(args: Args, out: &mut dyn Write) -> Result<ExitCode> {
    let locator = SettingsLocator::from_env(args.config.as_deref());

    match args.command {
        Command::Check {
            paths,
            format,
            no_follow,
            deny_warnings,
        } => {
            let (settings, source) = locator.load()?;
            if let Some(source) = source {
                tracing::info!(settings = %source.display(), "Loaded linter settings");
            }
            let options = CheckOptions {
                format,
                no_follow,
                deny_warnings,
            };
            let failed = commands::cmd_check(&paths, settings, options, out)?;
            Ok(if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Resolve { file } => {
            commands::cmd_resolve(&file, out)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Get { file, key, raw } => {
            commands::cmd_get(&file, &key, raw, out)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Rules => {
            let (settings, _) = locator.load()?;
            commands::cmd_rules(settings, out)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config { action } => {
            config_handlers::handle_config_command(&locator, action, out)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
