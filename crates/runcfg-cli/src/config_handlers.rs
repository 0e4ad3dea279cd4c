//! Handler functions for `config` subcommands.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use runcfg_lint::{LintSettings, SettingsLocator};

use crate::cli::ConfigAction;

/// Dispatch a `config` subcommand.
pub fn handle_config_command(
    locator: &SettingsLocator,
    action: ConfigAction,
    out: &mut dyn Write,
) -> Result<()> {
    match action {
        ConfigAction::Path => cmd_config_path(locator, out),
        ConfigAction::Show => cmd_config_show(locator, out),
        ConfigAction::Init { force } => cmd_config_init(locator, force, out),
    }
}

/// Show the settings file that applies.
pub fn cmd_config_path(locator: &SettingsLocator, out: &mut dyn Write) -> Result<()> {
    let path = locator
        .resolve()
        .ok_or_else(|| anyhow!("Could not determine config directory for this platform"))?;
    writeln!(out, "{}", path.display())?;
    if !path.exists() {
        eprintln!("(file does not exist; run `runcfg config init` to create it)");
    }
    Ok(())
}

/// Print the settings in effect as TOML.
pub fn cmd_config_show(locator: &SettingsLocator, out: &mut dyn Write) -> Result<()> {
    let (settings, source) = locator.load()?;
    match source {
        Some(path) => writeln!(out, "# {}", path.display())?,
        None => writeln!(out, "# defaults")?,
    }
    write!(out, "{}", settings.to_toml_string()?)?;
    Ok(())
}

/// Write a settings file with the defaults.
///
/// Writes to the explicit path when one was given, otherwise to the
/// per-user settings file.
pub fn cmd_config_init(locator: &SettingsLocator, force: bool, out: &mut dyn Write) -> Result<()> {
    let path = init_target(locator)?;

    if path.exists() && !force {
        bail!(
            "Settings file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let toml_str = LintSettings::default().to_toml_string()?;
    std::fs::write(&path, toml_str).with_context(|| format!("Failed to write {}", path.display()))?;

    writeln!(out, "Settings file created at {}", path.display())?;
    Ok(())
}

fn init_target(locator: &SettingsLocator) -> Result<PathBuf> {
    locator
        .explicit()
        .map(PathBuf::from)
        .or_else(|| locator.default_path())
        .ok_or_else(|| anyhow!("Could not determine config directory"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn output(run: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        run(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    // ------------------------------------------------------------------------
    // cmd_config_path tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_cmd_config_path_explicit() {
        let locator = SettingsLocator::new().with_explicit("/explicit/runcfg.toml");
        let text = output(|out| cmd_config_path(&locator, out));
        assert_eq!(text, "/explicit/runcfg.toml\n");
    }

    #[test]
    fn test_cmd_config_path_user_dir() {
        let dir = TempDir::new().unwrap();
        let locator = SettingsLocator::new().with_config_dir(dir.path());
        let text = output(|out| cmd_config_path(&locator, out));
        assert_eq!(text.trim_end(), dir.path().join("config.toml").display().to_string());
    }

    #[test]
    fn test_cmd_config_path_none() {
        assert!(cmd_config_path(&SettingsLocator::new(), &mut Vec::new()).is_err());
    }

    // ------------------------------------------------------------------------
    // cmd_config_init / show tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_cmd_config_init_then_show() {
        let dir = TempDir::new().unwrap();
        let locator = SettingsLocator::new().with_config_dir(dir.path().join("runcfg"));

        let text = output(|out| cmd_config_init(&locator, false, out));
        let path = dir.path().join("runcfg/config.toml");
        assert!(text.contains(&path.display().to_string()));
        assert!(path.exists());

        let shown = output(|out| cmd_config_show(&locator, out));
        assert!(shown.starts_with(&format!("# {}", path.display())));
        assert!(shown.contains("follow_refs = true"));
    }

    #[test]
    fn test_cmd_config_init_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runcfg.toml");
        std::fs::write(&path, "deny_warnings = true\n").unwrap();
        let locator = SettingsLocator::new().with_explicit(&path);

        assert!(cmd_config_init(&locator, false, &mut Vec::new()).is_err());
        cmd_config_init(&locator, true, &mut Vec::new()).unwrap();
        let settings = LintSettings::load(&path).unwrap();
        assert!(!settings.deny_warnings);
    }

    #[test]
    fn test_cmd_config_show_defaults() {
        let dir = TempDir::new().unwrap();
        let locator = SettingsLocator::new().with_config_dir(dir.path());
        let shown = output(|out| cmd_config_show(&locator, out));
        assert!(shown.starts_with("# defaults\n"));
    }

    #[test]
    fn test_handle_config_command_dispatch() {
        let locator = SettingsLocator::new().with_explicit("/explicit/runcfg.toml");
        let text = output(|out| handle_config_command(&locator, ConfigAction::Path, out));
        assert!(text.starts_with("/explicit"));
    }
}
