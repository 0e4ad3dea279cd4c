//! Linter settings file.
//!
//! Settings are TOML:
//!
//! ```toml
//! follow_refs = true
//! deny_warnings = false
//! extra_uri_schemes = ["r2"]
//!
//! [rules]
//! unused-variable = "off"
//! storage-uri = "error"
//! ```
//!
//! The file is located by [`SettingsLocator`], which checks in order:
//! 1. an explicit path (`--config`)
//! 2. the `RUNCFG_CONFIG` environment variable
//! 3. `runcfg.toml` in the working directory
//! 4. `<config_dir>/runcfg/config.toml`

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diagnostic::Severity;
use crate::error::{Error, Result};

/// Environment variable naming a settings file.
pub const CONFIG_ENV: &str = "RUNCFG_CONFIG";

/// Settings file name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "runcfg.toml";

/// Directory under the platform config dir.
pub const APP_DIR: &str = "runcfg";

/// Per-rule level in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleLevel {
    /// Report as an error.
    Error,
    /// Report as a warning.
    Warning,
    /// Report as information.
    Info,
    /// Do not run the rule.
    Off,
}

impl RuleLevel {
    /// Severity to report with; `None` when the rule is off.
    pub fn severity(self) -> Option<Severity> {
        match self {
            RuleLevel::Error => Some(Severity::Error),
            RuleLevel::Warning => Some(Severity::Warning),
            RuleLevel::Info => Some(Severity::Info),
            RuleLevel::Off => None,
        }
    }
}

impl From<Severity> for RuleLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => RuleLevel::Error,
            Severity::Warning => RuleLevel::Warning,
            Severity::Info => RuleLevel::Info,
        }
    }
}

impl fmt::Display for RuleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity() {
            Some(severity) => severity.fmt(f),
            None => f.write_str("off"),
        }
    }
}

/// Linter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintSettings {
    /// Follow `icl_tasks` / `eval_gauntlet` file references.
    pub follow_refs: bool,

    /// Fail a check on warnings as well as errors.
    pub deny_warnings: bool,

    /// URI schemes accepted in addition to the built-in ones.
    pub extra_uri_schemes: Vec<String>,

    /// Level overrides keyed by rule id.
    pub rules: BTreeMap<String, RuleLevel>,
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            follow_refs: true,
            deny_warnings: false,
            extra_uri_schemes: Vec::new(),
            rules: BTreeMap::new(),
        }
    }
}

impl LintSettings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read settings from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        toml::from_str(&text)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Level override for a rule, if any.
    pub fn level(&self, rule: &str) -> Option<RuleLevel> {
        self.rules.get(rule).copied()
    }

    /// Set a level override.
    pub fn set_level(&mut self, rule: impl Into<String>, level: RuleLevel) {
        self.rules.insert(rule.into(), level);
    }
}

/// Finds the settings file.
#[derive(Debug, Clone, Default)]
pub struct SettingsLocator {
    explicit: Option<PathBuf>,
    env_path: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    config_dir: Option<PathBuf>,
}

impl SettingsLocator {
    /// Locator with no candidates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locator for this process: `RUNCFG_CONFIG`, the current directory and
    /// the platform config directory.
    pub fn from_env(explicit: Option<&Path>) -> Self {
        Self {
            explicit: explicit.map(Path::to_path_buf),
            env_path: env::var_os(CONFIG_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            working_dir: env::current_dir().ok(),
            config_dir: dirs::config_dir().map(|d| d.join(APP_DIR)),
        }
    }

    /// Set the explicit settings path.
    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Set the path taken from the environment.
    pub fn with_env_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_path = Some(path.into());
        self
    }

    /// Set the directory searched for `runcfg.toml`.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the per-user settings directory.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Explicit settings path, if one was given.
    pub fn explicit(&self) -> Option<&Path> {
        self.explicit.as_deref()
    }

    /// Per-user settings file, whether or not it exists.
    pub fn default_path(&self) -> Option<PathBuf> {
        self.config_dir.as_ref().map(|d| d.join("config.toml"))
    }

    /// The settings file that applies.
    ///
    /// An explicit or environment path is returned even if it does not
    /// exist; otherwise the local file if present, then the per-user path.
    pub fn resolve(&self) -> Option<PathBuf> {
        if let Some(path) = &self.explicit {
            return Some(path.clone());
        }
        if let Some(path) = &self.env_path {
            return Some(path.clone());
        }
        if let Some(local) = self.working_dir.as_ref().map(|d| d.join(LOCAL_CONFIG_FILE))
            && local.is_file()
        {
            return Some(local);
        }
        self.default_path()
    }

    /// Load the settings that apply, with the file they came from.
    ///
    /// A missing explicit or environment path is an error; a missing
    /// per-user file yields the defaults.
    pub fn load(&self) -> Result<(LintSettings, Option<PathBuf>)> {
        let Some(path) = self.resolve() else {
            return Ok((LintSettings::default(), None));
        };
        let required = self.explicit.is_some() || self.env_path.is_some();
        if !path.exists() {
            if required {
                return Err(Error::config(format!(
                    "Settings file {} does not exist",
                    path.display()
                )));
            }
            log::debug!("No settings file at {}; using defaults", path.display());
            return Ok((LintSettings::default(), None));
        }
        log::debug!("Loading settings from {}", path.display());
        Ok((LintSettings::load(&path)?, Some(path)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Parsing
    // ------------------------------------------------------------------------

    #[test]
    fn test_defaults() {
        let settings = LintSettings::from_toml_str("").unwrap();
        assert!(settings.follow_refs);
        assert!(!settings.deny_warnings);
        assert!(settings.rules.is_empty());
    }

    #[test]
    fn test_rule_levels() {
        let text = "\
deny_warnings = true
extra_uri_schemes = [\"r2\"]

[rules]
unused-variable = \"off\"
storage-uri = \"error\"
";
        let settings = LintSettings::from_toml_str(text).unwrap();
        assert!(settings.deny_warnings);
        assert_eq!(settings.extra_uri_schemes, vec!["r2".to_string()]);
        assert_eq!(settings.level("unused-variable"), Some(RuleLevel::Off));
        assert_eq!(
            settings.level("storage-uri").and_then(RuleLevel::severity),
            Some(Severity::Error)
        );
        assert_eq!(settings.level("parse"), None);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = LintSettings::from_toml_str("follow = false\n").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_bad_level_rejected() {
        assert!(LintSettings::from_toml_str("[rules]\nparse = \"fatal\"\n").is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut settings = LintSettings::default();
        settings.set_level("checkpoint-load", RuleLevel::Off);
        let text = settings.to_toml_string().unwrap();
        assert_eq!(LintSettings::from_toml_str(&text).unwrap(), settings);
    }

    // ------------------------------------------------------------------------
    // Locating
    // ------------------------------------------------------------------------

    #[test]
    fn test_locator_explicit_wins() {
        let locator = SettingsLocator::new()
            .with_explicit("/a.toml")
            .with_env_path("/b.toml")
            .with_config_dir("/home/u/.config/runcfg");
        assert_eq!(locator.resolve(), Some(PathBuf::from("/a.toml")));
    }

    #[test]
    fn test_locator_env_before_local() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(LOCAL_CONFIG_FILE), "").unwrap();
        let locator = SettingsLocator::new()
            .with_env_path("/b.toml")
            .with_working_dir(dir.path());
        assert_eq!(locator.resolve(), Some(PathBuf::from("/b.toml")));
    }

    #[test]
    fn test_locator_local_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let local = dir.path().join(LOCAL_CONFIG_FILE);
        std::fs::write(&local, "deny_warnings = true\n").unwrap();
        let locator = SettingsLocator::new()
            .with_working_dir(dir.path())
            .with_config_dir("/nonexistent/runcfg");
        assert_eq!(locator.resolve(), Some(local.clone()));
        let (settings, path) = locator.load().unwrap();
        assert!(settings.deny_warnings);
        assert_eq!(path, Some(local));
    }

    #[test]
    fn test_locator_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let locator = SettingsLocator::new()
            .with_working_dir(dir.path())
            .with_config_dir(dir.path().join("cfg"));
        assert_eq!(
            locator.resolve(),
            Some(dir.path().join("cfg").join("config.toml"))
        );
        let (settings, path) = locator.load().unwrap();
        assert_eq!(settings, LintSettings::default());
        assert!(path.is_none());
    }

    #[test]
    fn test_locator_missing_explicit_is_error() {
        let locator = SettingsLocator::new().with_explicit("/nonexistent/runcfg.toml");
        let err = locator.load().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
