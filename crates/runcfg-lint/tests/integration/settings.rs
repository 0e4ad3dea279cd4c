//! Integration tests for settings files driving the linter.

use std::fs;

use runcfg_lint::{Error, Linter, RuleLevel, Severity, SettingsLocator};
use tempfile::TempDir;

use crate::common::{broken, findings, lint_with};

#[test]
fn test_local_settings_file_applies() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("runcfg.toml"),
        "deny_warnings = true\nextra_uri_schemes = [\"s4\"]\n\n[rules]\nbatch-size = \"warning\"\n",
    )
    .unwrap();

    let (settings, source) = SettingsLocator::new()
        .with_working_dir(dir.path())
        .load()
        .unwrap();
    assert_eq!(source, Some(dir.path().join("runcfg.toml")));
    assert_eq!(settings.level("batch-size"), Some(RuleLevel::Warning));

    let report = lint_with(&broken("mixed.yaml"), settings);
    assert_eq!(
        findings(&report),
        vec!["duration-literal@max_duration", "batch-size@device_train_microbatch_size"]
    );
    assert_eq!(report.diagnostics()[1].severity, Severity::Warning);
    assert!(report.fails(true));
}

#[test]
fn test_rule_turned_off() {
    let mut settings = runcfg_lint::LintSettings::default();
    settings.set_level("manifest-ref", RuleLevel::Off);
    let report = lint_with(&broken("missing-tasks.yaml"), settings);
    assert!(report.is_empty());
}

#[test]
fn test_misspelled_rule_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, "[rules]\nfsdp-8-bit = \"off\"\n").unwrap();

    let (settings, _) = SettingsLocator::new().with_explicit(&path).load().unwrap();
    let err = Linter::new(settings).unwrap_err();
    assert!(matches!(err, Error::UnknownRule { .. }));
    assert!(err.to_string().contains("did you mean 'fsdp-8bit'?"));
}

#[test]
fn test_unknown_setting_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    fs::write(&path, "follow_references = false\n").unwrap();
    let err = SettingsLocator::new().with_explicit(&path).load().unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}
