//! Common test utilities for runcfg-lint integration tests.

use std::path::{Path, PathBuf};

use runcfg_lint::{LintSettings, Linter, Report};

/// Root of the fixture tree.
pub fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// A clean pretraining document that references task and gauntlet files.
pub fn pretrain_yaml() -> PathBuf {
    fixtures().join("scripts/train/yamls/pretrain/mpt-125m.yaml")
}

/// A document under `fixtures/broken/`.
pub fn broken(name: &str) -> PathBuf {
    fixtures().join("broken").join(name)
}

/// Lint `path` with default settings.
pub fn lint(path: &Path) -> Report {
    lint_with(path, LintSettings::default())
}

/// Lint `path` with `settings`.
pub fn lint_with(path: &Path, settings: LintSettings) -> Report {
    Linter::new(settings)
        .expect("settings should be valid")
        .lint_file(path)
        .expect("fixture should be readable")
}

/// `rule@path` for every finding, for compact assertions.
pub fn findings(report: &Report) -> Vec<String> {
    report
        .diagnostics()
        .iter()
        .map(|d| format!("{}@{}", d.rule, d.path))
        .collect()
}
