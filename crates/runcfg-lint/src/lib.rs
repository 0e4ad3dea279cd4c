#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! runcfg lint library
//!
//! Checks LLM training run documents before they are launched. A document
//! is loaded, its `${variables.*}` references are resolved, the result is
//! projected onto the typed schema, and every enabled [`Rule`] reports
//! [`Diagnostic`]s into a [`Report`].
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`diagnostic`]: Findings and their severities
//! - [`settings`]: `runcfg.toml` settings and where they are found
//! - [`context`]: Everything a rule can look at for one document
//! - [`refs`]: Following `icl_tasks` / `eval_gauntlet` file references
//! - [`rule`]: The [`Rule`] trait and the [`RuleSet`] registry
//! - [`rules`]: Built-in rules
//! - [`report`]: Reports and their text / JSON renderings
//!
//! # Example
//!
//! ```rust
//! use runcfg_lint::{LintSettings, Linter};
//!
//! let linter = Linter::new(LintSettings::default()).unwrap();
//! let report = linter.lint_str("model:\n  load_in_8bit: true\nfsdp_config: {}\n");
//! assert!(report.has_errors());
//! assert_eq!(report.diagnostics()[0].rule, "fsdp-8bit");
//! ```

pub mod context;
pub mod diagnostic;
pub mod error;
pub mod refs;
pub mod report;
pub mod rule;
pub mod rules;
pub mod settings;

mod proptests;

use std::path::Path;

use runcfg_core::{Document, KeyPath};

// Re-exports for convenience
pub use context::{GauntletSource, LintContext, TaskSource};
pub use diagnostic::{Diagnostic, Severity};
pub use error::{Error, Result};
pub use refs::{Followed, FollowedRefs, RefFailure, RefProblem};
pub use report::{Report, Summary, render_json};
pub use rule::{Rule, RuleSet};
pub use settings::{LintSettings, RuleLevel, SettingsLocator};

/// Label used for documents that did not come from a file.
const STRING_SOURCE: &str = "<string>";

/// A rule set bound to the settings it was configured from.
#[derive(Debug)]
pub struct Linter {
    rules: RuleSet,
    settings: LintSettings,
}

impl Linter {
    /// Built-in rules with `settings` applied.
    ///
    /// Fails when the settings name a rule that does not exist.
    pub fn new(settings: LintSettings) -> Result<Self> {
        Self::with_rules(RuleSet::builtin(), settings)
    }

    /// A custom rule set with `settings` applied.
    pub fn with_rules(rules: RuleSet, settings: LintSettings) -> Result<Self> {
        let rules = rules.with_settings(&settings)?;
        Ok(Self { rules, settings })
    }

    /// Rules this linter runs.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Settings in effect.
    pub fn settings(&self) -> &LintSettings {
        &self.settings
    }

    /// Lint an already loaded document.
    pub fn lint_document(&self, document: &Document) -> Report {
        let ctx = LintContext::new(document, &self.settings);
        self.rules.run(&ctx)
    }

    /// Lint YAML text. Load failures are reported as findings.
    pub fn lint_str(&self, text: &str) -> Report {
        match runcfg_core::load_str(text) {
            Ok(doc) => self.lint_document(&doc),
            Err(e) => self.load_failure(STRING_SOURCE, e),
        }
    }

    /// Lint a file.
    ///
    /// A file that cannot be read is an error; a file that cannot be
    /// parsed produces a report with the parse finding.
    pub fn lint_file(&self, path: impl AsRef<Path>) -> Result<Report> {
        let path = path.as_ref();
        match runcfg_core::load_file(path) {
            Ok(doc) => Ok(self.lint_document(&doc)),
            Err(e @ runcfg_core::Error::Io { .. }) => Err(e.into()),
            Err(e) => Ok(self.load_failure(&path.display().to_string(), e)),
        }
    }

    fn load_failure(&self, source: &str, err: runcfg_core::Error) -> Report {
        log::debug!("{source} did not load: {err}");
        let path = match &err {
            runcfg_core::Error::DuplicateKey { path, key } => path.key(key.as_str()),
            _ => KeyPath::root(),
        };
        let mut report = Report::new(source);
        let diagnostic = Diagnostic::new(err.kind(), Severity::Error, path, err.to_string());
        if let Some(diagnostic) = self.rules.apply(diagnostic) {
            report.push(diagnostic);
        }
        report
    }
}

/// Lint a loaded document with the built-in rules.
pub fn lint_document(document: &Document, settings: &LintSettings) -> Result<Report> {
    Ok(Linter::new(settings.clone())?.lint_document(document))
}

/// Lint a file with the built-in rules.
pub fn lint_file(path: impl AsRef<Path>, settings: &LintSettings) -> Result<Report> {
    Linter::new(settings.clone())?.lint_file(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn linter() -> Linter {
        Linter::new(LintSettings::default()).unwrap()
    }

    #[test]
    fn test_clean_document() {
        let report = linter().lint_str("run_name: demo\nmax_duration: 10ba\n");
        assert!(report.is_empty(), "{}", report.render_text());
        assert_eq!(report.source(), "<string>");
    }

    #[test]
    fn test_parse_failure_is_finding() {
        let report = linter().lint_str("model: [unclosed\n");
        assert_eq!(report.diagnostics().len(), 1);
        assert_eq!(report.diagnostics()[0].rule, "parse");
        assert!(report.has_errors());
    }

    #[test]
    fn test_duplicate_key_path() {
        let report = linter().lint_str("model:\n  name: a\n  name: b\n");
        let d = &report.diagnostics()[0];
        assert_eq!(d.rule, "duplicate-key");
        assert_eq!(d.path.to_string(), "model.name");
    }

    #[test]
    fn test_empty_document() {
        let report = linter().lint_str("# nothing here\n");
        assert_eq!(report.diagnostics()[0].rule, "parse");
    }

    #[test]
    fn test_load_failure_respects_off() {
        let mut settings = LintSettings::default();
        settings.set_level("duplicate-key", RuleLevel::Off);
        let report = Linter::new(settings).unwrap().lint_str("a: 1\na: 2\n");
        assert!(report.is_empty());
    }

    #[test]
    fn test_lint_file_labels_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.yaml");
        fs::write(&path, "global_train_batch_size: 0\n").unwrap();
        let report = lint_file(&path, &LintSettings::default()).unwrap();
        assert_eq!(report.source(), path.display().to_string());
        assert_eq!(report.by_rule("batch-size").count(), 1);
    }

    #[test]
    fn test_lint_file_missing_is_error() {
        let dir = TempDir::new().unwrap();
        let err = lint_file(dir.path().join("nope.yaml"), &LintSettings::default()).unwrap_err();
        assert!(matches!(err, Error::Core(runcfg_core::Error::Io { .. })));
    }

    #[test]
    fn test_unknown_rule_in_settings() {
        let mut settings = LintSettings::default();
        settings.set_level("no-such-rule", RuleLevel::Off);
        assert!(matches!(
            Linter::new(settings),
            Err(Error::UnknownRule { .. })
        ));
    }
}
