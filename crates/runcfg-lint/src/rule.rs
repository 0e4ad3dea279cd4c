//! The `Rule` trait and the `RuleSet` registry.
//!
//! Each check is a [`Rule`]. A [`RuleSet`] holds the rules to run together
//! with the severity each one reports at, after settings are applied.

use std::collections::BTreeMap;

use runcfg_core::KeyPath;

use crate::context::LintContext;
use crate::diagnostic::{Diagnostic, Severity};
use crate::error::{Error, Result};
use crate::report::Report;
use crate::rules;
use crate::settings::LintSettings;

/// Minimum similarity for suggesting a rule id.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A named check over a [`LintContext`].
///
/// # Example
///
/// ```rust,ignore
/// struct NoEmptyRunName;
///
/// impl Rule for NoEmptyRunName {
///     fn id(&self) -> &'static str { "no-empty-run-name" }
///     fn description(&self) -> &'static str { "run_name is not empty" }
///     fn default_severity(&self) -> Severity { Severity::Warning }
///
///     fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
///         if ctx.tree().get("run_name").and_then(Node::as_str) == Some("") {
///             out.push(self.diagnostic(KeyPath::root().key("run_name"), "empty".into()));
///         }
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// Stable kebab-case id, used in settings and output.
    fn id(&self) -> &'static str;

    /// One-line description for `runcfg rules`.
    fn description(&self) -> &'static str;

    /// Severity when settings do not override it.
    fn default_severity(&self) -> Severity;

    /// Append findings for `ctx` to `out`.
    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>);

    /// A diagnostic from this rule at its default severity.
    fn diagnostic(&self, path: KeyPath, message: String) -> Diagnostic {
        Diagnostic::new(self.id(), self.default_severity(), path, message)
    }
}

/// Registry of rules with their effective severities.
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
    overrides: BTreeMap<&'static str, Option<Severity>>,
}

impl RuleSet {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            overrides: BTreeMap::new(),
        }
    }

    /// Every built-in rule at its default severity.
    pub fn builtin() -> Self {
        rules::builtin()
            .into_iter()
            .fold(Self::new(), |set, rule| set.add_boxed(rule))
    }

    /// Add a rule.
    #[allow(clippy::should_implement_trait)]
    pub fn add<R: Rule + 'static>(self, rule: R) -> Self {
        self.add_boxed(Box::new(rule))
    }

    fn add_boxed(mut self, rule: Box<dyn Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Apply level overrides from `settings`.
    ///
    /// Fails on a rule id that is not registered.
    pub fn with_settings(mut self, settings: &LintSettings) -> Result<Self> {
        for (id, level) in &settings.rules {
            let rule = self.get(id).ok_or_else(|| Error::UnknownRule {
                id: id.clone(),
                suggestion: self.suggest(id),
            })?;
            let id = rule.id();
            self.overrides.insert(id, level.severity());
        }
        Ok(self)
    }

    /// Number of registered rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Check if a rule exists by id.
    pub fn has_rule(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Rule with the given id.
    pub fn get(&self, id: &str) -> Option<&dyn Rule> {
        self.rules.iter().find(|r| r.id() == id).map(|r| r.as_ref())
    }

    /// Registered rules in registration order.
    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Severity a rule reports at, or `None` when it is off or unknown.
    pub fn severity(&self, id: &str) -> Option<Severity> {
        let rule = self.get(id)?;
        match self.overrides.get(rule.id()) {
            Some(level) => *level,
            None => Some(rule.default_severity()),
        }
    }

    /// Whether a rule will run.
    pub fn is_enabled(&self, id: &str) -> bool {
        self.severity(id).is_some()
    }

    /// Closest registered id to `id`.
    pub fn suggest(&self, id: &str) -> Option<String> {
        self.rules
            .iter()
            .map(|r| (strsim::jaro_winkler(id, r.id()), r.id()))
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id.to_string())
    }

    /// Run every enabled rule over `ctx`.
    pub fn run(&self, ctx: &LintContext<'_>) -> Report {
        let mut report = Report::new(ctx.document().label());
        for rule in &self.rules {
            let Some(severity) = self.severity(rule.id()) else {
                continue;
            };
            let mut found = Vec::new();
            rule.check(ctx, &mut found);
            if !found.is_empty() {
                log::debug!("{} reported {} finding(s)", rule.id(), found.len());
            }
            report.extend(found.into_iter().map(|mut d| {
                d.severity = severity;
                d
            }));
        }
        report
    }

    /// Apply this set's severity to a diagnostic produced outside `run`,
    /// such as a load failure. `None` when the rule is off.
    pub fn apply(&self, mut diagnostic: Diagnostic) -> Option<Diagnostic> {
        diagnostic.severity = self.severity(diagnostic.rule)?;
        Some(diagnostic)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.rules.iter().map(|r| r.id()).collect::<Vec<_>>())
            .field("overrides", &self.overrides)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::settings::RuleLevel;
    use runcfg_core::{Node, load_str};

    struct NoEmptyRunName;

    impl Rule for NoEmptyRunName {
        fn id(&self) -> &'static str {
            "no-empty-run-name"
        }

        fn description(&self) -> &'static str {
            "run_name is not empty"
        }

        fn default_severity(&self) -> Severity {
            Severity::Warning
        }

        fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
            if ctx.tree().get("run_name").and_then(Node::as_str) == Some("") {
                out.push(self.diagnostic(KeyPath::root().key("run_name"), "empty".into()));
            }
        }
    }

    fn custom() -> RuleSet {
        RuleSet::new().add(NoEmptyRunName)
    }

    #[test]
    fn test_rule_count() {
        assert_eq!(custom().rule_count(), 1);
        assert!(RuleSet::builtin().rule_count() > 20);
    }

    #[test]
    fn test_has_rule() {
        let set = custom();
        assert!(set.has_rule("no-empty-run-name"));
        assert!(!set.has_rule("missing"));
    }

    #[test]
    fn test_builtin_ids_unique() {
        let set = RuleSet::builtin();
        let mut ids: Vec<_> = set.rules().map(|r| r.id()).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_run_uses_default_severity() {
        let doc = load_str("run_name: ''\n").unwrap();
        let settings = LintSettings::default();
        let ctx = LintContext::new(&doc, &settings);
        let report = custom().run(&ctx);
        assert_eq!(report.diagnostics().len(), 1);
        assert_eq!(report.diagnostics()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_override_severity() {
        let mut settings = LintSettings::default();
        settings.set_level("no-empty-run-name", RuleLevel::Error);
        let set = custom().with_settings(&settings).unwrap();
        let doc = load_str("run_name: ''\n").unwrap();
        let ctx = LintContext::new(&doc, &settings);
        assert_eq!(set.run(&ctx).diagnostics()[0].severity, Severity::Error);
    }

    #[test]
    fn test_off_disables_rule() {
        let mut settings = LintSettings::default();
        settings.set_level("no-empty-run-name", RuleLevel::Off);
        let set = custom().with_settings(&settings).unwrap();
        assert!(!set.is_enabled("no-empty-run-name"));
        let doc = load_str("run_name: ''\n").unwrap();
        let ctx = LintContext::new(&doc, &settings);
        assert!(set.run(&ctx).is_empty());
    }

    #[test]
    fn test_unknown_rule_in_settings() {
        let mut settings = LintSettings::default();
        settings.set_level("fsdp-8-bit", RuleLevel::Off);
        let err = RuleSet::builtin().with_settings(&settings).unwrap_err();
        assert!(matches!(
            err,
            Error::UnknownRule { ref suggestion, .. } if suggestion.as_deref() == Some("fsdp-8bit")
        ));
    }

    #[test]
    fn test_apply_respects_off() {
        let mut settings = LintSettings::default();
        settings.set_level("parse", RuleLevel::Off);
        let set = RuleSet::builtin().with_settings(&settings).unwrap();
        let diag = Diagnostic::new("parse", Severity::Error, KeyPath::root(), "bad");
        assert!(set.apply(diag).is_none());
    }
}
