//! Rules about the document as a whole.
//!
//! `parse` and `duplicate-key` findings for the document itself come from
//! loading, before any rule runs. The rules report the same failures in
//! followed `icl_tasks` / `eval_gauntlet` files.

use runcfg_core::KeyPath;
use runcfg_schema::run::ROOT_SECTION;

use crate::context::LintContext;
use crate::diagnostic::{Diagnostic, Severity};
use crate::rule::Rule;

/// Failures under `rule` in files the document references.
fn followed_failures(rule: &dyn Rule, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
    let failures = ctx.refs().failures.iter().filter(|f| f.rule == rule.id());
    for failure in failures {
        out.push(
            rule.diagnostic(failure.path.clone(), failure.message.clone())
                .with_help(format!("file is referenced by {}", failure.from))
                .in_file(Some(failure.file.as_path())),
        );
    }
}

/// The document parses as YAML and has a mapping root.
pub struct Parse;

impl Rule for Parse {
    fn id(&self) -> &'static str {
        "parse"
    }

    fn description(&self) -> &'static str {
        "document parses as YAML with a mapping at the root"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        followed_failures(self, ctx, out);
    }
}

/// No mapping repeats a key.
pub struct DuplicateKey;

impl Rule for DuplicateKey {
    fn id(&self) -> &'static str {
        "duplicate-key"
    }

    fn description(&self) -> &'static str {
        "keys are unique at every mapping level"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        followed_failures(self, ctx, out);
    }
}

/// Known sections have the expected shape.
pub struct Schema;

impl Rule for Schema {
    fn id(&self) -> &'static str {
        "schema"
    }

    fn description(&self) -> &'static str {
        "known sections have the expected types"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        followed_failures(self, ctx, out);
        let Some(err) = ctx.schema_error() else {
            return;
        };
        let diagnostic = match err {
            runcfg_schema::Error::Schema { section, message } => {
                let path = if section == ROOT_SECTION {
                    KeyPath::root()
                } else {
                    KeyPath::root().key(section.as_str())
                };
                self.diagnostic(path, message.clone())
            }
            other => self.diagnostic(KeyPath::root(), other.to_string()),
        };
        out.push(diagnostic);
    }
}
