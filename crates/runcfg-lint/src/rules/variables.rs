//! `${variables.*}` rules.

use std::collections::BTreeSet;

use runcfg_core::document::VARIABLES_KEY;
use runcfg_core::interpolate::{find_references, is_defined, suggest};
use runcfg_core::{KeyPath, Mapping};

use crate::context::LintContext;
use crate::diagnostic::{Diagnostic, Severity};
use crate::rule::Rule;

/// Every reference names a declared variable.
pub struct UndefinedVariable;

impl Rule for UndefinedVariable {
    fn id(&self) -> &'static str {
        "undefined-variable"
    }

    fn description(&self) -> &'static str {
        "every ${variables.X} reference has an X under variables:"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        let empty = Mapping::new();
        let variables = ctx.document().variables().unwrap_or(&empty);
        let mut seen = BTreeSet::new();

        for reference in find_references(ctx.document()) {
            if is_defined(variables, &reference.name) {
                continue;
            }
            if !seen.insert((reference.path.to_string(), reference.name.clone())) {
                continue;
            }
            let help = match suggest(variables, &reference.name) {
                Some(s) => format!("did you mean '{s}'?"),
                None => format!("declare '{}' under {VARIABLES_KEY}:", reference.name),
            };
            out.push(
                self.diagnostic(
                    reference.path,
                    format!("undefined variable '{}'", reference.name),
                )
                .with_help(help),
            );
        }

        if let Some(runcfg_core::Error::NonScalarEmbed { name, path }) = ctx.resolve_error() {
            out.push(
                self.diagnostic(
                    path.clone(),
                    format!("variable '{name}' is not a scalar and cannot be embedded in text"),
                )
                .with_help("reference it as the whole value instead"),
            );
        }
    }
}

/// Every declared variable is referenced.
pub struct UnusedVariable;

impl Rule for UnusedVariable {
    fn id(&self) -> &'static str {
        "unused-variable"
    }

    fn description(&self) -> &'static str {
        "every declared variable is referenced"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        let Some(resolved) = ctx.resolved() else {
            return;
        };
        for name in resolved.unused() {
            out.push(self.diagnostic(
                KeyPath::root().key(VARIABLES_KEY).key(name),
                format!("variable '{name}' is never referenced"),
            ));
        }
    }
}

/// Variables do not reference themselves.
pub struct VariableCycle;

impl Rule for VariableCycle {
    fn id(&self) -> &'static str {
        "variable-cycle"
    }

    fn description(&self) -> &'static str {
        "variables do not reference themselves, directly or transitively"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        let Some(runcfg_core::Error::VariableCycle { chain }) = ctx.resolve_error() else {
            return;
        };
        let Some(first) = chain.first() else {
            return;
        };
        let root_name = first.split('.').next().unwrap_or(first);
        out.push(self.diagnostic(
            KeyPath::root().key(VARIABLES_KEY).key(root_name),
            format!("variables reference each other: {}", chain.join(" -> ")),
        ));
    }
}
