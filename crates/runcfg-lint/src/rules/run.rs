//! Run identity: `run_name` and seeds.

use runcfg_core::{KeyPath, Node};

use super::{describe, is_unresolved};
use crate::context::LintContext;
use crate::diagnostic::{Diagnostic, Severity};
use crate::rule::Rule;

/// `run_name` is a string; `global_seed` / `seed` are non-negative integers.
pub struct RunIdentity;

impl Rule for RunIdentity {
    fn id(&self) -> &'static str {
        "run-identity"
    }

    fn description(&self) -> &'static str {
        "run_name is a string and global_seed a non-negative integer"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        let tree = ctx.tree();

        if let Some(name) = tree.get("run_name")
            && !matches!(name, Node::String(_) | Node::Null)
        {
            out.push(self.diagnostic(
                KeyPath::root().key("run_name"),
                format!("run_name should be a string, found {}", describe(name)),
            ));
        }

        for key in ["global_seed", "seed"] {
            let Some(seed) = tree.get(key) else {
                continue;
            };
            if is_unresolved(seed) || seed.as_i64().is_some_and(|s| s >= 0) {
                continue;
            }
            out.push(
                self.diagnostic(
                    KeyPath::root().key(key),
                    format!("{key} should be a non-negative integer, found {}", describe(seed)),
                )
                .with_help("seeds are passed to every RNG as an unsigned integer"),
            );
        }
    }
}
