//! Duration literal fields.

use runcfg_core::{Duration, KeyPath, Node};

use super::is_unresolved;
use crate::context::LintContext;
use crate::diagnostic::{Diagnostic, Severity};
use crate::rule::Rule;

/// Top-level fields that hold a duration.
const TOP_LEVEL: &[&str] = &["max_duration", "eval_interval", "save_interval"];

/// `scheduler` fields that hold a duration.
const SCHEDULER: &[&str] = &["t_warmup", "t_max"];

/// Callback option suffix for periods.
const INTERVAL_SUFFIX: &str = "_interval";

/// Durations are written as `<n>ep`, `<n>ba`, `<n>sp`, `<n>tok` or `<x>dur`.
pub struct DurationLiteral;

impl Rule for DurationLiteral {
    fn id(&self) -> &'static str {
        "duration-literal"
    }

    fn description(&self) -> &'static str {
        "max_duration, intervals and scheduler periods use duration syntax (100ba, 1ep)"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        let tree = ctx.tree();
        let mut fields: Vec<(KeyPath, &Node)> = Vec::new();

        for key in TOP_LEVEL {
            if let Some(node) = tree.get(key) {
                fields.push((KeyPath::root().key(*key), node));
            }
        }

        if let Some(scheduler) = tree.get("scheduler") {
            for key in SCHEDULER {
                if let Some(node) = scheduler.get(key) {
                    fields.push((KeyPath::root().key("scheduler").key(*key), node));
                }
            }
        }

        if let Some(callbacks) = tree.get("callbacks").and_then(Node::as_map) {
            for (name, callback) in callbacks.iter() {
                let Some(options) = callback.as_map() else {
                    continue;
                };
                for (key, node) in options.iter() {
                    if key.ends_with(INTERVAL_SUFFIX) {
                        fields.push((KeyPath::root().key("callbacks").key(name).key(key), node));
                    }
                }
            }
        }

        for (path, node) in fields {
            if node.is_null() || is_unresolved(node) {
                continue;
            }
            if let Err(e) = Duration::from_node(node) {
                out.push(
                    self.diagnostic(path, e.to_string())
                        .with_help("use <n>ep, <n>ba, <n>sp, <n>tok or a fraction like 0.1dur"),
                );
            }
        }
    }
}
