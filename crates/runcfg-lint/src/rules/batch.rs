//! Batch size fields.

use runcfg_core::{KeyPath, Node};

use super::{describe, is_unresolved};
use crate::context::LintContext;
use crate::diagnostic::{Diagnostic, Severity};
use crate::rule::Rule;

/// Microbatch size that lets the trainer search for the largest fit.
const AUTO_MICROBATCH: &str = "auto";

/// Batch sizes are positive and consistent.
pub struct BatchSize;

impl Rule for BatchSize {
    fn id(&self) -> &'static str {
        "batch-size"
    }

    fn description(&self) -> &'static str {
        "batch sizes are positive integers and the microbatch fits the global batch"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        let tree = ctx.tree();

        let global = self.positive(tree, "global_train_batch_size", out);
        self.positive(tree, "device_eval_batch_size", out);

        let key = "device_train_microbatch_size";
        let Some(micro) = tree.get(key) else {
            return;
        };
        if is_unresolved(micro) || micro.as_str() == Some(AUTO_MICROBATCH) {
            return;
        }
        match micro.as_i64() {
            Some(m) if m > 0 => {
                if let Some(g) = global
                    && m > g
                {
                    out.push(
                        self.diagnostic(
                            KeyPath::root().key(key),
                            format!("{key} ({m}) is larger than global_train_batch_size ({g})"),
                        )
                        .with_help("the microbatch is a slice of the per-device batch"),
                    );
                }
            }
            _ => out.push(
                self.diagnostic(
                    KeyPath::root().key(key),
                    format!(
                        "{key} must be a positive integer or '{AUTO_MICROBATCH}', found {}",
                        describe(micro)
                    ),
                ),
            ),
        }
    }
}

impl BatchSize {
    /// The value at `key` if it is a positive integer; reports it otherwise.
    fn positive(&self, tree: &Node, key: &str, out: &mut Vec<Diagnostic>) -> Option<i64> {
        let node = tree.get(key)?;
        if is_unresolved(node) {
            return None;
        }
        match node.as_i64() {
            Some(n) if n > 0 => Some(n),
            _ => {
                out.push(self.diagnostic(
                    KeyPath::root().key(key),
                    format!("{key} must be a positive integer, found {}", describe(node)),
                ));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{paths, run_rule};

    #[test]
    fn test_valid_batch_sizes() {
        let text = "global_train_batch_size: 256\ndevice_train_microbatch_size: 8\ndevice_eval_batch_size: 8\n";
        assert!(run_rule(&BatchSize, text).is_empty());
    }

    #[test]
    fn test_auto_microbatch() {
        let text = "global_train_batch_size: 256\ndevice_train_microbatch_size: auto\n";
        assert!(run_rule(&BatchSize, text).is_empty());
    }

    #[test]
    fn test_microbatch_larger_than_global() {
        let text = "global_train_batch_size: 8\ndevice_train_microbatch_size: 16\n";
        let found = run_rule(&BatchSize, text);
        assert_eq!(paths(&found), vec!["device_train_microbatch_size"]);
        assert!(found[0].message.contains("larger than"));
    }

    #[test]
    fn test_non_positive() {
        let text = "global_train_batch_size: 0\ndevice_train_microbatch_size: min\ndevice_eval_batch_size: -2\n";
        let found = run_rule(&BatchSize, text);
        assert_eq!(
            paths(&found),
            vec![
                "global_train_batch_size",
                "device_eval_batch_size",
                "device_train_microbatch_size",
            ]
        );
    }
}
