//! Sharding rules.

use runcfg_core::{KeyPath, Node};
use runcfg_schema::{MixedPrecision, ShardingStrategy};

use super::{describe, is_unresolved, models};
use crate::context::LintContext;
use crate::diagnostic::{Diagnostic, Severity};
use crate::rule::Rule;

const FSDP_KEY: &str = "fsdp_config";

fn has_fsdp(tree: &Node) -> bool {
    tree.get(FSDP_KEY).is_some_and(|n| !n.is_null())
}

/// No 8-bit model is loaded under FSDP.
pub struct Fsdp8Bit;

impl Rule for Fsdp8Bit {
    fn id(&self) -> &'static str {
        "fsdp-8bit"
    }

    fn description(&self) -> &'static str {
        "no load_in_8bit: true model together with fsdp_config"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        let tree = ctx.tree();
        if !has_fsdp(tree) {
            return;
        }

        // The typed view gives the same answer when it exists; the tree
        // covers documents whose projection failed.
        let eight_bit: Vec<KeyPath> = match ctx.config() {
            Some(config) => config
                .all_models()
                .into_iter()
                .filter(|(_, model)| model.load_in_8bit)
                .filter_map(|(prefix, _)| prefix.parse::<KeyPath>().ok())
                .collect(),
            None => models(tree)
                .into_iter()
                .filter(|(_, model)| model.get("load_in_8bit").and_then(Node::as_bool) == Some(true))
                .map(|(path, _)| path)
                .collect(),
        };

        for path in eight_bit {
            out.push(
                self.diagnostic(
                    path.key("load_in_8bit"),
                    "8-bit model loading cannot be combined with fsdp_config".to_string(),
                )
                .with_help("remove load_in_8bit or the fsdp_config section"),
            );
        }
    }
}

/// `sharding_strategy` and `mixed_precision` name known policies.
pub struct FsdpOptions;

impl Rule for FsdpOptions {
    fn id(&self) -> &'static str {
        "fsdp-options"
    }

    fn description(&self) -> &'static str {
        "fsdp_config names a known sharding strategy and mixed precision policy"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        let Some(fsdp) = ctx.tree().get(FSDP_KEY) else {
            return;
        };
        let base = KeyPath::root().key(FSDP_KEY);

        if let Some(strategy) = fsdp.get("sharding_strategy")
            && !strategy.is_null()
            && !is_unresolved(strategy)
        {
            let problem = match strategy.as_str() {
                Some(s) => s.parse::<ShardingStrategy>().err(),
                None => Some(format!("sharding_strategy must be a string, found {}", describe(strategy))),
            };
            if let Some(message) = problem {
                out.push(self.diagnostic(base.key("sharding_strategy"), message).with_help(
                    format!("expected one of {}", names(&ShardingStrategy::ALL.map(|s| s.as_str()))),
                ));
            }
        }

        if let Some(precision) = fsdp.get("mixed_precision")
            && !precision.is_null()
            && !is_unresolved(precision)
        {
            let problem = match precision {
                Node::String(s) => s.parse::<MixedPrecision>().err(),
                Node::Map(_) => None,
                other => Some(format!(
                    "mixed_precision must be a policy name or a mapping, found {}",
                    describe(other)
                )),
            };
            if let Some(message) = problem {
                out.push(self.diagnostic(base.key("mixed_precision"), message).with_help(
                    format!(
                        "expected one of {} or a param_dtype/reduce_dtype/buffer_dtype mapping",
                        names(&MixedPrecision::ALL.map(|p| p.as_str()))
                    ),
                ));
            }
        }
    }
}

fn names(values: &[&str]) -> String {
    values.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{paths, run_rule};

    // ------------------------------------------------------------------------
    // fsdp-8bit
    // ------------------------------------------------------------------------

    #[test]
    fn test_8bit_with_fsdp() {
        let text = "\
model:
  name: hf_causal_lm
  load_in_8bit: true
fsdp_config:
  sharding_strategy: FULL_SHARD
";
        let found = run_rule(&Fsdp8Bit, text);
        assert_eq!(paths(&found), vec!["model.load_in_8bit"]);
    }

    #[test]
    fn test_8bit_without_fsdp() {
        let text = "model:\n  load_in_8bit: true\nfsdp_config: null\n";
        assert!(run_rule(&Fsdp8Bit, text).is_empty());
    }

    #[test]
    fn test_8bit_in_eval_models() {
        let text = "\
models:
- model_name: a
  model:
    load_in_8bit: false
- model_name: b
  model:
    load_in_8bit: true
fsdp_config: {}
";
        let found = run_rule(&Fsdp8Bit, text);
        assert_eq!(paths(&found), vec!["models[1].model.load_in_8bit"]);
    }

    #[test]
    fn test_8bit_when_projection_fails() {
        let text = "\
model:
  load_in_8bit: true
fsdp_config:
  limit_all_gathers: often
";
        let found = run_rule(&Fsdp8Bit, text);
        assert_eq!(paths(&found), vec!["model.load_in_8bit"]);
    }

    // ------------------------------------------------------------------------
    // fsdp-options
    // ------------------------------------------------------------------------

    #[test]
    fn test_valid_options() {
        let text = "fsdp_config:\n  sharding_strategy: HYBRID_SHARD\n  mixed_precision: DEFAULT\n";
        assert!(run_rule(&FsdpOptions, text).is_empty());
    }

    #[test]
    fn test_unknown_strategy_and_precision() {
        let text = "fsdp_config:\n  sharding_strategy: HALF_SHARD\n  mixed_precision: BF16\n";
        let found = run_rule(&FsdpOptions, text);
        assert_eq!(
            paths(&found),
            vec!["fsdp_config.sharding_strategy", "fsdp_config.mixed_precision"]
        );
        assert!(found[0].help.as_deref().unwrap_or_default().contains("FULL_SHARD"));
    }

    #[test]
    fn test_precision_mapping_allowed() {
        let text = "fsdp_config:\n  mixed_precision:\n    param_dtype: bf16\n";
        assert!(run_rule(&FsdpOptions, text).is_empty());
    }

    #[test]
    fn test_precision_wrong_type() {
        let found = run_rule(&FsdpOptions, "fsdp_config:\n  mixed_precision: 16\n");
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains("found 16"));
    }
}
