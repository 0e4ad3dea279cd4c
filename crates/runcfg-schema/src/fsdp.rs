//! `fsdp_config:` section.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// How parameters, gradients and optimizer state are partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShardingStrategy {
    /// Shard parameters, gradients and optimizer state.
    FullShard,
    /// Shard gradients and optimizer state only.
    ShardGradOp,
    /// Plain data parallelism.
    NoShard,
    /// Full sharding inside a node, replication across nodes.
    HybridShard,
    /// Gradient/optimizer sharding inside a node, replication across nodes.
    HybridShardZero2,
}

impl ShardingStrategy {
    /// All strategies.
    pub const ALL: [ShardingStrategy; 5] = [
        ShardingStrategy::FullShard,
        ShardingStrategy::ShardGradOp,
        ShardingStrategy::NoShard,
        ShardingStrategy::HybridShard,
        ShardingStrategy::HybridShardZero2,
    ];

    /// Spelling used in run documents.
    pub fn as_str(self) -> &'static str {
        match self {
            ShardingStrategy::FullShard => "FULL_SHARD",
            ShardingStrategy::ShardGradOp => "SHARD_GRAD_OP",
            ShardingStrategy::NoShard => "NO_SHARD",
            ShardingStrategy::HybridShard => "HYBRID_SHARD",
            ShardingStrategy::HybridShardZero2 => "_HYBRID_SHARD_ZERO2",
        }
    }
}

impl FromStr for ShardingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShardingStrategy::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown sharding strategy '{s}'"))
    }
}

impl fmt::Display for ShardingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named mixed-precision policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MixedPrecision {
    /// Everything in full precision.
    Full,
    /// Parameters in low precision, reductions and buffers in full.
    Default,
    /// Everything in low precision.
    Pure,
}

impl MixedPrecision {
    /// All named policies.
    pub const ALL: [MixedPrecision; 3] = [
        MixedPrecision::Full,
        MixedPrecision::Default,
        MixedPrecision::Pure,
    ];

    /// Spelling used in run documents.
    pub fn as_str(self) -> &'static str {
        match self {
            MixedPrecision::Full => "FULL",
            MixedPrecision::Default => "DEFAULT",
            MixedPrecision::Pure => "PURE",
        }
    }
}

impl FromStr for MixedPrecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MixedPrecision::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown mixed precision policy '{s}'"))
    }
}

impl fmt::Display for MixedPrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `fsdp_config:` section.
///
/// `sharding_strategy` and `mixed_precision` are kept as written and parsed
/// on demand, so an unknown spelling is reported by the lint rule with its
/// path instead of failing the whole projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FsdpConfig {
    /// Sharding strategy name.
    pub sharding_strategy: Option<String>,

    /// Policy name or a per-component dtype mapping.
    pub mixed_precision: Option<Value>,

    /// Recompute activations in the backward pass.
    pub activation_checkpointing: Option<bool>,

    /// Offload activations to host memory.
    pub activation_cpu_offload: Option<bool>,

    /// Limit in-flight all-gathers.
    pub limit_all_gathers: Option<bool>,

    /// Checkpoint layout, e.g. `sharded` or `full`.
    pub state_dict_type: Option<String>,

    /// Remaining runtime keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl FsdpConfig {
    /// Parsed sharding strategy, if one is set.
    pub fn strategy(&self) -> Option<Result<ShardingStrategy, String>> {
        self.sharding_strategy.as_deref().map(str::parse)
    }

    /// Parsed named mixed-precision policy, if one is set as a string.
    pub fn named_precision(&self) -> Option<Result<MixedPrecision, String>> {
        match self.mixed_precision.as_ref()? {
            Value::String(s) => Some(s.parse()),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse() {
        assert_eq!("FULL_SHARD".parse(), Ok(ShardingStrategy::FullShard));
        assert_eq!("hybrid_shard".parse(), Ok(ShardingStrategy::HybridShard));
        assert_eq!("_HYBRID_SHARD_ZERO2".parse(), Ok(ShardingStrategy::HybridShardZero2));
        assert!("HALF_SHARD".parse::<ShardingStrategy>().is_err());
    }

    #[test]
    fn test_precision_parse() {
        assert_eq!("PURE".parse(), Ok(MixedPrecision::Pure));
        assert!("BF16".parse::<MixedPrecision>().is_err());
    }

    #[test]
    fn test_fsdp_section() {
        let text = "\
sharding_strategy: FULL_SHARD
mixed_precision: PURE
activation_checkpointing: true
activation_checkpointing_reentrant: false
";
        let fsdp: FsdpConfig = serde_yaml::from_str(text).unwrap();
        assert_eq!(fsdp.strategy(), Some(Ok(ShardingStrategy::FullShard)));
        assert_eq!(fsdp.named_precision(), Some(Ok(MixedPrecision::Pure)));
        assert!(fsdp.extra.contains_key("activation_checkpointing_reentrant"));
    }

    #[test]
    fn test_custom_precision_mapping() {
        let text = "mixed_precision:\n  param_dtype: bf16\n  reduce_dtype: fp32\n";
        let fsdp: FsdpConfig = serde_yaml::from_str(text).unwrap();
        assert!(fsdp.named_precision().is_none());
        assert!(fsdp.mixed_precision.unwrap().is_mapping());
    }
}
