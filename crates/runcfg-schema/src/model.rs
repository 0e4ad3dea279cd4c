//! Model and tokenizer sections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Model names served through the Foundation Model API wrappers.
pub const FMAPI_MODEL_NAMES: &[&str] = &["fmapi_causal_lm", "fmapi_chat"];

/// FFN types backed by MegaBlocks mixture-of-experts layers.
pub const MEGABLOCKS_FFN_TYPES: &[&str] = &["mb_moe", "mb_dmoe"];

/// `model:` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Registered model builder, e.g. `hf_causal_lm` or `mpt_causal_lm`.
    pub name: Option<String>,

    /// Hub id or local path of the pretrained weights.
    pub pretrained_model_name_or_path: Option<String>,

    /// Load pretrained weights (as opposed to random init).
    pub pretrained: Option<bool>,

    /// Quantize weights to 8 bits on load.
    #[serde(default)]
    pub load_in_8bit: bool,

    /// Endpoint is served locally (FMAPI wrappers).
    #[serde(default)]
    pub local: bool,

    /// Endpoint base URL (FMAPI wrappers).
    pub base_url: Option<String>,

    /// Mixture-of-experts FFN configuration.
    pub ffn_config: Option<FfnConfig>,

    /// Builder-specific keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ModelConfig {
    /// Whether this model is reached through a Foundation Model API endpoint.
    pub fn is_fmapi(&self) -> bool {
        self.name
            .as_deref()
            .is_some_and(|n| FMAPI_MODEL_NAMES.contains(&n))
    }
}

/// `model.ffn_config:` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfnConfig {
    /// FFN implementation, e.g. `mptmlp` or `mb_dmoe`.
    pub ffn_type: Option<String>,

    /// Number of ranks experts are sharded over. Checked by lint rules.
    pub moe_world_size: Option<Value>,

    /// Load-balancing-loss process group. Checked by lint rules.
    pub lbl_process_group: Option<Value>,

    /// Device mesh shape. Checked by lint rules.
    pub device_mesh: Option<Value>,

    /// Implementation-specific keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl FfnConfig {
    /// Whether the FFN is a MegaBlocks MoE layer.
    pub fn is_megablocks(&self) -> bool {
        self.ffn_type
            .as_deref()
            .is_some_and(|t| MEGABLOCKS_FFN_TYPES.contains(&t))
    }
}

/// `tokenizer:` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Hub id or local path of the tokenizer.
    pub name: Option<String>,

    /// Constructor keyword arguments (`model_max_length`, ...).
    #[serde(default)]
    pub kwargs: BTreeMap<String, Value>,
}

impl TokenizerConfig {
    /// `kwargs.model_max_length`, if it is an integer.
    pub fn model_max_length(&self) -> Option<i64> {
        self.kwargs.get("model_max_length")?.as_i64()
    }
}
