//! The whole run document.

use std::collections::BTreeMap;

use runcfg_core::{Document, Node};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::data::{LoaderConfig, OneOrMany};
use crate::error::{Error, Result};
use crate::eval::{GauntletField, IclTasksField};
use crate::fsdp::FsdpConfig;
use crate::model::{ModelConfig, TokenizerConfig};

/// Section label used when a failure cannot be pinned to one key.
pub const ROOT_SECTION: &str = "<root>";

/// Typed view of a resolved run document.
///
/// Every field is optional and unknown keys land in [`RunConfig::extra`].
/// Fields that lint rules inspect for shape (durations, batch sizes, seeds)
/// are kept as raw [`Value`]s so a bad value is reported once, by the rule
/// that owns it, rather than failing the projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Run label.
    pub run_name: Option<Value>,

    /// Seed for every RNG.
    pub global_seed: Option<Value>,

    /// Legacy spelling of `global_seed` in eval documents.
    pub seed: Option<Value>,

    /// Sequence length shared by model, tokenizer and loaders.
    pub max_seq_len: Option<Value>,

    /// Model to train.
    pub model: Option<ModelConfig>,

    /// Tokenizer.
    pub tokenizer: Option<TokenizerConfig>,

    /// Models to evaluate (eval documents).
    #[serde(default)]
    pub models: Vec<EvalModelEntry>,

    /// Training dataloader.
    pub train_loader: Option<LoaderConfig>,

    /// One eval dataloader or several labelled ones.
    pub eval_loader: Option<OneOrMany<LoaderConfig>>,

    /// Learning-rate scheduler.
    pub scheduler: Option<Value>,

    /// Optimizer.
    pub optimizer: Option<Value>,

    /// Training algorithms such as gradient clipping.
    pub algorithms: Option<Value>,

    /// Training length as a duration literal.
    pub max_duration: Option<Value>,

    /// Evaluation period as a duration literal.
    pub eval_interval: Option<Value>,

    /// Evaluate before the first batch.
    pub eval_first: Option<bool>,

    /// Batches per evaluation; `-1` for all.
    pub eval_subset_num_batches: Option<i64>,

    /// Batch size summed over all ranks.
    pub global_train_batch_size: Option<Value>,

    /// Per-device microbatch size or `auto`.
    pub device_train_microbatch_size: Option<Value>,

    /// Per-device eval batch size.
    pub device_eval_batch_size: Option<Value>,

    /// Autocast precision, e.g. `amp_bf16`.
    pub precision: Option<String>,

    /// Sharding policy.
    pub fsdp_config: Option<FsdpConfig>,

    /// Checkpoint destination.
    pub save_folder: Option<String>,

    /// Checkpoint period as a duration literal.
    pub save_interval: Option<Value>,

    /// Checkpoints to retain; `-1` keeps all.
    pub save_num_checkpoints_to_keep: Option<i64>,

    /// Checkpoint to start from.
    pub load_path: Option<String>,

    /// Load weights but not optimizer state.
    pub load_weights_only: Option<bool>,

    /// Resume from the latest checkpoint in `save_folder`.
    pub autoresume: Option<bool>,

    /// ICL task manifest path or inline list.
    pub icl_tasks: Option<IclTasksField>,

    /// Gauntlet file path or inline gauntlet.
    pub eval_gauntlet: Option<GauntletField>,

    /// Logger destinations.
    pub loggers: Option<Value>,

    /// Training callbacks.
    pub callbacks: Option<Value>,

    /// Remaining top-level keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One entry of `models:` in an eval document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvalModelEntry {
    /// Name reported in eval tables.
    pub model_name: Option<String>,

    /// Model to evaluate.
    pub model: Option<ModelConfig>,

    /// Its tokenizer.
    pub tokenizer: Option<TokenizerConfig>,

    /// Checkpoint to evaluate.
    pub load_path: Option<String>,

    /// Remaining keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RunConfig {
    /// Project a resolved document root.
    ///
    /// On failure the error names the first top-level section that does not
    /// fit the schema on its own.
    pub fn from_node(node: &Node) -> Result<Self> {
        let map = node.as_map().ok_or_else(|| {
            Error::schema(
                ROOT_SECTION,
                format!("expected a mapping, found {}", node.kind()),
            )
        })?;
        match project::<RunConfig>(node.to_yaml_value()) {
            Ok(config) => Ok(config),
            Err(message) => {
                for (key, value) in map.iter() {
                    let mut single = serde_yaml::Mapping::new();
                    single.insert(Value::String(key.to_string()), value.to_yaml_value());
                    if let Err(message) = project::<RunConfig>(Value::Mapping(single)) {
                        return Err(Error::schema(key, message));
                    }
                }
                Err(Error::schema(ROOT_SECTION, message))
            }
        }
    }

    /// Project a resolved document.
    pub fn from_document(doc: &Document) -> Result<Self> {
        Self::from_node(doc.root())
    }

    /// Every model in the document with its key path prefix:
    /// `model` itself and each `models[i].model`.
    pub fn all_models(&self) -> Vec<(String, &ModelConfig)> {
        let mut out = Vec::new();
        if let Some(model) = &self.model {
            out.push(("model".to_string(), model));
        }
        for (i, entry) in self.models.iter().enumerate() {
            if let Some(model) = &entry.model {
                out.push((format!("models[{i}].model"), model));
            }
        }
        out
    }

    /// Eval loaders as a list.
    pub fn eval_loaders(&self) -> Vec<&LoaderConfig> {
        self.eval_loader
            .as_ref()
            .map(|l| l.iter().collect())
            .unwrap_or_default()
    }
}

fn project<T: DeserializeOwned>(value: Value) -> std::result::Result<T, String> {
    serde_yaml::from_value(value).map_err(|e| e.to_string())
}
