//! Dataloader sections: `train_loader`, `eval_loader` and their datasets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// A field that may hold one item or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single item.
    One(T),
    /// A list of items.
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Items as a slice-like iterator.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let items: Vec<&T> = match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items.iter().collect(),
        };
        items.into_iter()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        match self {
            OneOrMany::One(_) => 1,
            OneOrMany::Many(items) => items.len(),
        }
    }

    /// Whether there are no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A `train_loader` / `eval_loader` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Loader kind, e.g. `text` or `finetuning`.
    pub name: Option<String>,

    /// Label for one of several eval loaders.
    pub label: Option<String>,

    /// Dataset definition.
    pub dataset: Option<DatasetConfig>,

    /// Drop the last incomplete batch.
    pub drop_last: Option<bool>,

    /// Dataloader worker processes.
    pub num_workers: Option<u32>,

    /// Loader-specific keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// `*_loader.dataset:` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Named streaming sources mixed into this dataset.
    pub streams: Option<BTreeMap<String, StreamConfig>>,

    /// Local cache directory for shards.
    pub local: Option<String>,

    /// Remote location of shards.
    pub remote: Option<String>,

    /// Hugging Face dataset id (finetuning loaders).
    pub hf_name: Option<String>,

    /// Split to read.
    pub split: Option<String>,

    /// Shuffle samples.
    pub shuffle: Option<bool>,

    /// Sequence length. Checked by lint rules.
    pub max_seq_len: Option<Value>,

    /// Token appended between concatenated samples.
    pub eos_token_id: Option<i64>,

    /// Token prepended between concatenated samples.
    pub bos_token_id: Option<i64>,

    /// Data replication factor. Checked by lint rules.
    pub replication: Option<Value>,

    /// Sequence-parallel replication factor. Checked by lint rules.
    pub seq_parallel_replication: Option<Value>,

    /// Dataset-specific keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DatasetConfig {
    /// Whether any shard source is declared on the dataset itself.
    pub fn has_source(&self) -> bool {
        self.local.is_some() || self.remote.is_some() || self.hf_name.is_some()
    }
}

/// One entry of `dataset.streams`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Local cache directory.
    pub local: Option<String>,

    /// Remote location.
    pub remote: Option<String>,

    /// Split to read.
    pub split: Option<String>,

    /// Sampling proportion relative to other streams.
    pub proportion: Option<f64>,

    /// Times to repeat the stream.
    pub repeat: Option<f64>,

    /// Absolute number of samples to draw.
    pub choose: Option<u64>,

    /// Stream-specific keys.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl StreamConfig {
    /// Whether a shard source is declared.
    pub fn has_source(&self) -> bool {
        self.local.is_some() || self.remote.is_some()
    }
}
