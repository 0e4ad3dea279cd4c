#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! runcfg schema library
//!
//! Typed, permissive views of resolved run documents. Unknown keys are kept
//! in `extra` maps so projection only fails when a known field has the wrong
//! shape.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`run`]: [`RunConfig`], the whole document
//! - [`model`]: Model, FFN and tokenizer sections
//! - [`data`]: Dataloader, dataset and stream sections
//! - [`fsdp`]: Sharding strategy and mixed precision
//! - [`eval`]: ICL task manifests and the eval gauntlet

pub mod data;
pub mod error;
pub mod eval;
pub mod fsdp;
pub mod model;
pub mod run;

// Re-exports for convenience
pub use data::{DatasetConfig, LoaderConfig, OneOrMany, StreamConfig};
pub use error::{Error, Result};
pub use eval::{
    EvalGauntlet, GauntletBenchmark, GauntletCategory, GauntletField, IclTask, IclTaskManifest,
    IclTaskType, IclTasksField, Weighting,
};
pub use fsdp::{FsdpConfig, MixedPrecision, ShardingStrategy};
pub use model::{FfnConfig, ModelConfig, TokenizerConfig};
pub use run::{EvalModelEntry, RunConfig};
