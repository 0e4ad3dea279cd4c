#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! runcfg core library
//!
//! Foundational types for working with LLM training run documents: the
//! ordered YAML tree, loading with duplicate-key detection,
//! `${variables.*}` interpolation, duration literals and storage URIs.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`document`]: Document tree, key paths and loading
//! - [`interpolate`]: Variable reference discovery and resolution
//! - [`duration`]: `100ba` / `1ep` duration literals
//! - [`uri`]: Local path vs. object-store URI classification

pub mod document;
pub mod duration;
pub mod error;
pub mod interpolate;
pub mod uri;

mod proptests;

// Re-exports for convenience
pub use document::{Document, KeyPath, Mapping, Node, load_file, load_str};
pub use duration::{Duration, DurationUnit};
pub use error::{Error, Result};
pub use interpolate::{Resolved, VariableRef, resolve};
pub use uri::StorageUri;
