//! Run documents: an ordered YAML tree plus where it came from.

mod load;
mod node;
mod path;

use std::path::{Path, PathBuf};

pub use load::{load_file, load_str};
pub use node::{Mapping, Node};
pub use path::{KeyPath, Segment};

use crate::error::{Error, Result};

/// Name of the top-level block that `${variables.*}` references resolve
/// against.
pub const VARIABLES_KEY: &str = "variables";

/// A loaded run document.
///
/// The root is always a mapping; [`load_str`] and [`load_file`] reject
/// anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Node,
    source: Option<PathBuf>,
}

impl Document {
    /// Wrap an already-built tree.
    pub fn new(root: Node) -> Self {
        Self { root, source: None }
    }

    /// Attach the file the document was read from.
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Take the root node.
    pub fn into_root(self) -> Node {
        self.root
    }

    /// File the document was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Directory relative references in this document resolve against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source.as_deref().and_then(Path::parent)
    }

    /// Label for messages: the file path, or `<string>`.
    pub fn label(&self) -> String {
        self.source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<string>".to_string())
    }

    /// Node at a dotted key such as `model.name` or `icl_tasks[0].label`.
    ///
    /// Returns `None` when the key does not parse or nothing is there.
    pub fn get(&self, key: &str) -> Option<&Node> {
        let path: KeyPath = key.parse().ok()?;
        self.root.get_path(&path)
    }

    /// Node at a parsed path.
    pub fn lookup(&self, path: &KeyPath) -> Option<&Node> {
        self.root.get_path(path)
    }

    /// The `variables:` block, if present and a mapping.
    pub fn variables(&self) -> Option<&Mapping> {
        self.root.get(VARIABLES_KEY)?.as_map()
    }

    /// Render back to YAML text.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(&self.root).map_err(Error::from)
    }
}
