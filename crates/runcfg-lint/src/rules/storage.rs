//! Storage locations and checkpoint loading.

use std::path::Path;

use runcfg_core::uri::KNOWN_SCHEMES;
use runcfg_core::{KeyPath, Node, StorageUri};

use super::{datasets, is_unresolved};
use crate::context::LintContext;
use crate::diagnostic::{Diagnostic, Severity};
use crate::rule::Rule;

/// Storage locations use a scheme the training framework can read.
pub struct StorageUriCheck;

impl Rule for StorageUriCheck {
    fn id(&self) -> &'static str {
        "storage-uri"
    }

    fn description(&self) -> &'static str {
        "checkpoint, dataset and task locations use a known URI scheme"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        let tree = ctx.tree();
        let extra = &ctx.settings().extra_uri_schemes;
        let mut locations: Vec<(KeyPath, &Node)> = Vec::new();

        for key in ["save_folder", "load_path"] {
            if let Some(node) = tree.get(key) {
                locations.push((KeyPath::root().key(key), node));
            }
        }
        if let Some(entries) = tree.get("models").and_then(Node::as_seq) {
            for (i, entry) in entries.iter().enumerate() {
                if let Some(node) = entry.get("load_path") {
                    locations.push((KeyPath::root().key("models").index(i).key("load_path"), node));
                }
            }
        }
        for (path, dataset) in datasets(tree) {
            for key in ["remote", "local"] {
                if let Some(node) = dataset.get(key) {
                    locations.push((path.key(key), node));
                }
            }
            if let Some(streams) = dataset.get("streams").and_then(Node::as_map) {
                for (name, stream) in streams.iter() {
                    for key in ["remote", "local"] {
                        if let Some(node) = stream.get(key) {
                            locations.push((path.key("streams").key(name).key(key), node));
                        }
                    }
                }
            }
        }

        for (path, node) in locations {
            let Some(text) = node.as_str() else {
                continue;
            };
            if is_unresolved(node) {
                continue;
            }
            if let Some(d) = self.check_location(path, text, extra, None) {
                out.push(d);
            }
        }

        if let Some(source) = ctx.icl_tasks() {
            for (i, task) in source.tasks.iter().enumerate() {
                let Some(uri) = task.dataset_uri.as_deref() else {
                    continue;
                };
                let path = source.base.index(i).key("dataset_uri");
                if let Some(d) = self.check_location(path, uri, extra, source.file) {
                    out.push(d);
                }
            }
        }
    }
}

impl StorageUriCheck {
    fn check_location(
        &self,
        path: KeyPath,
        text: &str,
        extra: &[String],
        file: Option<&Path>,
    ) -> Option<Diagnostic> {
        match StorageUri::parse_with(text, extra) {
            StorageUri::Remote {
                scheme,
                known: false,
                ..
            } => Some(
                self.diagnostic(path, format!("unknown storage scheme '{scheme}' in '{text}'"))
                    .with_help(format!(
                        "known schemes: {}; add others to extra_uri_schemes",
                        KNOWN_SCHEMES.join(", ")
                    ))
                    .in_file(file),
            ),
            _ => None,
        }
    }
}

/// `load_weights_only` only matters when something is loaded.
pub struct CheckpointLoad;

impl Rule for CheckpointLoad {
    fn id(&self) -> &'static str {
        "checkpoint-load"
    }

    fn description(&self) -> &'static str {
        "load_weights_only is set together with load_path or autoresume"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        let tree = ctx.tree();
        let set = |key: &str| tree.get(key).is_some_and(|n| !n.is_null());
        let weights_only = tree.get("load_weights_only").and_then(Node::as_bool) == Some(true);
        let autoresume = tree.get("autoresume").and_then(Node::as_bool) == Some(true);

        if weights_only && !set("load_path") && !autoresume {
            out.push(
                self.diagnostic(
                    KeyPath::root().key("load_weights_only"),
                    "load_weights_only has no effect without load_path".to_string(),
                )
                .with_help("set load_path or remove load_weights_only"),
            );
        }
    }
}
