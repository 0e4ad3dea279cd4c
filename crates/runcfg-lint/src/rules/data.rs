//! Dataloader and dataset rules.

use runcfg_core::{KeyPath, Node};

use super::{datasets, describe, is_unresolved};
use crate::context::LintContext;
use crate::diagnostic::{Diagnostic, Severity};
use crate::rule::Rule;

/// Keys that name where a dataset's shards come from.
const SOURCE_KEYS: &[&str] = &["remote", "local", "hf_name"];

/// Keys that name where a stream's shards come from.
const STREAM_SOURCE_KEYS: &[&str] = &["remote", "local"];

fn has_any(node: &Node, keys: &[&str]) -> bool {
    keys.iter().any(|k| node.get(k).is_some_and(|v| !v.is_null()))
}

/// A dataset sets at most one of `eos_token_id` and `bos_token_id`.
pub struct DatasetTokenIds;

impl Rule for DatasetTokenIds {
    fn id(&self) -> &'static str {
        "dataset-token-ids"
    }

    fn description(&self) -> &'static str {
        "a dataset does not set both eos_token_id and bos_token_id"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        for (path, dataset) in datasets(ctx.tree()) {
            if has_any(dataset, &["eos_token_id"]) && has_any(dataset, &["bos_token_id"]) {
                out.push(
                    self.diagnostic(
                        path,
                        "dataset sets both eos_token_id and bos_token_id".to_string(),
                    )
                    .with_help("concatenated samples are separated by one token; keep only one"),
                );
            }
        }
    }
}

/// `max_seq_len` is a positive integer wherever it appears.
pub struct DatasetMaxSeqLen;

impl Rule for DatasetMaxSeqLen {
    fn id(&self) -> &'static str {
        "dataset-max-seq-len"
    }

    fn description(&self) -> &'static str {
        "max_seq_len is a positive integer"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        let tree = ctx.tree();
        let mut fields: Vec<(KeyPath, &Node)> = Vec::new();
        if let Some(node) = tree.get("max_seq_len") {
            fields.push((KeyPath::root().key("max_seq_len"), node));
        }
        for (path, dataset) in datasets(tree) {
            if let Some(node) = dataset.get("max_seq_len") {
                fields.push((path.key("max_seq_len"), node));
            }
        }

        for (path, node) in fields {
            if is_unresolved(node) || is_positive_integral(node) {
                continue;
            }
            out.push(self.diagnostic(
                path,
                format!("max_seq_len must be a positive integer, found {}", describe(node)),
            ));
        }
    }
}

fn is_positive_integral(node: &Node) -> bool {
    match node {
        Node::Int(n) => *n > 0,
        Node::Float(f) => *f > 0.0 && f.fract() == 0.0,
        _ => false,
    }
}

/// `replication` is not negative; sequence-parallel replication is off.
///
/// Zero or null for either count means 1.
pub struct DatasetReplication;

impl Rule for DatasetReplication {
    fn id(&self) -> &'static str {
        "dataset-replication"
    }

    fn description(&self) -> &'static str {
        "replication is not negative and seq_parallel_replication is not above 1"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        for (path, dataset) in datasets(ctx.tree()) {
            for key in ["replication", "seq_parallel_replication"] {
                let Some(node) = dataset.get(key) else {
                    continue;
                };
                if node.is_null() || is_unresolved(node) {
                    continue;
                }
                match node.as_i64() {
                    Some(n) if n < 0 => out.push(self.diagnostic(
                        path.key(key),
                        format!("{key} must not be negative, found {n}"),
                    )),
                    Some(n) if n > 1 && key == "seq_parallel_replication" => out.push(
                        self.diagnostic(
                            path.key(key),
                            format!("sequence-parallel replication ({n}) is not supported"),
                        )
                        .with_help("set seq_parallel_replication to 1 or remove it"),
                    ),
                    Some(_) => {}
                    None => out.push(self.diagnostic(
                        path.key(key),
                        format!("{key} must be an integer, found {}", describe(node)),
                    )),
                }
            }
        }
    }
}

/// Every dataset and stream declares where its data lives.
pub struct DatasetSource;

impl Rule for DatasetSource {
    fn id(&self) -> &'static str {
        "dataset-source"
    }

    fn description(&self) -> &'static str {
        "every dataset and stream declares remote, local or hf_name, and split is a string"
    }

    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    fn check(&self, ctx: &LintContext<'_>, out: &mut Vec<Diagnostic>) {
        for (path, dataset) in datasets(ctx.tree()) {
            self.check_split(&path, dataset, out);

            match dataset.get("streams") {
                Some(Node::Map(streams)) => {
                    // Dataset-level remote/local are defaults for every stream.
                    let defaults = has_any(dataset, STREAM_SOURCE_KEYS);
                    for (name, stream) in streams.iter() {
                        let stream_path = path.key("streams").key(name);
                        if !defaults && !has_any(stream, STREAM_SOURCE_KEYS) {
                            out.push(self.diagnostic(
                                stream_path.clone(),
                                format!("stream '{name}' declares neither remote nor local"),
                            ));
                        }
                        self.check_split(&stream_path, stream, out);
                    }
                }
                Some(Node::Null) | None => {
                    if !has_any(dataset, SOURCE_KEYS) {
                        out.push(
                            self.diagnostic(path, "dataset declares no data source".to_string())
                                .with_help("set remote, local or hf_name, or list streams"),
                        );
                    }
                }
                Some(other) => out.push(self.diagnostic(
                    path.key("streams"),
                    format!("streams must be a mapping of stream names, found {}", describe(other)),
                )),
            }
        }
    }
}

impl DatasetSource {
    fn check_split(&self, path: &KeyPath, node: &Node, out: &mut Vec<Diagnostic>) {
        if let Some(split) = node.get("split")
            && !matches!(split, Node::String(_) | Node::Null)
        {
            out.push(self.diagnostic(
                path.key("split"),
                format!("split must be a string, found {}", describe(split)),
            ));
        }
    }
}
