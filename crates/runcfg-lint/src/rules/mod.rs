//! Built-in rules.

mod batch;
mod data;
mod document;
mod duration;
mod eval;
mod fsdp;
mod model;
mod run;
mod storage;
mod variables;

use runcfg_core::interpolate::has_reference;
use runcfg_core::{KeyPath, Node};

use crate::rule::Rule;

pub use batch::BatchSize;
pub use data::{DatasetMaxSeqLen, DatasetReplication, DatasetSource, DatasetTokenIds};
pub use document::{DuplicateKey, Parse, Schema};
pub use duration::DurationLiteral;
pub use eval::{Gauntlet, IclTaskCheck, ManifestRef};
pub use fsdp::{Fsdp8Bit, FsdpOptions};
pub use model::{FmapiEndpoint, MoeConfig};
pub use run::RunIdentity;
pub use storage::{CheckpointLoad, StorageUriCheck};
pub use variables::{UndefinedVariable, UnusedVariable, VariableCycle};

/// Every built-in rule, in reporting order.
pub fn builtin() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(Parse),
        Box::new(DuplicateKey),
        Box::new(Schema),
        Box::new(UndefinedVariable),
        Box::new(UnusedVariable),
        Box::new(VariableCycle),
        Box::new(RunIdentity),
        Box::new(Fsdp8Bit),
        Box::new(FsdpOptions),
        Box::new(DurationLiteral),
        Box::new(BatchSize),
        Box::new(DatasetTokenIds),
        Box::new(DatasetMaxSeqLen),
        Box::new(DatasetReplication),
        Box::new(DatasetSource),
        Box::new(StorageUriCheck),
        Box::new(CheckpointLoad),
        Box::new(FmapiEndpoint),
        Box::new(MoeConfig),
        Box::new(IclTaskCheck),
        Box::new(Gauntlet),
        Box::new(ManifestRef),
    ]
}

/// Whether `node` still holds an unresolved `${variables.*}` reference.
///
/// Shape checks skip such values; the variable rules report them.
pub(crate) fn is_unresolved(node: &Node) -> bool {
    matches!(node, Node::String(s) if has_reference(s))
}

/// `train_loader.dataset` and every eval loader's dataset.
pub(crate) fn datasets(tree: &Node) -> Vec<(KeyPath, &Node)> {
    let mut loaders: Vec<(KeyPath, &Node)> = Vec::new();
    if let Some(train) = tree.get("train_loader") {
        loaders.push((KeyPath::root().key("train_loader"), train));
    }
    match tree.get("eval_loader") {
        Some(Node::Seq(items)) => {
            for (i, item) in items.iter().enumerate() {
                loaders.push((KeyPath::root().key("eval_loader").index(i), item));
            }
        }
        Some(single) => loaders.push((KeyPath::root().key("eval_loader"), single)),
        None => {}
    }
    loaders
        .into_iter()
        .filter_map(|(path, loader)| {
            let dataset = loader.get("dataset").filter(|d| d.as_map().is_some())?;
            Some((path.key("dataset"), dataset))
        })
        .collect()
}

/// `model` and every `models[i].model`.
pub(crate) fn models(tree: &Node) -> Vec<(KeyPath, &Node)> {
    let mut out = Vec::new();
    if let Some(model) = tree.get("model").filter(|m| m.as_map().is_some()) {
        out.push((KeyPath::root().key("model"), model));
    }
    if let Some(entries) = tree.get("models").and_then(Node::as_seq) {
        for (i, entry) in entries.iter().enumerate() {
            if let Some(model) = entry.get("model").filter(|m| m.as_map().is_some()) {
                out.push((KeyPath::root().key("models").index(i).key("model"), model));
            }
        }
    }
    out
}

/// Short rendering of a value for messages.
pub(crate) fn describe(node: &Node) -> String {
    match node.scalar_text() {
        Some(text) if matches!(node, Node::String(_)) => format!("'{text}'"),
        Some(text) => text,
        None => format!("a {}", node.kind()),
    }
}

/// Run one rule over `text` with default settings.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) fn run_rule(rule: &dyn Rule, text: &str) -> Vec<crate::Diagnostic> {
    let doc = runcfg_core::load_str(text).unwrap();
    let settings = crate::LintSettings::default();
    let ctx = crate::LintContext::new(&doc, &settings);
    let mut out = Vec::new();
    rule.check(&ctx, &mut out);
    out
}

/// Paths of the findings, rendered.
#[cfg(test)]
pub(crate) fn paths(found: &[crate::Diagnostic]) -> Vec<String> {
    found.iter().map(|d| d.path.to_string()).collect()
}
