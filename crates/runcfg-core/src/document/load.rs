//! YAML loading with duplicate-key detection.
//!
//! `serde_yaml` resolves anchors and aliases, but silently keeps the last of
//! two equal keys when deserializing into its own `Value`. Run documents are
//! loaded through an intermediate tree that keeps every entry, so a repeated
//! key can be reported with the path of the mapping that holds it.
//!
//! ```rust
//! use runcfg_core::document::load_str;
//!
//! let doc = load_str("run_name: demo\nmodel:\n  name: hf_causal_lm\n").unwrap();
//! assert_eq!(doc.get("model.name").and_then(|n| n.as_str()), Some("hf_causal_lm"));
//!
//! let err = load_str("a: 1\na: 2\n").unwrap_err();
//! assert!(err.to_string().contains("Duplicate key 'a'"));
//! ```

use std::fmt;
use std::path::Path;

use serde::de::{self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor};

use super::node::{Mapping, Node};
use super::path::KeyPath;
use super::Document;
use crate::error::{Error, Result};

/// YAML merge key.
const MERGE_KEY: &str = "<<";

/// Load a run document from YAML text.
pub fn load_str(text: &str) -> Result<Document> {
    if is_blank(text) {
        return Err(Error::EmptyDocument);
    }
    let raw: RawNode = serde_yaml::from_str(text)?;
    let root = raw.into_node(&KeyPath::root())?;
    match root {
        Node::Null => Err(Error::EmptyDocument),
        Node::Map(_) => Ok(Document::new(root)),
        other => Err(Error::NotAMapping {
            found: other.kind(),
        }),
    }
}

/// Load a run document from a file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    log::debug!("Loading run document from {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
    let doc = load_str(&text)?;
    Ok(doc.with_source(path))
}

/// Whether the text holds nothing but comments, blank lines and document
/// markers.
fn is_blank(text: &str) -> bool {
    text.lines().map(str::trim).all(|line| {
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

/// Tree exactly as written, duplicates included.
#[derive(Debug)]
enum RawNode {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Seq(Vec<RawNode>),
    Map(Vec<(String, RawNode)>),
}

impl RawNode {
    fn into_node(self, path: &KeyPath) -> Result<Node> {
        Ok(match self {
            RawNode::Null => Node::Null,
            RawNode::Bool(b) => Node::Bool(b),
            RawNode::Int(i) => Node::Int(i),
            RawNode::Float(f) => Node::Float(f),
            RawNode::String(s) => Node::String(s),
            RawNode::Seq(items) => Node::Seq(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| item.into_node(&path.index(i)))
                    .collect::<Result<_>>()?,
            ),
            RawNode::Map(entries) => Node::Map(build_mapping(entries, path)?),
        })
    }
}

fn build_mapping(entries: Vec<(String, RawNode)>, path: &KeyPath) -> Result<Mapping> {
    let mut mapping = Mapping::new();
    let mut merged: Vec<Mapping> = Vec::new();

    for (key, value) in entries {
        if key == MERGE_KEY {
            match value.into_node(&path.key(MERGE_KEY))? {
                Node::Map(m) => merged.push(m),
                Node::Seq(items) => {
                    for (i, item) in items.into_iter().enumerate() {
                        match item {
                            Node::Map(m) => merged.push(m),
                            other => {
                                return Err(Error::parse(format!(
                                    "merge key at {path} must reference mappings, found {} at index {i}",
                                    other.kind()
                                )));
                            }
                        }
                    }
                }
                other => {
                    return Err(Error::parse(format!(
                        "merge key at {path} must reference a mapping, found {}",
                        other.kind()
                    )));
                }
            }
            continue;
        }

        if mapping.contains_key(&key) {
            return Err(Error::DuplicateKey {
                path: path.clone(),
                key,
            });
        }
        let child = value.into_node(&path.key(key.as_str()))?;
        mapping.insert(key, child);
    }

    // Explicit keys win over merged ones; earlier merge sources win over later.
    for source in merged {
        for (key, value) in source {
            if !mapping.contains_key(&key) {
                mapping.insert(key, value);
            }
        }
    }
    Ok(mapping)
}

impl<'de> Deserialize<'de> for RawNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(RawNodeVisitor)
    }
}

struct RawNodeVisitor;

impl<'de> Visitor<'de> for RawNodeVisitor {
    type Value = RawNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any YAML value")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<RawNode, D::Error> {
        RawNode::deserialize(d)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<RawNode, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => RawNode::Int(i),
            Err(_) => RawNode::Float(v as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<RawNode, E> {
        Ok(RawNode::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<RawNode, E> {
        Ok(RawNode::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<RawNode, E> {
        Ok(RawNode::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<RawNode, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(RawNode::Seq(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<RawNode, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((RawKey(key), value)) = map.next_entry::<RawKey, RawNode>()? {
            entries.push((key, value));
        }
        Ok(RawNode::Map(entries))
    }

    // Custom tags (`!foo value`) arrive as enums; the tag is dropped.
    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> std::result::Result<RawNode, A::Error> {
        let (_tag, variant): (RawKey, _) = data.variant()?;
        variant.newtype_variant()
    }
}

/// Mapping key rendered to text.
struct RawKey(String);

impl<'de> Deserialize<'de> for RawKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct KeyVisitor;

        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = RawKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a scalar mapping key")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<RawKey, E> {
                Ok(RawKey("null".to_string()))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<RawKey, E> {
                Ok(RawKey(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<RawKey, E> {
                Ok(RawKey(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<RawKey, E> {
                Ok(RawKey(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<RawKey, E> {
                Ok(RawKey(v.to_string()))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<RawKey, E> {
                Ok(RawKey(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<RawKey, E> {
                Ok(RawKey(v))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}
