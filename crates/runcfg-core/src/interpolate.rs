//! `${variables.<name>}` interpolation.
//!
//! A run document may declare a top-level `variables:` block and reference
//! its entries anywhere else with `${variables.<name>}`. Dotted names reach
//! into nested variables (`${variables.data.remote}`).
//!
//! Resolution rules:
//!
//! - a string that is exactly one reference takes the referenced value with
//!   its type, so `global_seed: ${variables.seed}` stays an integer and a
//!   mapping variable is spliced in whole;
//! - a reference inside longer text is replaced by the scalar's text;
//!   embedding a mapping or sequence is an error;
//! - variables may reference other variables; loops are an error;
//! - a missing variable is an error; there are no defaults;
//! - other interpolations (`${oc.env:HOME}`) are left as written;
//! - the `variables:` block is dropped from the resolved document.
//!
//! ```rust
//! use runcfg_core::document::{load_str, Node};
//! use runcfg_core::interpolate::resolve;
//!
//! let doc = load_str(
//!     "variables:\n  seed: 17\n  run: demo\nglobal_seed: ${variables.seed}\nsave_folder: ./${variables.run}/ckpt\n",
//! ).unwrap();
//! let resolved = resolve(&doc).unwrap();
//! assert_eq!(resolved.document().get("global_seed"), Some(&Node::Int(17)));
//! assert_eq!(resolved.document().get("save_folder").and_then(Node::as_str), Some("./demo/ckpt"));
//! assert!(resolved.document().get("variables").is_none());
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::document::{Document, KeyPath, Mapping, Node, VARIABLES_KEY};
use crate::error::{Error, Result};

/// Minimum Jaro-Winkler similarity for a did-you-mean suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\s*variables\.([A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)*)\s*\}")
        .expect("valid variable reference regex")
});

/// One `${variables.*}` occurrence in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRef {
    /// Dotted variable name, without the `variables.` prefix.
    pub name: String,
    /// Location of the string that contains the reference.
    pub path: KeyPath,
}

impl VariableRef {
    /// First segment of the name: the top-level variable it depends on.
    pub fn root_name(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }

    /// Whether the reference sits inside the `variables:` block itself.
    pub fn is_in_variables_block(&self) -> bool {
        self.path.starts_with(&KeyPath::root().key(VARIABLES_KEY))
    }
}

/// Every variable reference in the document, in document order.
///
/// References inside the `variables:` block are included.
pub fn find_references(doc: &Document) -> Vec<VariableRef> {
    let mut refs = Vec::new();
    doc.root().walk(|path, node| {
        if let Node::String(s) = node {
            for caps in REFERENCE_RE.captures_iter(s) {
                refs.push(VariableRef {
                    name: caps[1].to_string(),
                    path: path.clone(),
                });
            }
        }
    });
    refs
}

/// Whether `text` contains at least one variable reference.
pub fn has_reference(text: &str) -> bool {
    REFERENCE_RE.is_match(text)
}

/// Whether `name` (dotted) is defined in `variables`.
pub fn is_defined(variables: &Mapping, name: &str) -> bool {
    lookup(variables, name).is_some()
}

/// Closest defined variable name to `name`, if any is similar enough.
pub fn suggest(variables: &Mapping, name: &str) -> Option<String> {
    let mut candidates = Vec::new();
    collect_names(variables, "", &mut candidates);
    candidates
        .into_iter()
        .map(|c| (strsim::jaro_winkler(name, &c), c))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c)
}

/// A document with every variable reference substituted.
#[derive(Debug, Clone)]
pub struct Resolved {
    document: Document,
    declared: Vec<String>,
    used: BTreeSet<String>,
}

impl Resolved {
    /// The resolved document, without its `variables:` block.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Take the resolved document.
    pub fn into_document(self) -> Document {
        self.document
    }

    /// Top-level variable names that some reference reached, directly or
    /// through another variable.
    pub fn used(&self) -> &BTreeSet<String> {
        &self.used
    }

    /// Top-level variables declared but never reached, in declaration order.
    pub fn unused(&self) -> Vec<&str> {
        self.declared
            .iter()
            .filter(|name| !self.used.contains(*name))
            .map(String::as_str)
            .collect()
    }
}

/// Substitute every `${variables.*}` reference in `doc`.
pub fn resolve(doc: &Document) -> Result<Resolved> {
    let empty = Mapping::new();
    let variables = doc.variables().unwrap_or(&empty);
    let mut resolver = Resolver {
        variables,
        cache: HashMap::new(),
        stack: Vec::new(),
        used: BTreeSet::new(),
    };

    let root = match doc.root() {
        Node::Map(m) => {
            let mut out = Mapping::new();
            for (key, value) in m.iter() {
                if key == VARIABLES_KEY {
                    continue;
                }
                let path = KeyPath::root().key(key);
                out.insert(key, resolver.resolve_node(value, &path)?);
            }
            Node::Map(out)
        }
        other => resolver.resolve_node(other, &KeyPath::root())?,
    };

    log::debug!(
        "Resolved {} with {} of {} variables used",
        doc.label(),
        resolver.used.len(),
        variables.len()
    );

    let mut document = Document::new(root);
    if let Some(source) = doc.source() {
        document = document.with_source(source);
    }
    Ok(Resolved {
        document,
        declared: variables.keys().map(String::from).collect(),
        used: resolver.used,
    })
}

struct Resolver<'a> {
    variables: &'a Mapping,
    cache: HashMap<String, Node>,
    stack: Vec<String>,
    used: BTreeSet<String>,
}

impl Resolver<'_> {
    fn resolve_node(&mut self, node: &Node, path: &KeyPath) -> Result<Node> {
        Ok(match node {
            Node::String(s) => self.resolve_string(s, path)?,
            Node::Seq(items) => Node::Seq(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.resolve_node(item, &path.index(i)))
                    .collect::<Result<_>>()?,
            ),
            Node::Map(m) => {
                let mut out = Mapping::new();
                for (key, value) in m.iter() {
                    out.insert(key, self.resolve_node(value, &path.key(key))?);
                }
                Node::Map(out)
            }
            scalar => scalar.clone(),
        })
    }

    fn resolve_string(&mut self, s: &str, path: &KeyPath) -> Result<Node> {
        if let Some(caps) = REFERENCE_RE.captures(s) {
            if caps.get(0).is_some_and(|m| m.as_str().len() == s.len()) {
                return self.variable(&caps[1], path);
            }
        } else {
            return Ok(Node::String(s.to_string()));
        }

        let mut failure = None;
        let text = REFERENCE_RE.replace_all(s, |caps: &Captures<'_>| {
            if failure.is_some() {
                return String::new();
            }
            let name = &caps[1];
            match self.variable(name, path) {
                Ok(value) => match value.scalar_text() {
                    Some(text) => text,
                    None => {
                        failure = Some(Error::NonScalarEmbed {
                            name: name.to_string(),
                            path: path.clone(),
                        });
                        String::new()
                    }
                },
                Err(e) => {
                    failure = Some(e);
                    String::new()
                }
            }
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(Node::String(text.into_owned())),
        }
    }

    fn variable(&mut self, name: &str, path: &KeyPath) -> Result<Node> {
        if let Some(root) = name.split('.').next() {
            self.used.insert(root.to_string());
        }
        if let Some(value) = self.cache.get(name) {
            return Ok(value.clone());
        }
        if let Some(pos) = self.stack.iter().position(|n| n == name) {
            let mut chain = self.stack[pos..].to_vec();
            chain.push(name.to_string());
            return Err(Error::VariableCycle { chain });
        }

        let raw = lookup(self.variables, name).ok_or_else(|| Error::UndefinedVariable {
            name: name.to_string(),
            path: path.clone(),
            suggestion: suggest(self.variables, name),
        })?;

        let mut var_path = KeyPath::root().key(VARIABLES_KEY);
        for part in name.split('.') {
            var_path = var_path.key(part);
        }

        self.stack.push(name.to_string());
        let resolved = self.resolve_node(raw, &var_path);
        self.stack.pop();

        let value = resolved?;
        self.cache.insert(name.to_string(), value.clone());
        Ok(value)
    }
}

fn lookup<'a>(variables: &'a Mapping, name: &str) -> Option<&'a Node> {
    let mut parts = name.split('.');
    let mut current = variables.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

fn collect_names(mapping: &Mapping, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in mapping.iter() {
        let name = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };
        if let Node::Map(inner) = value {
            collect_names(inner, &name, out);
        }
        out.push(name);
    }
}
