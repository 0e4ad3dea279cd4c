//! Key paths into a document tree.
//!
//! A [`KeyPath`] addresses one node: `train_loader.dataset.streams.c4.remote`
//! or `icl_tasks[2].num_fewshot`. Paths parse from and display as that
//! dotted form, so they double as the `get` syntax of the CLI and the
//! location shown in diagnostics.
//!
//! Keys that would be ambiguous in dotted form (containing `.`, `[`, `]` or
//! `"`, empty, or with surrounding whitespace) are written in brackets as a
//! quoted string: `callbacks["speed.monitor"].window_size`. Inside the
//! quotes, `\` escapes the next character.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::Error;

/// One step of a [`KeyPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Mapping key.
    Key(String),
    /// Sequence index.
    Index(usize),
}

/// Location of a node inside a document, from the root down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    /// The empty path, addressing the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Whether this path addresses the root.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segments from root to leaf.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// A new path with `key` appended.
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Key(key.into()));
        next
    }

    /// A new path with `index` appended.
    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.segments.push(Segment::Index(index));
        next
    }

    /// The path one level up, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.segments.pop();
        Some(parent)
    }

    /// The final mapping key, if the path ends in one.
    pub fn last_key(&self) -> Option<&str> {
        match self.segments.last() {
            Some(Segment::Key(k)) => Some(k),
            _ => None,
        }
    }

    /// Whether `prefix` is an ancestor of (or equal to) this path.
    pub fn starts_with(&self, prefix: &KeyPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

const ROOT_LABEL: &str = "<root>";

fn needs_quotes(key: &str) -> bool {
    key.is_empty()
        || key == ROOT_LABEL
        || key.trim() != key
        || key.contains(['.', '[', ']', '"'])
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str(ROOT_LABEL);
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(k) if needs_quotes(k) => {
                    let escaped = k.replace('\\', "\\\\").replace('"', "\\\"");
                    write!(f, "[\"{escaped}\"]")?;
                }
                Segment::Key(k) if i == 0 => write!(f, "{k}")?,
                Segment::Key(k) => write!(f, ".{k}")?,
                Segment::Index(n) => write!(f, "[{n}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for KeyPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidKeyPath(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == ROOT_LABEL {
            return Ok(Self::root());
        }

        let mut path = Self::root();
        let mut rest = trimmed;
        loop {
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            let (key, tail) = rest.split_at(end);
            let before = path.segments.len();
            if !key.is_empty() {
                path.segments.push(Segment::Key(key.to_string()));
            }
            rest = tail;
            while let Some(inner) = rest.strip_prefix('[') {
                let (segment, after) = parse_bracket(inner).ok_or_else(invalid)?;
                path.segments.push(segment);
                rest = after;
            }
            if path.segments.len() == before {
                return Err(invalid());
            }
            match rest.strip_prefix('.') {
                Some(next) => rest = next,
                None if rest.is_empty() => return Ok(path),
                None => return Err(invalid()),
            }
        }
    }
}

/// Parse the inside of `[...]` (after the `[`): an index or a quoted key.
fn parse_bracket(inner: &str) -> Option<(Segment, &str)> {
    let Some(quoted) = inner.strip_prefix('"') else {
        let close = inner.find(']')?;
        let index = inner[..close].trim().parse().ok()?;
        return Some((Segment::Index(index), &inner[close + 1..]));
    };

    let mut key = String::new();
    let mut chars = quoted.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => key.push(chars.next()?.1),
            '"' => {
                let after = quoted[i + 1..].strip_prefix(']')?;
                return Some((Segment::Key(key), after));
            }
            c => key.push(c),
        }
    }
    None
}

impl Serialize for KeyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
