//! The ordered document tree.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::path::{KeyPath, Segment};

/// One node of a run document.
///
/// Mappings keep their keys in document order; keys are always strings
/// (non-string YAML keys are rendered to their scalar text on load).
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `null` or `~` or an empty value.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String scalar.
    String(String),
    /// Sequence.
    Seq(Vec<Node>),
    /// Mapping.
    Map(Mapping),
}

impl Node {
    /// Human-readable kind, used in messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Int(_) => "integer",
            Node::Float(_) => "float",
            Node::String(_) => "string",
            Node::Seq(_) => "sequence",
            Node::Map(_) => "mapping",
        }
    }

    /// Whether this is a scalar (anything but a sequence or mapping).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Node::Seq(_) | Node::Map(_))
    }

    /// Whether this node is `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// String content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean content, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer content, if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric content as a float, for integers and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Int(i) => Some(*i as f64),
            Node::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Mapping content, if this is a mapping.
    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Node::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Sequence content, if this is a sequence.
    pub fn as_seq(&self) -> Option<&[Node]> {
        match self {
            Node::Seq(s) => Some(s),
            _ => None,
        }
    }

    /// Child of a mapping by key.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map()?.get(key)
    }

    /// Descendant addressed by `path`.
    pub fn get_path(&self, path: &KeyPath) -> Option<&Node> {
        let mut current = self;
        for segment in path.segments() {
            current = match (segment, current) {
                (Segment::Key(k), Node::Map(m)) => m.get(k)?,
                (Segment::Index(i), Node::Seq(s)) => s.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Scalar rendered as plain text, the way it appears when embedded in a
    /// string. `None` for sequences and mappings.
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Node::Null => Some("null".to_string()),
            Node::Bool(b) => Some(b.to_string()),
            Node::Int(i) => Some(i.to_string()),
            Node::Float(f) => Some(f.to_string()),
            Node::String(s) => Some(s.clone()),
            Node::Seq(_) | Node::Map(_) => None,
        }
    }

    /// Visit every node in document order, root first.
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&KeyPath, &Node),
    {
        self.walk_from(&KeyPath::root(), &mut visit);
    }

    fn walk_from<F>(&self, path: &KeyPath, visit: &mut F)
    where
        F: FnMut(&KeyPath, &Node),
    {
        visit(path, self);
        match self {
            Node::Map(m) => {
                for (k, v) in m.iter() {
                    v.walk_from(&path.key(k), visit);
                }
            }
            Node::Seq(s) => {
                for (i, v) in s.iter().enumerate() {
                    v.walk_from(&path.index(i), visit);
                }
            }
            _ => {}
        }
    }

    /// Convert to a `serde_yaml::Value` for typed deserialization.
    pub fn to_yaml_value(&self) -> serde_yaml::Value {
        use serde_yaml::Value;
        match self {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Int(i) => Value::Number((*i).into()),
            Node::Float(f) => Value::Number((*f).into()),
            Node::String(s) => Value::String(s.clone()),
            Node::Seq(s) => Value::Sequence(s.iter().map(Node::to_yaml_value).collect()),
            Node::Map(m) => {
                let mut out = serde_yaml::Mapping::new();
                for (k, v) in m.iter() {
                    out.insert(Value::String(k.to_string()), v.to_yaml_value());
                }
                Value::Mapping(out)
            }
        }
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::String(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::String(s)
    }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self {
        Node::Int(i)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<Mapping> for Node {
    fn from(m: Mapping) -> Self {
        Node::Map(m)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Int(i) => serializer.serialize_i64(*i),
            Node::Float(f) => serializer.serialize_f64(*f),
            Node::String(s) => serializer.serialize_str(s),
            Node::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Map(m) => m.serialize(serializer),
        }
    }
}

/// Insertion-ordered mapping with string keys.
///
/// Run documents have tens of keys per level, so lookups are linear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(String, Node)>,
}

impl Mapping {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value for `key`.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Mutable value for `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert or replace. A replaced key keeps its original position.
    /// Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) -> Option<Node> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl FromIterator<(String, Node)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (String, Node)>>(iter: I) -> Self {
        let mut mapping = Mapping::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}

impl IntoIterator for Mapping {
    type Item = (String, Node);
    type IntoIter = std::vec::IntoIter<(String, Node)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Node {
        let mut model = Mapping::new();
        model.insert("name", Node::from("hf_causal_lm"));
        model.insert("load_in_8bit", Node::Bool(false));

        let mut root = Mapping::new();
        root.insert("run_name", Node::from("demo"));
        root.insert("model", Node::Map(model));
        root.insert(
            "icl_tasks",
            Node::Seq(vec![Node::from("a"), Node::from("b")]),
        );
        Node::Map(root)
    }

    #[test]
    fn test_mapping_preserves_order() {
        let node = sample();
        let keys: Vec<_> = node.as_map().unwrap().keys().collect();
        assert_eq!(keys, vec!["run_name", "model", "icl_tasks"]);
    }

    #[test]
    fn test_mapping_insert_replaces_in_place() {
        let mut m = Mapping::new();
        m.insert("a", Node::Int(1));
        m.insert("b", Node::Int(2));
        let prev = m.insert("a", Node::Int(3));
        assert_eq!(prev, Some(Node::Int(1)));
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(m.get("a"), Some(&Node::Int(3)));
    }

    #[test]
    fn test_mapping_remove() {
        let mut m = Mapping::new();
        m.insert("a", Node::Int(1));
        assert_eq!(m.remove("a"), Some(Node::Int(1)));
        assert!(m.is_empty());
        assert!(m.remove("a").is_none());
    }

    #[test]
    fn test_get_path() {
        let node = sample();
        let path: KeyPath = "model.name".parse().unwrap();
        assert_eq!(node.get_path(&path).and_then(Node::as_str), Some("hf_causal_lm"));

        let path: KeyPath = "icl_tasks[1]".parse().unwrap();
        assert_eq!(node.get_path(&path).and_then(Node::as_str), Some("b"));

        let path: KeyPath = "icl_tasks[9]".parse().unwrap();
        assert!(node.get_path(&path).is_none());

        let path: KeyPath = "run_name.inner".parse().unwrap();
        assert!(node.get_path(&path).is_none());
    }

    #[test]
    fn test_walk_visits_every_node() {
        let node = sample();
        let mut paths = Vec::new();
        node.walk(|path, _| paths.push(path.to_string()));
        assert_eq!(
            paths,
            vec![
                "<root>",
                "run_name",
                "model",
                "model.name",
                "model.load_in_8bit",
                "icl_tasks",
                "icl_tasks[0]",
                "icl_tasks[1]",
            ]
        );
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(Node::Int(42).scalar_text().as_deref(), Some("42"));
        assert_eq!(Node::Bool(true).scalar_text().as_deref(), Some("true"));
        assert_eq!(Node::from("x").scalar_text().as_deref(), Some("x"));
        assert!(Node::Seq(vec![]).scalar_text().is_none());
    }

    #[test]
    fn test_as_f64_accepts_integers() {
        assert_eq!(Node::Int(3).as_f64(), Some(3.0));
        assert_eq!(Node::Float(0.5).as_f64(), Some(0.5));
        assert!(Node::from("3").as_f64().is_none());
    }

    #[test]
    fn test_serialize_to_yaml_keeps_order() {
        let yaml = serde_yaml::to_string(&sample()).unwrap();
        assert!(yaml.starts_with("run_name: demo\nmodel:"));
    }

    #[test]
    fn test_to_yaml_value() {
        let value = sample().to_yaml_value();
        assert_eq!(
            value.get("model").and_then(|m| m.get("name")).and_then(|v| v.as_str()),
            Some("hf_causal_lm")
        );
    }
}
