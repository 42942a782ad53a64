//! Document tree types
//!
//! `Node` is the closed set of shapes a document may take. Mappings keep
//! insertion order and may mix positional (`Key::Index`) and named keys, so a
//! container such as `["shoe", "scarf", "glass": [..]]` is representable.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A leaf value of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Raw textual form used for index rows and bound query parameters.
    ///
    /// `Null` has no text; it is stored as SQL NULL and never compares.
    pub fn raw_text(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(true) => Some("1".to_string()),
            Scalar::Bool(false) => Some("0".to_string()),
            Scalar::Int(i) => Some(i.to_string()),
            Scalar::Float(f) => Some(f.to_string()),
            Scalar::String(s) => Some(s.clone()),
        }
    }

    /// Returns true for `Scalar::Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "NULL"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Int(i64::from(i))
    }
}

impl From<u32> for Scalar {
    fn from(i: u32) -> Self {
        Scalar::Int(i64::from(i))
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Float(f)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Key of a mapping entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Positional key; contributes no path segment
    Index(u64),
    /// Named key; contributes its name as a path segment
    Name(String),
}

impl Key {
    /// Path segment contributed by this key, if any
    pub fn segment(&self) -> Option<&str> {
        match self {
            Key::Index(_) => None,
            Key::Name(name) => Some(name),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{}", i),
            Key::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Name(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Name(s)
    }
}

impl From<u64> for Key {
    fn from(i: u64) -> Self {
        Key::Index(i)
    }
}

/// A document, or any subtree of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Scalar(Scalar),
    Sequence(Vec<Node>),
    Mapping(Vec<(Key, Node)>),
    /// A value that is neither scalar nor container, e.g. a resource handle.
    ///
    /// Held in memory only: it cannot be flattened or encoded.
    #[serde(skip)]
    Opaque(String),
}

impl Node {
    /// Builds a mapping from ordered entries
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Node)>,
    {
        Node::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds a sequence from ordered items
    pub fn sequence<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Node>,
    {
        Node::Sequence(items.into_iter().collect())
    }

    /// Builds an opaque value described by `type_name`
    pub fn opaque(type_name: impl Into<String>) -> Self {
        Node::Opaque(type_name.into())
    }

    /// Builds the null scalar
    pub fn null() -> Self {
        Node::Scalar(Scalar::Null)
    }

    /// Looks up a named child of a mapping
    pub fn get(&self, name: &str) -> Option<&Node> {
        match self {
            Node::Mapping(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, Key::Name(n) if n == name))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Returns the scalar if this node is a leaf
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true for mappings and sequences
    pub fn is_container(&self) -> bool {
        matches!(self, Node::Sequence(_) | Node::Mapping(_))
    }
}

macro_rules! node_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Node {
                fn from(value: $ty) -> Self {
                    Node::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

node_from_scalar!(&str, String, i64, i32, u32, f64, bool);

impl From<Scalar> for Node {
    fn from(value: Scalar) -> Self {
        Node::Scalar(value)
    }
}

impl From<JsonValue> for Node {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Node::null(),
            JsonValue::Bool(b) => Node::from(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Node::from(i),
                // u64 beyond i64 and real numbers
                None => Node::from(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Node::from(s),
            JsonValue::Array(items) => Node::sequence(items.into_iter().map(Node::from)),
            JsonValue::Object(map) => Node::mapping(map.into_iter().map(|(k, v)| (k, Node::from(v)))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_text() {
        assert_eq!(Scalar::from("red").raw_text(), Some("red".to_string()));
        assert_eq!(Scalar::from(26).raw_text(), Some("26".to_string()));
        assert_eq!(Scalar::from(1.5).raw_text(), Some("1.5".to_string()));
        assert_eq!(Scalar::from(true).raw_text(), Some("1".to_string()));
        assert_eq!(Scalar::from(false).raw_text(), Some("0".to_string()));
        assert_eq!(Scalar::Null.raw_text(), None);
    }

    #[test]
    fn test_from_json_follows_map_order() {
        let node = Node::from(json!({"a": [true, null], "b": 1}));
        match &node {
            Node::Mapping(entries) => {
                let keys: Vec<_> = entries.iter().map(|(k, _)| k.to_string()).collect();
                assert_eq!(keys, vec!["a", "b"]);
            }
            other => panic!("expected mapping, got {:?}", other),
        }
        assert_eq!(
            node.get("a"),
            Some(&Node::sequence([Node::from(true), Node::null()]))
        );
    }

    #[test]
    fn test_key_segment() {
        assert_eq!(Key::Index(3).segment(), None);
        assert_eq!(Key::from("hair").segment(), Some("hair"));
    }

    #[test]
    fn test_get_ignores_positional_keys() {
        let node = Node::mapping([(Key::Index(0), Node::from("x")), (Key::from("0"), Node::from("y"))]);
        assert_eq!(node.get("0"), Some(&Node::from("y")));
        assert_eq!(Node::from("leaf").get("0"), None);
    }
}
