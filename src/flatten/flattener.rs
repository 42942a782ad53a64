//! Depth-first flattener
//!
//! `flatten` returns a lazy iterator with an explicit traversal stack, so deep
//! documents do not recurse on the call stack. The iterator is not resumable
//! after an error: it yields the error once and then ends.

use std::slice;

use super::errors::{FlattenError, FlattenResult};
use crate::document::{Key, Node, Scalar};

/// Separator between path segments
pub const PATH_SEPARATOR: char = '.';

/// One (path, value) pair of a flattened document
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Dotted path with positional keys collapsed
    pub path: String,
    /// Leaf value
    pub value: Scalar,
}

impl IndexEntry {
    /// Create a new entry
    pub fn new(path: impl Into<String>, value: Scalar) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }
}

/// Children of a container still to be visited
enum Children<'a> {
    Sequence(slice::Iter<'a, Node>),
    Mapping(slice::Iter<'a, (Key, Node)>),
}

impl<'a> Children<'a> {
    fn of(node: &'a Node) -> Option<Self> {
        match node {
            Node::Sequence(items) => Some(Children::Sequence(items.iter())),
            Node::Mapping(entries) => Some(Children::Mapping(entries.iter())),
            Node::Scalar(_) | Node::Opaque(_) => None,
        }
    }

    fn next_child(&mut self) -> Option<(Option<&'a str>, &'a Node)> {
        match self {
            Children::Sequence(items) => items.next().map(|node| (None, node)),
            Children::Mapping(entries) => entries.next().map(|(key, node)| (key.segment(), node)),
        }
    }
}

struct Frame<'a> {
    prefix: String,
    children: Children<'a>,
}

/// Lazy iterator over the index entries of a document
pub struct Flatten<'a> {
    root: Option<&'a Node>,
    stack: Vec<Frame<'a>>,
    failed: bool,
}

impl<'a> Flatten<'a> {
    fn new(document: &'a Node) -> Self {
        Self {
            root: Some(document),
            stack: Vec::new(),
            failed: false,
        }
    }

    /// Emit, descend into, or reject the node at `path`
    fn visit(&mut self, path: String, node: &'a Node) -> Option<FlattenResult<IndexEntry>> {
        match node {
            Node::Scalar(value) => Some(Ok(IndexEntry::new(path, value.clone()))),
            Node::Sequence(_) | Node::Mapping(_) => {
                if let Some(children) = Children::of(node) {
                    self.stack.push(Frame {
                        prefix: path,
                        children,
                    });
                }
                None
            }
            Node::Opaque(type_name) => {
                self.failed = true;
                self.stack.clear();
                Some(Err(FlattenError::UnsupportedLeafType {
                    path,
                    type_name: type_name.clone(),
                }))
            }
        }
    }
}

impl<'a> Iterator for Flatten<'a> {
    type Item = FlattenResult<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        if let Some(root) = self.root.take() {
            if let Some(item) = self.visit(String::new(), root) {
                return Some(item);
            }
        }

        loop {
            let frame = self.stack.last_mut()?;
            let (segment, node) = match frame.children.next_child() {
                Some(child) => child,
                None => {
                    self.stack.pop();
                    continue;
                }
            };

            let path = join_path(&frame.prefix, segment.unwrap_or(""));
            if let Some(item) = self.visit(path, node) {
                return Some(item);
            }
        }
    }
}

/// Join a prefix and a segment, trimming separators at both ends.
fn join_path(prefix: &str, segment: &str) -> String {
    let mut joined = String::with_capacity(prefix.len() + segment.len() + 1);
    joined.push_str(prefix);
    joined.push(PATH_SEPARATOR);
    joined.push_str(segment);
    joined.trim_matches(PATH_SEPARATOR).to_string()
}

/// Flatten a document lazily
pub fn flatten(document: &Node) -> Flatten<'_> {
    Flatten::new(document)
}

/// Flatten a document completely, failing on the first unsupported leaf
pub fn flatten_all(document: &Node) -> FlattenResult<Vec<IndexEntry>> {
    flatten(document).collect()
}
