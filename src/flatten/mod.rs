//! Path flattening for pathdoc
//!
//! Converts a document tree into the ordered (path, value) pairs stored in the
//! path index table.
//!
//! # Rules
//!
//! - Named keys contribute a path segment; positional keys contribute none
//! - Segments are joined with `.`, leading/trailing separators trimmed
//! - Output order equals depth-first traversal order
//! - Sibling sequence elements collapse onto the same path
//! - Opaque values fail with `UnsupportedLeafType`

mod errors;
mod flattener;

pub use errors::{FlattenError, FlattenResult};
pub use flattener::{flatten, flatten_all, Flatten, IndexEntry, PATH_SEPARATOR};
