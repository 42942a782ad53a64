//! Document model for pathdoc
//!
//! A document is a tree of ordered mappings and sequences whose leaves are
//! scalars. Documents are persisted opaquely through a [`BlobCodec`]; the
//! structure is only ever inspected by the path flattener.

mod codec;
mod errors;
mod node;

pub use codec::{BlobCodec, JsonCodec};
pub use errors::{CodecError, CodecResult};
pub use node::{Key, Node, Scalar};
