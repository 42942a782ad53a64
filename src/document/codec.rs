//! Pluggable blob encoding for stored documents
//!
//! The store only requires that `decode(encode(doc)) == doc`; the byte format
//! is owned by the codec.

use super::errors::{CodecError, CodecResult};
use super::node::{Node, Scalar};

/// Encodes documents into opaque blobs and back
pub trait BlobCodec {
    /// Encode a document to bytes
    fn encode(&self, document: &Node) -> CodecResult<Vec<u8>>;

    /// Decode bytes produced by `encode`
    fn decode(&self, bytes: &[u8]) -> CodecResult<Node>;
}

/// JSON codec over the tagged node representation.
///
/// Keeps key order and the distinction between positional and named keys.
/// JSON has no NaN or infinity, so documents holding them are rejected
/// rather than silently written as `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl BlobCodec for JsonCodec {
    fn encode(&self, document: &Node) -> CodecResult<Vec<u8>> {
        if let Some(value) = first_non_finite(document) {
            return Err(CodecError::Encode(format!("non-finite number {} has no JSON form", value)));
        }
        serde_json::to_vec(document).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Node> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

fn first_non_finite(document: &Node) -> Option<f64> {
    let mut stack = vec![document];
    while let Some(node) = stack.pop() {
        match node {
            Node::Scalar(Scalar::Float(f)) if !f.is_finite() => return Some(*f),
            Node::Sequence(items) => stack.extend(items.iter()),
            Node::Mapping(entries) => stack.extend(entries.iter().map(|(_, child)| child)),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Key;

    #[test]
    fn test_mixed_keys_survive_roundtrip() {
        let doc = Node::mapping([(
            "items",
            Node::mapping([
                (Key::Index(0), Node::from("shoe")),
                (Key::Index(1), Node::from("scarf")),
                (Key::from("glass"), Node::sequence([Node::from("stylish"), Node::from(2.5)])),
            ]),
        )]);

        let codec = JsonCodec;
        let bytes = codec.encode(&doc).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), doc);
    }

    #[test]
    fn test_opaque_cannot_be_encoded() {
        let doc = Node::mapping([("handle", Node::opaque("file"))]);
        let err = JsonCodec.encode(&doc).unwrap_err();
        assert_eq!(err.code(), "PATHDOC_CODEC_ENCODE_FAILED");
    }

    #[test]
    fn test_non_finite_floats_cannot_be_encoded() {
        for value in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let doc = Node::mapping([("a", Node::sequence([Node::from(1.0), Node::from(value)]))]);
            let err = JsonCodec.encode(&doc).unwrap_err();
            assert!(matches!(err, CodecError::Encode(_)), "{}", value);
        }
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        let err = JsonCodec.decode(b"not a document").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
