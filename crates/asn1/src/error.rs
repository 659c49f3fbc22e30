//! Error types for TLV decoding and tree manipulation

use thiserror::Error;

use crate::Tag;

/// Result type for ASN.1 operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reason a byte buffer could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    /// No bytes where an element was expected
    #[error("empty input")]
    Empty,

    /// The buffer ended inside a tag, length or value
    #[error("input truncated")]
    Truncated,

    /// Tags longer than four bytes are not supported
    #[error("tag longer than four bytes")]
    TagTooLong,

    /// The indefinite length form (`0x80`) is not allowed in DER
    #[error("indefinite length form")]
    IndefiniteLength,

    /// Length fields longer than four bytes are not supported
    #[error("length field longer than four bytes")]
    LengthTooLong,

    /// Constructed elements nested deeper than [`crate::MAX_DEPTH`]
    #[error("elements nested too deeply")]
    TooDeep,

    /// Bytes remain after the outermost element
    #[error("trailing bytes after element")]
    TrailingData,
}

/// A decoding failure at a given absolute offset of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset}")]
pub struct DecodeError {
    /// Offset of the offending byte in the original input
    pub offset: usize,
    /// What went wrong
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub(crate) const fn new(offset: usize, kind: DecodeErrorKind) -> Self {
        Self { offset, kind }
    }
}

/// Misuse of the tree structure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    /// Children were requested from a primitive element
    #[error("element {0} is primitive and cannot hold children")]
    Primitive(Tag),

    /// The path's root does not match the element it was applied to
    #[error("path {path} is not anchored at element {tag}")]
    NotAnchored {
        /// Name of the path
        path: &'static str,
        /// Tag of the element the path was applied to
        tag: Tag,
    },

    /// No element exists at the given path
    #[error("no element at path {0}")]
    Missing(&'static str),

    /// The root element of a path cannot be removed or replaced through itself
    #[error("path {0} denotes the root element")]
    Root(&'static str),

    /// An element carries a different tag than expected
    #[error("unexpected tag {actual}, expected {expected}")]
    UnexpectedTag {
        /// Expected tag
        expected: Tag,
        /// Tag found
        actual: Tag,
    },
}

/// Error type for ASN.1 operations
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input bytes
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Structural misuse of a tree
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// Malformed object identifier
    #[error("invalid object identifier: {0}")]
    Oid(#[from] const_oid::Error),
}
