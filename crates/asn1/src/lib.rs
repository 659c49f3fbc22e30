//! TLV/ASN.1 node model for TR-03110 card verifiable certificates
//!
//! This crate provides the small subset of BER/DER needed to read, navigate,
//! mutate and re-encode CV certificates and certificate requests:
//!
//! - [`Asn1`]: an owned tree of tag-length-value elements
//! - [`Asn1Path`]: static descriptors of named locations inside such a tree
//! - [`Tag`]: multi-byte BER tags as used by ISO/IEC 7816 and TR-03110
//!
//! Lengths are never stored on a node. They are derived whenever a tree is
//! encoded, so structural mutations performed through the owning root can
//! not leave an ancestor with a stale length prefix.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod node;
pub mod oid;
pub mod path;
pub mod tag;

pub use const_oid::ObjectIdentifier as Oid;
pub use error::{DecodeError, DecodeErrorKind, Error, Result, StructureError};
pub use node::{Asn1, MAX_DEPTH};
pub use path::Asn1Path;
pub use tag::Tag;
