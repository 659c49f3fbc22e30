//! Static descriptors of named locations inside an ASN.1 tree

use std::fmt;

use crate::Tag;

/// A named location in an ASN.1 tree
///
/// A path is a tag, the index among siblings carrying that tag, and an
/// optional parent path. The root of a chain has no parent and matches the
/// element the path is applied to. Paths are declared once as constants and
/// never built per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Asn1Path {
    name: &'static str,
    tag: Tag,
    index: usize,
    parent: Option<&'static Self>,
}

impl Asn1Path {
    /// Create a path below `parent`
    pub const fn new(
        name: &'static str,
        tag: Tag,
        index: usize,
        parent: Option<&'static Self>,
    ) -> Self {
        Self { name, tag, index, parent }
    }

    /// Create a root path
    pub const fn root(name: &'static str, tag: Tag) -> Self {
        Self::new(name, tag, 0, None)
    }

    /// Human readable name
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Tag of the element at this location
    pub const fn tag(&self) -> Tag {
        self.tag
    }

    /// Index among siblings carrying the same tag
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Parent location, `None` for a root
    pub const fn parent(&self) -> Option<&'static Self> {
        self.parent
    }

    /// Root of the parent chain
    pub fn root_path(&self) -> &Self {
        let mut current = self;
        while let Some(parent) = current.parent {
            current = parent;
        }
        current
    }

    /// All locations from the root down to and including this one
    pub fn chain(&self) -> Vec<&Self> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }
}

impl fmt::Display for Asn1Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
