//! Owned TLV trees
//!
//! An [`Asn1`] element is either primitive (raw value bytes) or constructed
//! (an ordered list of child elements). Whether a parsed element is
//! constructed follows the constructed bit of its tag.
//!
//! Structural mutation goes through the owning root together with an
//! [`Asn1Path`] naming the location to change. Since lengths are computed
//! while encoding, every ancestor of a changed element reflects the change on
//! the next call to [`Asn1::encode`].

use std::{borrow::Cow, fmt};

use tracing::trace;

use crate::{
    Asn1Path, Tag,
    error::{DecodeError, DecodeErrorKind, Result, StructureError},
};

/// Maximum number of bytes in a long form length field
const MAX_LENGTH_BYTES: usize = 4;

/// Deepest nesting of constructed elements accepted while decoding
pub const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Content {
    Primitive(Vec<u8>),
    Constructed(Vec<Asn1>),
}

/// A single tag-length-value element and, if constructed, its children
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Asn1 {
    tag: Tag,
    content: Content,
}

impl Asn1 {
    /// Create a primitive element
    pub fn primitive(tag: Tag, value: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            content: Content::Primitive(value.into()),
        }
    }

    /// Create a constructed element from its children
    pub fn constructed(tag: Tag, children: Vec<Self>) -> Self {
        Self {
            tag,
            content: Content::Constructed(children),
        }
    }

    /// Create an element from a tag and its raw value bytes
    ///
    /// For constructed tags the value is parsed into children.
    pub fn new(tag: Tag, value: &[u8]) -> std::result::Result<Self, DecodeError> {
        if tag.is_constructed() {
            Ok(Self::constructed(tag, Self::parse_all(value)?))
        } else {
            Ok(Self::primitive(tag, value))
        }
    }

    /// Parse exactly one element spanning the whole input
    pub fn parse(input: &[u8]) -> std::result::Result<Self, DecodeError> {
        if input.is_empty() {
            return Err(DecodeError::new(0, DecodeErrorKind::Empty));
        }
        let (element, end) = Self::decode_at(input, 0, 0, 0)?;
        if end != input.len() {
            trace!(end, len = input.len(), "trailing data after element");
            return Err(DecodeError::new(end, DecodeErrorKind::TrailingData));
        }
        Ok(element)
    }

    /// Parse a concatenation of elements
    pub fn parse_all(input: &[u8]) -> std::result::Result<Vec<Self>, DecodeError> {
        Self::decode_sequence(input, 0, 0)
    }

    fn decode_sequence(
        input: &[u8],
        base: usize,
        depth: usize,
    ) -> std::result::Result<Vec<Self>, DecodeError> {
        let mut children = Vec::new();
        let mut pos = 0;
        while pos < input.len() {
            let (child, next) = Self::decode_at(input, pos, base, depth)?;
            children.push(child);
            pos = next;
        }
        Ok(children)
    }

    /// Decode one element of `input` starting at `pos`
    ///
    /// Returns the element and the position right after it. `base` is the
    /// absolute offset of `input` within the buffer originally handed to
    /// [`Self::parse`], `depth` the number of enclosing constructed elements.
    fn decode_at(
        input: &[u8],
        pos: usize,
        base: usize,
        depth: usize,
    ) -> std::result::Result<(Self, usize), DecodeError> {
        if depth >= MAX_DEPTH {
            return Err(DecodeError::new(base + pos, DecodeErrorKind::TooDeep));
        }
        let (tag, after_tag) = Tag::decode(input, pos, base)?;
        let (len, value_start) = decode_length(input, after_tag, base)?;
        let value_end = value_start
            .checked_add(len)
            .filter(|end| *end <= input.len())
            .ok_or(DecodeError::new(base + value_start, DecodeErrorKind::Truncated))?;
        let value = &input[value_start..value_end];

        let content = if tag.is_constructed() {
            Content::Constructed(Self::decode_sequence(value, base + value_start, depth + 1)?)
        } else {
            Content::Primitive(value.to_vec())
        };

        Ok((Self { tag, content }, value_end))
    }

    /// Tag of this element
    pub const fn tag(&self) -> Tag {
        self.tag
    }

    /// Whether this element holds children
    pub const fn is_constructed(&self) -> bool {
        matches!(self.content, Content::Constructed(_))
    }

    /// Children of a constructed element, empty for primitive ones
    pub fn children(&self) -> &[Self] {
        match &self.content {
            Content::Constructed(children) => children,
            Content::Primitive(_) => &[],
        }
    }

    /// Value bytes, the encoded children for constructed elements
    pub fn value(&self) -> Cow<'_, [u8]> {
        match &self.content {
            Content::Primitive(value) => Cow::Borrowed(value),
            Content::Constructed(children) => {
                let mut out = Vec::with_capacity(self.value_len());
                for child in children {
                    child.encode_into(&mut out);
                }
                Cow::Owned(out)
            }
        }
    }

    /// Replace the value of this element
    ///
    /// The value of a constructed element is parsed into new children.
    pub fn set_value(&mut self, value: &[u8]) -> std::result::Result<(), DecodeError> {
        self.content = match self.content {
            Content::Constructed(_) => Content::Constructed(Self::parse_all(value)?),
            Content::Primitive(_) => Content::Primitive(value.to_vec()),
        };
        Ok(())
    }

    /// Length of the value field
    pub fn value_len(&self) -> usize {
        match &self.content {
            Content::Primitive(value) => value.len(),
            Content::Constructed(children) => children.iter().map(Self::encoded_len).sum(),
        }
    }

    /// Length of the full tag-length-value encoding
    pub fn encoded_len(&self) -> usize {
        let value_len = self.value_len();
        self.tag.len() + length_len(value_len) + value_len
    }

    /// Encode this element and its children
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }

    /// Append the encoding of this element to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        self.tag.encode_into(out);
        encode_length(self.value_len(), out);
        match &self.content {
            Content::Primitive(value) => out.extend_from_slice(value),
            Content::Constructed(children) => {
                for child in children {
                    child.encode_into(out);
                }
            }
        }
    }

    /// The `index`-th direct child carrying `tag`
    pub fn find_nth(&self, tag: Tag, index: usize) -> Option<&Self> {
        self.children().iter().filter(|c| c.tag == tag).nth(index)
    }

    /// The first direct child carrying `tag`
    pub fn find(&self, tag: Tag) -> Option<&Self> {
        self.find_nth(tag, 0)
    }

    fn find_nth_mut(&mut self, tag: Tag, index: usize) -> Option<&mut Self> {
        match &mut self.content {
            Content::Constructed(children) => {
                children.iter_mut().filter(|c| c.tag == tag).nth(index)
            }
            Content::Primitive(_) => None,
        }
    }

    fn position_of(&self, tag: Tag, index: usize) -> Option<usize> {
        self.children()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.tag == tag)
            .nth(index)
            .map(|(pos, _)| pos)
    }

    /// Append a direct child
    pub fn push_child(&mut self, child: Self) -> std::result::Result<(), StructureError> {
        match &mut self.content {
            Content::Constructed(children) => {
                children.push(child);
                Ok(())
            }
            Content::Primitive(_) => Err(StructureError::Primitive(self.tag)),
        }
    }

    /// Look up the element at `path`
    ///
    /// The root of the path chain must carry this element's tag. Returns
    /// `None` when any step of the chain has no matching child.
    pub fn child(&self, path: &Asn1Path) -> Option<&Self> {
        let chain = path.chain();
        let (root, steps) = chain.split_first()?;
        if root.tag() != self.tag {
            return None;
        }
        steps
            .iter()
            .try_fold(self, |node, step| node.find_nth(step.tag(), step.index()))
    }

    /// Mutable access to the element at `path`
    pub fn child_mut(&mut self, path: &Asn1Path) -> Option<&mut Self> {
        let chain = path.chain();
        let (root, steps) = chain.split_first()?;
        if root.tag() != self.tag {
            return None;
        }
        let mut node = self;
        for step in steps {
            node = node.find_nth_mut(step.tag(), step.index())?;
        }
        Some(node)
    }

    fn anchored(&self, path: &Asn1Path) -> std::result::Result<(), StructureError> {
        if path.root_path().tag() == self.tag {
            Ok(())
        } else {
            Err(StructureError::NotAnchored {
                path: path.name(),
                tag: self.tag,
            })
        }
    }

    /// Append `child` to the element at `parent`, this element being the owning root
    pub fn add_child(&mut self, parent: &Asn1Path, child: Self) -> Result<()> {
        self.anchored(parent)?;
        let target = self
            .child_mut(parent)
            .ok_or(StructureError::Missing(parent.name()))?;
        target.push_child(child)?;
        Ok(())
    }

    /// Remove the element at `path` from this owning root
    ///
    /// Returns the removed element, or `None` if nothing is at `path`.
    pub fn remove_child(&mut self, path: &Asn1Path) -> Result<Option<Self>> {
        self.anchored(path)?;
        let parent_path = path.parent().ok_or(StructureError::Root(path.name()))?;
        let Some(parent) = self.child_mut(parent_path) else {
            return Ok(None);
        };
        let Some(pos) = parent.position_of(path.tag(), path.index()) else {
            return Ok(None);
        };
        match &mut parent.content {
            Content::Constructed(children) => Ok(Some(children.remove(pos))),
            Content::Primitive(_) => Ok(None),
        }
    }

    /// Replace the element at `path` in this owning root, returning the old one
    pub fn replace_child(&mut self, path: &Asn1Path, new: Self) -> Result<Self> {
        self.anchored(path)?;
        if path.parent().is_none() {
            return Err(StructureError::Root(path.name()).into());
        }
        let target = self
            .child_mut(path)
            .ok_or(StructureError::Missing(path.name()))?;
        Ok(std::mem::replace(target, new))
    }

    /// Replace the value of the element at `path` in this owning root
    pub fn set_value_at(&mut self, path: &Asn1Path, value: &[u8]) -> Result<()> {
        self.anchored(path)?;
        let target = self
            .child_mut(path)
            .ok_or(StructureError::Missing(path.name()))?;
        target.set_value(value)?;
        Ok(())
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = depth * 2;
        match &self.content {
            Content::Primitive(value) => writeln!(
                f,
                "{:indent$}{} [{}] {}",
                "",
                self.tag,
                value.len(),
                hex::encode_upper(value)
            ),
            Content::Constructed(children) => {
                writeln!(f, "{:indent$}{} [{}]", "", self.tag, self.value_len())?;
                for child in children {
                    child.fmt_indented(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Asn1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// Number of bytes the DER length field for `len` occupies
const fn length_len(len: usize) -> usize {
    match len {
        0..=0x7F => 1,
        0x80..=0xFF => 2,
        0x100..=0xFFFF => 3,
        0x1_0000..=0xFF_FFFF => 4,
        _ => 5,
    }
}

/// Append the minimal DER length field for `len`
fn encode_length(len: usize, out: &mut Vec<u8>) {
    let field_len = length_len(len);
    if field_len == 1 {
        out.push(len as u8);
        return;
    }
    let count = field_len - 1;
    out.push(0x80 | count as u8);
    out.extend_from_slice(&(len as u32).to_be_bytes()[MAX_LENGTH_BYTES - count..]);
}

/// Read a definite length at `pos`, returning it and the position of the value
fn decode_length(
    input: &[u8],
    pos: usize,
    base: usize,
) -> std::result::Result<(usize, usize), DecodeError> {
    let first = *input
        .get(pos)
        .ok_or(DecodeError::new(base + pos, DecodeErrorKind::Truncated))?;
    if first < 0x80 {
        return Ok((usize::from(first), pos + 1));
    }
    let count = usize::from(first & 0x7F);
    if count == 0 {
        return Err(DecodeError::new(base + pos, DecodeErrorKind::IndefiniteLength));
    }
    if count > MAX_LENGTH_BYTES {
        return Err(DecodeError::new(base + pos, DecodeErrorKind::LengthTooLong));
    }
    let bytes = input
        .get(pos + 1..pos + 1 + count)
        .ok_or(DecodeError::new(base + pos + 1, DecodeErrorKind::Truncated))?;
    let len = bytes
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
    Ok((len, pos + 1 + count))
}
