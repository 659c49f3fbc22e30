//! BER tags of up to four bytes

use std::fmt;

use crate::error::{DecodeError, DecodeErrorKind};

/// Maximum number of bytes a tag may occupy
const MAX_TAG_LEN: usize = 4;

/// A BER tag, stored as the big-endian integer formed by its bytes
///
/// `Tag::new(0x7F21)` is the two byte tag `7F 21`. Keeping the numeric form
/// allows tags to be declared in `const` contexts such as path tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(u32);

impl Tag {
    /// INTEGER
    pub const INTEGER: Self = Self(0x02);
    /// OCTET STRING
    pub const OCTET_STRING: Self = Self(0x04);
    /// OBJECT IDENTIFIER
    pub const OBJECT_IDENTIFIER: Self = Self(0x06);
    /// UTF8String
    pub const UTF8_STRING: Self = Self(0x0C);
    /// PrintableString
    pub const PRINTABLE_STRING: Self = Self(0x13);
    /// IA5String
    pub const IA5_STRING: Self = Self(0x16);
    /// Constructed SEQUENCE
    pub const SEQUENCE: Self = Self(0x30);
    /// Constructed SET
    pub const SET: Self = Self(0x31);

    /// Create a tag from the big-endian integer formed by its bytes
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// The big-endian integer formed by the tag bytes
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Number of bytes the tag occupies when encoded
    pub const fn len(self) -> usize {
        match self.0 {
            0..=0xFF => 1,
            0x100..=0xFFFF => 2,
            0x1_0000..=0xFF_FFFF => 3,
            _ => 4,
        }
    }

    /// Tags always occupy at least one byte
    pub const fn is_empty(self) -> bool {
        false
    }

    /// The leading tag byte carrying class and constructed bit
    pub const fn first_byte(self) -> u8 {
        (self.0 >> (8 * (self.len() - 1))) as u8
    }

    /// Whether the constructed bit (`0x20`) is set
    pub const fn is_constructed(self) -> bool {
        self.first_byte() & 0x20 != 0
    }

    /// Append the encoded tag bytes to `out`
    pub fn encode_into(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0.to_be_bytes()[MAX_TAG_LEN - self.len()..]);
    }

    /// Encoded tag bytes
    pub fn to_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        self.encode_into(&mut out);
        out
    }

    /// Read a tag from `input` at `pos`, returning it and the position after it
    ///
    /// `base` is added to positions reported in errors so that nested
    /// decoding reports offsets relative to the original buffer.
    pub(crate) fn decode(input: &[u8], pos: usize, base: usize) -> Result<(Self, usize), DecodeError> {
        let first = *input
            .get(pos)
            .ok_or(DecodeError::new(base + pos, DecodeErrorKind::Truncated))?;
        let mut value = u32::from(first);
        let mut cursor = pos + 1;

        // Low tag number form unless all five tag number bits are set
        if first & 0x1F == 0x1F {
            loop {
                if cursor - pos >= MAX_TAG_LEN {
                    return Err(DecodeError::new(base + pos, DecodeErrorKind::TagTooLong));
                }
                let byte = *input
                    .get(cursor)
                    .ok_or(DecodeError::new(base + cursor, DecodeErrorKind::Truncated))?;
                value = (value << 8) | u32::from(byte);
                cursor += 1;
                if byte & 0x80 == 0 {
                    break;
                }
            }
        }

        Ok((Self(value), cursor))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.to_bytes()))
    }
}

impl From<u32> for Tag {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_lengths() {
        assert_eq!(Tag::new(0x42).len(), 1);
        assert_eq!(Tag::new(0x7F21).len(), 2);
        assert_eq!(Tag::new(0x5F20).len(), 2);
        assert_eq!(Tag::new(0x7F21).to_bytes(), vec![0x7F, 0x21]);
    }

    #[test]
    fn test_constructed_bit() {
        assert!(Tag::new(0x7F21).is_constructed());
        assert!(Tag::new(0x67).is_constructed());
        assert!(Tag::new(0x73).is_constructed());
        assert!(!Tag::new(0x5F37).is_constructed());
        assert!(!Tag::new(0x42).is_constructed());
        assert!(!Tag::OBJECT_IDENTIFIER.is_constructed());
    }

    #[test]
    fn test_decode_multi_byte_tag() {
        let (tag, next) = Tag::decode(&[0x7F, 0x4E, 0x00], 0, 0).unwrap();
        assert_eq!(tag, Tag::new(0x7F4E));
        assert_eq!(next, 2);

        let (tag, next) = Tag::decode(&[0x00, 0x5F, 0x81, 0x05], 1, 10).unwrap();
        assert_eq!(tag, Tag::new(0x5F_8105));
        assert_eq!(next, 4);
    }

    #[test]
    fn test_decode_tag_errors() {
        let err = Tag::decode(&[0x7F], 0, 3).unwrap_err();
        assert_eq!(err, DecodeError::new(4, DecodeErrorKind::Truncated));

        let err = Tag::decode(&[0x1F, 0x81, 0x81, 0x81, 0x01], 0, 0).unwrap_err();
        assert_eq!(err.kind, DecodeErrorKind::TagTooLong);
    }

    #[test]
    fn test_display() {
        assert_eq!(Tag::new(0x7F49).to_string(), "7F49");
        assert_eq!(Tag::new(0x06).to_string(), "06");
    }
}
