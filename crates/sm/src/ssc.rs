//! Send sequence counter

use std::fmt;

use crate::crypto::BLOCK_SIZE;

/// A 128 bit big-endian counter, incremented before every secured APDU
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct SendSequenceCounter([u8; BLOCK_SIZE]);

impl SendSequenceCounter {
    /// Counter starting at zero
    pub const fn new() -> Self {
        Self([0; BLOCK_SIZE])
    }

    /// Counter with the given big-endian value
    pub const fn from_bytes(bytes: [u8; BLOCK_SIZE]) -> Self {
        Self(bytes)
    }

    /// Counter with the given numeric value
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    /// Numeric value
    pub const fn value(&self) -> u128 {
        u128::from_be_bytes(self.0)
    }

    /// Big-endian bytes
    pub const fn bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    /// Add one, wrapping at 2^128
    pub fn increment(&mut self) {
        *self = Self::from_u128(self.value().wrapping_add(1));
    }
}

impl fmt::Debug for SendSequenceCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SendSequenceCounter({})", hex::encode_upper(self.0))
    }
}

impl fmt::Display for SendSequenceCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

/// A send sequence counter with one remembered position
///
/// Batches encrypt all commands up front, so the counter is marked after the
/// first command and reset afterwards to where the card will be when it
/// answers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SscIv {
    ssc: SendSequenceCounter,
    mark: Option<SendSequenceCounter>,
}

impl SscIv {
    /// Wrap a counter with no mark
    pub const fn new(ssc: SendSequenceCounter) -> Self {
        Self { ssc, mark: None }
    }

    /// Current counter
    pub const fn ssc(&self) -> &SendSequenceCounter {
        &self.ssc
    }

    /// Big-endian bytes of the current counter
    pub const fn bytes(&self) -> &[u8; BLOCK_SIZE] {
        self.ssc.bytes()
    }

    /// Add one to the current counter
    pub fn increase(&mut self) {
        self.ssc.increment();
    }

    /// Remember the current position, replacing any earlier mark
    pub fn mark(&mut self) {
        self.mark = Some(self.ssc);
    }

    /// Marked position, if any
    pub const fn marked(&self) -> Option<&SendSequenceCounter> {
        self.mark.as_ref()
    }

    /// Return to the marked position and clear the mark
    ///
    /// Without a mark the counter is left unchanged.
    pub fn reset(&mut self) {
        if let Some(mark) = self.mark.take() {
            self.ssc = mark;
        }
    }
}

impl From<SendSequenceCounter> for SscIv {
    fn from(ssc: SendSequenceCounter) -> Self {
        Self::new(ssc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_wraps() {
        let mut ssc = SendSequenceCounter::from_u128(0xFF);
        ssc.increment();
        assert_eq!(ssc.bytes()[14..], [0x01, 0x00]);

        let mut ssc = SendSequenceCounter::from_bytes([0xFF; 16]);
        ssc.increment();
        assert_eq!(ssc, SendSequenceCounter::new());
    }

    #[test]
    fn test_mark_and_reset() {
        let mut iv = SscIv::new(SendSequenceCounter::from_u128(5));
        iv.increase();
        iv.mark();
        iv.increase();
        iv.increase();
        assert_eq!(iv.ssc().value(), 8);
        iv.reset();
        assert_eq!(iv.ssc().value(), 6);
        assert!(iv.marked().is_none());

        // no mark, no change
        iv.reset();
        assert_eq!(iv.ssc().value(), 6);
    }
}
