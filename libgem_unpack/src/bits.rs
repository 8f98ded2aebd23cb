//! Bitfield extraction primitives for the 64-bit wire words.
//!
//! Every record in the FED format is a fixed table of (low bit, width) ranges
//! within 64-bit words, bit 0 least significant. These helpers are the only
//! place bit arithmetic happens; the record decoders are tables of calls.

use super::error::{FedBlockError, RecordKind};

/// Extract the unsigned value in bits `[low_bit, low_bit + width)` of a word.
///
/// `low_bit + width <= 64` is a caller invariant. The record layouts are
/// fixed tables known at compile time, so it is not checked at runtime.
#[inline]
pub fn extract_bits(word: u64, low_bit: u32, width: u32) -> u64 {
    let shifted = word >> low_bit;
    if width >= 64 {
        shifted
    } else {
        shifted & ((1u64 << width) - 1)
    }
}

/// Read a single bit as a flag.
#[inline]
pub fn bool_bit(word: u64, bit: u32) -> bool {
    (word >> bit) & 0x1 == 1
}

/// A cursor over the 64-bit words of one FED block.
///
/// Record decoders advance the cursor one word at a time; running out of
/// words mid-record reports a truncation naming the record being read.
#[derive(Debug)]
pub struct WordCursor<'a> {
    words: &'a [u64],
    position: usize,
}

impl<'a> WordCursor<'a> {
    pub fn new(words: &'a [u64]) -> Self {
        Self { words, position: 0 }
    }

    /// Take the next word for the given record, or report truncation.
    pub fn take(&mut self, record: RecordKind) -> Result<u64, FedBlockError> {
        match self.words.get(self.position) {
            Some(word) => {
                self.position += 1;
                Ok(*word)
            }
            None => Err(FedBlockError::Truncated {
                record,
                word: self.position,
            }),
        }
    }

    /// Number of words consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_round_trip() {
        // Encode a value into a bit range, extract it back out.
        let cases: [(u64, u32, u32); 6] = [
            (0xf, 56, 4),
            (0xabcdef, 32, 24),
            (0xfff, 20, 12),
            (0x1, 14, 1),
            (0xfffff, 0, 20),
            (0xdead_beef_cafe_f00d, 0, 64),
        ];
        for (value, low_bit, width) in cases {
            let word = value << low_bit;
            assert_eq!(extract_bits(word, low_bit, width), value);
        }
    }

    #[test]
    fn test_extract_masks_neighbors() {
        let word = u64::MAX;
        assert_eq!(extract_bits(word, 11, 5), 0x1f);
        assert_eq!(extract_bits(word, 63, 1), 1);
        assert_eq!(extract_bits(word, 0, 0), 0);
    }

    #[test]
    fn test_bool_bit() {
        let word = 1u64 << 22;
        assert!(bool_bit(word, 22));
        assert!(!bool_bit(word, 21));
    }

    #[test]
    fn test_cursor_truncation() {
        let words = [0u64; 2];
        let mut cursor = WordCursor::new(&words);
        cursor.take(RecordKind::AmcHeader).unwrap();
        cursor.take(RecordKind::AmcHeader).unwrap();
        match cursor.take(RecordKind::EventHeader) {
            Err(FedBlockError::Truncated { record, word }) => {
                assert_eq!(record, RecordKind::EventHeader);
                assert_eq!(word, 2);
            }
            _ => panic!(),
        }
        assert_eq!(cursor.position(), 2);
    }
}
