use super::bits::{bool_bit, extract_bits, WordCursor};
use super::error::{FedBlockError, RecordKind};

/// One VFAT front-end block: a fixed 3-word (192-bit) record for a single
/// front-end chip.
///
/// The 12-bit marker is assembled from three disjoint 4-bit fragments spread
/// across the first word. That is the wire layout, not an unpacking bug; its
/// nominal value is checked by the validator, never enforced here.
#[derive(Debug, Clone)]
pub struct VfatBlock {
    /// 0-based position within the owning chamber, assigned at decode time.
    pub vfat_index: usize,
    pub marker: u16,
    /// Chip-local bunch counter.
    pub bc: u16,
    /// Chip-local event counter.
    pub ec: u8,
    pub hamming_err: bool,
    pub almost_full: bool,
    pub seu_logic: bool,
    pub seu_i2c: bool,
    pub chip_id: u16,
    /// 128-bit channel hit bitmap, channel 0 in the least significant bit.
    pub chan_data: u128,
    pub crc: u16,
}

impl VfatBlock {
    /// Decode the 3-word VFAT block at the cursor.
    pub fn read(cursor: &mut WordCursor<'_>, vfat_index: usize) -> Result<Self, FedBlockError> {
        let w0 = cursor.take(RecordKind::VfatBlock)?;
        let w1 = cursor.take(RecordKind::VfatBlock)?;
        let w2 = cursor.take(RecordKind::VfatBlock)?;

        let marker = ((extract_bits(w0, 60, 4) << 8)
            | (extract_bits(w0, 44, 4) << 4)
            | extract_bits(w0, 28, 4)) as u16;

        // The channel bitmap spans the low 16 bits of word 0, all of word 1
        // and the high 48 bits of word 2.
        let chan_data = ((extract_bits(w0, 0, 16) as u128) << 112)
            | ((w1 as u128) << 48)
            | extract_bits(w2, 16, 48) as u128;

        Ok(Self {
            vfat_index,
            marker,
            bc: extract_bits(w0, 48, 12) as u16,
            ec: extract_bits(w0, 36, 8) as u8,
            hamming_err: bool_bit(w0, 35),
            almost_full: bool_bit(w0, 34),
            seu_logic: bool_bit(w0, 33),
            seu_i2c: bool_bit(w0, 32),
            chip_id: extract_bits(w0, 16, 12) as u16,
            chan_data,
            crc: extract_bits(w2, 0, 16) as u16,
        })
    }

    /// Number of hit channels, derived from the channel bitmap.
    pub fn hit_count(&self) -> u32 {
        self.chan_data.count_ones()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(words: &[u64; 3]) -> VfatBlock {
        let mut cursor = WordCursor::new(words);
        VfatBlock::read(&mut cursor, 0).unwrap()
    }

    #[test]
    fn test_marker_reassembly() {
        // 0xace split into its three fragments: a at [63:60], c at [47:44], e at [31:28]
        let w0 = (0xau64 << 60) | (0xcu64 << 44) | (0xeu64 << 28);
        let vfat = decode(&[w0, 0, 0]);
        assert_eq!(vfat.marker, 0xace);
    }

    #[test]
    fn test_scalar_fields() {
        let w0 = (0x123u64 << 48) | (0x45u64 << 36) | (1u64 << 35) | (1u64 << 32) | (0x678u64 << 16);
        let w2 = 0xbeefu64;
        let vfat = decode(&[w0, 0, w2]);
        assert_eq!(vfat.bc, 0x123);
        assert_eq!(vfat.ec, 0x45);
        assert!(vfat.hamming_err);
        assert!(!vfat.almost_full);
        assert!(!vfat.seu_logic);
        assert!(vfat.seu_i2c);
        assert_eq!(vfat.chip_id, 0x678);
        assert_eq!(vfat.crc, 0xbeef);
    }

    #[test]
    fn test_channel_bitmap_assembly() {
        // Low 16 bits of w0 land in the top of the bitmap, high 48 bits of w2 in the bottom.
        let vfat = decode(&[0xffff, 0, 0]);
        assert_eq!(vfat.chan_data, 0xffffu128 << 112);

        let vfat = decode(&[0, u64::MAX, 0]);
        assert_eq!(vfat.chan_data, (u64::MAX as u128) << 48);

        let vfat = decode(&[0, 0, 0xffff_ffff_ffffu64 << 16]);
        assert_eq!(vfat.chan_data, 0xffff_ffff_ffffu128);
    }

    #[test]
    fn test_hit_count_popcount() {
        assert_eq!(decode(&[0, 0, 0]).hit_count(), 0);
        let all_set = [0xffffu64, u64::MAX, u64::MAX << 16];
        assert_eq!(decode(&all_set).hit_count(), 128);
        assert_eq!(decode(&[0x5, 0, 0]).hit_count(), 2);
    }

    #[test]
    fn test_truncated_block() {
        let words = [0u64; 2];
        let mut cursor = WordCursor::new(&words);
        match VfatBlock::read(&mut cursor, 0) {
            Err(FedBlockError::Truncated { record, word }) => {
                assert_eq!(record, RecordKind::VfatBlock);
                assert_eq!(word, 2);
            }
            _ => panic!(),
        }
    }
}
