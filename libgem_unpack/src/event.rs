//! The FED block records and the event assembler.
//!
//! A FED block is a flat sequence of 64-bit words: a 2-word AMC header, a
//! 1-word event header, one chamber block per DAV count (chamber header,
//! VFAT blocks, chamber trailer), then a 1-word event trailer and a 1-word
//! AMC trailer. The event header's DAV count drives how many chamber blocks
//! follow; each chamber header's VFAT word count drives how many 3-word VFAT
//! blocks follow it.

use byteorder::{ByteOrder, LittleEndian};

use super::bits::{bool_bit, extract_bits, WordCursor};
use super::constants::{VFAT_BLOCK_WORDS, WORD_SIZE};
use super::error::{FedBlockError, RecordKind};
use super::vfat::VfatBlock;

/// First two words of the FED block: slot, trigger and run identity.
#[derive(Debug, Clone)]
pub struct AmcHeader {
    pub amc_num: u8,
    /// Full 24-bit level-1-accept identifier; the AMC trailer echoes its low 8 bits.
    pub l1a_id: u32,
    pub bx_id: u16,
    pub format_version: u8,
    pub run_type: u8,
    pub run_params: u32,
    pub orbit_id: u16,
    pub board_id: u16,
}

impl AmcHeader {
    pub fn read(cursor: &mut WordCursor<'_>) -> Result<Self, FedBlockError> {
        let w0 = cursor.take(RecordKind::AmcHeader)?;
        let w1 = cursor.take(RecordKind::AmcHeader)?;
        Ok(Self {
            amc_num: extract_bits(w0, 56, 4) as u8,
            l1a_id: extract_bits(w0, 32, 24) as u32,
            bx_id: extract_bits(w0, 20, 12) as u16,
            format_version: extract_bits(w1, 60, 4) as u8,
            run_type: extract_bits(w1, 56, 4) as u8,
            run_params: extract_bits(w1, 32, 24) as u32,
            orbit_id: extract_bits(w1, 16, 16) as u16,
            board_id: extract_bits(w1, 0, 16) as u16,
        })
    }
}

/// Event header: which chambers contributed data, plus DAQ health bits.
#[derive(Debug, Clone)]
pub struct EventHeader {
    /// 24-bit bitmap of chamber inputs that sent data for this event.
    pub dav_list: u32,
    pub buf_status: u32,
    /// Number of chamber blocks that follow. The decoder trusts this count
    /// to drive iteration rather than recomputing it from the bitmap.
    pub dav_count: u8,
    /// Trigger-throttle state.
    pub tts_state: u8,
}

impl EventHeader {
    pub fn read(cursor: &mut WordCursor<'_>) -> Result<Self, FedBlockError> {
        let w = cursor.take(RecordKind::EventHeader)?;
        Ok(Self {
            dav_list: extract_bits(w, 40, 24) as u32,
            buf_status: extract_bits(w, 16, 24) as u32,
            dav_count: extract_bits(w, 11, 5) as u8,
            tts_state: extract_bits(w, 0, 4) as u8,
        })
    }

    /// Indices of the set bits of the DAV list.
    pub fn dav_inputs(&self) -> Vec<usize> {
        (0..24).filter(|bit| self.dav_list >> bit & 1 == 1).collect()
    }
}

/// Chamber header: declared payload size and FIFO/overflow status flags.
#[derive(Debug, Clone)]
pub struct ChamberHeader {
    pub zs_word_cnt: u16,
    pub input_id: u8,
    /// Declared number of VFAT payload words; must be a multiple of 3.
    pub vfat_word_cnt: u16,
    pub evt_fifo_full: bool,
    pub in_fifo_full: bool,
    pub l1a_fifo_full: bool,
    pub evt_size_ovf: bool,
    pub evt_fifo_near_full: bool,
    pub in_fifo_near_full: bool,
    pub l1a_fifo_near_full: bool,
    pub evt_size_more_than_24: bool,
    pub no_vfat_marker: bool,
}

impl ChamberHeader {
    pub fn read(cursor: &mut WordCursor<'_>) -> Result<Self, FedBlockError> {
        let w = cursor.take(RecordKind::ChamberHeader)?;
        Ok(Self {
            zs_word_cnt: extract_bits(w, 40, 12) as u16,
            input_id: extract_bits(w, 35, 5) as u8,
            vfat_word_cnt: extract_bits(w, 23, 12) as u16,
            evt_fifo_full: bool_bit(w, 22),
            in_fifo_full: bool_bit(w, 21),
            l1a_fifo_full: bool_bit(w, 20),
            evt_size_ovf: bool_bit(w, 19),
            evt_fifo_near_full: bool_bit(w, 18),
            in_fifo_near_full: bool_bit(w, 17),
            l1a_fifo_near_full: bool_bit(w, 16),
            evt_size_more_than_24: bool_bit(w, 15),
            no_vfat_marker: bool_bit(w, 14),
        })
    }
}

/// Chamber trailer: echoed payload size, underflow flags and the
/// chamber-local counters.
#[derive(Debug, Clone)]
pub struct ChamberTrailer {
    /// Echo of the header's VFAT word count; checked by the validator.
    pub vfat_word_cnt: u16,
    pub evt_fifo_unf: bool,
    pub in_fifo_unf: bool,
    /// Chamber-local bunch counter.
    pub oh_bc: u16,
    /// Chamber-local event counter.
    pub oh_ec: u32,
}

impl ChamberTrailer {
    pub fn read(cursor: &mut WordCursor<'_>) -> Result<Self, FedBlockError> {
        let w = cursor.take(RecordKind::ChamberTrailer)?;
        Ok(Self {
            vfat_word_cnt: extract_bits(w, 36, 12) as u16,
            evt_fifo_unf: bool_bit(w, 35),
            in_fifo_unf: bool_bit(w, 33),
            oh_bc: extract_bits(w, 20, 12) as u16,
            oh_ec: extract_bits(w, 0, 20) as u32,
        })
    }
}

/// Event trailer: DAV timeout flags and board health bits.
#[derive(Debug, Clone)]
pub struct EventTrailer {
    pub dav_timeout_flags: u32,
    pub daq_almost_full: bool,
    pub mmcm_locked: bool,
    pub daq_clk_locked: bool,
    pub daq_ready: bool,
    pub bc0_locked: bool,
}

impl EventTrailer {
    pub fn read(cursor: &mut WordCursor<'_>) -> Result<Self, FedBlockError> {
        let w = cursor.take(RecordKind::EventTrailer)?;
        Ok(Self {
            dav_timeout_flags: extract_bits(w, 40, 24) as u32,
            daq_almost_full: bool_bit(w, 7),
            mmcm_locked: bool_bit(w, 6),
            daq_clk_locked: bool_bit(w, 5),
            daq_ready: bool_bit(w, 4),
            bc0_locked: bool_bit(w, 3),
        })
    }
}

/// AMC trailer: truncated L1A echo and the total word count of the block.
#[derive(Debug, Clone)]
pub struct AmcTrailer {
    /// Low 8 bits of the header's L1A identifier.
    pub l1a_id_echo: u8,
    /// Total 64-bit words in the block, headers and trailers included.
    pub word_cnt: u32,
}

impl AmcTrailer {
    pub fn read(cursor: &mut WordCursor<'_>) -> Result<Self, FedBlockError> {
        let w = cursor.take(RecordKind::AmcTrailer)?;
        Ok(Self {
            l1a_id_echo: extract_bits(w, 24, 8) as u8,
            word_cnt: extract_bits(w, 0, 20) as u32,
        })
    }
}

/// One chamber readout block with its VFAT payload.
#[derive(Debug, Clone)]
pub struct GemChamber {
    /// 0-based position within the owning event; not carried in the wire data.
    pub chamber_index: usize,
    pub header: ChamberHeader,
    pub vfats: Vec<VfatBlock>,
    pub trailer: ChamberTrailer,
}

impl GemChamber {
    fn read(cursor: &mut WordCursor<'_>, chamber_index: usize) -> Result<Self, FedBlockError> {
        let header = ChamberHeader::read(cursor)?;

        // A count that does not divide by 3 makes the rest of the event
        // unparseable; there is no resynchronization point inside a block.
        if header.vfat_word_cnt % VFAT_BLOCK_WORDS != 0 {
            return Err(FedBlockError::MalformedChamber {
                chamber: chamber_index,
                vfat_word_cnt: header.vfat_word_cnt,
            });
        }

        let n_vfats = (header.vfat_word_cnt / VFAT_BLOCK_WORDS) as usize;
        let mut vfats = Vec::with_capacity(n_vfats);
        for vfat_index in 0..n_vfats {
            vfats.push(VfatBlock::read(cursor, vfat_index)?);
        }

        let trailer = ChamberTrailer::read(cursor)?;
        Ok(Self {
            chamber_index,
            header,
            vfats,
            trailer,
        })
    }
}

/// One fully decoded detector event.
#[derive(Debug, Clone)]
pub struct GemEvent {
    pub amc_header: AmcHeader,
    pub event_header: EventHeader,
    pub chambers: Vec<GemChamber>,
    pub event_trailer: EventTrailer,
    pub amc_trailer: AmcTrailer,
    /// Total words consumed while decoding this block. Checked against the
    /// AMC trailer's declared count by the validator.
    pub words_consumed: usize,
}

impl GemEvent {
    /// Decode a FED block from its raw bytes.
    ///
    /// The buffer is zero-padded to an 8-byte boundary and packed into
    /// little-endian 64-bit words, matching how the capture tooling wrote it.
    pub fn unpack(bytes: &[u8]) -> Result<Self, FedBlockError> {
        let words = pack_words(bytes);
        let mut cursor = WordCursor::new(&words);
        Self::read(&mut cursor)
    }

    fn read(cursor: &mut WordCursor<'_>) -> Result<Self, FedBlockError> {
        let amc_header = AmcHeader::read(cursor)?;
        let event_header = EventHeader::read(cursor)?;

        let mut chambers = Vec::with_capacity(event_header.dav_count as usize);
        for chamber_index in 0..event_header.dav_count as usize {
            chambers.push(GemChamber::read(cursor, chamber_index)?);
        }

        let event_trailer = EventTrailer::read(cursor)?;
        let amc_trailer = AmcTrailer::read(cursor)?;

        Ok(Self {
            amc_header,
            event_header,
            chambers,
            event_trailer,
            amc_trailer,
            words_consumed: cursor.position(),
        })
    }

    /// Total VFAT blocks across all chambers.
    ///
    /// Used by consumers that only care about events with front-end payload.
    pub fn num_vfat_blocks(&self) -> usize {
        self.chambers.iter().map(|chamber| chamber.vfats.len()).sum()
    }
}

/// Pack a byte buffer into little-endian 64-bit words, zero-padding the tail.
fn pack_words(bytes: &[u8]) -> Vec<u64> {
    let mut words = Vec::with_capacity(bytes.len().div_ceil(WORD_SIZE));
    let mut chunks = bytes.chunks_exact(WORD_SIZE);
    for chunk in chunks.by_ref() {
        words.push(LittleEndian::read_u64(chunk));
    }
    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut padded = [0u8; WORD_SIZE];
        padded[..tail.len()].copy_from_slice(tail);
        words.push(LittleEndian::read_u64(&padded));
    }
    words
}

/// Synthetic FED blocks shared by the unit tests of this module, the
/// validator and the raw file reader.
#[cfg(test)]
pub(crate) mod test_blocks {
    use super::WORD_SIZE;
    use byteorder::{ByteOrder, LittleEndian};

    pub(crate) fn words_to_bytes(words: &[u64]) -> Vec<u8> {
        let mut bytes = vec![0u8; words.len() * WORD_SIZE];
        LittleEndian::write_u64_into(words, &mut bytes);
        bytes
    }

    /// A minimal well-formed event declaring zero chambers: 2 header words,
    /// event header, event trailer, AMC trailer. Total word count 5.
    pub(crate) fn chamberless_event_words() -> Vec<u64> {
        let amc_w0 = (3u64 << 56) | (0x1234u64 << 32) | (0x25u64 << 20);
        let amc_w1 = (1u64 << 60) | (0x42u64 << 16) | 0xbeefu64;
        let evt_header = 0u64; // dav_count = 0
        let evt_trailer = (1u64 << 6) | (1u64 << 5) | (1u64 << 4) | (1u64 << 3);
        let amc_trailer = (0x34u64 << 24) | 5;
        vec![amc_w0, amc_w1, evt_header, evt_trailer, amc_trailer]
    }

    /// A well-formed event with one chamber holding a single VFAT block.
    /// Counters and echoes agree everywhere, total word count 10.
    pub(crate) fn one_chamber_event_words() -> Vec<u64> {
        let bx = 0x25u64;
        let amc_w0 = (3u64 << 56) | (0x1234u64 << 32) | (bx << 20);
        let amc_w1 = (1u64 << 60) | (0x42u64 << 16) | 0xbeefu64;
        let evt_header = (1u64 << 40) | (1u64 << 11); // dav_list bit 0, dav_count 1
        let chamber_header = (2u64 << 35) | (3u64 << 23); // input 2, 3 VFAT words
        let vfat_w0 = (0xau64 << 60)
            | (bx << 48)
            | (0xcu64 << 44)
            | (7u64 << 36)
            | (0xeu64 << 28)
            | (0x123u64 << 16)
            | 0xffffu64;
        let vfat_w1 = 0u64;
        let vfat_w2 = 0xbeefu64;
        let chamber_trailer = (3u64 << 36) | ((bx + 1) << 20) | 5;
        let evt_trailer = 0u64;
        let amc_trailer = (0x34u64 << 24) | 10;
        vec![
            amc_w0,
            amc_w1,
            evt_header,
            chamber_header,
            vfat_w0,
            vfat_w1,
            vfat_w2,
            chamber_trailer,
            evt_trailer,
            amc_trailer,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::test_blocks::{chamberless_event_words, one_chamber_event_words, words_to_bytes};
    use super::*;

    #[test]
    fn test_chamberless_event() {
        let event = GemEvent::unpack(&words_to_bytes(&chamberless_event_words())).unwrap();
        assert_eq!(event.amc_header.amc_num, 3);
        assert_eq!(event.amc_header.l1a_id, 0x1234);
        assert_eq!(event.amc_header.bx_id, 0x25);
        assert_eq!(event.amc_header.format_version, 1);
        assert_eq!(event.amc_header.orbit_id, 0x42);
        assert_eq!(event.amc_header.board_id, 0xbeef);
        assert_eq!(event.event_header.dav_count, 0);
        assert!(event.chambers.is_empty());
        assert!(event.event_trailer.mmcm_locked);
        assert!(event.event_trailer.daq_ready);
        assert_eq!(event.amc_trailer.l1a_id_echo, 0x34);
        // 2 + 1 + 0 + 1 + 1 words, matching the trailer's declared total
        assert_eq!(event.words_consumed, 5);
        assert_eq!(event.amc_trailer.word_cnt, 5);
        assert_eq!(event.num_vfat_blocks(), 0);
    }

    #[test]
    fn test_one_chamber_event() {
        let event = GemEvent::unpack(&words_to_bytes(&one_chamber_event_words())).unwrap();
        assert_eq!(event.event_header.dav_count, 1);
        assert_eq!(event.event_header.dav_inputs(), vec![0]);
        assert_eq!(event.chambers.len(), 1);

        let chamber = &event.chambers[0];
        assert_eq!(chamber.chamber_index, 0);
        assert_eq!(chamber.header.input_id, 2);
        assert_eq!(chamber.header.vfat_word_cnt, 3);
        assert_eq!(chamber.trailer.vfat_word_cnt, 3);
        assert_eq!(chamber.trailer.oh_bc, 0x26);
        assert_eq!(chamber.trailer.oh_ec, 5);

        assert_eq!(chamber.vfats.len(), 1);
        let vfat = &chamber.vfats[0];
        assert_eq!(vfat.marker, 0xace);
        assert_eq!(vfat.bc, 0x25);
        assert_eq!(vfat.ec, 7);
        assert_eq!(vfat.chip_id, 0x123);
        assert_eq!(vfat.hit_count(), 16);

        assert_eq!(event.words_consumed, 10);
        assert_eq!(event.num_vfat_blocks(), 1);
    }

    #[test]
    fn test_malformed_chamber_word_count() {
        let mut words = one_chamber_event_words();
        words[3] = (2u64 << 35) | (4u64 << 23); // 4 does not divide by 3
        match GemEvent::unpack(&words_to_bytes(&words)) {
            Err(FedBlockError::MalformedChamber {
                chamber,
                vfat_word_cnt,
            }) => {
                assert_eq!(chamber, 0);
                assert_eq!(vfat_word_cnt, 4);
            }
            _ => panic!(),
        }
    }

    #[test]
    fn test_truncated_event() {
        let words = chamberless_event_words();
        let bytes = words_to_bytes(&words[..3]);
        match GemEvent::unpack(&bytes) {
            Err(FedBlockError::Truncated { record, word }) => {
                assert_eq!(record, RecordKind::EventTrailer);
                assert_eq!(word, 3);
            }
            _ => panic!(),
        }
    }

    #[test]
    fn test_pack_words_pads_tail() {
        // 9 bytes pad out to two words, the second mostly zero
        let mut bytes = vec![0u8; 9];
        bytes[0] = 0x01;
        bytes[8] = 0x02;
        let words = pack_words(&bytes);
        assert_eq!(words, vec![0x01u64, 0x02u64]);
    }
}
