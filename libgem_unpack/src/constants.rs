//! Constants of the GEM FED wire format and its capture container.

/// Number of bytes in one 64-bit wire word.
pub const WORD_SIZE: usize = 8;

/// Number of words in one VFAT front-end block.
pub const VFAT_BLOCK_WORDS: u16 = 3;

/// Nominal value of the reassembled 12-bit VFAT marker.
pub const EXPECTED_VFAT_MARKER: u16 = 0xace;

/// Byte count of the init record fields up to and including the event header
/// size; the remainder of the record is padding up to its declared size.
pub const INIT_RECORD_FIXED_BYTES: u32 = 34;

/// Fixed event envelope prefix: code, size, protocol, run number, event number.
pub const EVT_PREFIX_BYTES: u32 = 14;

/// Size of the compressed-length field that closes the envelope header.
pub const COMPRESSED_LEN_BYTES: u32 = 4;

/// Byte offset of the FED block within a decompressed event payload.
///
/// Determined empirically from captured files by the original tooling. The
/// container layout between the end of decompression and the start of FED
/// data has no independent specification, so this offset should be checked
/// against freshly captured files before being trusted for a new run period.
pub const FED_DATA_OFFSET: usize = 0x1c81;
