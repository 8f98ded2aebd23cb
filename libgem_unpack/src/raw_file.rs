//! The capture file framing layer.
//!
//! A capture file holds one init record followed by event envelopes, each
//! wrapping a zlib-compressed payload. All multi-byte integers are
//! little-endian. The init record carries the per-event header size that
//! tells the reader where each envelope's compressed-length field sits; the
//! decompressed payload carries the FED block at a fixed byte offset.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::ZlibDecoder;

use super::constants::{
    COMPRESSED_LEN_BYTES, EVT_PREFIX_BYTES, FED_DATA_OFFSET, INIT_RECORD_FIXED_BYTES,
};
use super::error::RawFileError;
use super::event::GemEvent;
use super::validator::{self, Mismatch};

/// Run metadata carried once at the start of every capture file.
#[derive(Debug, Clone)]
pub struct InitRecord {
    pub code: u8,
    pub size: u32,
    pub protocol: u8,
    pub run_number: u32,
    pub init_header_size: u32,
    /// Header size every following event envelope honors; locates the
    /// compressed-length field at `evt_header_size - 4` from envelope start.
    pub evt_header_size: u32,
}

/// Per-event envelope metadata, read before the compressed payload.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub code: u8,
    pub size: u32,
    pub protocol: u8,
    pub run_number: u32,
    pub event_number: u32,
    pub compressed_len: u32,
}

/// One decoded event bundled with its envelope and validation report.
#[derive(Debug, Clone)]
pub struct UnpackedEvent {
    pub envelope: EventEnvelope,
    pub event: GemEvent,
    /// Advisory consistency mismatches; empty for a healthy event.
    pub mismatches: Vec<Mismatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    ReadingInit,
    ReadingEvents { evt_header_size: u32 },
    Done,
}

/// Reader over one capture file.
///
/// Walks the file as a state machine: exactly one init record, then event
/// envelopes until end-of-file. A declared compressed length that would read
/// past the end of the file is the normal end-of-stream condition of a
/// capture and terminates the sequence cleanly rather than erroring.
#[derive(Debug)]
pub struct RawFile {
    handle: BufReader<File>,
    size_bytes: u64,
    state: ReaderState,
    init: Option<InitRecord>,
}

impl RawFile {
    pub fn new(path: &Path) -> Result<Self, RawFileError> {
        if !path.exists() {
            return Err(RawFileError::BadFilePath(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let size_bytes = file.metadata()?.len();
        spdlog::info!(
            "Opened raw file {:?} ({})",
            path,
            human_bytes::human_bytes(size_bytes as f64)
        );
        Ok(Self {
            handle: BufReader::new(file),
            size_bytes,
            state: ReaderState::ReadingInit,
            init: None,
        })
    }

    /// Run metadata, available once the init record has been consumed.
    pub fn init_record(&self) -> Option<&InitRecord> {
        self.init.as_ref()
    }

    /// Decode the next event in file order.
    ///
    /// Returns `Ok(None)` once the capture is exhausted. Decode and
    /// decompression failures leave the reader positioned at the next
    /// envelope, so the caller may keep iterating after an error.
    pub fn next_event(&mut self) -> Result<Option<UnpackedEvent>, RawFileError> {
        loop {
            match self.state {
                ReaderState::Done => return Ok(None),
                ReaderState::ReadingInit => {
                    let init = self.read_init_record()?;
                    spdlog::info!(
                        "Capture of run {}: protocol {}, event header size {} bytes",
                        init.run_number,
                        init.protocol,
                        init.evt_header_size
                    );
                    self.state = ReaderState::ReadingEvents {
                        evt_header_size: init.evt_header_size,
                    };
                    self.init = Some(init);
                }
                ReaderState::ReadingEvents { evt_header_size } => {
                    return self.read_event_record(evt_header_size);
                }
            }
        }
    }

    /// Seek back to the start of the file so the event sequence can be
    /// replayed from the beginning.
    pub fn rewind(&mut self) -> Result<(), RawFileError> {
        self.handle.seek(SeekFrom::Start(0))?;
        self.state = ReaderState::ReadingInit;
        self.init = None;
        Ok(())
    }

    fn read_init_record(&mut self) -> Result<InitRecord, RawFileError> {
        let code = self.handle.read_u8()?;
        let size = self.handle.read_u32::<LittleEndian>()?;
        let protocol = self.handle.read_u8()?;
        self.skip(16)?; // reserved
        let run_number = self.handle.read_u32::<LittleEndian>()?;
        let init_header_size = self.handle.read_u32::<LittleEndian>()?;
        let evt_header_size = self.handle.read_u32::<LittleEndian>()?;
        // The rest of the init record is padding up to its declared size
        self.skip(size.saturating_sub(INIT_RECORD_FIXED_BYTES))?;
        Ok(InitRecord {
            code,
            size,
            protocol,
            run_number,
            init_header_size,
            evt_header_size,
        })
    }

    fn read_event_record(
        &mut self,
        evt_header_size: u32,
    ) -> Result<Option<UnpackedEvent>, RawFileError> {
        if self.handle.stream_position()? >= self.size_bytes.saturating_sub(1) {
            spdlog::info!("End of capture file reached");
            self.state = ReaderState::Done;
            return Ok(None);
        }

        let code = self.handle.read_u8()?;
        let size = self.handle.read_u32::<LittleEndian>()?;
        let protocol = self.handle.read_u8()?;
        let run_number = self.handle.read_u32::<LittleEndian>()?;
        let event_number = self.handle.read_u32::<LittleEndian>()?;
        // The compressed-length field sits at evt_header_size - 4 from the
        // start of the envelope; skip whatever lies between it and the prefix.
        self.skip(evt_header_size.saturating_sub(EVT_PREFIX_BYTES + COMPRESSED_LEN_BYTES))?;
        let compressed_len = self.handle.read_u32::<LittleEndian>()?;

        let payload_start = self.handle.stream_position()?;
        if payload_start + compressed_len as u64 >= self.size_bytes {
            // A payload running past end-of-file is how a capture normally
            // ends; stop without reading a short buffer.
            spdlog::info!(
                "Payload of event {event_number} runs past end of file, stopping"
            );
            self.state = ReaderState::Done;
            return Ok(None);
        }

        let mut compressed = vec![0u8; compressed_len as usize];
        self.handle.read_exact(&mut compressed)?;

        let mut payload = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .read_to_end(&mut payload)
            .map_err(|source| RawFileError::Decompression {
                event_number,
                source,
            })?;
        if payload.len() < FED_DATA_OFFSET {
            return Err(RawFileError::PayloadTooShort {
                event_number,
                size: payload.len(),
            });
        }

        let event = GemEvent::unpack(&payload[FED_DATA_OFFSET..])
            .map_err(|source| RawFileError::BadBlock {
                event_number,
                source,
            })?;
        let mismatches = validator::validate(&event);

        Ok(Some(UnpackedEvent {
            envelope: EventEnvelope {
                code,
                size,
                protocol,
                run_number,
                event_number,
                compressed_len,
            },
            event,
            mismatches,
        }))
    }

    fn skip(&mut self, bytes: u32) -> Result<(), RawFileError> {
        self.handle.seek_relative(bytes as i64)?;
        Ok(())
    }
}
