//! The unpacking pipeline: read, decompress, decode, validate, one event at
//! a time in file order.

use super::config::{Config, ErrorPolicy};
use super::error::{ProcessorError, RawFileError};
use super::raw_file::{RawFile, UnpackedEvent};

/// Unpack every event of a capture file.
///
/// Per-event failures (decompression, FED block decode) are handled
/// according to the configured policy: `Abort` stops and surfaces the error,
/// `Skip` logs the event and moves on to the next envelope. Validation
/// mismatches are never fatal; they are logged and carried on the event.
pub fn unpack_run(config: &Config) -> Result<Vec<UnpackedEvent>, ProcessorError> {
    let mut raw_file = RawFile::new(&config.raw_path)?;
    let mut events = Vec::new();
    let mut skipped: u64 = 0;

    loop {
        match raw_file.next_event() {
            Ok(Some(unpacked)) => {
                if !unpacked.mismatches.is_empty() {
                    spdlog::warn!(
                        "Event {} decoded with {} consistency mismatch(es)",
                        unpacked.envelope.event_number,
                        unpacked.mismatches.len()
                    );
                    for mismatch in &unpacked.mismatches {
                        spdlog::warn!("  {}", mismatch);
                    }
                }
                events.push(unpacked);
            }
            Ok(None) => break,
            Err(
                e @ (RawFileError::Decompression { .. }
                | RawFileError::PayloadTooShort { .. }
                | RawFileError::BadBlock { .. }),
            ) => match config.on_decode_error {
                ErrorPolicy::Abort => return Err(e.into()),
                ErrorPolicy::Skip => {
                    // The reader is already positioned at the next envelope
                    spdlog::error!("Skipping undecodable event: {e}");
                    skipped += 1;
                }
            },
            Err(e) => return Err(e.into()),
        }
    }

    spdlog::info!("Unpacked {} event(s), skipped {}", events.len(), skipped);
    Ok(events)
}
