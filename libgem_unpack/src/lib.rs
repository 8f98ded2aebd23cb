//! # libgem_unpack
//!
//! libgem_unpack decodes raw capture files produced by the GEM DAQ chain. A
//! capture file wraps each detector event in a compressed envelope; inside is
//! the FED block, the hierarchical binary record the AMC back-end board emits
//! per trigger. The library reconstructs the full typed hierarchy
//! (event, chamber blocks, VFAT front-end blocks) from the flat 64-bit word
//! stream and cross-checks the consistency relations the hardware protocol
//! promises, reporting where they fail.
//!
//! ## File format
//!
//! A capture file starts with one init record (run number, protocol version,
//! and the per-event header size every later record honors), followed by one
//! envelope per captured event. Each envelope carries a zlib-compressed
//! payload; the FED block sits at a fixed byte offset inside the
//! decompressed stream.
//!
//! The FED block itself is a sequence of 64-bit words, read from the payload
//! as little-endian 8-byte units:
//!
//! ```text
//! AMC header (2 words)
//! event header (1 word, declares the chamber count)
//! per chamber:
//!     chamber header (1 word, declares the VFAT word count)
//!     VFAT blocks (3 words each)
//!     chamber trailer (1 word)
//! event trailer (1 word)
//! AMC trailer (1 word, declares the total word count)
//! ```
//!
//! Counts declared in headers drive the iteration; counts echoed in trailers
//! are checked after the fact. A VFAT word count that does not divide by 3
//! makes the rest of the event unparseable and fails the decode hard;
//! everything else (counter offsets, echo fields, the VFAT marker) is
//! advisory and collected by the validator without rejecting the event.
//!
//! ## Usage
//!
//! Unpack a whole capture with the pipeline driver:
//!
//! ```no_run
//! use libgem_unpack::config::Config;
//! use libgem_unpack::process::unpack_run;
//!
//! let config = Config {
//!     raw_path: "/data/run_0042.raw".into(),
//!     ..Default::default()
//! };
//! let events = unpack_run(&config).unwrap();
//! for unpacked in &events {
//!     println!(
//!         "event {}: {} chambers, {} VFAT blocks, {} mismatches",
//!         unpacked.envelope.event_number,
//!         unpacked.event.chambers.len(),
//!         unpacked.event.num_vfat_blocks(),
//!         unpacked.mismatches.len()
//!     );
//! }
//! ```
//!
//! Or drive the reader by hand for event-at-a-time processing:
//!
//! ```no_run
//! use std::path::Path;
//! use libgem_unpack::raw_file::RawFile;
//!
//! let mut raw_file = RawFile::new(Path::new("/data/run_0042.raw")).unwrap();
//! while let Some(unpacked) = raw_file.next_event().unwrap() {
//!     // hit multiplicity per front-end chip
//!     for chamber in &unpacked.event.chambers {
//!         for vfat in &chamber.vfats {
//!             println!("chip {:#x}: {} hits", vfat.chip_id, vfat.hit_count());
//!         }
//!     }
//! }
//! ```
//!
//! `RawFile::rewind` replays the sequence from the start, so a downstream
//! analysis layer can make multiple passes over the same capture.
pub mod bits;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod process;
pub mod raw_file;
pub mod validator;
pub mod vfat;
