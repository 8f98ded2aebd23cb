use std::path::PathBuf;
use thiserror::Error;

/// The fixed-shape records of a FED block. Used to name the point of failure
/// when a block is truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    AmcHeader,
    EventHeader,
    ChamberHeader,
    VfatBlock,
    ChamberTrailer,
    EventTrailer,
    AmcTrailer,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordKind::AmcHeader => "AMC header",
            RecordKind::EventHeader => "event header",
            RecordKind::ChamberHeader => "chamber header",
            RecordKind::VfatBlock => "VFAT block",
            RecordKind::ChamberTrailer => "chamber trailer",
            RecordKind::EventTrailer => "event trailer",
            RecordKind::AmcTrailer => "AMC trailer",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Error)]
pub enum FedBlockError {
    #[error("FED block ended at word {word} while reading a {record}")]
    Truncated { record: RecordKind, word: usize },
    #[error("Chamber {chamber} declared VFAT word count {vfat_word_cnt} which does not divide by 3")]
    MalformedChamber { chamber: usize, vfat_word_cnt: u16 },
}

#[derive(Debug, Error)]
pub enum RawFileError {
    #[error("Could not open raw file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Raw file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Failed to decompress the payload of event {event_number}: {source}")]
    Decompression {
        event_number: u32,
        source: std::io::Error,
    },
    #[error("Decompressed payload of event {event_number} is {size} bytes, shorter than the FED data offset")]
    PayloadTooShort { event_number: u32, size: usize },
    #[error("Error while decoding the FED block of event {event_number}: {source}")]
    BadBlock {
        event_number: u32,
        source: FedBlockError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Unpacker failed due to raw file error: {0}")]
    FileError(#[from] RawFileError),
    #[error("Unpacker failed due to configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}
