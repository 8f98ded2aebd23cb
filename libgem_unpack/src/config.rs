use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::ConfigError;

/// What to do with an event that fails to decode or decompress.
///
/// The FED format has no resynchronization point inside a block, but the
/// outer envelope framing stays intact after a failed event, so skipping to
/// the next envelope is well defined. Aborting matches the original tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    #[default]
    Abort,
    Skip,
}

/// Structure representing the unpacker configuration.
/// Configs are serializable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub raw_path: PathBuf,
    pub on_decode_error: ErrorPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from("None"),
            on_decode_error: ErrorPolicy::Abort,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    pub fn does_raw_file_exist(&self) -> bool {
        self.raw_path.exists()
    }
}
