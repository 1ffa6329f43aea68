use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use blobkeep_gate::GateConfig;
use blobkeep_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Top-level configuration, usually read from a TOML file.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobkeepConfig {
    /// Parent directory of the database directory.
    pub data_dir: PathBuf,
    pub store: StoreConfig,
    pub gate: GateConfig,
    pub autosave_interval_secs: u64,
    /// Default maximum asset age for retention sweeps.
    pub retention_days: u64,
}

impl Default for BlobkeepConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".blobkeep"),
            store: StoreConfig::default(),
            gate: GateConfig::default(),
            autosave_interval_secs: 30,
            retention_days: 30,
        }
    }
}

impl BlobkeepConfig {
    /// Read and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SdkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SdkResult<()> {
        if self.autosave_interval_secs == 0 {
            return Err(SdkError::InvalidConfig("autosave_interval_secs must be at least 1".into()));
        }
        if self.store.database_name.trim().is_empty() {
            return Err(SdkError::InvalidConfig("store.database_name must not be empty".into()));
        }
        if !(self.store.compact_ratio > 0.0 && self.store.compact_ratio <= 1.0) {
            return Err(SdkError::InvalidConfig("store.compact_ratio must be in (0, 1]".into()));
        }
        self.gate.validate()?;
        Ok(())
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }
}
