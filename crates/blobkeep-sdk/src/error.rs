use std::path::PathBuf;

use blobkeep_gate::GateError;
use blobkeep_settings::SettingsError;
use blobkeep_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("upload error: {0}")]
    Gate(#[from] GateError),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type SdkResult<T> = Result<T, SdkError>;
