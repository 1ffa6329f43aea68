use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq)]
pub enum TypeError {
    #[error("unknown asset kind: {0}")]
    UnknownKind(String),

    #[error("malformed asset id: {0}")]
    InvalidAssetId(String),

    #[error("volume must be within 0.0..=1.0, got {0}")]
    InvalidVolume(f64),

    #[error("unknown theme: {0}")]
    UnknownTheme(String),

    #[error("unknown setting: {0}")]
    UnknownSetting(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}
