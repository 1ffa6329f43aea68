use std::fmt;

use blobkeep_codec::FormatError;
use blobkeep_store::StoreError;
use blobkeep_types::AssetKind;

/// Errors that can occur while admitting or serving uploads.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The upload was rejected by a gate stage. Nothing was written.
    #[error("validation error: {0}")]
    Validation(String),

    /// A portable-form body could not be decoded. Nothing was written.
    #[error("malformed portable body: {0}")]
    Format(#[from] FormatError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Every generated id already existed.
    #[error("no unused {kind} id after {attempts} attempts")]
    IdExhausted { kind: AssetKind, attempts: u32 },

    /// A stage returned an unexpected error.
    #[error("stage error in '{stage}': {message}")]
    StageError { stage: String, message: String },

    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GateError {
    /// Create a stage error with a name and message.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageError {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if the error happened before anything was written.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Format(_))
    }
}

impl PartialEq for GateError {
    fn eq(&self, other: &Self) -> bool {
        // Compare by display representation for test convenience.
        fmt::format(format_args!("{self}")) == fmt::format(format_args!("{other}"))
    }
}

/// Result alias for gate operations.
pub type GateResult<T> = Result<T, GateError>;
