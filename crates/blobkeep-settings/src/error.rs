use blobkeep_store::StoreError;
use blobkeep_types::TypeError;

/// Errors from settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A setting value failed validation.
    #[error("invalid setting: {0}")]
    InvalidValue(#[from] TypeError),

    /// A settings JSON document could not be read or written.
    #[error("settings JSON error: {0}")]
    Import(#[from] serde_json::Error),
}

/// Result alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;
