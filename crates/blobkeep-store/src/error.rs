use std::fmt;
use std::path::PathBuf;

use crate::record::Collection;

/// The store operation a failure belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOp {
    Open,
    Put,
    Get,
    GetAll,
    Delete,
    Clear,
    Compact,
    Close,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Put => "put",
            Self::Get => "get",
            Self::GetAll => "get_all",
            Self::Delete => "delete",
            Self::Clear => "clear",
            Self::Compact => "compact",
            Self::Close => "close",
        };
        f.write_str(name)
    }
}

/// Failure raised inside a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// I/O error from the underlying file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A log entry failed its CRC or could not be decoded.
    #[error("corrupt entry at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },
}

impl From<bincode::Error> for BackendError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors from object store operations.
///
/// Backend failures are always wrapped in [`StoreError::Operation`] so callers
/// see the operation and target without matching on backend details.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{op} failed{}: {source}", describe_target(.collection, .key))]
    Operation {
        op: StoreOp,
        collection: Option<Collection>,
        key: Option<String>,
        #[source]
        source: BackendError,
    },

    #[error("{op} rejected: store is closed")]
    Closed { op: StoreOp },

    #[error("cannot write a {record} record into the {collection} collection")]
    CollectionMismatch {
        collection: Collection,
        record: &'static str,
    },

    #[error("cannot open store at {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
}

impl StoreError {
    pub(crate) fn operation(
        op: StoreOp,
        collection: Option<Collection>,
        key: Option<&str>,
        source: impl Into<BackendError>,
    ) -> Self {
        Self::Operation {
            op,
            collection,
            key: key.map(str::to_string),
            source: source.into(),
        }
    }

    pub(crate) fn open(path: impl Into<PathBuf>, source: impl Into<BackendError>) -> Self {
        Self::Open {
            path: path.into(),
            source: source.into(),
        }
    }
}

fn describe_target(collection: &Option<Collection>, key: &Option<String>) -> String {
    match (collection, key) {
        (Some(c), Some(k)) => format!(" on {c}/{k}"),
        (Some(c), None) => format!(" on {c}"),
        (None, Some(k)) => format!(" on {k}"),
        (None, None) => String::new(),
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
