use thiserror::Error;

/// The text is not a well-formed portable form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("missing `data:` scheme")]
    MissingScheme,

    #[error("missing `,` between header and payload")]
    MissingSeparator,

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("MIME type is not valid percent-encoded UTF-8: {0}")]
    InvalidMime(String),
}

pub type CodecResult<T> = Result<T, FormatError>;
