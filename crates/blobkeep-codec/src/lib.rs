//! Portable form for blobkeep payloads.
//!
//! The portable form is a `data:` URI (RFC 2397) that embeds both the MIME
//! type and the bytes, so it can be handed straight to presentation code as
//! an image or audio source:
//!
//! ```text
//! data:image/png;base64,iVBORw0KGgo...
//! ```
//!
//! ```rust
//! use blobkeep_codec::PortableCodec;
//!
//! let text = PortableCodec::encode(b"hi", "text/plain");
//! assert_eq!(text, "data:text/plain;base64,aGk=");
//! let (bytes, mime) = PortableCodec::decode(&text).unwrap();
//! assert_eq!((bytes.as_slice(), mime.as_str()), (&b"hi"[..], "text/plain"));
//! ```

pub mod error;
pub mod portable;

pub use error::{CodecResult, FormatError};
pub use portable::PortableCodec;
