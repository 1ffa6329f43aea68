//! Built-in gate stages.

pub mod mime;
pub mod size;

pub use mime::MimeTypeStage;
pub use size::SizeLimitStage;
