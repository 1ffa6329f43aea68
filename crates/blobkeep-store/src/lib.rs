//! Record storage for blobkeep.
//!
//! Four collections live in one store: `images`, `sounds` and `backgrounds`
//! hold [`AssetRecord`]s keyed by asset id, and `settings` holds the single
//! [`SettingsRecord`] under [`SETTINGS_KEY`].
//!
//! # Storage Backends
//!
//! All backends implement the async [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`LogStore`] -- durable, CRC-framed append-only log with compaction
//!
//! # Maintenance
//!
//! - [`RetentionSweeper`] -- deletes assets older than a maximum age
//! - [`storage_stats`] -- per-kind counts and declared sizes
//!
//! # Design Rules
//!
//! 1. The store handle is constructed explicitly and shared as [`SharedStore`].
//! 2. Every mutation is atomic.
//! 3. Backend failures surface as [`StoreError::Operation`] naming the
//!    operation, collection and key.
//! 4. The store never validates payloads against declared sizes or types.

pub mod config;
pub mod durable;
pub mod error;
mod log;
pub mod memory;
pub mod record;
pub mod retention;
pub mod stats;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{StoreConfig, SyncMode};
pub use durable::{CompactionReport, LogStore};
pub use error::{BackendError, StoreError, StoreOp, StoreResult};
pub use memory::InMemoryObjectStore;
pub use record::{AssetRecord, AssetSummary, Collection, SettingsRecord, StoredRecord, SETTINGS_KEY};
pub use retention::{RetentionSweeper, SweepReport};
pub use stats::{storage_stats, KindStats, StorageStats};
pub use traits::{ObjectStore, SharedStore};
