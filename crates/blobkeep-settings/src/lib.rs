//! Settings persistence for blobkeep.
//!
//! [`SettingsAggregator`] owns the read-merge-write cycle over the single
//! settings record: every write applies a partial update on top of the
//! stored value and stamps `last_saved`. [`AutoSave`] sits in front of it and
//! batches changes, writing them when flushed or when its periodic timer
//! fires.
//!
//! A failed write never loses changes. The batch goes back into the pending
//! set underneath anything recorded since, and the next flush retries it.

pub mod aggregator;
pub mod autosave;
pub mod error;

pub use aggregator::SettingsAggregator;
pub use autosave::AutoSave;
pub use error::{SettingsError, SettingsResult};
