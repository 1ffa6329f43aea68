use serde::{Deserialize, Serialize};

/// Flush/sync strategy for the durable log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every entry (safest, highest latency).
    EveryWrite,
    /// Flush to the OS and rely on its page cache.
    #[default]
    OsDefault,
}

/// Configuration for [`LogStore`](crate::LogStore).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory name of the database under the data directory.
    pub database_name: String,
    pub sync_mode: SyncMode,
    /// Compact once dead bytes exceed this fraction of the log.
    pub compact_ratio: f64,
    /// Never compact a log smaller than this.
    pub compact_min_bytes: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_name: "blobkeep".into(),
            sync_mode: SyncMode::default(),
            compact_ratio: 0.5,
            compact_min_bytes: 1024 * 1024, // 1 MiB
        }
    }
}
