use std::collections::BTreeMap;

use blobkeep_types::{AssetKind, SharedClock, Timestamp};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::StoreResult;
use crate::traits::{ObjectStore, SharedStore};

/// Result of one retention sweep.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Records created strictly before this instant were deleted.
    pub cutoff: Timestamp,
    pub deleted: BTreeMap<AssetKind, usize>,
}

impl SweepReport {
    /// Records deleted across all kinds.
    pub fn total(&self) -> usize {
        self.deleted.values().sum()
    }

    pub fn deleted_for(&self, kind: AssetKind) -> usize {
        self.deleted.get(&kind).copied().unwrap_or(0)
    }
}

/// Deletes assets older than a maximum age. Runs only when invoked.
pub struct RetentionSweeper {
    store: SharedStore,
    clock: SharedClock,
}

impl RetentionSweeper {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Delete every asset whose `created_at` is strictly before
    /// `now - max_age_days`.
    pub async fn sweep(&self, max_age_days: u64) -> StoreResult<SweepReport> {
        let cutoff = self.clock.now().minus_days(max_age_days);
        let mut deleted = BTreeMap::new();

        for kind in AssetKind::ALL {
            let mut count = 0;
            for summary in self.store.summaries(kind).await? {
                if summary.created_at.is_before(&cutoff) {
                    self.store.delete_asset(kind, summary.id.as_str()).await?;
                    debug!(%kind, id = %summary.id, created_at = %summary.created_at, "swept");
                    count += 1;
                }
            }
            deleted.insert(kind, count);
        }

        let report = SweepReport { cutoff, deleted };
        info!(
            max_age_days,
            cutoff = %report.cutoff,
            deleted = report.total(),
            "retention sweep complete"
        );
        Ok(report)
    }
}
