use std::collections::BTreeMap;

use blobkeep_types::AssetKind;
use serde::Serialize;

use crate::error::StoreResult;
use crate::traits::ObjectStore;

/// Count and declared size of one kind's assets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KindStats {
    pub count: usize,
    pub total_size_bytes: u64,
}

/// Per-kind storage usage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub kinds: BTreeMap<AssetKind, KindStats>,
}

impl StorageStats {
    pub fn kind(&self, kind: AssetKind) -> KindStats {
        self.kinds.get(&kind).copied().unwrap_or_default()
    }

    /// Sum over all kinds.
    pub fn total(&self) -> KindStats {
        self.kinds.values().fold(KindStats::default(), |acc, stats| KindStats {
            count: acc.count + stats.count,
            total_size_bytes: acc.total_size_bytes + stats.total_size_bytes,
        })
    }
}

/// Compute usage from the declared sizes of every stored asset.
pub async fn storage_stats(store: &dyn ObjectStore) -> StoreResult<StorageStats> {
    let mut kinds = BTreeMap::new();
    for kind in AssetKind::ALL {
        let summaries = store.summaries(kind).await?;
        kinds.insert(
            kind,
            KindStats {
                count: summaries.len(),
                total_size_bytes: summaries.iter().map(|s| s.size).sum(),
            },
        );
    }
    Ok(StorageStats { kinds })
}
