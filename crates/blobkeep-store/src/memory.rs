use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{StoreError, StoreOp, StoreResult};
use crate::record::{Collection, StoredRecord};
use crate::traits::ObjectStore;

type Records = HashMap<Collection, HashMap<String, StoredRecord>>;

/// In-memory, HashMap-based record store.
///
/// Intended for tests and embedding. Records are held behind a `RwLock` and
/// cloned on read.
pub struct InMemoryObjectStore {
    records: RwLock<Records>,
    closed: AtomicBool,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Total number of records across all collections.
    pub fn len(&self) -> usize {
        self.records
            .read()
            .expect("lock poisoned")
            .values()
            .map(HashMap::len)
            .sum()
    }

    /// Returns `true` if no collection holds a record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_open(&self, op: StoreOp) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed { op });
        }
        Ok(())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, collection: Collection, record: StoredRecord) -> StoreResult<String> {
        self.ensure_open(StoreOp::Put)?;
        if !collection.accepts(&record) {
            return Err(StoreError::CollectionMismatch {
                collection,
                record: record.shape(),
            });
        }
        let key = record.key().to_string();
        let mut map = self.records.write().expect("lock poisoned");
        map.entry(collection).or_default().insert(key.clone(), record);
        Ok(key)
    }

    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<StoredRecord>> {
        self.ensure_open(StoreOp::Get)?;
        let map = self.records.read().expect("lock poisoned");
        Ok(map.get(&collection).and_then(|records| records.get(key)).cloned())
    }

    async fn get_all(&self, collection: Collection) -> StoreResult<Vec<StoredRecord>> {
        self.ensure_open(StoreOp::GetAll)?;
        let map = self.records.read().expect("lock poisoned");
        Ok(map
            .get(&collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<()> {
        self.ensure_open(StoreOp::Delete)?;
        let mut map = self.records.write().expect("lock poisoned");
        if let Some(records) = map.get_mut(&collection) {
            records.remove(key);
        }
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.ensure_open(StoreOp::Clear)?;
        self.records.write().expect("lock poisoned").clear();
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    async fn contains(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        self.ensure_open(StoreOp::Get)?;
        let map = self.records.read().expect("lock poisoned");
        Ok(map.get(&collection).is_some_and(|records| records.contains_key(key)))
    }

    async fn count(&self, collection: Collection) -> StoreResult<usize> {
        self.ensure_open(StoreOp::GetAll)?;
        let map = self.records.read().expect("lock poisoned");
        Ok(map.get(&collection).map_or(0, HashMap::len))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("record_count", &self.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
