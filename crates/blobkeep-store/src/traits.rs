use std::sync::Arc;

use async_trait::async_trait;
use blobkeep_types::AssetKind;

use crate::error::StoreResult;
use crate::record::{AssetRecord, AssetSummary, Collection, SettingsRecord, StoredRecord, SETTINGS_KEY};

/// Shared handle to a store, passed explicitly to every component.
pub type SharedStore = Arc<dyn ObjectStore>;

/// Collection-keyed record store.
///
/// All implementations must satisfy these invariants:
/// - `put` is an upsert: a record replaces any record with the same key.
/// - A collection only holds records of its own shape; mismatches fail with
///   `StoreError::CollectionMismatch` and leave the store untouched.
/// - `delete` of a missing key succeeds.
/// - Each mutation is atomic: it is either fully visible or not at all.
/// - After `close`, every other operation fails with `StoreError::Closed`;
///   closing twice is a no-op.
/// - All backend errors are propagated, never silently ignored.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Insert or replace `record` and return its key.
    async fn put(&self, collection: Collection, record: StoredRecord) -> StoreResult<String>;

    /// Read a record by key. Returns `Ok(None)` if it does not exist.
    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<StoredRecord>>;

    /// Every record in `collection`, in no particular order.
    async fn get_all(&self, collection: Collection) -> StoreResult<Vec<StoredRecord>>;

    /// Remove a record. Deleting a missing key is a no-op.
    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<()>;

    /// Remove every record from every collection.
    async fn clear(&self) -> StoreResult<()>;

    /// Release the backend. Later calls fail with `StoreError::Closed`.
    async fn close(&self) -> StoreResult<()>;

    /// Whether `collection` holds a record under `key`.
    ///
    /// Default implementation calls `get()`.
    async fn contains(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        Ok(self.get(collection, key).await?.is_some())
    }

    /// Number of records in `collection`.
    ///
    /// Default implementation counts `get_all()`. Backends with an index
    /// should override.
    async fn count(&self, collection: Collection) -> StoreResult<usize> {
        Ok(self.get_all(collection).await?.len())
    }

    /// Metadata of every asset of `kind`, without payloads.
    ///
    /// Default implementation projects `assets()`. Backends that can list
    /// without reading payloads should override.
    async fn summaries(&self, kind: AssetKind) -> StoreResult<Vec<AssetSummary>> {
        Ok(self.assets(kind).await?.iter().map(AssetRecord::summary).collect())
    }

    // -----------------------------------------------------------------------
    // Typed helpers
    // -----------------------------------------------------------------------

    async fn put_asset(&self, kind: AssetKind, record: AssetRecord) -> StoreResult<String> {
        self.put(Collection::for_kind(kind), record.into()).await
    }

    async fn get_asset(&self, kind: AssetKind, id: &str) -> StoreResult<Option<AssetRecord>> {
        let record = self.get(Collection::for_kind(kind), id).await?;
        Ok(record.and_then(StoredRecord::into_asset))
    }

    async fn assets(&self, kind: AssetKind) -> StoreResult<Vec<AssetRecord>> {
        let records = self.get_all(Collection::for_kind(kind)).await?;
        Ok(records.into_iter().filter_map(StoredRecord::into_asset).collect())
    }

    async fn delete_asset(&self, kind: AssetKind, id: &str) -> StoreResult<()> {
        self.delete(Collection::for_kind(kind), id).await
    }

    async fn put_settings(&self, record: SettingsRecord) -> StoreResult<()> {
        self.put(Collection::Settings, record.into()).await.map(|_| ())
    }

    async fn get_settings(&self) -> StoreResult<Option<SettingsRecord>> {
        let record = self.get(Collection::Settings, SETTINGS_KEY).await?;
        Ok(record.and_then(StoredRecord::into_settings))
    }
}
