use std::sync::Arc;

use blobkeep_gate::{BatchReport, Gatekeeper, IncomingFile, UploadGate};
use blobkeep_settings::{AutoSave, SettingsAggregator};
use blobkeep_store::{
    storage_stats, AssetRecord, AssetSummary, Collection, CompactionReport, InMemoryObjectStore, LogStore,
    ObjectStore, RetentionSweeper, SharedStore, StorageStats, SweepReport,
};
use blobkeep_types::{
    AssetId, AssetKind, AssetSlot, PrayerSound, SettingChange, Settings, SettingsPatch, SharedClock,
    SystemClock,
};
use tracing::{info, warn};

use crate::config::BlobkeepConfig;
use crate::error::SdkResult;
use crate::inventory::Inventory;

/// High-level blobkeep API.
///
/// Owns one store handle and wires the gatekeeper, settings aggregator,
/// auto-save timer and retention sweeper around it. Call
/// [`Blobkeep::shutdown`] before dropping to write pending settings and close
/// the store.
pub struct Blobkeep {
    config: BlobkeepConfig,
    store: SharedStore,
    durable: Option<Arc<LogStore>>,
    clock: SharedClock,
    gatekeeper: Gatekeeper,
    aggregator: Arc<SettingsAggregator>,
    autosave: AutoSave,
    sweeper: RetentionSweeper,
}

impl Blobkeep {
    /// Open (or create) the durable store under `config.data_dir`.
    pub async fn open(config: BlobkeepConfig) -> SdkResult<Self> {
        config.validate()?;
        let log = Arc::new(LogStore::open(&config.data_dir, config.store.clone()).await?);
        info!(path = %log.log_path().display(), "blobkeep opened");
        let store: SharedStore = log.clone();
        Ok(Self::assemble(config, store, Some(log), Arc::new(SystemClock)))
    }

    /// A non-persistent instance backed by memory.
    pub async fn in_memory(config: BlobkeepConfig) -> SdkResult<Self> {
        Self::with_store(config, Arc::new(InMemoryObjectStore::new()), Arc::new(SystemClock)).await
    }

    /// Build around an existing store handle and clock.
    pub async fn with_store(config: BlobkeepConfig, store: SharedStore, clock: SharedClock) -> SdkResult<Self> {
        config.validate()?;
        Ok(Self::assemble(config, store, None, clock))
    }

    fn assemble(
        config: BlobkeepConfig,
        store: SharedStore,
        durable: Option<Arc<LogStore>>,
        clock: SharedClock,
    ) -> Self {
        let gate = UploadGate::with_default_stages(config.gate.clone());
        let gatekeeper = Gatekeeper::new(gate, store.clone(), clock.clone());
        let aggregator = Arc::new(SettingsAggregator::new(store.clone(), clock.clone()));
        let autosave = AutoSave::spawn(aggregator.clone(), config.autosave_interval());
        let sweeper = RetentionSweeper::new(store.clone(), clock.clone());
        Self {
            config,
            store,
            durable,
            clock,
            gatekeeper,
            aggregator,
            autosave,
            sweeper,
        }
    }

    pub fn config(&self) -> &BlobkeepConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    // ---- Assets ----

    pub async fn admit(&self, kind: AssetKind, file: IncomingFile) -> SdkResult<AssetId> {
        Ok(self.gatekeeper.admit(kind, file).await?)
    }

    pub async fn admit_many(&self, kind: AssetKind, files: Vec<IncomingFile>) -> BatchReport {
        self.gatekeeper.admit_many(kind, files).await
    }

    /// The asset as a `data:` URI, or `None` if it does not exist.
    pub async fn load_asset(&self, kind: AssetKind, id: &str) -> SdkResult<Option<String>> {
        Ok(self.gatekeeper.load_asset(kind, id).await?)
    }

    /// The asset with its raw payload.
    pub async fn fetch(&self, kind: AssetKind, id: &str) -> SdkResult<Option<AssetRecord>> {
        Ok(self.gatekeeper.fetch(kind, id).await?)
    }

    pub async fn delete_asset(&self, kind: AssetKind, id: &str) -> SdkResult<()> {
        Ok(self.gatekeeper.delete_asset(kind, id).await?)
    }

    pub async fn delete_many<S: AsRef<str>>(&self, kind: AssetKind, ids: &[S]) -> usize {
        self.gatekeeper.delete_many(kind, ids).await
    }

    pub async fn list(&self, kind: AssetKind) -> SdkResult<Vec<AssetSummary>> {
        Ok(self.gatekeeper.list(kind).await?)
    }

    pub async fn inventory(&self) -> SdkResult<Inventory> {
        Ok(Inventory::new(
            self.list(AssetKind::Image).await?,
            self.list(AssetKind::Sound).await?,
            self.list(AssetKind::Background).await?,
        ))
    }

    // ---- Purpose flows ----

    /// Store a new background and make it the current one.
    pub async fn set_background(&self, file: IncomingFile) -> SdkResult<AssetId> {
        let id = self.admit(AssetKind::Background, file).await?;
        let patch = SettingsPatch::from(SettingChange::CurrentBackground(Some(id.clone())))
            .with(SettingChange::LastBackgroundUpdate(self.clock.now()));
        self.aggregator.merge(&patch).await?;
        info!(%id, "background updated");
        Ok(id)
    }

    /// The current background as a `data:` URI. A reference to a deleted
    /// background yields `None`.
    pub async fn current_background(&self) -> SdkResult<Option<String>> {
        let settings = self.aggregator.read().await?;
        self.resolve(AssetKind::Background, settings.current_background.as_ref())
            .await
    }

    /// Store a custom call-to-prayer sound for `prayer`.
    pub async fn set_prayer_sound(&self, prayer: &str, file: IncomingFile) -> SdkResult<AssetId> {
        let file_name = file.name.clone();
        let id = self.admit(AssetKind::Sound, file).await?;
        let sound = PrayerSound {
            sound_id: id.clone(),
            uploaded_at: self.clock.now(),
            file_name,
        };
        self.aggregator
            .set_one(SettingChange::PrayerSound {
                prayer: prayer.to_string(),
                sound: Some(sound),
            })
            .await?;
        info!(prayer, %id, "prayer sound updated");
        Ok(id)
    }

    pub async fn prayer_sound(&self, prayer: &str) -> SdkResult<Option<String>> {
        let settings = self.aggregator.read().await?;
        let id = settings.prayer_sounds.get(prayer).map(|sound| &sound.sound_id);
        self.resolve(AssetKind::Sound, id).await
    }

    pub async fn set_alert_sound(&self, file: IncomingFile) -> SdkResult<AssetId> {
        let id = self.admit(AssetKind::Sound, file).await?;
        self.aggregator
            .set_one(SettingChange::AlertSound(Some(id.clone())))
            .await?;
        Ok(id)
    }

    pub async fn alert_sound(&self) -> SdkResult<Option<String>> {
        let settings = self.aggregator.read().await?;
        self.resolve(AssetKind::Sound, settings.alert_sound.as_ref()).await
    }

    /// Store the device image and remember its original file name.
    pub async fn set_device_image(&self, file: IncomingFile) -> SdkResult<AssetId> {
        let name = file.name.clone();
        let id = self.admit(AssetKind::Image, file).await?;
        self.aggregator
            .set_one(SettingChange::DeviceImage {
                id: Some(id.clone()),
                name: Some(name),
            })
            .await?;
        Ok(id)
    }

    pub async fn device_image(&self) -> SdkResult<Option<String>> {
        let settings = self.aggregator.read().await?;
        self.resolve(AssetKind::Image, settings.device_image.as_ref()).await
    }

    async fn resolve(&self, kind: AssetKind, id: Option<&AssetId>) -> SdkResult<Option<String>> {
        match id {
            Some(id) => self.load_asset(kind, id.as_str()).await,
            None => Ok(None),
        }
    }

    // ---- Settings ----

    pub async fn settings(&self) -> SdkResult<Settings> {
        Ok(self.aggregator.read().await?)
    }

    pub async fn merge_settings(&self, patch: &SettingsPatch) -> SdkResult<Settings> {
        Ok(self.aggregator.merge(patch).await?)
    }

    pub async fn set_setting(&self, change: SettingChange) -> SdkResult<Settings> {
        Ok(self.aggregator.set_one(change).await?)
    }

    /// Record a change for the next auto-save flush.
    pub fn queue_setting(&self, change: SettingChange) {
        self.autosave.set_pending(change);
    }

    pub fn has_pending_settings(&self) -> bool {
        self.autosave.is_dirty()
    }

    /// Write queued changes now instead of waiting for the timer.
    pub async fn flush_settings(&self) -> SdkResult<Option<Settings>> {
        Ok(self.autosave.flush_once().await?)
    }

    pub async fn export_settings(&self) -> SdkResult<String> {
        Ok(self.aggregator.export_json().await?)
    }

    /// Replace the settings with a JSON document. Queued changes are dropped
    /// so they cannot overwrite the imported values; an invalid document
    /// leaves both the stored settings and the queue alone.
    pub async fn import_settings(&self, json: &str) -> SdkResult<Settings> {
        Ok(self.autosave.discard_with(self.aggregator.import_json(json)).await?)
    }

    // ---- Maintenance ----

    pub async fn sweep(&self, max_age_days: u64) -> SdkResult<SweepReport> {
        Ok(self.sweeper.sweep(max_age_days).await?)
    }

    pub async fn stats(&self) -> SdkResult<StorageStats> {
        Ok(storage_stats(self.store.as_ref()).await?)
    }

    /// Remove every record from every collection, settings included.
    pub async fn clear_all(&self) -> SdkResult<()> {
        self.autosave.discard_with(self.aggregator.clear_store()).await?;
        warn!("all stored data cleared");
        Ok(())
    }

    /// Clear settings references whose asset no longer exists. Returns the
    /// slots that were cleared.
    pub async fn prune_dangling_references(&self) -> SdkResult<Vec<AssetSlot>> {
        let settings = self.aggregator.read().await?;
        let mut patch = SettingsPatch::new();
        let mut pruned = Vec::new();
        for (slot, id) in settings.asset_references() {
            let collection = Collection::for_kind(slot.kind());
            if !self.store.contains(collection, id.as_str()).await? {
                patch.detach(&slot);
                pruned.push(slot);
            }
        }
        if !patch.is_empty() {
            self.aggregator.merge(&patch).await?;
            info!(pruned = pruned.len(), "dangling settings references cleared");
        }
        Ok(pruned)
    }

    /// Compact the durable log. `None` for in-memory instances.
    pub async fn compact(&self) -> SdkResult<Option<CompactionReport>> {
        match &self.durable {
            Some(log) => Ok(Some(log.compact().await?)),
            None => Ok(None),
        }
    }

    /// Stop auto-save with a final flush, then close the store.
    ///
    /// The store is closed even if the final flush fails; the flush error is
    /// returned afterwards.
    pub async fn shutdown(&self) -> SdkResult<()> {
        let flushed = self.autosave.shutdown().await;
        self.store.close().await?;
        flushed?;
        info!("blobkeep closed");
        Ok(())
    }
}

impl std::fmt::Debug for Blobkeep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blobkeep")
            .field("durable", &self.durable.is_some())
            .field("autosave", &self.autosave)
            .finish()
    }
}
