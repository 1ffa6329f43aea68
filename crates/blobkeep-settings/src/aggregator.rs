use blobkeep_store::{ObjectStore, SettingsRecord, SharedStore};
use blobkeep_types::{SettingChange, Settings, SettingsPatch, SharedClock};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::SettingsResult;

/// Read-merge-write access to the single settings record.
///
/// Writes through one aggregator are serialized, so two merges never lose
/// each other's fields. Writers using separate aggregators on the same store
/// resolve by commit order.
pub struct SettingsAggregator {
    store: SharedStore,
    clock: SharedClock,
    write_lock: Mutex<()>,
}

impl SettingsAggregator {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// The persisted settings, or the defaults if none were ever saved.
    pub async fn read(&self) -> SettingsResult<Settings> {
        Ok(self
            .store
            .get_settings()
            .await?
            .map(|record| record.value)
            .unwrap_or_default())
    }

    /// Apply `patch` on top of the current settings, stamp `last_saved` and
    /// persist. Returns the merged value.
    pub async fn merge(&self, patch: &SettingsPatch) -> SettingsResult<Settings> {
        let _guard = self.write_lock.lock().await;
        let mut settings = self.read().await?;
        settings.apply(patch);
        self.persist(settings).await
    }

    pub async fn set_one(&self, change: SettingChange) -> SettingsResult<Settings> {
        self.merge(&SettingsPatch::from(change)).await
    }

    /// Persist a complete settings value, replacing whatever was stored.
    pub async fn replace(&self, settings: Settings) -> SettingsResult<Settings> {
        let _guard = self.write_lock.lock().await;
        self.persist(settings).await
    }

    /// The current settings as pretty-printed JSON.
    pub async fn export_json(&self) -> SettingsResult<String> {
        Ok(serde_json::to_string_pretty(&self.read().await?)?)
    }

    /// Replace the settings with a JSON document. Missing fields take their
    /// defaults; invalid values are rejected before anything is written.
    pub async fn import_json(&self, json: &str) -> SettingsResult<Settings> {
        let settings: Settings = serde_json::from_str(json)?;
        self.replace(settings).await
    }

    /// Clear every collection of the store, settings included, once no
    /// settings write through this aggregator is in progress.
    pub async fn clear_store(&self) -> SettingsResult<()> {
        let _guard = self.write_lock.lock().await;
        self.store.clear().await?;
        debug!("store cleared");
        Ok(())
    }

    async fn persist(&self, mut settings: Settings) -> SettingsResult<Settings> {
        let now = self.clock.now();
        settings.last_saved = Some(now);
        self.store
            .put_settings(SettingsRecord::new(settings.clone(), now))
            .await?;
        debug!(saved_at = %now, "settings saved");
        Ok(settings)
    }
}
