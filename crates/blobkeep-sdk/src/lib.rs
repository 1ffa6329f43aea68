//! High-level API for blobkeep.
//!
//! [`Blobkeep`] is the entry point for applications: it opens one store
//! (durable or in-memory), shares it between upload admission, settings,
//! auto-save and retention, and exposes the application-level flows such as
//! setting the current background or a per-prayer sound.
//!
//! Settings may reference assets that were later deleted. Readers treat such
//! references as absent; [`Blobkeep::prune_dangling_references`] clears them
//! on request.

pub mod app;
pub mod config;
pub mod error;
pub mod inventory;

pub use app::Blobkeep;
pub use config::BlobkeepConfig;
pub use error::{SdkError, SdkResult};
pub use inventory::Inventory;

// Re-export key types
pub use blobkeep_gate::{BatchReport, FileBody, GateConfig, GateError, IncomingFile};
pub use blobkeep_settings::SettingsError;
pub use blobkeep_store::{
    AssetRecord, AssetSummary, CompactionReport, KindStats, StorageStats, StoreConfig, StoreError, SweepReport,
    SyncMode,
};
pub use blobkeep_types::{
    AssetId, AssetKind, AssetSlot, PrayerSound, SettingChange, Settings, SettingsPatch, Theme, Timestamp, Volume,
};

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use blobkeep_codec::PortableCodec;
    use blobkeep_store::{Collection, InMemoryObjectStore, ObjectStore, StoreResult, StoredRecord};
    use blobkeep_types::{ManualClock, MILLIS_PER_DAY};
    use tokio::sync::Notify;

    use super::*;

    const START: u64 = 100 * MILLIS_PER_DAY;

    async fn app() -> (Blobkeep, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(START)));
        let store = Arc::new(InMemoryObjectStore::new());
        let app = Blobkeep::with_store(BlobkeepConfig::default(), store, clock.clone())
            .await
            .unwrap();
        (app, clock)
    }

    fn png(name: &str, len: usize) -> IncomingFile {
        IncomingFile::bytes(name, "image/png", vec![0x89; len])
    }

    fn mp3(name: &str) -> IncomingFile {
        IncomingFile::bytes(name, "audio/mpeg", b"ID3\x03".to_vec())
    }

    fn days(n: u64) -> Duration {
        Duration::from_millis(n * MILLIS_PER_DAY)
    }

    // -----------------------------------------------------------------------
    // 1. Assets
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn upload_list_delete_end_to_end() {
        let (app, _) = app().await;
        let id = app.admit(AssetKind::Image, png("photo.png", 2 * 1024 * 1024)).await.unwrap();
        assert!(id.as_str().starts_with(&format!("image_{START}_")));

        let listed = app.list(AssetKind::Image).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].size, 2_097_152);

        app.delete_asset(AssetKind::Image, id.as_str()).await.unwrap();
        assert!(app.fetch(AssetKind::Image, id.as_str()).await.unwrap().is_none());
        assert!(app.load_asset(AssetKind::Image, id.as_str()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn inventory_and_stats_cover_every_kind() {
        let (app, _) = app().await;
        app.admit(AssetKind::Image, png("a.png", 10)).await.unwrap();
        app.admit(AssetKind::Image, png("b.png", 20)).await.unwrap();
        app.admit(AssetKind::Sound, mp3("c.mp3")).await.unwrap();
        app.admit(AssetKind::Background, png("d.png", 5)).await.unwrap();

        let inventory = app.inventory().await.unwrap();
        assert_eq!(inventory.images.len(), 2);
        assert_eq!(inventory.sounds.len(), 1);
        assert_eq!(inventory.backgrounds.len(), 1);
        assert_eq!(inventory.total, 4);

        let stats = app.stats().await.unwrap();
        assert_eq!(stats.kind(AssetKind::Image).total_size_bytes, 30);
        assert_eq!(stats.total().count, 4);
        assert_eq!(stats.total().total_size_bytes, 39);
    }

    #[tokio::test]
    async fn batch_upload_reports_each_file() {
        let (app, _) = app().await;
        let report = app
            .admit_many(
                AssetKind::Sound,
                vec![mp3("ok.mp3"), IncomingFile::bytes("bad.txt", "text/plain", b"x".to_vec())],
            )
            .await;
        assert_eq!(report.admitted.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "bad.txt");

        let ids: Vec<String> = report.admitted.iter().map(|(_, id)| id.to_string()).collect();
        assert_eq!(app.delete_many(AssetKind::Sound, &ids).await, 1);
        assert!(app.inventory().await.unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // 2. Purpose flows
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn background_flow_records_reference_and_time() {
        let (app, _) = app().await;
        let id = app.set_background(png("sky.png", 64)).await.unwrap();

        let settings = app.settings().await.unwrap();
        assert_eq!(settings.current_background, Some(id));
        assert_eq!(settings.last_background_update, Some(Timestamp::from_millis(START)));

        let uri = app.current_background().await.unwrap().expect("background set");
        let (bytes, mime) = PortableCodec::decode(&uri).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, vec![0x89; 64]);
    }

    #[tokio::test]
    async fn dangling_reference_reads_as_absent_until_pruned() {
        let (app, _) = app().await;
        let id = app.set_background(png("sky.png", 8)).await.unwrap();
        app.delete_asset(AssetKind::Background, id.as_str()).await.unwrap();

        assert!(app.current_background().await.unwrap().is_none());
        assert_eq!(app.settings().await.unwrap().current_background, Some(id));

        let pruned = app.prune_dangling_references().await.unwrap();
        assert_eq!(pruned, vec![AssetSlot::CurrentBackground]);
        assert!(app.settings().await.unwrap().current_background.is_none());
        assert!(app.prune_dangling_references().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prayer_sounds_are_kept_per_prayer() {
        let (app, _) = app().await;
        let fajr = app.set_prayer_sound("fajr", mp3("fajr.mp3")).await.unwrap();
        app.set_prayer_sound("isha", mp3("isha.mp3")).await.unwrap();

        let settings = app.settings().await.unwrap();
        let entry = &settings.prayer_sounds["fajr"];
        assert_eq!(entry.sound_id, fajr);
        assert_eq!(entry.file_name, "fajr.mp3");
        assert_eq!(entry.uploaded_at, Timestamp::from_millis(START));
        assert_eq!(settings.prayer_sounds.len(), 2);

        let uri = app.prayer_sound("fajr").await.unwrap().unwrap();
        assert!(uri.starts_with("data:audio/mpeg;base64,"));
        assert!(app.prayer_sound("maghrib").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn alert_sound_and_device_image() {
        let (app, _) = app().await;
        let alert = app.set_alert_sound(mp3("beep.mp3")).await.unwrap();
        let image = app.set_device_image(png("me.png", 4)).await.unwrap();

        let settings = app.settings().await.unwrap();
        assert_eq!(settings.alert_sound, Some(alert));
        assert_eq!(settings.device_image, Some(image));
        assert_eq!(settings.device_image_name.as_deref(), Some("me.png"));
        assert!(app.alert_sound().await.unwrap().is_some());
        assert!(app.device_image().await.unwrap().unwrap().starts_with("data:image/png;"));
    }

    #[tokio::test]
    async fn rejected_upload_leaves_settings_alone() {
        let (app, _) = app().await;
        let err = app
            .set_background(IncomingFile::bytes("notes.txt", "text/plain", b"hi".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Gate(GateError::Validation(_))));
        assert!(app.store().get_settings().await.unwrap().is_none());
        assert!(app.inventory().await.unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // 3. Settings
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn queued_settings_are_written_on_flush() {
        let (app, _) = app().await;
        app.queue_setting(SettingChange::Theme(Theme::Light));
        assert!(app.has_pending_settings());
        assert_eq!(app.settings().await.unwrap().theme, Theme::Dark);

        let saved = app.flush_settings().await.unwrap().unwrap();
        assert_eq!(saved.theme, Theme::Light);
        assert!(!app.has_pending_settings());
    }

    #[tokio::test]
    async fn import_replaces_settings_and_drops_queue() {
        let (app, _) = app().await;
        app.set_setting(SettingChange::Language("en".into())).await.unwrap();
        let exported = app.export_settings().await.unwrap();

        app.set_setting(SettingChange::Language("fr".into())).await.unwrap();
        app.queue_setting(SettingChange::Notifications(false));
        let imported = app.import_settings(&exported).await.unwrap();

        assert_eq!(imported.language, "en");
        assert!(!app.has_pending_settings());
        assert!(app.flush_settings().await.unwrap().is_none());
        assert!(app.settings().await.unwrap().notifications);
    }

    #[tokio::test]
    async fn invalid_setting_json_is_rejected() {
        let (app, _) = app().await;
        let err = app.import_settings("{\"theme\": \"purple\"}").await.unwrap_err();
        assert!(matches!(err, SdkError::Settings(SettingsError::Import(_))));
    }

    // -----------------------------------------------------------------------
    // 4. Maintenance
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn sweep_uses_the_injected_clock() {
        let (app, clock) = app().await;
        app.admit(AssetKind::Image, png("old.png", 1)).await.unwrap();
        clock.advance(days(31));
        let fresh = app.admit(AssetKind::Image, png("new.png", 1)).await.unwrap();

        let report = app.sweep(30).await.unwrap();
        assert_eq!(report.total(), 1);
        let remaining = app.list(AssetKind::Image).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, fresh);
    }

    #[tokio::test]
    async fn clear_all_empties_store_and_queue() {
        let (app, _) = app().await;
        app.set_background(png("sky.png", 8)).await.unwrap();
        app.queue_setting(SettingChange::LockScreenMinutes(9));

        app.clear_all().await.unwrap();
        assert!(app.inventory().await.unwrap().is_empty());
        assert!(!app.has_pending_settings());
        assert_eq!(app.settings().await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn compact_is_a_no_op_in_memory() {
        let (app, _) = app().await;
        assert!(app.compact().await.unwrap().is_none());
    }

    // -----------------------------------------------------------------------
    // 5. Durable lifecycle
    // -----------------------------------------------------------------------

    fn durable_config(dir: &tempfile::TempDir) -> BlobkeepConfig {
        BlobkeepConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn durable_instance_survives_restart() {
        let dir = tempfile::tempdir().unwrap();

        let app = Blobkeep::open(durable_config(&dir)).await.unwrap();
        let id = app.set_background(png("sky.png", 128)).await.unwrap();
        app.queue_setting(SettingChange::Theme(Theme::Light));
        app.shutdown().await.unwrap();

        assert!(dir.path().join("blobkeep").join("store.log").exists());

        let app = Blobkeep::open(durable_config(&dir)).await.unwrap();
        let settings = app.settings().await.unwrap();
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.current_background, Some(id));
        assert!(app.current_background().await.unwrap().is_some());

        let report = app.compact().await.unwrap().expect("durable store compacts");
        assert!(report.records >= 2);
        app.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn operations_after_shutdown_fail() {
        let dir = tempfile::tempdir().unwrap();
        let app = Blobkeep::open(durable_config(&dir)).await.unwrap();
        app.shutdown().await.unwrap();

        let err = app.list(AssetKind::Image).await.unwrap_err();
        assert!(matches!(err, SdkError::Gate(GateError::Store(StoreError::Closed { .. }))));
        app.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_opening() {
        let dir = tempfile::tempdir().unwrap();
        let config = BlobkeepConfig {
            autosave_interval_secs: 0,
            ..durable_config(&dir)
        };
        let err = Blobkeep::open(config).await.unwrap_err();
        assert!(matches!(err, SdkError::InvalidConfig(_)));
        assert!(!dir.path().join("blobkeep").exists());
    }

    // -----------------------------------------------------------------------
    // 6. Clearing and importing while a flush is in flight
    // -----------------------------------------------------------------------

    /// In-memory store whose next settings write, once armed, signals
    /// `entered` and waits for `release`.
    #[derive(Default)]
    struct GatedStore {
        inner: InMemoryObjectStore,
        armed: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl ObjectStore for GatedStore {
        async fn put(&self, collection: Collection, record: StoredRecord) -> StoreResult<String> {
            if collection == Collection::Settings && self.armed.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.put(collection, record).await
        }

        async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<StoredRecord>> {
            self.inner.get(collection, key).await
        }

        async fn get_all(&self, collection: Collection) -> StoreResult<Vec<StoredRecord>> {
            self.inner.get_all(collection).await
        }

        async fn delete(&self, collection: Collection, key: &str) -> StoreResult<()> {
            self.inner.delete(collection, key).await
        }

        async fn clear(&self) -> StoreResult<()> {
            self.inner.clear().await
        }

        async fn close(&self) -> StoreResult<()> {
            self.inner.close().await
        }
    }

    async fn gated_app() -> (Blobkeep, Arc<GatedStore>) {
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(START)));
        let store = Arc::new(GatedStore::default());
        let app = Blobkeep::with_store(BlobkeepConfig::default(), store.clone(), clock)
            .await
            .unwrap();
        (app, store)
    }

    #[tokio::test]
    async fn clear_all_is_not_undone_by_a_flush_in_flight() {
        let (app, store) = gated_app().await;
        app.queue_setting(SettingChange::Language("en".into()));
        app.queue_setting(SettingChange::Theme(Theme::Light));
        store.armed.store(true, Ordering::SeqCst);

        let (flushed, cleared) = tokio::join!(app.flush_settings(), async {
            store.entered.notified().await;
            let (cleared, ()) = tokio::join!(app.clear_all(), async {
                tokio::task::yield_now().await;
                store.release.notify_one();
            });
            cleared
        });
        flushed.unwrap();
        cleared.unwrap();

        assert_eq!(app.settings().await.unwrap(), Settings::default());
        assert!(store.get_settings().await.unwrap().is_none());
        assert!(!app.has_pending_settings());
    }

    #[tokio::test]
    async fn import_wins_over_a_flush_in_flight() {
        let (app, store) = gated_app().await;
        app.queue_setting(SettingChange::Theme(Theme::Light));
        store.armed.store(true, Ordering::SeqCst);

        let (flushed, imported) = tokio::join!(app.flush_settings(), async {
            store.entered.notified().await;
            let (imported, ()) = tokio::join!(app.import_settings(r#"{"language":"fr"}"#), async {
                tokio::task::yield_now().await;
                store.release.notify_one();
            });
            imported
        });
        flushed.unwrap();
        assert_eq!(imported.unwrap().language, "fr");

        let settings = app.settings().await.unwrap();
        assert_eq!(settings.language, "fr");
        assert_eq!(settings.theme, Theme::Dark);
        assert!(!app.has_pending_settings());
    }

    #[tokio::test]
    async fn failed_import_keeps_queued_changes() {
        let (app, _) = app().await;
        app.queue_setting(SettingChange::LockScreenMinutes(3));
        assert!(app.import_settings("{ not json").await.is_err());
        assert!(app.has_pending_settings());
        let saved = app.flush_settings().await.unwrap().unwrap();
        assert_eq!(saved.lock_screen_minutes, 3);
    }
}
