//! Upload admission for blobkeep.
//!
//! Every upload passes through the [`UploadGate`] before its body is decoded
//! or anything is written. The gate runs a configurable pipeline of stages
//! (MIME allow-list, size ceiling) and the [`Gatekeeper`] persists accepted
//! uploads under freshly generated ids.
//!
//! # Quick Start
//!
//! ```rust
//! use blobkeep_gate::{GateConfig, UploadCandidate, UploadGate};
//! use blobkeep_types::AssetKind;
//!
//! let gate = UploadGate::with_default_stages(GateConfig::default());
//! let candidate = UploadCandidate {
//!     kind: AssetKind::Image,
//!     name: "sunset.png",
//!     mime_type: "image/png",
//!     size: 1024,
//! };
//! assert!(gate.evaluate(&candidate).unwrap().is_accepted());
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod gatekeeper;
pub mod stage;
pub mod stages;

// Re-exports for convenience.
pub use config::GateConfig;
pub use error::{GateError, GateResult};
pub use gate::{GateVerdict, UploadGate};
pub use gatekeeper::{BatchReport, FileBody, Gatekeeper, IncomingFile};
pub use stage::{GateStage, StageDecision, StageResult, UploadCandidate};
pub use stages::{MimeTypeStage, SizeLimitStage};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use blobkeep_codec::{FormatError, PortableCodec};
    use blobkeep_store::{
        Collection, InMemoryObjectStore, ObjectStore, SharedStore, StoreResult, StoredRecord,
    };
    use blobkeep_types::{AssetKind, ManualClock, Timestamp, ID_SUFFIX_LEN};

    const START: u64 = 1_700_000_000_000;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Timestamp::from_millis(START)))
    }

    fn keeper_with(store: SharedStore, config: GateConfig) -> Gatekeeper {
        Gatekeeper::new(UploadGate::with_default_stages(config), store, clock())
    }

    fn keeper() -> (Gatekeeper, Arc<InMemoryObjectStore>) {
        let store = Arc::new(InMemoryObjectStore::new());
        (keeper_with(store.clone(), GateConfig::default()), store)
    }

    async fn counts(store: &InMemoryObjectStore) -> Vec<usize> {
        let mut counts = Vec::new();
        for collection in Collection::ALL {
            counts.push(store.count(collection).await.unwrap());
        }
        counts
    }

    fn png(name: &str, len: usize) -> IncomingFile {
        IncomingFile::bytes(name, "image/png", vec![0xAB; len])
    }

    // -----------------------------------------------------------------------
    // 1. End-to-end admission
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn admit_list_delete_roundtrip() {
        let (keeper, store) = keeper();
        let id = keeper.admit(AssetKind::Image, png("photo.png", 2 * 1024 * 1024)).await.unwrap();

        // ^image_\d+_[0-9a-z]{9}$
        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "image");
        assert!(!parts[1].is_empty() && parts[1].bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
        assert!(parts[2].bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));

        let listed = keeper.list(AssetKind::Image).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].size, 2_097_152);
        assert_eq!(listed[0].created_at, Timestamp::from_millis(START));

        keeper.delete_asset(AssetKind::Image, id.as_str()).await.unwrap();
        assert!(store.get(Collection::Images, id.as_str()).await.unwrap().is_none());
        assert!(keeper.load_asset(AssetKind::Image, id.as_str()).await.unwrap().is_none());
    }

    // -----------------------------------------------------------------------
    // 2. Validation leaves the store untouched
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn rejections_leave_counts_unchanged() {
        let (keeper, store) = keeper();
        keeper.admit(AssetKind::Sound, IncomingFile::bytes("a.mp3", "audio/mpeg", vec![1; 10])).await.unwrap();
        let before = counts(&store).await;

        let wrong_type = keeper.admit(AssetKind::Image, IncomingFile::bytes("a.bmp", "image/bmp", vec![1])).await;
        assert!(matches!(wrong_type, Err(GateError::Validation(_))));

        let too_big = keeper.admit(AssetKind::Background, png("huge.png", 10 * 1024 * 1024 + 1)).await;
        let err = too_big.unwrap_err();
        assert!(err.is_rejection());
        assert!(err.to_string().contains("limit"));

        assert_eq!(counts(&store).await, before);
    }

    #[tokio::test]
    async fn stored_mime_type_is_exactly_the_admitted_one() {
        let (keeper, store) = keeper();
        let before = counts(&store).await;
        let variant = IncomingFile::bytes("a.ogg", "Audio/OGG; codecs=opus", vec![1; 4]);
        assert!(matches!(keeper.admit(AssetKind::Sound, variant).await, Err(GateError::Validation(_))));
        assert_eq!(counts(&store).await, before);

        let id = keeper.admit(AssetKind::Sound, IncomingFile::bytes("a.ogg", "audio/ogg", vec![1; 4])).await.unwrap();
        let record = keeper.fetch(AssetKind::Sound, id.as_str()).await.unwrap().unwrap();
        assert_eq!(record.mime_type, "audio/ogg");
    }

    #[tokio::test]
    async fn declared_size_is_what_gets_checked() {
        let (keeper, _store) = keeper();
        // Tiny body, oversized declaration.
        let file = IncomingFile::portable("big.ogg", "audio/ogg", 60 * 1024 * 1024, "data:audio/ogg;base64,AA==");
        assert!(matches!(keeper.admit(AssetKind::Sound, file).await, Err(GateError::Validation(_))));
    }

    // -----------------------------------------------------------------------
    // 3. Portable bodies
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn portable_body_is_decoded_before_storage() {
        let (keeper, store) = keeper();
        let text = PortableCodec::encode(b"RIFF....WAVE", "audio/wav");
        let file = IncomingFile::portable("beep.wav", "audio/wav", 12, text.clone());
        let id = keeper.admit(AssetKind::Sound, file).await.unwrap();

        let record = store.get_asset(AssetKind::Sound, id.as_str()).await.unwrap().unwrap();
        assert_eq!(record.payload, b"RIFF....WAVE");
        assert_eq!(keeper.load_asset(AssetKind::Sound, id.as_str()).await.unwrap(), Some(text));
    }

    #[tokio::test]
    async fn malformed_portable_body_writes_nothing() {
        let (keeper, store) = keeper();
        let file = IncomingFile::portable("x.png", "image/png", 3, "not a data uri");
        let err = keeper.admit(AssetKind::Image, file).await.unwrap_err();
        assert_eq!(err, GateError::Format(FormatError::MissingScheme));
        assert!(store.is_empty());
    }

    // -----------------------------------------------------------------------
    // 4. Id uniqueness
    // -----------------------------------------------------------------------

    /// Reports every key as taken so id generation can never succeed.
    struct CrowdedStore(InMemoryObjectStore);

    #[async_trait]
    impl ObjectStore for CrowdedStore {
        async fn put(&self, collection: Collection, record: StoredRecord) -> StoreResult<String> {
            self.0.put(collection, record).await
        }
        async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<StoredRecord>> {
            self.0.get(collection, key).await
        }
        async fn get_all(&self, collection: Collection) -> StoreResult<Vec<StoredRecord>> {
            self.0.get_all(collection).await
        }
        async fn delete(&self, collection: Collection, key: &str) -> StoreResult<()> {
            self.0.delete(collection, key).await
        }
        async fn clear(&self) -> StoreResult<()> {
            self.0.clear().await
        }
        async fn close(&self) -> StoreResult<()> {
            self.0.close().await
        }
        async fn contains(&self, _collection: Collection, _key: &str) -> StoreResult<bool> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn exhausted_ids_fail_without_writing() {
        let store = Arc::new(CrowdedStore(InMemoryObjectStore::new()));
        let config = GateConfig {
            id_attempts: 3,
            ..GateConfig::default()
        };
        let keeper = keeper_with(store.clone(), config);
        let err = keeper.admit(AssetKind::Image, png("a.png", 4)).await.unwrap_err();
        assert_eq!(
            err,
            GateError::IdExhausted {
                kind: AssetKind::Image,
                attempts: 3
            }
        );
        assert!(store.0.is_empty());
    }

    #[tokio::test]
    async fn ids_are_distinct_within_one_millisecond() {
        let (keeper, _store) = keeper();
        let a = keeper.admit(AssetKind::Image, png("a.png", 1)).await.unwrap();
        let b = keeper.admit(AssetKind::Image, png("b.png", 1)).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(keeper.list(AssetKind::Image).await.unwrap().len(), 2);
    }

    // -----------------------------------------------------------------------
    // 5. Listing order
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn list_is_oldest_first() {
        let store = Arc::new(InMemoryObjectStore::new());
        let clock = clock();
        let keeper = Gatekeeper::new(
            UploadGate::with_default_stages(GateConfig::default()),
            store.clone(),
            clock.clone(),
        );
        let first = keeper.admit(AssetKind::Background, png("1.png", 1)).await.unwrap();
        clock.advance(std::time::Duration::from_secs(5));
        let second = keeper.admit(AssetKind::Background, png("2.png", 1)).await.unwrap();

        let ids: Vec<_> = keeper.list(AssetKind::Background).await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    // -----------------------------------------------------------------------
    // 6. Batch operations
    // -----------------------------------------------------------------------
    #[tokio::test]
    async fn admit_many_reports_each_file() {
        let (keeper, store) = keeper();
        let report = keeper
            .admit_many(
                AssetKind::Image,
                vec![
                    png("ok-1.png", 8),
                    IncomingFile::bytes("notes.txt", "text/plain", b"hi".to_vec()),
                    png("ok-2.png", 8),
                ],
            )
            .await;
        assert_eq!(report.admitted.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "notes.txt");
        assert!(!report.is_complete());
        assert_eq!(store.count(Collection::Images).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn delete_many_counts_successes_and_tolerates_missing_ids() {
        let (keeper, store) = keeper();
        let a = keeper.admit(AssetKind::Image, png("a.png", 1)).await.unwrap();
        let b = keeper.admit(AssetKind::Image, png("b.png", 1)).await.unwrap();

        let deleted = keeper
            .delete_many(AssetKind::Image, &[a.as_str(), "image_1_missing00", b.as_str()])
            .await;
        assert_eq!(deleted, 3);
        assert_eq!(store.count(Collection::Images).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_many_continues_past_failures() {
        let (keeper, store) = keeper();
        store.close().await.unwrap();
        let deleted = keeper.delete_many(AssetKind::Sound, &["a", "b"]).await;
        assert_eq!(deleted, 0);
    }

    // -----------------------------------------------------------------------
    // 7. Pipeline behaviour
    // -----------------------------------------------------------------------
    #[test]
    fn pipeline_is_fail_fast() {
        let gate = UploadGate::with_default_stages(GateConfig::default());
        let candidate = UploadCandidate {
            kind: AssetKind::Image,
            name: "clip.mp4",
            mime_type: "video/mp4",
            size: u64::MAX,
        };
        let verdict = gate.evaluate(&candidate).unwrap();
        assert!(!verdict.is_accepted());
        assert_eq!(verdict.stage_results.len(), 1);
        assert_eq!(verdict.stage_results[0].stage_name, "mime-type");
    }

    #[test]
    fn permissive_mode_accepts_all() {
        let gate = UploadGate::with_default_stages(GateConfig::permissive());
        let candidate = UploadCandidate {
            kind: AssetKind::Sound,
            name: "anything",
            mime_type: "application/zip",
            size: u64::MAX,
        };
        let verdict = gate.evaluate(&candidate).unwrap();
        assert!(verdict.is_accepted());
        assert!(verdict.stage_results.is_empty());
    }

    #[test]
    fn custom_stage_integration() {
        struct NoHiddenFiles;
        impl GateStage for NoHiddenFiles {
            fn name(&self) -> &str {
                "no-hidden-files"
            }
            fn evaluate(&self, candidate: &UploadCandidate<'_>, _config: &GateConfig) -> Result<StageDecision, GateError> {
                if candidate.name.starts_with('.') {
                    return Ok(StageDecision::Fail {
                        reason: "hidden files are not accepted".into(),
                    });
                }
                Ok(StageDecision::Pass)
            }
        }

        let mut gate = UploadGate::with_default_stages(GateConfig::default());
        gate.add_stage(Box::new(NoHiddenFiles));
        assert_eq!(gate.stage_count(), 3);

        let candidate = UploadCandidate {
            kind: AssetKind::Image,
            name: ".thumb.png",
            mime_type: "image/png",
            size: 10,
        };
        let verdict = gate.evaluate(&candidate).unwrap();
        assert_eq!(verdict.rejection.as_deref(), Some("hidden files are not accepted"));
        assert_eq!(verdict.stage_results.len(), 3);
        assert!(verdict.stage_results[..2].iter().all(|r| r.passed));
    }

    #[test]
    fn empty_pipeline_accepts() {
        let gate = UploadGate::new(GateConfig::default());
        let candidate = UploadCandidate {
            kind: AssetKind::Image,
            name: "x",
            mime_type: "nonsense",
            size: 0,
        };
        assert!(gate.evaluate(&candidate).unwrap().is_accepted());
    }
}
