use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use blobkeep_types::AssetKind;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{BackendError, StoreError, StoreOp, StoreResult};
use crate::log::{Frame, LogEntry, LogSegment};
use crate::record::{AssetSummary, Collection, StoredRecord};
use crate::traits::ObjectStore;

const LOG_FILE: &str = "store.log";
const COMPACT_FILE: &str = "store.log.compact";

/// Outcome of a [`LogStore::compact`] run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
    pub bytes_before: u64,
    pub bytes_after: u64,
    pub records: usize,
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct Slot {
    frame: Frame,
    summary: Option<AssetSummary>,
}

/// In-memory view of the live log: where every record's latest `Put` sits.
#[derive(Debug, Default)]
struct Index {
    collections: BTreeMap<Collection, HashMap<String, Slot>>,
    /// Bytes of frames still needed to rebuild the current state.
    live_bytes: u64,
}

impl Index {
    fn apply(&mut self, frame: Frame, entry: &LogEntry) {
        match entry {
            LogEntry::CreateCollection(collection) => {
                if !self.collections.contains_key(collection) {
                    self.collections.insert(*collection, HashMap::new());
                    self.live_bytes += frame.len;
                }
            }
            LogEntry::Put { collection, record } => {
                let summary = match record {
                    StoredRecord::Asset(asset) => Some(asset.summary()),
                    StoredRecord::Settings(_) => None,
                };
                let slots = self.collections.entry(*collection).or_default();
                if let Some(old) = slots.insert(record.key().to_string(), Slot { frame, summary }) {
                    self.live_bytes -= old.frame.len;
                }
                self.live_bytes += frame.len;
            }
            LogEntry::Delete { collection, key } => {
                if let Some(old) = self.collections.get_mut(collection).and_then(|slots| slots.remove(key)) {
                    self.live_bytes -= old.frame.len;
                }
            }
            LogEntry::Clear => {
                for slots in self.collections.values_mut() {
                    for (_, old) in slots.drain() {
                        self.live_bytes -= old.frame.len;
                    }
                }
            }
        }
    }

    fn slot(&self, collection: Collection, key: &str) -> Option<&Slot> {
        self.collections.get(&collection).and_then(|slots| slots.get(key))
    }

    fn frames(&self, collection: Collection) -> Vec<Frame> {
        self.collections
            .get(&collection)
            .map(|slots| slots.values().map(|slot| slot.frame).collect())
            .unwrap_or_default()
    }

    fn record_count(&self) -> usize {
        self.collections.values().map(HashMap::len).sum()
    }
}

struct LogState {
    segment: LogSegment,
    index: Index,
}

impl LogState {
    fn append(&mut self, entry: &LogEntry) -> Result<(), BackendError> {
        let frame = self.segment.append(entry)?;
        self.index.apply(frame, entry);
        Ok(())
    }

    fn read_record(&mut self, frame: Frame) -> Result<StoredRecord, BackendError> {
        match self.segment.read_at(frame)? {
            LogEntry::Put { record, .. } => Ok(record),
            other => Err(BackendError::Corrupt {
                offset: frame.offset,
                reason: format!("index points at a non-put entry: {other:?}"),
            }),
        }
    }

    fn dead_bytes(&self) -> u64 {
        self.segment.len().saturating_sub(self.index.live_bytes)
    }
}

// ---------------------------------------------------------------------------
// LogStore
// ---------------------------------------------------------------------------

/// Durable record store backed by one append-only log segment.
///
/// Layout: `<root>/<database_name>/store.log`. Every mutation is a single
/// framed entry, so each `put`, `delete` and `clear` is atomic. Opening the
/// store replays the log into an index of `(collection, key) -> frame`;
/// reads fetch the frame and verify its CRC.
///
/// All operations run under one async mutex, so they complete in submission
/// order.
pub struct LogStore {
    dir: PathBuf,
    config: StoreConfig,
    state: Mutex<Option<LogState>>,
}

impl LogStore {
    /// Open (or create) the database `config.database_name` under `root`.
    ///
    /// A torn or corrupt tail is logged and truncated. Collections missing
    /// from the log are created; existing ones are kept.
    pub async fn open(root: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        let dir = root.as_ref().join(&config.database_name);
        let state = Self::recover(&dir, &config).map_err(|e| StoreError::open(&dir, e))?;
        info!(
            path = %dir.display(),
            records = state.index.record_count(),
            bytes = state.segment.len(),
            "log store opened"
        );
        Ok(Self {
            dir,
            config,
            state: Mutex::new(Some(state)),
        })
    }

    fn recover(dir: &Path, config: &StoreConfig) -> Result<LogState, BackendError> {
        fs::create_dir_all(dir)?;

        let leftover = dir.join(COMPACT_FILE);
        match fs::remove_file(&leftover) {
            Ok(()) => warn!(path = %leftover.display(), "removed unfinished compaction output"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut segment = LogSegment::open(&dir.join(LOG_FILE), config.sync_mode)?;
        let mut index = Index::default();
        let valid_len = segment.scan(|frame, entry| index.apply(frame, &entry))?;
        if valid_len < segment.len() {
            warn!(
                valid_len,
                file_len = segment.len(),
                "truncating corrupt log tail"
            );
            segment.truncate(valid_len)?;
        }

        let mut state = LogState { segment, index };
        for collection in Collection::ALL {
            if !state.index.collections.contains_key(&collection) {
                debug!(%collection, "creating collection");
                state.append(&LogEntry::CreateCollection(collection))?;
            }
        }
        Ok(state)
    }

    /// Path of the log segment.
    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    /// Rewrite the live records into a fresh segment and swap it in.
    pub async fn compact(&self) -> StoreResult<CompactionReport> {
        let mut guard = self.state.lock().await;
        let state = live(&mut guard, StoreOp::Compact)?;
        self.compact_locked(state)
            .map_err(|e| StoreError::operation(StoreOp::Compact, None, None, e))
    }

    fn compact_locked(&self, state: &mut LogState) -> Result<CompactionReport, BackendError> {
        let bytes_before = state.segment.len();
        let temp = self.dir.join(COMPACT_FILE);
        let (mut segment, index) = match write_compacted(state, &temp, &self.config) {
            Ok(fresh) => fresh,
            Err(e) => {
                let _ = fs::remove_file(&temp);
                return Err(e);
            }
        };
        segment.rename_to(&self.dir.join(LOG_FILE))?;

        let report = CompactionReport {
            bytes_before,
            bytes_after: segment.len(),
            records: index.record_count(),
        };
        state.segment = segment;
        state.index = index;
        info!(
            bytes_before = report.bytes_before,
            bytes_after = report.bytes_after,
            records = report.records,
            "log compacted"
        );
        Ok(report)
    }

    fn should_compact(&self, state: &LogState) -> bool {
        let len = state.segment.len();
        len >= self.config.compact_min_bytes
            && state.dead_bytes() as f64 > self.config.compact_ratio * len as f64
    }

    /// Compact after a mutation if the log has grown mostly dead. The
    /// mutation itself is already durable, so a failed compaction is only
    /// logged.
    fn maybe_compact(&self, state: &mut LogState) {
        if self.should_compact(state) {
            if let Err(e) = self.compact_locked(state) {
                warn!(error = %e, "automatic compaction failed");
            }
        }
    }
}

fn write_compacted(
    state: &mut LogState,
    temp: &Path,
    config: &StoreConfig,
) -> Result<(LogSegment, Index), BackendError> {
    let mut fresh = LogSegment::create(temp, config.sync_mode)?;
    let mut index = Index::default();

    for collection in state.index.collections.keys() {
        let entry = LogEntry::CreateCollection(*collection);
        let frame = fresh.append(&entry)?;
        index.apply(frame, &entry);
    }

    let mut frames: Vec<Frame> = state
        .index
        .collections
        .values()
        .flat_map(|slots| slots.values().map(|slot| slot.frame))
        .collect();
    frames.sort_by_key(|frame| frame.offset);

    for frame in frames {
        let entry = state.segment.read_at(frame)?;
        let frame = fresh.append(&entry)?;
        index.apply(frame, &entry);
    }

    fresh.sync()?;
    Ok((fresh, index))
}

fn live(guard: &mut Option<LogState>, op: StoreOp) -> StoreResult<&mut LogState> {
    guard.as_mut().ok_or(StoreError::Closed { op })
}

#[async_trait]
impl ObjectStore for LogStore {
    async fn put(&self, collection: Collection, record: StoredRecord) -> StoreResult<String> {
        let mut guard = self.state.lock().await;
        let state = live(&mut guard, StoreOp::Put)?;
        if !collection.accepts(&record) {
            return Err(StoreError::CollectionMismatch {
                collection,
                record: record.shape(),
            });
        }
        let key = record.key().to_string();
        state
            .append(&LogEntry::Put { collection, record })
            .map_err(|e| StoreError::operation(StoreOp::Put, Some(collection), Some(&key), e))?;
        debug!(%collection, key = %key, "put");
        self.maybe_compact(state);
        Ok(key)
    }

    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<StoredRecord>> {
        let mut guard = self.state.lock().await;
        let state = live(&mut guard, StoreOp::Get)?;
        let Some(frame) = state.index.slot(collection, key).map(|slot| slot.frame) else {
            return Ok(None);
        };
        let record = state
            .read_record(frame)
            .map_err(|e| StoreError::operation(StoreOp::Get, Some(collection), Some(key), e))?;
        Ok(Some(record))
    }

    async fn get_all(&self, collection: Collection) -> StoreResult<Vec<StoredRecord>> {
        let mut guard = self.state.lock().await;
        let state = live(&mut guard, StoreOp::GetAll)?;
        let frames = state.index.frames(collection);
        let mut records = Vec::with_capacity(frames.len());
        for frame in frames {
            let record = state
                .read_record(frame)
                .map_err(|e| StoreError::operation(StoreOp::GetAll, Some(collection), None, e))?;
            records.push(record);
        }
        Ok(records)
    }

    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<()> {
        let mut guard = self.state.lock().await;
        let state = live(&mut guard, StoreOp::Delete)?;
        if state.index.slot(collection, key).is_none() {
            return Ok(());
        }
        let entry = LogEntry::Delete {
            collection,
            key: key.to_string(),
        };
        state
            .append(&entry)
            .map_err(|e| StoreError::operation(StoreOp::Delete, Some(collection), Some(key), e))?;
        debug!(%collection, key, "delete");
        self.maybe_compact(state);
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut guard = self.state.lock().await;
        let state = live(&mut guard, StoreOp::Clear)?;
        state
            .append(&LogEntry::Clear)
            .map_err(|e| StoreError::operation(StoreOp::Clear, None, None, e))?;
        info!("log store cleared");
        self.maybe_compact(state);
        Ok(())
    }

    async fn close(&self) -> StoreResult<()> {
        let mut guard = self.state.lock().await;
        if let Some(mut state) = guard.take() {
            state
                .segment
                .sync()
                .map_err(|e| StoreError::operation(StoreOp::Close, None, None, e))?;
            info!(path = %state.segment.path().display(), "log store closed");
        }
        Ok(())
    }

    async fn contains(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        let mut guard = self.state.lock().await;
        let state = live(&mut guard, StoreOp::Get)?;
        Ok(state.index.slot(collection, key).is_some())
    }

    async fn count(&self, collection: Collection) -> StoreResult<usize> {
        let mut guard = self.state.lock().await;
        let state = live(&mut guard, StoreOp::GetAll)?;
        Ok(state.index.collections.get(&collection).map_or(0, HashMap::len))
    }

    async fn summaries(&self, kind: AssetKind) -> StoreResult<Vec<AssetSummary>> {
        let mut guard = self.state.lock().await;
        let state = live(&mut guard, StoreOp::GetAll)?;
        Ok(state
            .index
            .collections
            .get(&Collection::for_kind(kind))
            .map(|slots| slots.values().filter_map(|slot| slot.summary.clone()).collect())
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("dir", &self.dir)
            .field("config", &self.config)
            .finish()
    }
}
