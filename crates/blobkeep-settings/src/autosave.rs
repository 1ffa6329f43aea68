use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use blobkeep_types::{SettingChange, Settings, SettingsPatch};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::aggregator::SettingsAggregator;
use crate::error::SettingsResult;

/// Pending changes plus the aggregator they are flushed through.
struct Pending {
    aggregator: Arc<SettingsAggregator>,
    changes: StdMutex<SettingsPatch>,
    flush_lock: Mutex<()>,
}

impl Pending {
    async fn flush(&self) -> SettingsResult<Option<Settings>> {
        let _guard = self.flush_lock.lock().await;
        let batch = std::mem::take(&mut *self.changes.lock().expect("lock poisoned"));
        if batch.is_empty() {
            return Ok(None);
        }

        match self.aggregator.merge(&batch).await {
            Ok(settings) => {
                debug!("pending settings flushed");
                Ok(Some(settings))
            }
            Err(e) => {
                warn!(error = %e, "settings flush failed, changes kept for retry");
                self.changes.lock().expect("lock poisoned").absorb_older(batch);
                Err(e)
            }
        }
    }
}

struct Timer {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Buffers settings changes and writes them in batches.
///
/// Changes accumulate in memory until [`AutoSave::flush_once`] runs, either
/// explicitly or from the periodic timer started by [`AutoSave::spawn`]. A
/// failed flush keeps its changes pending; newer changes recorded meanwhile
/// take precedence over them.
pub struct AutoSave {
    pending: Arc<Pending>,
    timer: StdMutex<Option<Timer>>,
}

impl AutoSave {
    /// An auto-saver without a timer. Changes are written on explicit flushes.
    pub fn new(aggregator: Arc<SettingsAggregator>) -> Self {
        Self {
            pending: Arc::new(Pending {
                aggregator,
                changes: StdMutex::new(SettingsPatch::new()),
                flush_lock: Mutex::new(()),
            }),
            timer: StdMutex::new(None),
        }
    }

    /// An auto-saver that flushes every `period`, first after one full period.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(aggregator: Arc<SettingsAggregator>, period: Duration) -> Self {
        let autosave = Self::new(aggregator);
        let (stop, mut stopped) = oneshot::channel();
        let pending = autosave.pending.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        // Failures are logged inside flush and retried next tick.
                        let _ = pending.flush().await;
                    }
                }
            }
            debug!("auto-save timer stopped");
        });

        *autosave.timer.lock().expect("lock poisoned") = Some(Timer { stop, handle });
        info!(period_ms = period.as_millis() as u64, "auto-save timer started");
        autosave
    }

    /// Record one change to be written on the next flush.
    pub fn set_pending(&self, change: SettingChange) {
        self.pending.changes.lock().expect("lock poisoned").record(change);
    }

    /// Record every field of `patch`; fields already pending are overwritten.
    pub fn queue(&self, patch: SettingsPatch) {
        let mut changes = self.pending.changes.lock().expect("lock poisoned");
        let mut merged = patch;
        merged.absorb_older(std::mem::take(&mut *changes));
        *changes = merged;
    }

    /// Write pending changes now. Returns the saved settings, or `None` if
    /// nothing was pending.
    pub async fn flush_once(&self) -> SettingsResult<Option<Settings>> {
        self.pending.flush().await
    }

    /// Returns `true` if changes are waiting to be written.
    pub fn is_dirty(&self) -> bool {
        !self.pending.changes.lock().expect("lock poisoned").is_empty()
    }

    /// A copy of the changes waiting to be written.
    pub fn pending(&self) -> SettingsPatch {
        self.pending.changes.lock().expect("lock poisoned").clone()
    }

    /// Drop pending changes without writing them.
    ///
    /// Waits for a flush already in progress, so a batch it fails to write
    /// and puts back is dropped as well.
    pub async fn discard(&self) {
        let _guard = self.pending.flush_lock.lock().await;
        *self.pending.changes.lock().expect("lock poisoned") = SettingsPatch::new();
    }

    /// Run `op` while no flush is in progress and none can start, then drop
    /// pending changes if it succeeded.
    ///
    /// For writes that supersede the queue, such as replacing or clearing the
    /// stored settings: a flush finishing after `op` would otherwise write a
    /// stale merge over its result.
    pub async fn discard_with<T, E, F>(&self, op: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let _guard = self.pending.flush_lock.lock().await;
        let value = op.await?;
        *self.pending.changes.lock().expect("lock poisoned") = SettingsPatch::new();
        Ok(value)
    }

    /// Returns `true` while the periodic timer is running.
    pub fn is_running(&self) -> bool {
        self.timer.lock().expect("lock poisoned").is_some()
    }

    /// Stop the timer, then write whatever is still pending.
    pub async fn shutdown(&self) -> SettingsResult<Option<Settings>> {
        let timer = self.timer.lock().expect("lock poisoned").take();
        if let Some(Timer { stop, handle }) = timer {
            let _ = stop.send(());
            if let Err(e) = handle.await {
                warn!(error = %e, "auto-save timer task ended abnormally");
            }
        }
        self.flush_once().await
    }
}

impl Drop for AutoSave {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(timer) = timer.take() {
                timer.handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for AutoSave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoSave")
            .field("dirty", &self.is_dirty())
            .field("running", &self.is_running())
            .finish()
    }
}
