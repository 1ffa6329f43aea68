use blobkeep_codec::PortableCodec;
use blobkeep_store::{AssetRecord, AssetSummary, Collection, ObjectStore, SharedStore};
use blobkeep_types::{AssetId, AssetKind, SharedClock, Timestamp};
use tracing::{debug, info, warn};

use crate::error::{GateError, GateResult};
use crate::gate::UploadGate;
use crate::stage::UploadCandidate;

// ---------------------------------------------------------------------------
// Intake types
// ---------------------------------------------------------------------------

/// Body of an upload: raw bytes, or a `data:` URI produced by a file reader.
#[derive(Clone, PartialEq, Eq)]
pub enum FileBody {
    Bytes(Vec<u8>),
    Portable(String),
}

impl std::fmt::Debug for FileBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Portable(text) => write!(f, "Portable({} chars)", text.len()),
        }
    }
}

/// An upload as handed over by the file picker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingFile {
    pub name: String,
    pub mime_type: String,
    /// Declared size in bytes; this is what the size limit checks.
    pub size: u64,
    pub body: FileBody,
}

impl IncomingFile {
    /// A raw-bytes upload whose declared size is the body length.
    pub fn bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            body: FileBody::Bytes(bytes),
        }
    }

    /// A portable-form upload with an explicitly declared size.
    pub fn portable(name: impl Into<String>, mime_type: impl Into<String>, size: u64, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size,
            body: FileBody::Portable(text.into()),
        }
    }

    fn candidate(&self, kind: AssetKind) -> UploadCandidate<'_> {
        UploadCandidate {
            kind,
            name: &self.name,
            mime_type: &self.mime_type,
            size: self.size,
        }
    }
}

/// Outcome of [`Gatekeeper::admit_many`]. Every input lands in exactly one list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub admitted: Vec<(String, AssetId)>,
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Gatekeeper
// ---------------------------------------------------------------------------

/// Validates uploads, normalises their bodies and persists them.
///
/// Validation and decoding happen before any store access, so a rejected
/// upload never mutates the store.
pub struct Gatekeeper {
    gate: UploadGate,
    store: SharedStore,
    clock: SharedClock,
}

impl Gatekeeper {
    pub fn new(gate: UploadGate, store: SharedStore, clock: SharedClock) -> Self {
        Self { gate, store, clock }
    }

    pub fn gate(&self) -> &UploadGate {
        &self.gate
    }

    /// Admit one file and return its new id.
    pub async fn admit(&self, kind: AssetKind, file: IncomingFile) -> GateResult<AssetId> {
        let verdict = self.gate.evaluate(&file.candidate(kind))?;
        if let Some(reason) = verdict.rejection {
            return Err(GateError::Validation(reason));
        }

        let payload = match file.body {
            FileBody::Bytes(bytes) => bytes,
            FileBody::Portable(text) => PortableCodec::decode(&text)?.0,
        };

        let now = self.clock.now();
        let id = self.fresh_id(kind, now).await?;
        let record = AssetRecord {
            id: id.clone(),
            payload,
            name: file.name,
            size: file.size,
            mime_type: file.mime_type,
            created_at: now,
        };
        self.store.put_asset(kind, record).await?;

        info!(%kind, %id, size = file.size, "asset admitted");
        Ok(id)
    }

    /// Generate an id that no record in the collection already uses.
    async fn fresh_id(&self, kind: AssetKind, now: Timestamp) -> GateResult<AssetId> {
        let attempts = self.gate.config().id_attempts;
        let collection = Collection::for_kind(kind);
        for attempt in 1..=attempts {
            let id = AssetId::generate(kind, now);
            if !self.store.contains(collection, id.as_str()).await? {
                return Ok(id);
            }
            warn!(%kind, %id, attempt, "generated id already in use");
        }
        Err(GateError::IdExhausted { kind, attempts })
    }

    /// The stored asset in portable form, or `None` if it does not exist.
    pub async fn load_asset(&self, kind: AssetKind, id: &str) -> GateResult<Option<String>> {
        let record = self.store.get_asset(kind, id).await?;
        Ok(record.map(|r| PortableCodec::encode(&r.payload, &r.mime_type)))
    }

    /// The stored record with its raw payload.
    pub async fn fetch(&self, kind: AssetKind, id: &str) -> GateResult<Option<AssetRecord>> {
        Ok(self.store.get_asset(kind, id).await?)
    }

    /// Delete an asset. Deleting a missing id succeeds.
    pub async fn delete_asset(&self, kind: AssetKind, id: &str) -> GateResult<()> {
        self.store.delete_asset(kind, id).await?;
        debug!(%kind, id, "asset deleted");
        Ok(())
    }

    /// Metadata of every asset of `kind`, oldest first.
    pub async fn list(&self, kind: AssetKind) -> GateResult<Vec<AssetSummary>> {
        let mut summaries = self.store.summaries(kind).await?;
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }

    /// Admit each file independently.
    pub async fn admit_many(&self, kind: AssetKind, files: Vec<IncomingFile>) -> BatchReport {
        let mut report = BatchReport::default();
        for file in files {
            let name = file.name.clone();
            match self.admit(kind, file).await {
                Ok(id) => report.admitted.push((name, id)),
                Err(e) => {
                    warn!(%kind, file = %name, error = %e, "batch upload entry failed");
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        info!(
            %kind,
            admitted = report.admitted.len(),
            failed = report.failed.len(),
            "batch upload complete"
        );
        report
    }

    /// Delete each id, continuing past failures. Returns how many deletes
    /// succeeded.
    pub async fn delete_many<S: AsRef<str>>(&self, kind: AssetKind, ids: &[S]) -> usize {
        let mut deleted = 0;
        for id in ids {
            match self.delete_asset(kind, id.as_ref()).await {
                Ok(()) => deleted += 1,
                Err(e) => warn!(%kind, id = id.as_ref(), error = %e, "batch delete entry failed"),
            }
        }
        deleted
    }
}
