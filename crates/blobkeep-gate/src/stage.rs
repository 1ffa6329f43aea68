use std::time::Duration;

use blobkeep_types::AssetKind;

use crate::config::GateConfig;
use crate::error::GateError;

// ---------------------------------------------------------------------------
// UploadCandidate
// ---------------------------------------------------------------------------

/// What the gate knows about an upload before touching its body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadCandidate<'a> {
    pub kind: AssetKind,
    pub name: &'a str,
    pub mime_type: &'a str,
    /// Declared size in bytes.
    pub size: u64,
}

// ---------------------------------------------------------------------------
// StageDecision
// ---------------------------------------------------------------------------

/// The outcome of a single gate stage evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    /// The stage passed; proceed to the next stage.
    Pass,
    /// The stage failed; the upload is rejected.
    Fail { reason: String },
}

impl StageDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }
}

// ---------------------------------------------------------------------------
// StageResult
// ---------------------------------------------------------------------------

/// Recorded result from a completed stage evaluation.
#[derive(Clone, Debug)]
pub struct StageResult {
    pub stage_name: String,
    pub passed: bool,
    /// Populated on failure.
    pub reason: Option<String>,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// GateStage trait
// ---------------------------------------------------------------------------

/// A single check in the upload pipeline.
///
/// Stages only see metadata: they must not decode or store anything.
pub trait GateStage: Send + Sync {
    /// Human-readable stage name (used in results and logs).
    fn name(&self) -> &str;

    fn evaluate(&self, candidate: &UploadCandidate<'_>, config: &GateConfig) -> Result<StageDecision, GateError>;
}
