use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::GateConfig;
use crate::error::GateError;
use crate::stage::{GateStage, StageDecision, StageResult, UploadCandidate};
use crate::stages::{MimeTypeStage, SizeLimitStage};

// ---------------------------------------------------------------------------
// GateVerdict
// ---------------------------------------------------------------------------

/// The outcome of running an upload through the full gate pipeline.
#[derive(Clone, Debug)]
pub struct GateVerdict {
    /// `None` when accepted, otherwise the first failing stage's reason.
    pub rejection: Option<String>,
    /// Per-stage results in evaluation order.
    pub stage_results: Vec<StageResult>,
    /// Total wall-clock time for the pipeline evaluation.
    pub elapsed: Duration,
}

impl GateVerdict {
    pub fn is_accepted(&self) -> bool {
        self.rejection.is_none()
    }
}

// ---------------------------------------------------------------------------
// UploadGate
// ---------------------------------------------------------------------------

/// A configurable pipeline of stages every upload passes through before
/// anything is decoded or stored.
pub struct UploadGate {
    stages: Vec<Box<dyn GateStage>>,
    config: GateConfig,
}

impl UploadGate {
    /// Create a gate with an empty pipeline.
    pub fn new(config: GateConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    /// Create a gate with the default stage pipeline:
    /// MimeType -> SizeLimit
    pub fn with_default_stages(config: GateConfig) -> Self {
        let mut gate = Self::new(config);
        gate.add_stage(Box::new(MimeTypeStage));
        gate.add_stage(Box::new(SizeLimitStage));
        gate
    }

    /// Append a stage to the end of the pipeline.
    pub fn add_stage(&mut self, stage: Box<dyn GateStage>) {
        self.stages.push(stage);
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Evaluate an upload through the pipeline.
    ///
    /// The pipeline is **fail-fast**: the first failing stage stops
    /// evaluation. In permissive mode no stage runs.
    pub fn evaluate(&self, candidate: &UploadCandidate<'_>) -> Result<GateVerdict, GateError> {
        let pipeline_start = Instant::now();

        if self.config.permissive {
            return Ok(GateVerdict {
                rejection: None,
                stage_results: Vec::new(),
                elapsed: pipeline_start.elapsed(),
            });
        }

        let mut stage_results = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let stage_start = Instant::now();
            let decision = stage.evaluate(candidate, &self.config)?;

            let (passed, reason) = match &decision {
                StageDecision::Pass => (true, None),
                StageDecision::Fail { reason } => (false, Some(reason.clone())),
            };
            stage_results.push(StageResult {
                stage_name: stage.name().to_string(),
                passed,
                reason,
                elapsed: stage_start.elapsed(),
            });

            if let StageDecision::Fail { reason } = decision {
                debug!(stage = stage.name(), kind = %candidate.kind, %reason, "upload rejected");
                return Ok(GateVerdict {
                    rejection: Some(reason),
                    stage_results,
                    elapsed: pipeline_start.elapsed(),
                });
            }
        }

        Ok(GateVerdict {
            rejection: None,
            stage_results,
            elapsed: pipeline_start.elapsed(),
        })
    }
}

impl std::fmt::Debug for UploadGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("UploadGate")
            .field("stages", &names)
            .field("config", &self.config)
            .finish()
    }
}
