use crate::config::GateConfig;
use crate::error::GateError;
use crate::stage::{GateStage, StageDecision, UploadCandidate};

/// Rejects uploads whose MIME type is not on the kind's allow-list.
///
/// Matching is exact: the declared type is what gets stored, so a variant
/// spelling such as `Audio/OGG` or a `; codecs=` suffix is rejected.
pub struct MimeTypeStage;

impl GateStage for MimeTypeStage {
    fn name(&self) -> &str {
        "mime-type"
    }

    fn evaluate(&self, candidate: &UploadCandidate<'_>, config: &GateConfig) -> Result<StageDecision, GateError> {
        let allowed = config.allowed_types(candidate.kind);
        if allowed.is_empty() {
            return Err(GateError::stage(
                self.name(),
                format!("no MIME types are allowed for {}", candidate.kind),
            ));
        }

        if allowed.iter().any(|t| t == candidate.mime_type) {
            return Ok(StageDecision::Pass);
        }

        Ok(StageDecision::Fail {
            reason: format!(
                "{} type '{}' is not allowed (expected one of: {})",
                candidate.kind,
                candidate.mime_type,
                allowed.join(", ")
            ),
        })
    }
}
