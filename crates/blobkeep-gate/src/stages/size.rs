use crate::config::GateConfig;
use crate::error::GateError;
use crate::stage::{GateStage, StageDecision, UploadCandidate};

/// Rejects uploads whose declared size exceeds the kind's ceiling.
pub struct SizeLimitStage;

impl GateStage for SizeLimitStage {
    fn name(&self) -> &str {
        "size-limit"
    }

    fn evaluate(&self, candidate: &UploadCandidate<'_>, config: &GateConfig) -> Result<StageDecision, GateError> {
        let limit = config.max_bytes(candidate.kind);
        if candidate.size > limit {
            return Ok(StageDecision::Fail {
                reason: format!(
                    "{} '{}' is {} bytes, limit is {} bytes",
                    candidate.kind, candidate.name, candidate.size, limit
                ),
            });
        }
        Ok(StageDecision::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobkeep_types::AssetKind;

    fn sized(kind: AssetKind, size: u64) -> UploadCandidate<'static> {
        UploadCandidate {
            kind,
            name: "upload",
            mime_type: "image/png",
            size,
        }
    }

    #[test]
    fn limit_is_inclusive() {
        let config = GateConfig::default();
        let at = config.max_bytes(AssetKind::Image);
        assert!(SizeLimitStage.evaluate(&sized(AssetKind::Image, at), &config).unwrap().is_pass());
        assert!(SizeLimitStage.evaluate(&sized(AssetKind::Image, at + 1), &config).unwrap().is_fail());
    }

    #[test]
    fn sounds_get_a_larger_ceiling() {
        let config = GateConfig::default();
        let twenty_mib = 20 * 1024 * 1024;
        assert!(SizeLimitStage.evaluate(&sized(AssetKind::Sound, twenty_mib), &config).unwrap().is_pass());
        assert!(SizeLimitStage.evaluate(&sized(AssetKind::Background, twenty_mib), &config).unwrap().is_fail());
    }
}
