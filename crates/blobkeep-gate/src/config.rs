use blobkeep_types::AssetKind;
use serde::{Deserialize, Serialize};

use crate::error::GateError;

const MIB: u64 = 1024 * 1024;

/// Configuration for the upload gate pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// MIME types accepted for images.
    pub image_types: Vec<String>,
    /// MIME types accepted for sounds.
    pub sound_types: Vec<String>,
    /// MIME types accepted for backgrounds.
    pub background_types: Vec<String>,
    pub max_image_bytes: u64,
    pub max_sound_bytes: u64,
    pub max_background_bytes: u64,
    /// How many fresh ids to try before giving up on a collision.
    pub id_attempts: u32,
    /// When `true`, every upload passes without checks.
    pub permissive: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        let images = ["image/jpeg", "image/png", "image/gif", "image/webp"].map(String::from).to_vec();
        Self {
            sound_types: ["audio/mpeg", "audio/wav", "audio/ogg", "audio/mp4", "audio/x-m4a"]
                .map(String::from)
                .to_vec(),
            background_types: images.clone(),
            image_types: images,
            max_image_bytes: 10 * MIB,
            max_sound_bytes: 50 * MIB,
            max_background_bytes: 10 * MIB,
            id_attempts: 8,
            permissive: false,
        }
    }
}

impl GateConfig {
    /// Accept every upload regardless of type or size.
    pub fn permissive() -> Self {
        Self {
            permissive: true,
            ..Default::default()
        }
    }

    /// Reject settings no gate can work with.
    pub fn validate(&self) -> Result<(), GateError> {
        if self.id_attempts == 0 {
            return Err(GateError::Config("id_attempts must be at least 1".into()));
        }
        if !self.permissive {
            for kind in AssetKind::ALL {
                if self.allowed_types(kind).is_empty() {
                    return Err(GateError::Config(format!("no MIME types are allowed for {kind}")));
                }
            }
        }
        Ok(())
    }

    pub fn allowed_types(&self, kind: AssetKind) -> &[String] {
        match kind {
            AssetKind::Image => &self.image_types,
            AssetKind::Sound => &self.sound_types,
            AssetKind::Background => &self.background_types,
        }
    }

    /// Largest accepted declared size for `kind`, inclusive.
    pub fn max_bytes(&self, kind: AssetKind) -> u64 {
        match kind {
            AssetKind::Image => self.max_image_bytes,
            AssetKind::Sound => self.max_sound_bytes,
            AssetKind::Background => self.max_background_bytes,
        }
    }
}
