use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::temporal::Timestamp;

/// Length of the random suffix appended to every generated [`AssetId`].
pub const ID_SUFFIX_LEN: usize = 9;

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// The family an asset belongs to. Each kind has its own collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Sound,
    Background,
}

impl AssetKind {
    /// All asset kinds, in collection order.
    pub const ALL: [AssetKind; 3] = [AssetKind::Image, AssetKind::Sound, AssetKind::Background];

    /// Prefix used in generated ids (`image`, `sound`, `background`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Sound => "sound",
            Self::Background => "background",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" | "images" => Ok(Self::Image),
            "sound" | "sounds" => Ok(Self::Sound),
            "background" | "backgrounds" => Ok(Self::Background),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

/// Identifier of an asset record.
///
/// Generated ids have the shape `{kind}_{epochMillis}_{suffix}` where the
/// suffix is [`ID_SUFFIX_LEN`] characters of `[0-9a-z]`. Ids are opaque to
/// the store; the shape only matters to [`AssetId::kind`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    /// Generate a fresh id for `kind` stamped with `now`.
    pub fn generate(kind: AssetKind, now: Timestamp) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
            .collect();
        Self(format!("{}_{}_{}", kind.as_str(), now.as_millis(), suffix))
    }

    /// Wrap an existing id string without validation.
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse and validate a generated-shape id.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let id = Self(s.to_string());
        id.kind()?;
        Ok(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The kind encoded in the id prefix.
    pub fn kind(&self) -> Result<AssetKind, TypeError> {
        let invalid = || TypeError::InvalidAssetId(self.0.clone());
        let mut parts = self.0.splitn(3, '_');
        let kind = parts.next().ok_or_else(invalid)?;
        let millis = parts.next().ok_or_else(invalid)?;
        let suffix = parts.next().ok_or_else(invalid)?;
        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if suffix.len() != ID_SUFFIX_LEN || !suffix.bytes().all(|b| SUFFIX_ALPHABET.contains(&b)) {
            return Err(invalid());
        }
        kind.parse::<AssetKind>().map_err(|_| invalid())
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AssetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
