use std::fmt;

use blobkeep_types::{AssetId, AssetKind, Settings, Timestamp};
use serde::{Deserialize, Serialize};

/// Key under which the single settings record is stored.
pub const SETTINGS_KEY: &str = "appSettings";

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// A named collection of records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Collection {
    Images,
    Sounds,
    Backgrounds,
    Settings,
}

impl Collection {
    /// Every collection a store must provide.
    pub const ALL: [Collection; 4] = [
        Collection::Images,
        Collection::Sounds,
        Collection::Backgrounds,
        Collection::Settings,
    ];

    /// The asset collection holding records of `kind`.
    pub fn for_kind(kind: AssetKind) -> Self {
        match kind {
            AssetKind::Image => Self::Images,
            AssetKind::Sound => Self::Sounds,
            AssetKind::Background => Self::Backgrounds,
        }
    }

    /// The asset kind stored here, or `None` for the settings collection.
    pub fn asset_kind(&self) -> Option<AssetKind> {
        match self {
            Self::Images => Some(AssetKind::Image),
            Self::Sounds => Some(AssetKind::Sound),
            Self::Backgrounds => Some(AssetKind::Background),
            Self::Settings => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Sounds => "sounds",
            Self::Backgrounds => "backgrounds",
            Self::Settings => "settings",
        }
    }

    /// Whether `record` has the shape this collection holds.
    pub fn accepts(&self, record: &StoredRecord) -> bool {
        matches!(
            (self, record),
            (Self::Settings, StoredRecord::Settings(_))
                | (Self::Images | Self::Sounds | Self::Backgrounds, StoredRecord::Asset(_))
        )
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A stored binary asset.
///
/// `size` and `mime_type` are the values declared at admission; the store
/// never re-checks them against `payload`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: AssetId,
    pub payload: Vec<u8>,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub created_at: Timestamp,
}

impl AssetRecord {
    /// Metadata view without the payload.
    pub fn summary(&self) -> AssetSummary {
        AssetSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            size: self.size,
            created_at: self.created_at,
            mime_type: self.mime_type.clone(),
        }
    }
}

impl fmt::Debug for AssetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("mime_type", &self.mime_type)
            .field("created_at", &self.created_at)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Listing entry for an asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub id: AssetId,
    pub name: String,
    pub size: u64,
    pub created_at: Timestamp,
    pub mime_type: String,
}

/// The single persisted settings record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettingsRecord {
    pub key: String,
    pub value: Settings,
    pub saved_at: Timestamp,
}

impl SettingsRecord {
    pub fn new(value: Settings, saved_at: Timestamp) -> Self {
        Self {
            key: SETTINGS_KEY.to_string(),
            value,
            saved_at,
        }
    }
}

/// Any record a collection can hold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum StoredRecord {
    Asset(AssetRecord),
    Settings(SettingsRecord),
}

impl StoredRecord {
    /// The key the record is stored under.
    pub fn key(&self) -> &str {
        match self {
            Self::Asset(asset) => asset.id.as_str(),
            Self::Settings(settings) => &settings.key,
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Self::Asset(_) => "asset",
            Self::Settings(_) => "settings",
        }
    }

    pub fn into_asset(self) -> Option<AssetRecord> {
        match self {
            Self::Asset(asset) => Some(asset),
            Self::Settings(_) => None,
        }
    }

    pub fn into_settings(self) -> Option<SettingsRecord> {
        match self {
            Self::Settings(settings) => Some(settings),
            Self::Asset(_) => None,
        }
    }
}

impl From<AssetRecord> for StoredRecord {
    fn from(record: AssetRecord) -> Self {
        Self::Asset(record)
    }
}

impl From<SettingsRecord> for StoredRecord {
    fn from(record: SettingsRecord) -> Self {
        Self::Settings(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> AssetRecord {
        AssetRecord {
            id: AssetId::from_raw("image_1_abcdefghi"),
            payload: vec![1, 2, 3],
            name: "a.png".into(),
            size: 3,
            mime_type: "image/png".into(),
            created_at: Timestamp::from_millis(1),
        }
    }

    #[test]
    fn collections_accept_matching_shapes() {
        let asset: StoredRecord = asset().into();
        let settings: StoredRecord = SettingsRecord::new(Settings::default(), Timestamp::from_millis(1)).into();
        assert!(Collection::Images.accepts(&asset));
        assert!(Collection::Backgrounds.accepts(&asset));
        assert!(!Collection::Settings.accepts(&asset));
        assert!(Collection::Settings.accepts(&settings));
        assert!(!Collection::Sounds.accepts(&settings));
    }

    #[test]
    fn keys() {
        let asset: StoredRecord = asset().into();
        assert_eq!(asset.key(), "image_1_abcdefghi");
        let settings: StoredRecord = SettingsRecord::new(Settings::default(), Timestamp::from_millis(1)).into();
        assert_eq!(settings.key(), SETTINGS_KEY);
    }

    #[test]
    fn kind_collection_mapping_is_consistent() {
        for kind in AssetKind::ALL {
            assert_eq!(Collection::for_kind(kind).asset_kind(), Some(kind));
        }
        assert_eq!(Collection::Settings.asset_kind(), None);
    }

    #[test]
    fn debug_omits_payload_bytes() {
        let text = format!("{:?}", asset());
        assert!(text.contains("payload_len: 3"));
        assert!(!text.contains("[1, 2, 3]"));
    }

    #[test]
    fn summary_drops_payload() {
        let summary = asset().summary();
        assert_eq!(summary.size, 3);
        assert_eq!(serde_json::to_value(&summary).unwrap()["name"], "a.png");
    }
}
