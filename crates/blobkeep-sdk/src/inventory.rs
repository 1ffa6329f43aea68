use blobkeep_store::AssetSummary;
use serde::Serialize;

/// Every stored asset, grouped by kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub images: Vec<AssetSummary>,
    pub sounds: Vec<AssetSummary>,
    pub backgrounds: Vec<AssetSummary>,
    pub total: usize,
}

impl Inventory {
    pub fn new(images: Vec<AssetSummary>, sounds: Vec<AssetSummary>, backgrounds: Vec<AssetSummary>) -> Self {
        let total = images.len() + sounds.len() + backgrounds.len();
        Self {
            images,
            sounds,
            backgrounds,
            total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
