//! Persisted catalog of known streamer crop layouts, keyed by source stream
//! resolution. Feeds `vision-core::calibration::try_common_layouts` as the
//! calibration pipeline's last-resort fallback.

use serde::{Deserialize, Serialize};
use vision_core::calibration::LayoutEntry;
use vision_core::state::CropRect;

use crate::error::ProtoError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub stream_width: u32,
    pub stream_height: u32,
    pub crop: CropRect,
}

impl From<&CatalogEntry> for LayoutEntry {
    fn from(entry: &CatalogEntry) -> Self {
        LayoutEntry {
            id: entry.id.clone(),
            stream_width: entry.stream_width,
            stream_height: entry.stream_height,
            crop: entry.crop,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonLayoutCatalog {
    pub layouts: Vec<CatalogEntry>,
}

impl CommonLayoutCatalog {
    pub fn from_json(s: &str) -> Result<Self, ProtoError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Convert to the plain `Vec<LayoutEntry>` `try_common_layouts` expects.
    pub fn to_layout_entries(&self) -> Vec<LayoutEntry> {
        self.layouts.iter().map(LayoutEntry::from).collect()
    }
}
