//! Persisted calibration state: the crop rectangle, grid offset, and
//! optional pixel-measured landmarks for a given stream layout. Round-trips
//! through `--landmarks <json>` and the `PUT`-crop-profile transport call.

use serde::{Deserialize, Serialize};
use vision_core::state::CropRect;

use crate::error::ProtoError;

/// One pixel-measured HUD landmark override (see `HudReader`'s grid-based
/// fallback, which this can augment but never replace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub name: String,
    pub x: i64,
    pub y: i64,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    pub stream_width: u32,
    pub stream_height: u32,
    pub crop: CropRect,
    pub grid_dx: u8,
    pub grid_dy: u8,
    pub life_row: u32,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

impl CropProfile {
    pub fn from_json(s: &str) -> Result<Self, ProtoError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_json(&self) -> Result<String, ProtoError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up a named landmark override, if present.
    pub fn landmark(&self, name: &str) -> Option<&Landmark> {
        self.landmarks.iter().find(|l| l.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> CropProfile {
        CropProfile {
            stream_width: 1920,
            stream_height: 1080,
            crop: CropRect { x: 100, y: 50, w: 512, h: 480 },
            grid_dx: 1,
            grid_dy: 0,
            life_row: 8,
            landmarks: vec![Landmark { name: "hearts".to_string(), x: 10, y: 20, w: 40, h: 8 }],
        }
    }

    #[test]
    fn round_trips_through_json() {
        let p = profile();
        let json = p.to_json().unwrap();
        let back = CropProfile::from_json(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn landmark_lookup_by_name() {
        let p = profile();
        assert!(p.landmark("hearts").is_some());
        assert!(p.landmark("keys").is_none());
    }
}
