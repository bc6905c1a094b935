//! Top-level detected/validated state types shared across the pipeline.
//!
//! `GameState` is produced fresh every frame by [`crate::detector`] and then
//! passed through `vision-logic`'s `GameLogicValidator`, which is the only
//! thing allowed to mutate its carried-forward fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Screen classification. Mirrors the original's bare string tags; kept as
/// `String` rather than an enum because new classifier fallbacks
/// (`"unknown"`) must round-trip through JSON without a schema change.
pub type ScreenType = String;

/// One detected floor item sprite (position in native game-area pixels).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorItem {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub score: f32,
}

/// Complete detected NES Zelda 1 game state for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub screen_type: ScreenType,
    pub dungeon_level: u8,
    pub hearts_current: u8,
    pub hearts_max: u8,
    pub has_half_heart: bool,
    pub rupees: u16,
    pub keys: u8,
    pub bombs: u8,
    pub b_item: Option<String>,
    pub sword_level: u8,
    pub has_master_key: bool,
    pub gannon_nearby: bool,
    pub bomb_max: u8,
    pub items: HashMap<String, bool>,
    pub triforce: [bool; 8],
    pub map_position: u16,
    pub detected_item: Option<String>,
    pub detected_item_y: i32,
    pub floor_items: Vec<FloorItem>,
    pub dungeon_map_rooms: Option<u16>,
    pub triforce_room: Option<(u8, u8)>,
    pub zelda_room: Option<(u8, u8)>,
    pub tile_match_id: Option<u32>,
    pub tile_match_score: f32,
    /// One-shot events emitted by the validator for this frame only; never
    /// carried forward and never deduplicated across frames.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub events: Vec<EventRecord>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            screen_type: "unknown".to_string(),
            dungeon_level: 0,
            hearts_current: 0,
            hearts_max: 3,
            has_half_heart: false,
            rupees: 0,
            keys: 0,
            bombs: 0,
            b_item: None,
            sword_level: 0,
            has_master_key: false,
            gannon_nearby: false,
            bomb_max: 8,
            items: HashMap::new(),
            triforce: [false; 8],
            map_position: 0,
            detected_item: None,
            detected_item_y: 0,
            floor_items: Vec::new(),
            dungeon_map_rooms: None,
            triforce_room: None,
            zelda_room: None,
            tile_match_id: None,
            tile_match_score: 0.0,
            events: Vec::new(),
        }
    }
}

/// A game event inferred by one of the validator's sub-trackers (death,
/// warp, sword upgrade, heart container, item pickup, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub frame: u64,
    pub event: String,
    pub description: String,
    pub dungeon_level: u8,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub item: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub y: Option<i32>,
}

/// Anomaly severity. `Info` anomalies are explanatory (e.g. a recognized
/// Up+A warp) rather than indicative of a detection failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Info,
    Warning,
}

/// A rejected/impossible state transition recorded by the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub frame: u64,
    pub detector: String,
    pub description: String,
    pub severity: AnomalySeverity,
}

/// Crop rectangle in source-stream pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: i64,
    pub y: i64,
    pub w: u32,
    pub h: u32,
}

/// Result of auto-calibration: the NES rectangle plus tile-grid offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub crop: CropRect,
    pub grid_dx: u8,
    pub grid_dy: u8,
    pub confidence: f64,
    pub method: String,
    pub hud_verified: bool,
}

/// One loaded reference sprite: its label and source path, for diagnostics.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub path: String,
}
