//! The per-frame state-delta POSTed to the dashboard: changed fields only,
//! plus this frame's one-shot events. Mirrors `GameState`'s field set but
//! every field is optional, present only when it differs from the last
//! delta sent for this racer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vision_core::state::{EventRecord, FloorItem, GameState};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub screen_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dungeon_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hearts_current: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hearts_max: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub has_half_heart: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rupees: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub keys: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bombs: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub b_item: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sword_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub has_master_key: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gannon_nearby: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bomb_max: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub items: Option<HashMap<String, bool>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub triforce: Option<[bool; 8]>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub map_position: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detected_item: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detected_item_y: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub floor_items: Option<Vec<FloorItem>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dungeon_map_rooms: Option<Option<u16>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub triforce_room: Option<Option<(u8, u8)>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub zelda_room: Option<Option<(u8, u8)>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tile_match_id: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tile_match_score: Option<f32>,
    /// Always carried verbatim; never diffed, never deduplicated.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub game_events: Vec<EventRecord>,
}

impl StateDelta {
    /// True when no field changed and there are no events to report —
    /// callers use this to decide whether a POST is worth sending at all.
    pub fn is_empty(&self) -> bool {
        if !self.game_events.is_empty() {
            return false;
        }
        let mut without_events = self.clone();
        without_events.game_events = Vec::new();
        without_events == StateDelta::default()
    }
}

/// Diff `current` against `prev` (the last state sent), producing only the
/// fields that changed. `prev == None` (first frame for this racer) yields a
/// delta with every field populated.
pub fn compute_delta(prev: Option<&GameState>, current: &GameState) -> StateDelta {
    macro_rules! field {
        ($name:ident) => {
            match prev {
                Some(p) if p.$name == current.$name => None,
                _ => Some(current.$name.clone()),
            }
        };
    }

    StateDelta {
        screen_type: field!(screen_type),
        dungeon_level: field!(dungeon_level),
        hearts_current: field!(hearts_current),
        hearts_max: field!(hearts_max),
        has_half_heart: field!(has_half_heart),
        rupees: field!(rupees),
        keys: field!(keys),
        bombs: field!(bombs),
        b_item: field!(b_item),
        sword_level: field!(sword_level),
        has_master_key: field!(has_master_key),
        gannon_nearby: field!(gannon_nearby),
        bomb_max: field!(bomb_max),
        items: field!(items),
        triforce: field!(triforce),
        map_position: field!(map_position),
        detected_item: field!(detected_item),
        detected_item_y: field!(detected_item_y),
        floor_items: field!(floor_items),
        dungeon_map_rooms: field!(dungeon_map_rooms),
        triforce_room: field!(triforce_room),
        zelda_room: field!(zelda_room),
        tile_match_id: field!(tile_match_id),
        tile_match_score: field!(tile_match_score),
        game_events: current.events.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_populates_every_field() {
        let state = GameState::default();
        let delta = compute_delta(None, &state);
        assert_eq!(delta.screen_type, Some("unknown".to_string()));
        assert_eq!(delta.hearts_max, Some(3));
        assert_eq!(delta.bomb_max, Some(8));
    }

    #[test]
    fn unchanged_fields_are_omitted() {
        let prev = GameState::default();
        let mut current = prev.clone();
        current.rupees = 10;
        let delta = compute_delta(Some(&prev), &current);
        assert_eq!(delta.rupees, Some(10));
        assert_eq!(delta.screen_type, None);
        assert_eq!(delta.hearts_max, None);
    }

    #[test]
    fn events_are_always_carried_even_when_everything_else_is_unchanged() {
        let prev = GameState::default();
        let mut current = prev.clone();
        current.events = vec![EventRecord {
            frame: 5,
            event: "heart_container".to_string(),
            description: "Heart container".to_string(),
            dungeon_level: 0,
            item: None,
            x: None,
            y: None,
        }];
        let delta = compute_delta(Some(&prev), &current);
        assert_eq!(delta.game_events.len(), 1);
        assert!(delta.rupees.is_none());
    }

    #[test]
    fn empty_delta_with_no_events_reports_empty() {
        let prev = GameState::default();
        let current = prev.clone();
        let delta = compute_delta(Some(&prev), &current);
        assert!(delta.is_empty());
    }
}
