//! Game-logic validation for Zelda 1 state transitions.
//!
//! Validates detected state changes against Zelda 1 game rules to filter
//! impossible transitions: triforce pieces cannot be uncollected, sword
//! level can only increase, certain items cannot be lost once acquired, max
//! hearts can only increase. Reduces false detections by rejecting state
//! changes that violate known game mechanics.

use std::collections::{HashMap, HashSet};

use tracing::debug;
use vision_core::state::{AnomalyRecord, AnomalySeverity, EventRecord, GameState};
use vision_core::zelda_map::{is_adjacent, DUNGEON_COLS, OVERWORLD_COLS};

use crate::inventory::{InventoryAccumulator, PlayerItemTracker};
use crate::tracker::dungeon_exit::DungeonExitTracker;
use crate::tracker::floor_item::FloorItemTracker;
use crate::tracker::item_hold::ItemHoldTracker;
use crate::tracker::staircase_item::StaircaseItemTracker;
use crate::tracker::warp_death::WarpDeathTracker;

const ANOMALY_DEBOUNCE_FRAMES: u64 = 20;

/// Items that cannot be lost once acquired (one-time pickups).
const NON_LOSABLE_ITEMS: &[&str] = &["raft", "ladder", "book", "power_bracelet", "magic_key"];

/// Items that upgrade in place — the base item can be "lost" when upgraded.
const UPGRADE_CHAINS: &[(&str, &str)] =
    &[("boomerang", "magic_boomerang"), ("blue_candle", "red_candle"), ("letter", "blue_potion"),
      ("blue_potion", "red_potion"), ("blue_ring", "red_ring")];

/// Known bomb capacity tiers in Zelda 1.
const BOMB_TIERS: &[u8] = &[8, 12, 16];

/// Consecutive gameplay frames needed before attract-mode events unlock.
const GAMEPLAY_STARTED_STREAK: u32 = 120;

/// Consecutive matching frames required before a `gannon_nearby` flip is
/// accepted — suppresses single-frame ROAR-detection flicker.
const GANNON_NEARBY_STREAK_THRESHOLD: u32 = 2;

/// Validates state transitions against Zelda 1 game rules.
///
/// Maintains the last validated state and filters impossible changes from
/// new detections, while driving the per-concern trackers (dungeon exit,
/// item hold, warp/death, staircase items, floor items) and the inventory
/// accumulator off the same event stream.
pub struct GameLogicValidator {
    prev: Option<GameState>,
    anomalies: Vec<AnomalyRecord>,
    any_roads: HashSet<u16>,

    pre_cave_position: u16,
    item_anomaly_logged: HashSet<String>,
    last_anomaly_frame: HashMap<String, u64>,
    dungeon_heart_frame: HashMap<u8, u64>,

    /// Canonical triforce-inferred flags, owned here and threaded by
    /// mutable reference into both `dungeon_exit_tracker` and
    /// `item_hold_tracker` on every call — the idiomatic Rust analogue of
    /// the original's shared-list-by-reference constructor pattern.
    triforce_inferred: [bool; 8],

    dungeon_exit_tracker: DungeonExitTracker,
    item_hold_tracker: ItemHoldTracker,
    warp_death_tracker: WarpDeathTracker,
    staircase_tracker: StaircaseItemTracker,
    floor_item_tracker: FloorItemTracker,
    inventory_accumulator: InventoryAccumulator,
    player_items: PlayerItemTracker,

    game_events: Vec<EventRecord>,

    gameplay_started: bool,
    gameplay_streak: u32,
    last_title_frame: u64,

    ganon_seen: bool,

    /// Pending (candidate value, consecutive-frame count) for the
    /// `gannon_nearby` streak guard; `None` when no change is pending.
    gannon_nearby_streak: Option<(bool, u32)>,

    dungeons_visited: HashSet<u8>,
    last_b_item: Option<String>,
}

impl GameLogicValidator {
    pub fn new(any_roads: HashSet<u16>) -> Self {
        Self {
            prev: None,
            anomalies: Vec::new(),
            any_roads: any_roads.clone(),
            pre_cave_position: 0,
            item_anomaly_logged: HashSet::new(),
            last_anomaly_frame: HashMap::new(),
            dungeon_heart_frame: HashMap::new(),
            triforce_inferred: [false; 8],
            dungeon_exit_tracker: DungeonExitTracker::new(),
            item_hold_tracker: ItemHoldTracker::new(),
            warp_death_tracker: WarpDeathTracker::new(any_roads),
            staircase_tracker: StaircaseItemTracker::new(),
            floor_item_tracker: FloorItemTracker::new(),
            inventory_accumulator: InventoryAccumulator::new(),
            player_items: PlayerItemTracker::new(),
            game_events: Vec::new(),
            gameplay_started: false,
            gameplay_streak: 0,
            last_title_frame: 0,
            ganon_seen: false,
            gannon_nearby_streak: None,
            dungeons_visited: HashSet::new(),
            last_b_item: None,
        }
    }

    /// Apply game logic constraints to filter impossible transitions.
    pub fn validate(&mut self, current: GameState, frame_number: u64) -> GameState {
        let events_start = self.game_events.len();

        let Some(prev) = self.prev.clone() else {
            if current.map_position > 0 {
                if current.screen_type == "overworld" {
                    self.warp_death_tracker.overworld_start = current.map_position;
                }
                if current.screen_type == "dungeon" && current.dungeon_level > 0 {
                    self.warp_death_tracker.dungeon_entrances.insert(current.dungeon_level, current.map_position);
                }
            }
            self.prev = Some(current.clone());
            return current;
        };

        let mut d = current.clone();

        // Carry forward non-readable fields.
        if !matches!(d.screen_type.as_str(), "overworld" | "dungeon" | "cave") {
            d.hearts_current = prev.hearts_current;
            d.hearts_max = prev.hearts_max;
            d.has_half_heart = prev.has_half_heart;
            d.rupees = prev.rupees;
            d.keys = prev.keys;
            d.bombs = prev.bombs;
            d.has_master_key = prev.has_master_key;
            d.gannon_nearby = prev.gannon_nearby;
            d.map_position = prev.map_position;
            d.dungeon_level = prev.dungeon_level;
            d.bomb_max = prev.bomb_max;
            d.sword_level = prev.sword_level;
        }
        if d.screen_type != "subscreen" {
            d.items = prev.items.clone();
            d.triforce = prev.triforce;
        }
        if !matches!(d.screen_type.as_str(), "overworld" | "dungeon" | "cave" | "subscreen") {
            d.b_item = prev.b_item.clone();
        }

        // Streak validation for gannon_nearby.
        if matches!(d.screen_type.as_str(), "overworld" | "dungeon" | "cave") {
            let raw_value = d.gannon_nearby;
            if raw_value != prev.gannon_nearby {
                match self.gannon_nearby_streak {
                    Some((pending_value, count)) if pending_value == raw_value => {
                        if count + 1 >= GANNON_NEARBY_STREAK_THRESHOLD {
                            self.gannon_nearby_streak = None;
                        } else {
                            self.gannon_nearby_streak = Some((raw_value, count + 1));
                            d.gannon_nearby = prev.gannon_nearby;
                        }
                    }
                    _ => {
                        self.gannon_nearby_streak = Some((raw_value, 1));
                        d.gannon_nearby = prev.gannon_nearby;
                    }
                }
            } else {
                self.gannon_nearby_streak = None;
            }
        }

        // Track gameplay started (suppress attract-mode events).
        if d.screen_type == "title" {
            self.last_title_frame = frame_number;
            self.gameplay_streak = 0;
        } else if matches!(d.screen_type.as_str(), "overworld" | "dungeon" | "cave") {
            self.gameplay_streak += 1;
            if self.gameplay_streak >= GAMEPLAY_STARTED_STREAK && !self.gameplay_started {
                self.gameplay_started = true;
            }
        }

        // Dungeon first visit.
        if d.screen_type == "dungeon"
            && d.dungeon_level > 0
            && self.gameplay_started
            && !self.dungeons_visited.contains(&d.dungeon_level)
        {
            self.dungeons_visited.insert(d.dungeon_level);
            self.game_events.push(EventRecord {
                frame: frame_number,
                event: "dungeon_first_visit".to_string(),
                description: format!("Entered dungeon {} for the first time", d.dungeon_level),
                dungeon_level: d.dungeon_level,
                item: None,
                x: None,
                y: None,
            });
        }

        // Subscreen open.
        if d.screen_type == "subscreen" && prev.screen_type != "subscreen" && self.gameplay_started {
            self.game_events.push(EventRecord {
                frame: frame_number,
                event: "subscreen_open".to_string(),
                description: "Opened inventory".to_string(),
                dungeon_level: d.dungeon_level,
                item: None,
                x: None,
                y: None,
            });
        }

        // B-item change.
        if let Some(b_item) = d.b_item.clone() {
            if Some(&b_item) != self.last_b_item.as_ref()
                && matches!(d.screen_type.as_str(), "overworld" | "dungeon" | "cave" | "subscreen")
                && self.gameplay_started
            {
                let description = match &self.last_b_item {
                    Some(old) => format!("B-item: {b_item} (was {old})"),
                    None => format!("B-item: {b_item}"),
                };
                self.game_events.push(EventRecord {
                    frame: frame_number,
                    event: "b_item_change".to_string(),
                    description,
                    dungeon_level: d.dungeon_level,
                    item: None,
                    x: None,
                    y: None,
                });
                self.last_b_item = Some(b_item);
            }
        }

        // Item-hold detection (Link holding item overhead).
        let (events, anomalies) = self.item_hold_tracker.process_frame(
            current.detected_item.as_deref(),
            current.detected_item_y,
            &d.screen_type,
            d.dungeon_level,
            d.hearts_current,
            d.hearts_max,
            frame_number,
            &mut self.triforce_inferred,
        );
        self.game_events.extend(events);
        for a in anomalies {
            self.push_anomaly(a);
        }

        // Dungeon exit / triforce inference. Runs before warp/death so
        // game_complete can suppress credits-related death events on the
        // same frame.
        let (events, anomalies) = self.dungeon_exit_tracker.process_frame(
            &d.screen_type,
            d.dungeon_level,
            d.hearts_current,
            d.hearts_max,
            &prev.screen_type,
            prev.dungeon_level,
            frame_number,
            &mut self.triforce_inferred,
        );
        self.game_events.extend(events);
        for a in anomalies {
            self.push_anomaly(a);
        }

        // Warp/death detection.
        let events = self.warp_death_tracker.process_frame(
            &d.screen_type,
            d.dungeon_level,
            d.hearts_current,
            d.hearts_max,
            d.map_position,
            &prev.screen_type,
            prev.hearts_max,
            self.gameplay_started,
            self.dungeon_exit_tracker.game_completed,
            &self.game_events,
            frame_number,
            self.dungeon_exit_tracker.is_exiting_d9(),
        );
        self.game_events.extend(events);

        // Staircase item tracking.
        let staircase_events = self.staircase_tracker.process(current.detected_item.as_deref(), &d.screen_type, d.dungeon_level);
        self.game_events.extend(staircase_events);

        // Floor item tracking.
        let floor_events = self.floor_item_tracker.process(&current.floor_items, &d.screen_type, d.dungeon_level, d.map_position, frame_number);
        self.game_events.extend(floor_events);

        // Ganon fight tracking (D9 only).
        if d.screen_type == "dungeon" && d.dungeon_level == 9 && !self.dungeon_exit_tracker.game_completed {
            if d.gannon_nearby && !self.ganon_seen {
                self.ganon_seen = true;
                self.game_events.push(EventRecord {
                    frame: frame_number,
                    event: "ganon_fight".to_string(),
                    description: "Entered Ganon fight (ROAR detected)".to_string(),
                    dungeon_level: 9,
                    item: None,
                    x: None,
                    y: None,
                });
            } else if !d.gannon_nearby && self.ganon_seen {
                self.ganon_seen = false;
                self.game_events.push(EventRecord {
                    frame: frame_number,
                    event: "ganon_kill".to_string(),
                    description: "Ganon defeated (ROAR ended)".to_string(),
                    dungeon_level: 9,
                    item: None,
                    x: None,
                    y: None,
                });
            }
        }

        // ─── Validation rules ───

        // Rule 1: max hearts can only increase.
        if d.hearts_max < prev.hearts_max && prev.hearts_max > 0 {
            self.record_anomaly(frame_number, "hearts_max", format!("Max hearts decreased from {} to {}", prev.hearts_max, d.hearts_max), AnomalySeverity::Warning);
            d.hearts_max = prev.hearts_max;
        }

        // Rule 2: hearts cannot exceed max.
        if d.hearts_current > d.hearts_max {
            d.hearts_current = d.hearts_max;
        }

        // Rule 3: triforce pieces cannot be uncollected.
        for i in 0..8 {
            if prev.triforce[i] && !d.triforce[i] {
                self.record_anomaly(frame_number, "triforce", format!("Triforce piece {} disappeared", i + 1), AnomalySeverity::Warning);
                d.triforce[i] = true;
            }
        }

        // Rule 3b: merge inferred triforce into state.
        for i in 0..8 {
            if self.triforce_inferred[i] {
                d.triforce[i] = true;
            }
        }

        // Sword upgrade event (before Rule 4 validation).
        if d.sword_level > prev.sword_level && self.gameplay_started {
            let name = match d.sword_level {
                1 => "Wooden Sword".to_string(),
                2 => "White Sword".to_string(),
                3 => "Magical Sword".to_string(),
                other => format!("Sword level {other}"),
            };
            self.game_events.push(EventRecord {
                frame: frame_number,
                event: "sword_upgrade".to_string(),
                description: format!("Picked up {name}"),
                dungeon_level: d.dungeon_level,
                item: None,
                x: None,
                y: None,
            });
        }

        // Rule 4: sword level can only increase.
        if d.sword_level < prev.sword_level && prev.sword_level > 0 {
            self.record_anomaly(frame_number, "sword_level", format!("Sword level decreased from {} to {}", prev.sword_level, d.sword_level), AnomalySeverity::Warning);
            d.sword_level = prev.sword_level;
        }

        // Rule 5: non-losable items cannot disappear.
        for &item in NON_LOSABLE_ITEMS {
            let was_true = prev.items.get(item).copied().unwrap_or(false);
            let now_false = !d.items.get(item).copied().unwrap_or(false);
            if was_true && now_false {
                if !self.item_anomaly_logged.contains(item) {
                    self.record_anomaly(frame_number, &format!("item:{item}"), format!("Non-losable item {item} disappeared"), AnomalySeverity::Warning);
                    self.item_anomaly_logged.insert(item.to_string());
                }
                d.items.insert(item.to_string(), true);
            }
        }

        // Rule 6: upgraded items.
        for &(base, upgrade) in UPGRADE_CHAINS {
            let base_was_true = prev.items.get(base).copied().unwrap_or(false);
            let base_now_false = !d.items.get(base).copied().unwrap_or(false);
            if base_was_true && base_now_false && !d.items.get(upgrade).copied().unwrap_or(false) {
                if !self.item_anomaly_logged.contains(base) {
                    self.record_anomaly(frame_number, &format!("item:{base}"), format!("Item {base} disappeared without upgrade to {upgrade}"), AnomalySeverity::Warning);
                    self.item_anomaly_logged.insert(base.to_string());
                }
                d.items.insert(base.to_string(), true);
            }
        }

        // Rule 7: rupees bounded 0-255.
        d.rupees = d.rupees.min(255);

        // Rule 8: master key is permanent once acquired.
        if prev.has_master_key && !d.has_master_key {
            self.record_anomaly(frame_number, "has_master_key", "Master key disappeared".to_string(), AnomalySeverity::Warning);
            d.has_master_key = true;
        }

        // Rule 9: bomb max can only increase.
        let observed = d.bombs.max(prev.bomb_max);
        d.bomb_max = *BOMB_TIERS.iter().find(|&&tier| observed <= tier).unwrap_or(&16);

        // Track cave traversals (for Rule 10 cave warp detection).
        if prev.screen_type == "overworld" && d.screen_type == "cave" {
            self.pre_cave_position = prev.map_position;
        } else if prev.screen_type != "cave" && d.screen_type != "cave" {
            self.pre_cave_position = 0;
        }

        // Rule 10: map position adjacency.
        let ow_start = self.warp_death_tracker.overworld_start;
        if prev.map_position > 0 && d.map_position > 0 && prev.screen_type == d.screen_type {
            if d.screen_type == "overworld" {
                if !is_adjacent(prev.map_position, d.map_position, OVERWORLD_COLS) {
                    if d.map_position == ow_start {
                        self.record_anomaly(frame_number, "map_position", format!("Up+A/Reset to start screen: {} -> {}", prev.map_position, d.map_position), AnomalySeverity::Info);
                    } else if !self.any_roads.is_empty() && self.any_roads.contains(&prev.map_position) && self.any_roads.contains(&d.map_position) {
                        self.record_anomaly(frame_number, "map_position", format!("Any Roads warp: {} -> {}", prev.map_position, d.map_position), AnomalySeverity::Info);
                    } else if self.pre_cave_position > 0 {
                        self.record_anomaly(frame_number, "map_position", format!("Cave warp: {} -> {}", prev.map_position, d.map_position), AnomalySeverity::Info);
                    } else {
                        self.record_anomaly(frame_number, "map_position", format!("Non-adjacent overworld jump: {} -> {}", prev.map_position, d.map_position), AnomalySeverity::Warning);
                    }
                }
            } else if d.screen_type == "dungeon" && !is_adjacent(prev.map_position, d.map_position, DUNGEON_COLS) {
                let entrance = *self.warp_death_tracker.dungeon_entrances.get(&d.dungeon_level).unwrap_or(&0);
                if entrance > 0 && d.map_position == entrance {
                    self.record_anomaly(frame_number, "map_position", format!("Up+A to dungeon {} entrance: {} -> {}", d.dungeon_level, prev.map_position, d.map_position), AnomalySeverity::Info);
                } else {
                    self.record_anomaly(frame_number, "map_position", format!("Non-adjacent dungeon jump (staircase?): {} -> {}", prev.map_position, d.map_position), AnomalySeverity::Info);
                }
            }
        }

        // Rule 11: dungeon level stickiness.
        if prev.dungeon_level > 0
            && d.dungeon_level == 0
            && matches!(d.screen_type.as_str(), "dungeon" | "cave")
            && matches!(prev.screen_type.as_str(), "dungeon" | "cave")
        {
            self.record_anomaly(frame_number, "dungeon_level", format!("Dungeon level dropped to 0 while in {}", d.screen_type), AnomalySeverity::Warning);
            d.dungeon_level = prev.dungeon_level;
        }

        // Rule 12: screen type reinforcement from dungeon context.
        if prev.screen_type == "dungeon" && prev.dungeon_level > 0 && d.screen_type == "overworld" && d.dungeon_level > 0 {
            self.record_anomaly(frame_number, "screen_type", format!("Classifier said overworld but dungeon level {} still present", d.dungeon_level), AnomalySeverity::Warning);
            d.screen_type = "dungeon".to_string();
        }

        // Heart container tracking.
        if matches!(d.screen_type.as_str(), "overworld" | "dungeon" | "cave") && d.hearts_max > prev.hearts_max && prev.hearts_max > 0 {
            let dg = d.dungeon_level;
            let desc = if d.screen_type == "dungeon" && dg > 0 {
                self.dungeon_heart_frame.entry(dg).or_insert(frame_number);
                format!("Heart container in D{dg} ({}->{})", prev.hearts_max, d.hearts_max)
            } else if d.screen_type == "cave" {
                format!("Heart container in cave ({}->{})", prev.hearts_max, d.hearts_max)
            } else {
                format!("Heart container on overworld ({}->{})", prev.hearts_max, d.hearts_max)
            };
            self.game_events.push(EventRecord {
                frame: frame_number,
                event: "heart_container".to_string(),
                description: desc.clone(),
                dungeon_level: dg,
                item: None,
                x: None,
                y: None,
            });
            self.record_anomaly(frame_number, "heart_container", desc, AnomalySeverity::Info);
        }

        // Feed events to inventory accumulator.
        for evt in &self.game_events[events_start..] {
            self.inventory_accumulator.process_event(evt);
        }

        // Equipped-item knowledge (quick "what is Link holding" query),
        // updated every frame alongside the event-driven accumulator above.
        self.player_items.update_from_b_item(d.b_item.as_deref());
        self.player_items.update_sword_level(d.sword_level);

        d.events = self.game_events[events_start..].to_vec();
        self.prev = Some(d.clone());
        d
    }

    pub fn get_anomalies(&self) -> &[AnomalyRecord] {
        &self.anomalies
    }

    pub fn get_accumulated_inventory(&self) -> HashMap<String, bool> {
        self.inventory_accumulator.get_inventory()
    }

    /// Quick equipped-item query: what the player currently holds, plus
    /// their highest observed sword/arrows tier.
    pub fn get_player_items(&self) -> HashMap<String, bool> {
        self.player_items.get_items()
    }

    pub fn get_triforce_inferred(&self) -> [bool; 8] {
        self.triforce_inferred
    }

    pub fn reset(&mut self) {
        self.prev = None;
        self.anomalies.clear();
        self.pre_cave_position = 0;
        self.item_anomaly_logged.clear();
        self.last_anomaly_frame.clear();
        self.dungeon_heart_frame.clear();
        self.dungeon_exit_tracker.reset(&mut self.triforce_inferred);
        self.item_hold_tracker.reset(&mut self.triforce_inferred);
        self.warp_death_tracker.reset();
        self.staircase_tracker.reset();
        self.floor_item_tracker.reset();
        self.inventory_accumulator.reset();
        self.player_items = PlayerItemTracker::new();
        self.gameplay_started = false;
        self.gameplay_streak = 0;
        self.last_title_frame = 0;
        self.ganon_seen = false;
        self.gannon_nearby_streak = None;
        self.dungeons_visited.clear();
        self.last_b_item = None;
        self.game_events.clear();
    }

    fn push_anomaly(&mut self, anomaly: AnomalyRecord) {
        self.anomalies.push(anomaly);
    }

    /// Record a detected anomaly with temporal debouncing — warning-severity
    /// anomalies from the same detector are suppressed for
    /// [`ANOMALY_DEBOUNCE_FRAMES`] frames; info anomalies are never debounced.
    fn record_anomaly(&mut self, frame_number: u64, detector: &str, description: String, severity: AnomalySeverity) {
        if severity != AnomalySeverity::Info {
            if let Some(&last_frame) = self.last_anomaly_frame.get(detector) {
                if frame_number.saturating_sub(last_frame) < ANOMALY_DEBOUNCE_FRAMES {
                    return;
                }
            }
        }
        self.last_anomaly_frame.insert(detector.to_string(), frame_number);
        debug!(detector, %description, "anomaly");
        self.anomalies.push(AnomalyRecord { frame: frame_number, detector: detector.to_string(), description, severity });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gameplay(hearts: u8, hearts_max: u8) -> GameState {
        GameState { screen_type: "overworld".to_string(), hearts_current: hearts, hearts_max, ..GameState::default() }
    }

    #[test]
    fn first_frame_passes_through_unchanged() {
        let mut v = GameLogicValidator::new(HashSet::new());
        let state = gameplay(3, 3);
        let out = v.validate(state.clone(), 1);
        assert_eq!(out.hearts_current, 3);
    }

    #[test]
    fn hearts_max_cannot_decrease() {
        let mut v = GameLogicValidator::new(HashSet::new());
        v.validate(gameplay(3, 3), 1);
        let out = v.validate(gameplay(3, 2), 2);
        assert_eq!(out.hearts_max, 3);
        assert_eq!(v.get_anomalies().len(), 1);
    }

    #[test]
    fn hearts_current_clamped_to_max() {
        let mut v = GameLogicValidator::new(HashSet::new());
        v.validate(gameplay(3, 3), 1);
        let mut next = gameplay(5, 3);
        next.hearts_max = 3;
        let out = v.validate(next, 2);
        assert_eq!(out.hearts_current, 3);
    }

    #[test]
    fn triforce_cannot_be_uncollected() {
        let mut v = GameLogicValidator::new(HashSet::new());
        let mut first = gameplay(3, 3);
        first.triforce[0] = true;
        v.validate(first, 1);
        let mut next = gameplay(3, 3);
        next.triforce[0] = false;
        let out = v.validate(next, 2);
        assert!(out.triforce[0]);
        assert_eq!(v.get_anomalies().len(), 1);
    }

    #[test]
    fn sword_level_cannot_decrease() {
        let mut v = GameLogicValidator::new(HashSet::new());
        let mut first = gameplay(3, 3);
        first.sword_level = 2;
        v.validate(first, 1);
        let mut next = gameplay(3, 3);
        next.sword_level = 1;
        let out = v.validate(next, 2);
        assert_eq!(out.sword_level, 2);
    }

    #[test]
    fn rupees_clamped_to_255() {
        let mut v = GameLogicValidator::new(HashSet::new());
        v.validate(gameplay(3, 3), 1);
        let mut next = gameplay(3, 3);
        next.rupees = 9000;
        let out = v.validate(next, 2);
        assert_eq!(out.rupees, 255);
    }

    #[test]
    fn non_losable_item_cannot_disappear() {
        let mut v = GameLogicValidator::new(HashSet::new());
        let mut first = gameplay(3, 3);
        first.items.insert("raft".to_string(), true);
        v.validate(first, 1);
        let next = gameplay(3, 3);
        let out = v.validate(next, 2);
        assert!(out.items.get("raft").copied().unwrap_or(false));
    }

    #[test]
    fn master_key_is_permanent() {
        let mut v = GameLogicValidator::new(HashSet::new());
        let mut first = gameplay(3, 3);
        first.has_master_key = true;
        v.validate(first, 1);
        let next = gameplay(3, 3);
        let out = v.validate(next, 2);
        assert!(out.has_master_key);
    }

    #[test]
    fn non_gameplay_screen_carries_forward_hud_fields() {
        let mut v = GameLogicValidator::new(HashSet::new());
        v.validate(gameplay(2, 3), 1);
        let mut subscreen = gameplay(0, 0);
        subscreen.screen_type = "subscreen".to_string();
        let out = v.validate(subscreen, 2);
        assert_eq!(out.hearts_current, 2);
        assert_eq!(out.hearts_max, 3);
    }
}
