//! Event-driven inventory accumulation, plus the player/race item knowledge
//! trackers used for Z1R-style "what has this player obtained, and where
//! did each item live on this seed" bookkeeping.

use std::collections::{HashMap, HashSet};

use vision_core::state::EventRecord;

/// One-way upgrade chains: obtaining the key implies the listed items too.
fn upgrade_implies() -> &'static HashMap<&'static str, &'static [&'static str]> {
    use std::sync::OnceLock;
    static MAP: OnceLock<HashMap<&'static str, &'static [&'static str]>> = OnceLock::new();
    MAP.get_or_init(|| {
        HashMap::from([
            ("red_candle", &["blue_candle"][..]),
            ("magical_boomerang", &["boomerang"][..]),
            ("silver_arrow", &["arrow", "bow"][..]),
            ("red_ring", &["blue_ring"][..]),
            ("red_potion", &["blue_potion", "letter"][..]),
            ("blue_potion", &["letter"][..]),
            ("magical_shield", &[][..]),
            ("white_sword", &["wood_sword"][..]),
            ("magical_sword", &["wood_sword", "white_sword"][..]),
        ])
    })
}

fn b_item_to_inventory(name: &str) -> Option<&'static str> {
    Some(match name {
        "boomerang" => "boomerang",
        "magical_boomerang" => "magical_boomerang",
        "bomb" => "bomb",
        "bow" => "bow",
        "arrows" => "arrow",
        "candle" | "blue_candle" => "blue_candle",
        "red_candle" => "red_candle",
        "whistle" => "whistle",
        "food" => "food",
        "potion" | "blue_potion" => "blue_potion",
        "red_potion" => "red_potion",
        "magical_rod" => "magical_rod",
        "raft" => "raft",
        "wand" => "wand",
        "letter" => "letter",
        _ => return None,
    })
}

pub const ALL_ITEMS: &[&str] = &[
    "sword", "wood_sword", "white_sword", "magical_sword", "bow", "arrow", "silver_arrow",
    "boomerang", "magical_boomerang", "bomb", "blue_candle", "red_candle", "whistle", "food",
    "letter", "blue_potion", "red_potion", "magical_rod", "raft", "wand", "ladder", "power_bracelet",
];

/// Accumulates items the player has obtained from the validator's event
/// stream (b-item changes, staircase pickups, sword upgrades) plus the
/// occasional vanilla subscreen scan. Once obtained, an item is never
/// forgotten — this is a one-way accumulator, not a snapshot of current
/// HUD/subscreen state.
#[derive(Default)]
pub struct InventoryAccumulator {
    obtained: HashSet<String>,
}

impl InventoryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_event(&mut self, event: &EventRecord) {
        match event.event.as_str() {
            "b_item_change" => {
                if let Some(name) = parse_b_item_description(&event.description) {
                    self.add_from_b_item(&name);
                }
            }
            "staircase_item_acquired" | "item_obtained" | "item_pickup" => {
                if let Some(item) = &event.item {
                    self.add_item(item);
                }
            }
            "sword_upgrade" => {
                if event.description.contains("Magical Sword") {
                    self.add_item("magical_sword");
                } else if event.description.contains("White Sword") {
                    self.add_item("white_sword");
                } else if event.description.contains("Wooden Sword") {
                    self.add_item("wood_sword");
                }
            }
            _ => {}
        }
    }

    /// Seed from a vanilla (non-Z1R) subscreen scan: merge every `true` item.
    pub fn process_subscreen(&mut self, items: &HashMap<String, bool>) {
        for (name, &value) in items {
            if value {
                self.add_item(name);
            }
        }
    }

    pub fn get_inventory(&self) -> HashMap<String, bool> {
        ALL_ITEMS.iter().map(|&name| (name.to_string(), self.obtained.contains(name))).collect()
    }

    pub fn reset(&mut self) {
        self.obtained.clear();
    }

    fn add_from_b_item(&mut self, b_item: &str) {
        if let Some(inv_name) = b_item_to_inventory(b_item) {
            self.add_item(inv_name);
        }
    }

    fn add_item(&mut self, name: &str) {
        self.obtained.insert(name.to_string());
        if let Some(implied) = upgrade_implies().get(name) {
            for &dep in implied.iter() {
                self.obtained.insert(dep.to_string());
            }
        }
    }
}

/// Parse a `b_item_change` description of the form `"B-item: <name>"` or
/// `"B-item: <name> (was <old>)"`.
fn parse_b_item_description(description: &str) -> Option<String> {
    let rest = description.strip_prefix("B-item: ")?;
    let name = rest.split(" (was ").next().unwrap_or(rest);
    Some(name.to_string())
}

/// Tracks items the player has obtained. State only ever increases.
///
/// Vocabulary: vision *identifies* items; this tracker records that the
/// player has *obtained* them.
#[derive(Default)]
pub struct PlayerItemTracker {
    items: HashMap<String, bool>,
    pub sword_level: u8,
    pub arrows_level: u8,
}

impl PlayerItemTracker {
    const UPGRADES: &'static [(&'static str, &'static str)] =
        &[("blue_candle", "red_candle"), ("blue_ring", "red_ring"), ("boomerang", "magical_boomerang")];

    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_from_b_item(&mut self, b_item: Option<&str>) {
        let Some(b_item) = b_item else { return };
        self.set(b_item, true);
        if b_item == "arrows" {
            self.set("bow", true);
            self.arrows_level = self.arrows_level.max(1);
        }
    }

    pub fn update_item_obtained(&mut self, item: &str) {
        self.set(item, true);
    }

    pub fn update_sword_level(&mut self, level: u8) {
        self.sword_level = self.sword_level.max(level);
    }

    pub fn update_arrows_level(&mut self, level: u8) {
        self.arrows_level = self.arrows_level.max(level);
    }

    /// Merge a subscreen scan: `true` values override; `false` values are
    /// only accepted when we have no prior `true` for that item.
    pub fn merge_subscreen(&mut self, subscreen_items: &HashMap<String, bool>) {
        for (item, &value) in subscreen_items {
            if value {
                self.set(item, true);
            } else if !self.items.get(item).copied().unwrap_or(false) {
                self.items.insert(item.clone(), false);
            }
        }
    }

    pub fn get_items(&self) -> HashMap<String, bool> {
        self.items.clone()
    }

    fn set(&mut self, item: &str, value: bool) {
        self.items.insert(item.to_string(), value);
        if !value {
            return;
        }
        for &(inferior, superior) in Self::UPGRADES {
            if item == superior {
                self.items.insert(inferior.to_string(), false);
            }
        }
    }
}

/// One item's known location and pickup status, as inferred from vision.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemLocation {
    pub map_position: u16,
    pub first_seen_frame: u64,
    pub obtained: bool,
}

/// Tracks where each item lives on the seed — a seed knowledge map.
///
/// Records "for each item in the game, where is it?" as detected by vision.
/// Combined with [`PlayerItemTracker`] this answers "did the player get the
/// silver arrows from Level 5?"
///
/// Vocabulary: vision *detects* floor items. This tracker records that an
/// item was *seen* at a location; separately records if it was *obtained*.
#[derive(Default)]
pub struct RaceItemTracker {
    locations: HashMap<String, ItemLocation>,
}

impl RaceItemTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that vision detected this item at a map position. Idempotent:
    /// does not overwrite an item already marked obtained.
    pub fn item_seen(&mut self, item: &str, map_position: u16, frame: u64) {
        self.locations.entry(item.to_string()).or_insert(ItemLocation {
            map_position,
            first_seen_frame: frame,
            obtained: false,
        });
    }

    /// Mark an item as obtained by the player (confirmed pickup). Records a
    /// synthetic unknown-location entry if no prior sighting exists.
    pub fn item_obtained(&mut self, item: &str, frame: u64) {
        self.locations
            .entry(item.to_string())
            .and_modify(|loc| loc.obtained = true)
            .or_insert(ItemLocation { map_position: 0, first_seen_frame: frame, obtained: true });
    }

    pub fn get_locations(&self) -> HashMap<String, ItemLocation> {
        self.locations.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, desc: &str, item: Option<&str>) -> EventRecord {
        EventRecord {
            frame: 1,
            event: name.to_string(),
            description: desc.to_string(),
            dungeon_level: 0,
            item: item.map(str::to_string),
            x: None,
            y: None,
        }
    }

    #[test]
    fn b_item_change_adds_mapped_inventory_item() {
        let mut acc = InventoryAccumulator::new();
        acc.process_event(&event("b_item_change", "B-item: raft", None));
        assert!(acc.get_inventory()["raft"]);
    }

    #[test]
    fn b_item_change_with_was_suffix_parses_new_name_only() {
        let mut acc = InventoryAccumulator::new();
        acc.process_event(&event("b_item_change", "B-item: bow (was boomerang)", None));
        assert!(acc.get_inventory()["bow"]);
    }

    #[test]
    fn sword_upgrade_description_sets_correct_tier() {
        let mut acc = InventoryAccumulator::new();
        acc.process_event(&event("sword_upgrade", "Picked up Magical Sword", None));
        let inv = acc.get_inventory();
        assert!(inv["magical_sword"]);
        assert!(inv["wood_sword"]);
        assert!(inv["white_sword"]);
    }

    #[test]
    fn staircase_item_acquired_adds_named_item() {
        let mut acc = InventoryAccumulator::new();
        acc.process_event(&event("staircase_item_acquired", "Staircase item: raft", Some("raft")));
        assert!(acc.get_inventory()["raft"]);
    }

    #[test]
    fn silver_arrow_implies_bow_and_arrow() {
        let mut acc = InventoryAccumulator::new();
        acc.process_event(&event("staircase_item_acquired", "x", Some("silver_arrow")));
        let inv = acc.get_inventory();
        assert!(inv["bow"]);
        assert!(inv["arrow"]);
    }

    #[test]
    fn player_item_tracker_upgrade_clears_inferior() {
        let mut t = PlayerItemTracker::new();
        t.update_item_obtained("boomerang");
        t.update_item_obtained("magical_boomerang");
        let items = t.get_items();
        assert_eq!(items.get("boomerang"), Some(&false));
        assert_eq!(items.get("magical_boomerang"), Some(&true));
    }

    #[test]
    fn sword_and_arrows_levels_never_decrease() {
        let mut t = PlayerItemTracker::new();
        t.update_sword_level(2);
        t.update_sword_level(1);
        assert_eq!(t.sword_level, 2);
        t.update_arrows_level(2);
        t.update_arrows_level(0);
        assert_eq!(t.arrows_level, 2);
    }

    #[test]
    fn race_item_tracker_records_unknown_location_on_direct_obtain() {
        let mut t = RaceItemTracker::new();
        t.item_obtained("raft", 10);
        let loc = t.get_locations().remove("raft").unwrap();
        assert_eq!(loc.map_position, 0);
        assert!(loc.obtained);
    }

    #[test]
    fn race_item_tracker_marks_seen_item_obtained_without_losing_location() {
        let mut t = RaceItemTracker::new();
        t.item_seen("bow", 42, 5);
        t.item_obtained("bow", 20);
        let loc = t.get_locations().remove("bow").unwrap();
        assert_eq!(loc.map_position, 42);
        assert!(loc.obtained);
    }
}
