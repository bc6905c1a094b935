//! Warp/death tracker: detects Up+A warps and deaths from gameplay gaps.
//!
//! Tracks non-gameplay gaps (consecutive non-subscreen, non-gameplay frames)
//! and detects when gameplay resumes at a known reset position (overworld
//! start or dungeon entrance). Also runs the CSR screen-based fallback
//! detection and the hearts-zero streak guard against false deaths.

use std::collections::{HashMap, HashSet};

use vision_core::state::EventRecord;

/// Detects Up+A warps and deaths via position-reset and CSR patterns.
///
/// `overworld_start` and `dungeon_entrances` are read by the coordinator
/// for Rule 10's map-adjacency checks.
pub struct WarpDeathTracker {
    pub overworld_start: u16,
    pub dungeon_entrances: HashMap<u8, u16>,
    /// Kept for future use — Rule 10 in the coordinator reads this.
    pub any_roads: HashSet<u16>,

    last_gameplay_hearts: u8,
    zero_hearts_streak: u32,
    non_gameplay_gap: u32,
    last_gameplay_position: u16,
    last_gameplay_screen: String,
    warp_detected_this_gap: bool,
}

impl WarpDeathTracker {
    pub fn new(any_roads: HashSet<u16>) -> Self {
        Self {
            overworld_start: 0,
            dungeon_entrances: HashMap::new(),
            any_roads,
            last_gameplay_hearts: 0,
            zero_hearts_streak: 0,
            non_gameplay_gap: 0,
            last_gameplay_position: 0,
            last_gameplay_screen: String::new(),
            warp_detected_this_gap: false,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn process_frame(
        &mut self,
        screen_type: &str,
        dungeon_level: u8,
        hearts_current: u8,
        hearts_max: u8,
        map_position: u16,
        prev_screen_type: &str,
        prev_hearts_max: u8,
        gameplay_started: bool,
        game_completed: bool,
        game_events: &[EventRecord],
        frame_number: u64,
        dungeon_exit_exiting_d9: bool,
    ) -> Vec<EventRecord> {
        let mut events = Vec::new();

        // Captured before the hearts-zero streak update below.
        let pre_gap_hearts = self.last_gameplay_hearts;

        if matches!(screen_type, "overworld" | "dungeon" | "cave") {
            if hearts_current > 0 {
                self.last_gameplay_hearts = hearts_current;
                self.zero_hearts_streak = 0;
            } else if prev_hearts_max > 0 && hearts_max >= prev_hearts_max {
                self.zero_hearts_streak += 1;
                if self.zero_hearts_streak >= 4 {
                    self.last_gameplay_hearts = 0;
                }
            }
        }

        if matches!(screen_type, "overworld" | "dungeon" | "cave")
            && self.non_gameplay_gap >= 4
            && gameplay_started
            && !game_completed
            && !self.warp_detected_this_gap
        {
            let new_pos = map_position;
            let mut is_reset = false;

            if screen_type == "overworld" && self.overworld_start > 0 && new_pos == self.overworld_start {
                is_reset = true;
            } else if screen_type == "dungeon" && dungeon_level > 0 {
                let entrance = *self.dungeon_entrances.get(&dungeon_level).unwrap_or(&0);
                if entrance > 0 && new_pos == entrance && self.last_gameplay_screen == "dungeon" {
                    is_reset = true;
                }
            }

            let triforce_just_inferred = game_events
                .last()
                .map(|e| e.event == "triforce_inferred" && e.frame == frame_number)
                .unwrap_or(false);

            if is_reset && !triforce_just_inferred {
                self.warp_detected_this_gap = true;
                if pre_gap_hearts == 0 {
                    events.push(EventRecord {
                        frame: frame_number,
                        event: "death".to_string(),
                        description: format!(
                            "Link died (respawned at reset position after {} frame gap)",
                            self.non_gameplay_gap
                        ),
                        dungeon_level,
                        item: None,
                        x: None,
                        y: None,
                    });
                } else {
                    events.push(EventRecord {
                        frame: frame_number,
                        event: "up_a_warp".to_string(),
                        description: format!(
                            "Up+A warp (hearts {pre_gap_hearts}, reset after {} frame gap)",
                            self.non_gameplay_gap
                        ),
                        dungeon_level,
                        item: None,
                        x: None,
                        y: None,
                    });
                }
            }
        }

        if screen_type == "death"
            && prev_screen_type != "death"
            && !game_completed
            && gameplay_started
            && !self.warp_detected_this_gap
            && !dungeon_exit_exiting_d9
        {
            self.warp_detected_this_gap = true;
            if self.last_gameplay_hearts == 0 {
                events.push(EventRecord {
                    frame: frame_number,
                    event: "death".to_string(),
                    description: "Link died (hearts reached 0, CSR screen detected)".to_string(),
                    dungeon_level,
                    item: None,
                    x: None,
                    y: None,
                });
            } else {
                events.push(EventRecord {
                    frame: frame_number,
                    event: "up_a_warp".to_string(),
                    description: format!(
                        "Up+A warp (hearts were {}, CSR screen detected)",
                        self.last_gameplay_hearts
                    ),
                    dungeon_level,
                    item: None,
                    x: None,
                    y: None,
                });
            }
        }

        if map_position > 0 {
            if screen_type == "overworld" && self.overworld_start == 0 {
                self.overworld_start = map_position;
            }
            if screen_type == "dungeon" && dungeon_level > 0 {
                self.dungeon_entrances.entry(dungeon_level).or_insert(map_position);
            }
        }

        if matches!(screen_type, "overworld" | "dungeon" | "cave") {
            self.non_gameplay_gap = 0;
            self.warp_detected_this_gap = false;
            self.last_gameplay_position = map_position;
            self.last_gameplay_screen = screen_type.to_string();
        } else if screen_type != "subscreen" {
            self.non_gameplay_gap += 1;
        }

        events
    }

    pub fn reset(&mut self) {
        self.overworld_start = 0;
        self.dungeon_entrances.clear();
        self.last_gameplay_hearts = 0;
        self.zero_hearts_streak = 0;
        self.non_gameplay_gap = 0;
        self.last_gameplay_position = 0;
        self.last_gameplay_screen.clear();
        self.warp_detected_this_gap = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gameplay_frame(
        t: &mut WarpDeathTracker,
        screen: &str,
        dungeon: u8,
        hearts: u8,
        hearts_max: u8,
        pos: u16,
        prev_screen: &str,
        prev_hearts_max: u8,
        frame: u64,
    ) -> Vec<EventRecord> {
        t.process_frame(screen, dungeon, hearts, hearts_max, pos, prev_screen, prev_hearts_max, true, false, &[], frame, false)
    }

    #[test]
    fn records_overworld_start_on_first_gameplay_frame() {
        let mut t = WarpDeathTracker::new(HashSet::new());
        gameplay_frame(&mut t, "overworld", 0, 3, 3, 42, "unknown", 3, 1);
        assert_eq!(t.overworld_start, 42);
    }

    #[test]
    fn death_detected_on_reset_position_after_gap_with_zero_hearts() {
        let mut t = WarpDeathTracker::new(HashSet::new());
        gameplay_frame(&mut t, "overworld", 0, 3, 3, 10, "unknown", 3, 1);
        // Hearts drop to zero for 4 consecutive frames to confirm death.
        for f in 2..=5 {
            gameplay_frame(&mut t, "overworld", 0, 0, 3, 10, "overworld", 3, f);
        }
        // Non-gameplay gap of 4+ frames.
        for f in 6..=9 {
            t.process_frame("unknown", 0, 0, 3, 10, "overworld", 3, true, false, &[], f, false);
        }
        let events = gameplay_frame(&mut t, "overworld", 0, 3, 3, 10, "unknown", 3, 10);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "death");
    }

    #[test]
    fn up_a_warp_detected_on_reset_position_with_hearts_remaining() {
        let mut t = WarpDeathTracker::new(HashSet::new());
        gameplay_frame(&mut t, "overworld", 0, 3, 3, 10, "unknown", 3, 1);
        for f in 2..=5 {
            t.process_frame("unknown", 0, 3, 3, 10, "overworld", 3, true, false, &[], f, false);
        }
        let events = gameplay_frame(&mut t, "overworld", 0, 3, 3, 10, "unknown", 3, 6);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "up_a_warp");
    }

    #[test]
    fn triforce_just_inferred_suppresses_warp_death_event() {
        let mut t = WarpDeathTracker::new(HashSet::new());
        gameplay_frame(&mut t, "overworld", 0, 3, 3, 10, "unknown", 3, 1);
        for f in 2..=5 {
            t.process_frame("unknown", 0, 3, 3, 10, "overworld", 3, true, false, &[], f, false);
        }
        let triforce_event = EventRecord {
            frame: 6,
            event: "triforce_inferred".to_string(),
            description: "x".to_string(),
            dungeon_level: 3,
            item: None,
            x: None,
            y: None,
        };
        let events = t.process_frame(
            "overworld", 0, 3, 3, 10, "unknown", 3, true, false, &[triforce_event], 6, false,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn csr_death_screen_fires_when_hearts_were_zero() {
        let mut t = WarpDeathTracker::new(HashSet::new());
        gameplay_frame(&mut t, "overworld", 0, 0, 3, 10, "unknown", 3, 1);
        let events = t.process_frame("death", 0, 0, 3, 0, "overworld", 3, true, false, &[], 2, false);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "death");
    }

    #[test]
    fn dungeon_exit_exiting_d9_suppresses_csr_death() {
        let mut t = WarpDeathTracker::new(HashSet::new());
        gameplay_frame(&mut t, "dungeon", 9, 0, 16, 5, "unknown", 16, 1);
        let events = t.process_frame("death", 9, 0, 16, 0, "dungeon", 16, true, false, &[], 2, true);
        assert!(events.is_empty());
    }
}
