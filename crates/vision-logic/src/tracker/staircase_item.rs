//! Tracks items on dungeon staircase pedestals across frames.
//!
//! State machine: `idle -> item_visible` once an item is detected for 2+
//! consecutive frames; `item_visible -> acquired` (emits an event) once the
//! item has been gone for 3+ consecutive frames, then back to `idle`.

use vision_core::state::EventRecord;

const VISIBLE_THRESHOLD: u32 = 2;
const ACQUIRED_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    ItemVisible,
}

pub struct StaircaseItemTracker {
    state: State,
    item_name: Option<String>,
    seen_count: u32,
    gone_count: u32,
}

impl Default for StaircaseItemTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StaircaseItemTracker {
    pub fn new() -> Self {
        Self { state: State::Idle, item_name: None, seen_count: 0, gone_count: 0 }
    }

    pub fn process(&mut self, detected_item: Option<&str>, screen_type: &str, dungeon_level: u8) -> Vec<EventRecord> {
        let mut events = Vec::new();

        if screen_type != "dungeon" {
            self.reset();
            return events;
        }

        let is_staircase_item = detected_item.is_some_and(|i| i != "triforce");

        match self.state {
            State::Idle => {
                if is_staircase_item {
                    self.seen_count += 1;
                    self.item_name = detected_item.map(str::to_string);
                    if self.seen_count >= VISIBLE_THRESHOLD {
                        self.state = State::ItemVisible;
                    }
                } else {
                    self.seen_count = 0;
                    self.item_name = None;
                }
            }
            State::ItemVisible => {
                if is_staircase_item {
                    self.gone_count = 0;
                    self.item_name = detected_item.map(str::to_string);
                } else {
                    self.gone_count += 1;
                    if self.gone_count >= ACQUIRED_THRESHOLD {
                        let item = self.item_name.clone();
                        events.push(EventRecord {
                            frame: 0,
                            event: "staircase_item_acquired".to_string(),
                            description: format!("Staircase item: {}", item.as_deref().unwrap_or("unknown")),
                            dungeon_level,
                            item,
                            x: None,
                            y: None,
                        });
                        self.reset();
                    }
                }
            }
        }

        events
    }

    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.item_name = None;
        self.seen_count = 0;
        self.gone_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_dungeon_screen_resets_tracking() {
        let mut t = StaircaseItemTracker::new();
        t.process(Some("bow"), "dungeon", 1);
        let events = t.process(Some("bow"), "overworld", 0);
        assert!(events.is_empty());
        assert_eq!(t.state, State::Idle);
    }

    #[test]
    fn item_acquired_after_gone_for_threshold_frames() {
        let mut t = StaircaseItemTracker::new();
        t.process(Some("bow"), "dungeon", 4);
        t.process(Some("bow"), "dungeon", 4);
        assert_eq!(t.state, State::ItemVisible);
        t.process(None, "dungeon", 4);
        t.process(None, "dungeon", 4);
        let events = t.process(None, "dungeon", 4);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "staircase_item_acquired");
        assert_eq!(events[0].item.as_deref(), Some("bow"));
    }

    #[test]
    fn triforce_is_not_treated_as_staircase_item() {
        let mut t = StaircaseItemTracker::new();
        t.process(Some("triforce"), "dungeon", 4);
        let events = t.process(Some("triforce"), "dungeon", 4);
        assert!(events.is_empty());
        assert_eq!(t.state, State::Idle);
    }

    #[test]
    fn brief_gap_does_not_reset_visible_item() {
        let mut t = StaircaseItemTracker::new();
        t.process(Some("bow"), "dungeon", 4);
        t.process(Some("bow"), "dungeon", 4);
        t.process(None, "dungeon", 4);
        let events = t.process(Some("bow"), "dungeon", 4);
        assert!(events.is_empty());
        assert_eq!(t.state, State::ItemVisible);
    }
}
