//! Tracks items on dungeon/overworld floors across frames.
//!
//! Emits `item_drop` events when new items appear and `item_pickup` events
//! when tracked items disappear. Room transitions are handled gracefully: a
//! grace period after entering a new room absorbs whatever is already on
//! the floor as the baseline rather than reporting it as freshly dropped.
//! Items must be confirmed present for [`CONFIRM_FRAMES`] consecutive
//! frames before being tracked, and absent for [`GONE_FRAMES`] consecutive
//! frames before being considered picked up — both guard against
//! single-frame detection flicker.

use vision_core::state::{EventRecord, FloorItem};

const ROOM_ENTRY_GRACE: u32 = 3;
const CONFIRM_FRAMES: u32 = 2;
const GONE_FRAMES: u32 = 3;
const MATCH_DIST: i32 = 12;

struct Tracked {
    name: String,
    x: i32,
    y: i32,
    gone: u32,
}

struct Pending {
    name: String,
    x: i32,
    y: i32,
    count: u32,
}

#[derive(Default, PartialEq, Clone)]
struct ScreenKey {
    screen_type: String,
    dungeon_level: u8,
    map_position: u16,
}

pub struct FloorItemTracker {
    tracked: Vec<Tracked>,
    pending: Vec<Pending>,
    grace_remaining: u32,
    prev_screen_key: ScreenKey,
}

impl Default for FloorItemTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FloorItemTracker {
    pub fn new() -> Self {
        Self {
            tracked: Vec::new(),
            pending: Vec::new(),
            grace_remaining: 0,
            prev_screen_key: ScreenKey::default(),
        }
    }

    pub fn process(
        &mut self,
        floor_items: &[FloorItem],
        screen_type: &str,
        dungeon_level: u8,
        map_position: u16,
        frame_number: u64,
    ) -> Vec<EventRecord> {
        let mut events = Vec::new();

        if !matches!(screen_type, "dungeon" | "overworld") {
            self.reset();
            return events;
        }

        let screen_key = ScreenKey { screen_type: screen_type.to_string(), dungeon_level, map_position };
        if screen_key != self.prev_screen_key {
            self.reset();
            self.prev_screen_key = screen_key;
            self.grace_remaining = ROOM_ENTRY_GRACE;
        }

        if self.grace_remaining > 0 {
            self.grace_remaining -= 1;
            if self.grace_remaining == 0 {
                for fi in floor_items {
                    self.tracked.push(Tracked { name: fi.name.clone(), x: fi.x, y: fi.y, gone: 0 });
                }
            }
            return events;
        }

        let current: Vec<(&str, i32, i32)> = floor_items.iter().map(|fi| (fi.name.as_str(), fi.x, fi.y)).collect();

        let mut still_tracked = Vec::new();
        for item in self.tracked.drain(..) {
            // Matched by position only, same as the pending/tracked checks
            // below — the original does not also require the name to match.
            let present = current.iter().any(|&(_, x, y)| matches(item.x, item.y, x, y));
            if present {
                still_tracked.push(Tracked { gone: 0, ..item });
            } else {
                let gone = item.gone + 1;
                if gone >= GONE_FRAMES {
                    events.push(EventRecord {
                        frame: frame_number,
                        event: "item_pickup".to_string(),
                        description: format!("Picked up floor item: {}", item.name),
                        dungeon_level,
                        item: Some(item.name),
                        x: Some(item.x),
                        y: Some(item.y),
                    });
                } else {
                    still_tracked.push(Tracked { gone, ..item });
                }
            }
        }
        self.tracked = still_tracked;

        for &(name, x, y) in &current {
            if self.tracked.iter().any(|t| matches(t.x, t.y, x, y)) {
                continue;
            }

            let mut matched_pending = false;
            let mut confirmed_at = None;
            for (idx, p) in self.pending.iter_mut().enumerate() {
                if matches(p.x, p.y, x, y) {
                    p.count += 1;
                    matched_pending = true;
                    if p.count >= CONFIRM_FRAMES {
                        confirmed_at = Some(idx);
                    }
                    break;
                }
            }

            if let Some(idx) = confirmed_at {
                self.pending.remove(idx);
                self.tracked.push(Tracked { name: name.to_string(), x, y, gone: 0 });
                events.push(EventRecord {
                    frame: frame_number,
                    event: "item_drop".to_string(),
                    description: format!("Floor item appeared: {name}"),
                    dungeon_level,
                    item: Some(name.to_string()),
                    x: Some(x),
                    y: Some(y),
                });
            } else if !matched_pending {
                self.pending.push(Pending { name: name.to_string(), x, y, count: 1 });
            }
        }

        self.pending.retain(|p| current.iter().any(|&(_, x, y)| matches(p.x, p.y, x, y)));

        events
    }

    pub fn reset(&mut self) {
        self.tracked.clear();
        self.pending.clear();
        self.grace_remaining = 0;
    }
}

fn matches(ix: i32, iy: i32, x: i32, y: i32) -> bool {
    (ix - x).abs() < MATCH_DIST && (iy - y).abs() < MATCH_DIST
}
