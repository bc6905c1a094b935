//! Overworld/dungeon minimap reading: link's position plus room-visit
//! bookkeeping that persists across frames.
//!
//! This is a richer sibling of [`crate::hud::HudReader::read_minimap_position`]:
//! that method answers "where is the dot right now" for one frame, this
//! module additionally tracks which rooms have been seen in the current
//! dungeon. Room-tile recognition against a catalog of overworld room
//! screenshots (`tile_match_id`/`tile_match_score`, `triforce_room`,
//! `zelda_room`) is out of scope here for the same reason `RoomMatcher` is
//! out of scope in `calibration.rs` (see DESIGN.md Open Questions): it needs
//! an external catalog this pipeline never loads, so those fields are always
//! `None`/`0.0`.

use crate::calibration::bounding_boxes;
use crate::frame::NesFrame;

const MINIMAP_NES_X1: i64 = 16;
const MINIMAP_NES_X2: i64 = 80;
const LEVEL_TEXT_ROW: i64 = 8;
const LEVEL_TEXT_COL_END: i64 = 64;
const LEVEL_TEXT_BRIGHTNESS_MIN: f64 = 140.0;
const DOT_BRIGHTNESS_MIN: f64 = 60.0;
const DOT_THRESHOLD_FRAC: f64 = 0.7;
const DOT_THRESHOLD_FLOOR: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinimapMode {
    Overworld,
    Dungeon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinimapResult {
    /// 1-based column of link's dot, 0 when not found.
    pub col: u8,
    /// 1-based row of link's dot, 0 when not found.
    pub row: u8,
    pub mode: MinimapMode,
    /// Bitmask of minimap cells visited so far in the current dungeon.
    /// Cleared whenever `dungeon_level` changes. Cells beyond bit 15 of the
    /// current dungeon's row-major grid alias onto lower bits; this is a
    /// coarse "has this area been seen" signal, not an exact room catalog.
    pub dungeon_map_rooms: Option<u16>,
    /// Always `None`: requires the overworld room-tile catalog (out of scope).
    pub triforce_room: Option<(u8, u8)>,
    /// Always `None`: requires the overworld room-tile catalog (out of scope).
    pub zelda_room: Option<(u8, u8)>,
    /// Always `None`: requires the overworld room-tile catalog (out of scope).
    pub tile_match_id: Option<u32>,
    /// Always `0.0`: requires the overworld room-tile catalog (out of scope).
    pub tile_match_score: f32,
    /// Encoded player position: 0-127 overworld (16x8), 0-63 dungeon (8x8).
    pub map_position: u16,
}

pub struct MinimapReader {
    minimap_y1: i64,
    minimap_y2: i64,
    last_dungeon_level: u8,
    visited: u16,
}

impl MinimapReader {
    /// `life_row` is the same life-text-row anchor `HudReader::new` takes;
    /// the minimap rows sit at a fixed offset below it.
    pub fn new(life_row: i64) -> Self {
        let dy = life_row - 5;
        Self {
            minimap_y1: (12 + dy * 8).max(0),
            minimap_y2: (52 + dy * 8).max(0),
            last_dungeon_level: 0,
            visited: 0,
        }
    }

    /// Read the minimap for this frame. `dungeon_level` is 0 on the
    /// overworld/non-dungeon screens and 1-9 inside a dungeon; it both
    /// selects the grid shape and resets the visited-room bitmask whenever
    /// it changes (a new dungeon starts with a blank map).
    pub fn read(&mut self, nf: &NesFrame, dungeon_level: u8) -> MinimapResult {
        let is_dungeon = dungeon_level > 0;
        if is_dungeon && dungeon_level != self.last_dungeon_level {
            self.visited = 0;
        }
        self.last_dungeon_level = dungeon_level;

        let mode = if is_dungeon { MinimapMode::Dungeon } else { MinimapMode::Overworld };
        let grid_cols: i64 = if is_dungeon { 8 } else { 16 };

        let (col0, row0) = self.find_dot(nf, grid_cols);

        let dungeon_map_rooms = if is_dungeon {
            if col0 > 0 || row0 > 0 {
                let idx = (row0 as u32 * grid_cols as u32 + col0 as u32) % 16;
                self.visited |= 1u16 << idx;
            }
            Some(self.visited)
        } else {
            None
        };

        let map_position = if col0 == 0 && row0 == 0 {
            0
        } else {
            ((row0 as i64 - 1).max(0) * grid_cols + (col0 as i64 - 1).max(0)) as u16
        };

        MinimapResult {
            col: col0,
            row: row0,
            mode,
            dungeon_map_rooms,
            triforce_room: None,
            zelda_room: None,
            tile_match_id: None,
            tile_match_score: 0.0,
            map_position,
        }
    }

    /// Detect whether a dungeon level-number banner is showing above the
    /// minimap (bright text in the top strip) — a cheap confirmation signal
    /// for mode, independent of `dungeon_level` bookkeeping.
    pub fn detects_level_text(&self, nf: &NesFrame) -> bool {
        let y = LEVEL_TEXT_ROW + nf.grid_dy as i64;
        let region = nf.region(nf.grid_dx as i64, y, LEVEL_TEXT_COL_END as u32, 8);
        if region.width() == 0 || region.height() == 0 {
            return false;
        }
        let mut max_bright = 0f64;
        for y in 0..region.height() {
            for x in 0..region.width() {
                let px = region.get(x, y);
                let g = (px.b as f64 + px.g as f64 + px.r as f64) / 3.0;
                if g > max_bright {
                    max_bright = g;
                }
            }
        }
        max_bright >= LEVEL_TEXT_BRIGHTNESS_MIN
    }

    /// Find link's dot (brightest connected blob) on the minimap, returning
    /// 1-based (col, row), or (0, 0) when nothing bright enough is found.
    fn find_dot(&self, nf: &NesFrame, grid_cols: i64) -> (u8, u8) {
        let x1 = MINIMAP_NES_X1 + nf.grid_dx as i64;
        let x2 = MINIMAP_NES_X2 + nf.grid_dx as i64;
        let y1 = self.minimap_y1 + nf.grid_dy as i64;
        let y2 = self.minimap_y2 + nf.grid_dy as i64;

        let minimap = nf.region(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32);
        if minimap.width() == 0 || minimap.height() == 0 {
            return (0, 0);
        }

        let mut max_bright = 0f64;
        for y in 0..minimap.height() {
            for x in 0..minimap.width() {
                let px = minimap.get(x, y);
                let g = (px.b as f64 + px.g as f64 + px.r as f64) / 3.0;
                if g > max_bright {
                    max_bright = g;
                }
            }
        }
        if max_bright < DOT_BRIGHTNESS_MIN {
            return (0, 0);
        }
        let threshold = (max_bright * DOT_THRESHOLD_FRAC).max(DOT_THRESHOLD_FLOOR);

        let mut mask = vec![false; (minimap.width() * minimap.height()) as usize];
        for y in 0..minimap.height() {
            for x in 0..minimap.width() {
                let px = minimap.get(x, y);
                let g = (px.b as f64 + px.g as f64 + px.r as f64) / 3.0;
                if g > threshold {
                    mask[(y * minimap.width() + x) as usize] = true;
                }
            }
        }

        let components = bounding_boxes(&mask, minimap.width(), minimap.height(), 1.0, f64::MAX);
        let Some(best) = components.iter().max_by_key(|c| c.w as u64 * c.h as u64) else {
            return (0, 0);
        };

        let cell_w = minimap.width() as f64 / grid_cols as f64;
        let cell_h = minimap.height() as f64 / 8.0;
        let cx = best.x as f64 + best.w as f64 / 2.0;
        let cy = best.y as f64 + best.h as f64 / 2.0;
        let col = ((cx / cell_w) as i64 + 1).clamp(1, grid_cols) as u8;
        let row = ((cy / cell_h) as i64 + 1).clamp(1, 8) as u8;
        (col, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buf::{Bgr, BgrImage};

    #[test]
    fn no_dot_returns_zero_position() {
        let img = BgrImage::new(256, 240);
        let nf = NesFrame::new(img, 0, 0);
        let mut reader = MinimapReader::new(29);
        let result = reader.read(&nf, 0);
        assert_eq!(result.col, 0);
        assert_eq!(result.row, 0);
        assert_eq!(result.map_position, 0);
        assert_eq!(result.mode, MinimapMode::Overworld);
    }

    #[test]
    fn finds_bright_dot_on_overworld_minimap() {
        let mut img = BgrImage::new(256, 240);
        // Minimap spans NES x 16..80, y depends on life_row=29 -> dy=24 ->
        // y1 = 12 + 24*8 = 204, within the default 256x240 frame's bottom strip.
        for y in 204..244 {
            for x in 16..80 {
                img.set(x.min(255), y.min(239), Bgr { b: 10, g: 10, r: 10 });
            }
        }
        for y in 210..214 {
            for x in 20..24 {
                img.set(x, y, Bgr { b: 230, g: 230, r: 230 });
            }
        }
        let nf = NesFrame::new(img, 0, 0);
        let mut reader = MinimapReader::new(29);
        let result = reader.read(&nf, 0);
        assert!(result.col >= 1);
        assert!(result.row >= 1);
    }

    #[test]
    fn dungeon_level_change_resets_visited_rooms() {
        let img = BgrImage::new(256, 240);
        let nf = NesFrame::new(img, 0, 0);
        let mut reader = MinimapReader::new(29);
        reader.visited = 0b1111;
        reader.last_dungeon_level = 3;
        let result = reader.read(&nf, 4);
        assert_eq!(result.dungeon_map_rooms, Some(0));
    }

    #[test]
    fn same_dungeon_level_keeps_visited_rooms() {
        let img = BgrImage::new(256, 240);
        let nf = NesFrame::new(img, 0, 0);
        let mut reader = MinimapReader::new(29);
        reader.visited = 0b1010;
        reader.last_dungeon_level = 3;
        let result = reader.read(&nf, 3);
        // No dot found (blank frame), but the pre-existing bits survive.
        assert_eq!(result.dungeon_map_rooms, Some(0b1010));
    }

    #[test]
    fn tile_match_fields_always_empty() {
        let img = BgrImage::new(256, 240);
        let nf = NesFrame::new(img, 0, 0);
        let mut reader = MinimapReader::new(29);
        let result = reader.read(&nf, 0);
        assert_eq!(result.triforce_room, None);
        assert_eq!(result.zelda_room, None);
        assert_eq!(result.tile_match_id, None);
        assert_eq!(result.tile_match_score, 0.0);
    }
}
