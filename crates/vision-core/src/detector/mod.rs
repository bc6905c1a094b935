//! Top-level per-frame orchestrator: wires every sub-detector together into
//! one [`FrameDetector::detect`] call that produces a [`crate::state::GameState`].
//!
//! Grid auto-calibration runs on every frame (rather than once, behind a
//! landmark cache) — this pipeline has no persisted landmark/calibrator
//! state to short-circuit it, so every frame pays the alignment-refinement
//! cost that the original reserves for "standalone, no landmarks" use.

use crate::calibration::find_grid_alignment;
use crate::frame::NesFrame;
use crate::ganon::GanonDetector;
use crate::hud::HudReader;
use crate::inventory_reader::InventoryReader;
use crate::item_detector::ItemDetector;
use crate::floor_item::FloorItemDetector;
use crate::minimap::MinimapReader;
use crate::screen;
use crate::state::GameState;
use crate::template::{DigitReader, ItemReader};
use crate::triforce_reader::TriforceReader;
use crate::Result;

/// Rows sampled when refining the grid offset: (columns, HUD row).
/// Row 5 (bombs) is intentionally excluded — on streams with a 4.5x
/// vertical scale the bomb digit sits 1px lower than the global grid
/// offset predicts, which would pull dy off by one for every other row.
const REFINE_ROW_SPECS: &[(&[i64], i64)] = &[(&[12, 13, 14], 2), (&[8], 1), (&[13], 4)];

pub struct FrameDetector {
    life_row: u8,
    hud_reader: HudReader,
    digit_reader: DigitReader,
    item_reader: ItemReader,
    inventory_reader: InventoryReader,
    triforce_reader: TriforceReader,
    item_detector: ItemDetector,
    floor_item_detector: FloorItemDetector,
    ganon_detector: GanonDetector,
    minimap: MinimapReader,
}

impl FrameDetector {
    pub fn new(template_dir: &str, life_row: u8) -> Result<Self> {
        Ok(Self {
            life_row,
            hud_reader: HudReader::new(life_row as i64),
            digit_reader: DigitReader::load_dir(format!("{template_dir}/digits"))?,
            item_reader: ItemReader::load_dir(format!("{template_dir}/items"), 10)?,
            inventory_reader: InventoryReader::new(),
            triforce_reader: TriforceReader::new(),
            item_detector: ItemDetector::new(),
            floor_item_detector: FloorItemDetector::new(0.85),
            ganon_detector: GanonDetector::load_dir(format!("{template_dir}/enemies"))?,
            minimap: MinimapReader::new(life_row as i64),
        })
    }

    /// Detect full game state from one native-resolution NES crop. Mutates
    /// `nf`'s grid offset in place when auto-calibration finds a better one.
    pub fn detect(&mut self, nf: &mut NesFrame) -> GameState {
        let mut state = GameState::default();

        let canonical = nf.to_canonical();
        if let Some((dx, dy, _)) = find_grid_alignment(&canonical) {
            let canonical_nf = NesFrame::new(canonical, dx, dy);
            let (rdx, rdy) = self.refine_grid(&canonical_nf, dx, dy);
            nf.grid_dx = rdx;
            nf.grid_dy = rdy;
        }

        state.screen_type = screen::classify(nf, self.life_row);

        if !matches!(state.screen_type.as_str(), "overworld" | "dungeon" | "cave") && self.hud_reader.is_hud_present(nf) {
            let game_area = nf.game_area();
            let brightness = game_area.mean_brightness();
            state.screen_type = if brightness < 35.0 {
                "dungeon".to_string()
            } else if brightness < 55.0 {
                "cave".to_string()
            } else {
                "overworld".to_string()
            };
        }

        if matches!(state.screen_type.as_str(), "overworld" | "dungeon" | "cave") && self.hud_reader.is_hud_present(nf) {
            let raw_level = self.hud_reader.read_dungeon_level(nf, &self.digit_reader);
            if raw_level > 0 {
                state.dungeon_level = raw_level;
                state.screen_type = "dungeon".to_string();
            }

            let (hearts_current, hearts_max, has_half_heart) = self.hud_reader.read_hearts(nf);
            state.hearts_current = hearts_current;
            state.hearts_max = hearts_max;
            state.has_half_heart = has_half_heart;

            state.rupees = self.hud_reader.read_rupees(nf, &self.digit_reader);
            let (keys, has_master_key) = self.hud_reader.read_keys(nf, &self.digit_reader);
            state.keys = keys as u8;
            state.has_master_key = has_master_key;
            state.bombs = self.hud_reader.read_bombs(nf, &self.digit_reader) as u8;

            state.sword_level = self.hud_reader.read_sword(nf);
            state.b_item = self.hud_reader.read_b_item(nf, Some(&self.item_reader));

            state.gannon_nearby = self.hud_reader.read_life_roar(nf);
            if !state.gannon_nearby {
                state.gannon_nearby = self.ganon_detector.detect(nf, &state.screen_type, state.dungeon_level);
            }

            let is_dungeon = state.screen_type == "dungeon";
            state.map_position = self.hud_reader.read_minimap_position(nf, is_dungeon);

            let canonical = nf.to_canonical();
            let canonical_nf = NesFrame::new(canonical, nf.grid_dx, nf.grid_dy);
            let minimap_result = self.minimap.read(&canonical_nf, state.dungeon_level);
            state.dungeon_map_rooms = minimap_result.dungeon_map_rooms;
            state.triforce_room = minimap_result.triforce_room;
            state.zelda_room = minimap_result.zelda_room;
            state.tile_match_id = minimap_result.tile_match_id;
            state.tile_match_score = minimap_result.tile_match_score;

            let items = self.item_detector.detect_items(nf, &state.screen_type, Some(&self.item_reader));
            if let Some(best) = items.first() {
                state.detected_item = Some(best.item_type.clone());
                state.detected_item_y = best.y;
            }

            state.floor_items = self.floor_item_detector.detect(nf, &state.screen_type, &self.item_reader);
        }

        if state.screen_type == "subscreen" {
            state.items = self.inventory_reader.read_items(nf);
            state.triforce = self.triforce_reader.read_triforce(nf);
            state.b_item = self.inventory_reader.read_b_item(nf);
        }

        state
    }

    /// Search a +-1 window around `(initial_dx, initial_dy)` for the offset
    /// that maximizes the minimum per-row average digit-match score across
    /// the sampled HUD rows. Using the minimum (rather than mean) prevents
    /// one high-scoring row from masking a row that disagrees.
    fn refine_grid(&self, nf: &NesFrame, initial_dx: u8, initial_dy: u8) -> (u8, u8) {
        let mut best_dx = initial_dx;
        let mut best_dy = initial_dy;
        let mut best_score = -1.0f32;

        let dy_lo = initial_dy.saturating_sub(1);
        let dy_hi = (initial_dy + 2).min(8);

        for candidate_dy in dy_lo..dy_hi {
            for candidate_dx in 0u8..8 {
                let mut row_avgs = Vec::new();
                for &(cols, row) in REFINE_ROW_SPECS {
                    let mut row_total = 0.0f32;
                    let mut row_count = 0u32;
                    for &col in cols {
                        let x = col * 8 + candidate_dx as i64;
                        let y = row * 8 + candidate_dy as i64;
                        if x + 8 > 256 || y + 8 > 240 {
                            continue;
                        }
                        let tile = nf.extract(x, y, 8, 8);
                        if tile.mean_brightness() < 10.0 {
                            continue;
                        }
                        let (_, score) = self.digit_reader.read_digit_with_score(&tile);
                        row_total += score;
                        row_count += 1;
                    }
                    if row_count > 0 {
                        row_avgs.push(row_total / row_count as f32);
                    }
                }
                if row_avgs.is_empty() {
                    continue;
                }
                let quality = row_avgs.iter().cloned().fold(f32::MAX, f32::min);
                if quality > best_score {
                    best_score = quality;
                    best_dx = candidate_dx;
                    best_dy = candidate_dy;
                }
            }
        }
        (best_dx, best_dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buf::BgrImage;

    #[test]
    fn detect_on_blank_frame_reports_unknown() {
        // No template directory: digit/item/ganon readers load empty.
        let mut detector = FrameDetector::new("/nonexistent/templates", 5).expect("empty dirs load gracefully");
        let img = BgrImage::new(256, 240);
        let mut nf = NesFrame::new(img, 0, 0);
        let state = detector.detect(&mut nf);
        assert_eq!(state.screen_type, "unknown");
        assert_eq!(state.hearts_current, 0);
    }
}
