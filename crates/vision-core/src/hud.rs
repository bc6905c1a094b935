//! Read heart count, rupees, keys, bombs, sword, B-item and dungeon level
//! from the Zelda 1 HUD (top 64 rows of the 256x240 frame).
//!
//! Every position is expressed as an NES tile (col, row) and extracted
//! through [`NesFrame`], which already applies the grid offset and maps
//! NES pixel coordinates onto the native stream crop. `life_row` shifts
//! every other HUD row by the same amount, since a mis-detected grid
//! anchor shifts the whole HUD uniformly.

use crate::frame::NesFrame;
use crate::image_buf::BgrImage;
use crate::template::{DigitReader, ItemReader};

/// Minimum template-match score considered a confident digit read. Real
/// digits on calibrated streams score ~0.7-0.9; the hex "A" glyph (Z1R
/// Master Key display) matches "0" at ~0.58, below this threshold.
const DIGIT_CONFIDENT_SCORE: f32 = 0.65;

const HEART_START_X: i64 = 176;
const HEART_SPACING: i64 = 8;

const RUPEE_DIGIT_COLS: [i64; 3] = [12, 13, 14];
const KEY_DIGIT_COLS: [i64; 2] = [13, 14];
const BOMB_DIGIT_COLS: [i64; 2] = [13, 14];

const LEVEL_DIGIT_COL: i64 = 8;
const LEVEL_TEXT_COLS: (i64, i64) = (2, 7);

const SWORD_COL: i64 = 19;

const B_ITEM_X: i64 = 128;

const LIFE_TEXT_START_COL: i64 = 22;
const LIFE_CHAR2_COL: i64 = 23;

/// B-slot allowable items; anything else from `ItemReader` is rejected as
/// a misread (e.g. an A-slot-only item bleeding through template noise).
const B_ITEMS: &[&str] = &[
    "boomerang",
    "magical_boomerang",
    "bomb",
    "bow",
    "blue_candle",
    "red_candle",
    "recorder",
    "wand",
    "bait",
    "letter",
    "potion_blue",
    "potion_red",
];

pub struct HudReader {
    life_text_row: i64,
    level_text_row: i64,
    level_digit_row: i64,
    rupee_digit_row: i64,
    key_digit_row: i64,
    bomb_digit_row: i64,
    sword_row: i64,
    heart_row_1: i64,
    heart_row_2: i64,
    b_item_y: i64,
    minimap_y1: i64,
    minimap_y2: i64,
}

impl HudReader {
    /// `life_row` is the tile row where "-LIFE-" actually appears in the
    /// canonical frame (standard is 5; crop/overscan differences can shift
    /// it to 3-6). Every other HUD position shifts by the same amount.
    pub fn new(life_row: i64) -> Self {
        let shift = life_row - 5;
        Self {
            life_text_row: 5 + shift,
            level_text_row: 1 + shift,
            level_digit_row: 1 + shift,
            rupee_digit_row: 2 + shift,
            key_digit_row: 4 + shift,
            bomb_digit_row: 5 + shift,
            sword_row: 3 + shift,
            heart_row_1: 32 + shift * 8,
            heart_row_2: 40 + shift * 8,
            b_item_y: 16 + shift * 8,
            minimap_y1: 12 + shift * 8,
            minimap_y2: 52 + shift * 8,
        }
    }

    /// Check if the Zelda HUD is present by looking for "-LIFE-" red text.
    /// Guards against misclassified screens (ROM menus, title cards) that
    /// slip past the screen classifier and would produce garbage readings.
    pub fn is_hud_present(&self, nf: &NesFrame) -> bool {
        let tile = nf.tile(LIFE_TEXT_START_COL, self.life_text_row);
        let (r, g, b) = mean_rgb(&tile);
        r > 50.0 && r > g * 2.0 && r > b * 2.0
    }

    /// Read heart count. Returns (current, max, has_half_heart).
    pub fn read_hearts(&self, nf: &NesFrame) -> (u8, u8, bool) {
        let row1_y = self.heart_row_1;
        let row2_y = self.heart_row_2;

        let mut rows = [(0u8, 0u8, false); 2];
        for (slot, &row_y) in [row1_y, row2_y].iter().enumerate() {
            let mut current = 0u8;
            let mut max_hearts = 0u8;
            let mut has_half = false;
            for i in 0..8i64 {
                let x = HEART_START_X + i * HEART_SPACING;
                if x + 8 > 256 {
                    break;
                }
                let tile = nf.extract(x + nf.grid_dx as i64, row_y + nf.grid_dy as i64, 8, 8);
                let red_ratio = red_ratio(&tile);
                if red_ratio > 0.4 {
                    current += 1;
                    max_hearts += 1;
                } else if red_ratio > 0.1 {
                    has_half = true;
                    max_hearts += 1;
                } else if has_heart_outline(&tile) {
                    max_hearts += 1;
                } else {
                    break;
                }
            }
            rows[slot] = (current, max_hearts, has_half);
        }

        let (r1_cur, r1_max, r1_half) = rows[0];
        let (r2_cur, r2_max, r2_half) = rows[1];

        // Row-dedup: when the bottom row reports more current hearts than the
        // top row, the top row is a distorted duplicate of the bottom row
        // (extreme vertical stretch). Use the bottom row alone, carrying
        // forward any empty-container slots the top row saw that the bottom
        // row doesn't (partial containers that collapsed into full ones).
        if r2_cur > r1_cur {
            if r1_max == r1_cur {
                return (r2_cur, r2_max, r2_half);
            }
            let extra_empties = r1_max - r1_cur;
            return (r2_cur, r2_max + extra_empties, r2_half);
        }
        (r1_cur + r2_cur, r1_max + r2_max, r1_half || r2_half)
    }

    /// Read rupee count from HUD digits. Z1R caps rupees at 255; values
    /// above indicate the hundreds tile captured part of the adjacent
    /// rupee icon, producing a false leading digit, so it's dropped.
    pub fn read_rupees(&self, nf: &NesFrame, digit_reader: &DigitReader) -> u16 {
        let value = self.read_counter_tiles(nf, digit_reader, &RUPEE_DIGIT_COLS, self.rupee_digit_row, 0, 0.5);
        if value > 255 {
            value % 100
        } else {
            value
        }
    }

    /// Read key count and master-key status. When the tile shows "A"
    /// instead of a digit, `has_master_key` is true and `key_count` is 0.
    pub fn read_keys(&self, nf: &NesFrame, digit_reader: &DigitReader) -> (u16, bool) {
        let first_tile = nf.tile(KEY_DIGIT_COLS[0], self.key_digit_row);
        let (first_d, first_score) = digit_reader.read_digit_with_score(&first_tile);

        // dy+1 fallback: non-integer vertical scale can offset a row by 1px.
        // Before declaring Master Key, check whether shifting +1 gives a
        // confident read; if so, use that offset for the counter too.
        let mut dy_adj = 0i64;
        let mut first_d = first_d;
        let mut first_score = first_score;
        let mut first_tile = first_tile;
        if (first_d.is_none() || first_score < DIGIT_CONFIDENT_SCORE)
            && first_tile.mean_brightness() > 20.0
        {
            let y = self.key_digit_row * 8 + nf.grid_dy as i64 + 1;
            if y + 8 <= 240 {
                let adj_tile = nf.extract(KEY_DIGIT_COLS[0] * 8 + nf.grid_dx as i64, y, 8, 8);
                let (adj_d, adj_score) = digit_reader.read_digit_with_score(&adj_tile);
                if adj_score > first_score {
                    first_tile = adj_tile;
                    first_d = adj_d;
                    first_score = adj_score;
                    dy_adj = 1;
                }
            }
        }

        if (first_d.is_none() || first_score < DIGIT_CONFIDENT_SCORE) && first_tile.mean_brightness() > 20.0 {
            return (0, true);
        }

        let count = self.read_counter_tiles(nf, digit_reader, &KEY_DIGIT_COLS, self.key_digit_row, dy_adj, 0.5);
        (count, false)
    }

    /// Read bomb count. The bomb row can sit 1px below the global grid
    /// offset on streams with a non-integer vertical scale; retry at dy+1
    /// when the primary read is unconfident.
    pub fn read_bombs(&self, nf: &NesFrame, digit_reader: &DigitReader) -> u16 {
        let y = self.bomb_digit_row * 8 + nf.grid_dy as i64;
        let primary_tile = nf.extract(BOMB_DIGIT_COLS[0] * 8 + nf.grid_dx as i64, y, 8, 8);
        let (_, primary_score) = digit_reader.read_digit_with_score(&primary_tile);
        let mut dy_adj = 0i64;
        if primary_score < DIGIT_CONFIDENT_SCORE && primary_tile.mean_brightness() > 20.0 && y + 1 + 8 <= 240 {
            dy_adj = 1;
        }
        self.read_counter_tiles(nf, digit_reader, &BOMB_DIGIT_COLS, self.bomb_digit_row, dy_adj, 0.35)
    }

    /// Read dungeon level (1-9) from the LEVEL-X text; 0 if not in a
    /// dungeon (brightness/white-pixel guards reject the overworld
    /// minimap, which sits in the same pixel region but is dimmer/greyer).
    pub fn read_dungeon_level(&self, nf: &NesFrame, digit_reader: &DigitReader) -> u8 {
        let (start_col, end_col) = LEVEL_TEXT_COLS;
        let rw = ((end_col + 1 - start_col) * 8) as u32;
        let text_region = nf.region(
            start_col * 8 + nf.grid_dx as i64,
            self.level_text_row * 8 + nf.grid_dy as i64,
            rw,
            8,
        );
        if text_region.mean_brightness() < 50.0 {
            return 0;
        }
        if white_ratio(&text_region) < 0.15 {
            return 0;
        }

        let digit_tile = nf.tile(LEVEL_DIGIT_COL, self.level_digit_row);
        let (result, score) = digit_reader.read_digit_with_score(&digit_tile);
        match result {
            Some(d) if (1..=9).contains(&d) && score >= 0.3 => d,
            _ => 0,
        }
    }

    /// Read sword level from the HUD A-slot sword indicator.
    /// 0 = none, 1 = wood, 2 = white, 3 = magical.
    pub fn read_sword(&self, nf: &NesFrame) -> u8 {
        let tile = nf.tile(SWORD_COL, self.sword_row);
        if tile.mean_brightness() < 15.0 {
            return 0;
        }
        let (r, g, b) = mean_rgb(&tile);
        let brightness = (r + g + b) / 3.0;
        if b > r + 20.0 {
            3
        } else if brightness > 160.0 {
            2
        } else {
            1
        }
    }

    /// Read the B-item sprite. Prefers template matching via `item_reader`
    /// restricted to the B-slot-allowable set, falling back to a color
    /// heuristic when no reader is available or nothing matched.
    pub fn read_b_item(&self, nf: &NesFrame, item_reader: Option<&ItemReader>) -> Option<String> {
        let x = B_ITEM_X + nf.grid_dx as i64;
        let y = self.b_item_y + nf.grid_dy as i64;
        // Extract a region larger than the 8x16 sprite for sliding template
        // match: 2px of horizontal slide room while keeping the right blue
        // HUD border (starts ~12px from B_ITEM_X) out of the color analysis.
        let region = nf.extract(x, y, 10, 24);
        if region.mean_brightness() < 10.0 {
            return None;
        }

        if let Some(reader) = item_reader {
            if reader.has_templates() {
                if let Some(name) = reader.read_item(&region, &[]) {
                    if B_ITEMS.contains(&name.as_str()) {
                        return Some(name);
                    }
                }
            }
        }

        let (ch, cw) = (region.height(), region.width());
        if ch < 16 || cw < 8 {
            return None;
        }
        let cx = (cw - 8) / 2;
        let cy = (ch - 16) / 2;
        let tile = region.crop_padded(cx as i64, cy as i64, 8, 16);
        if tile.mean_brightness() < 15.0 {
            return None;
        }
        let (r, g, b) = mean_rgb(&tile);
        let brightness = (r + g + b) / 3.0;
        if r > b + 30.0 && r > g + 30.0 {
            Some("candle".to_string())
        } else if b > r + 30.0 && b > g + 30.0 {
            Some("boomerang".to_string())
        } else if g > r + 20.0 && g > b + 20.0 {
            Some("recorder".to_string())
        } else if brightness > 150.0 && (r - g).abs() < 20.0 && (r - b).abs() < 20.0 {
            Some("bow".to_string())
        } else if brightness > 60.0 {
            Some("unknown".to_string())
        } else {
            None
        }
    }

    /// Detect whether the HUD shows "-ROAR-" instead of "-LIFE-" (Gannon
    /// nearby). The second character ("I" in LIFE, narrow; "O" in ROAR,
    /// wide) is distinguished by how concentrated its bright columns are.
    pub fn read_life_roar(&self, nf: &NesFrame) -> bool {
        let text_tile = nf.tile(LIFE_TEXT_START_COL, self.life_text_row);
        let (r, g, b) = mean_rgb(&text_tile);
        if r < 50.0 || r < g * 2.0 || r < b * 2.0 {
            return false;
        }

        let tile = nf.tile(LIFE_CHAR2_COL, self.life_text_row);
        if tile.mean_brightness() < 15.0 {
            return false;
        }
        let mut col_sums = [0f64; 8];
        for x in 0..tile.width().min(8) {
            let mut count = 0f64;
            for y in 0..tile.height() {
                let px = tile.get(x, y);
                let bright = (px.b as f64 + px.g as f64 + px.r as f64) / 3.0;
                if bright > 40.0 {
                    count += 1.0;
                }
            }
            col_sums[x as usize] = count;
        }
        let total = col_sums.iter().sum::<f64>().max(1.0);
        let center: f64 = col_sums[2..6].iter().sum();
        (center / total) < 0.55
    }

    /// Read player position from the minimap dot. Overworld returns 0-127
    /// (16 cols x 8 rows); dungeon returns 0-63 (8 cols x 8 rows).
    pub fn read_minimap_position(&self, nf: &NesFrame, is_dungeon: bool) -> u16 {
        let grid_cols: i64 = if is_dungeon { 8 } else { 16 };
        let x1 = 16i64 + nf.grid_dx as i64;
        let x2 = 80i64 + nf.grid_dx as i64;
        let y1 = self.minimap_y1 + nf.grid_dy as i64;
        let y2 = self.minimap_y2 + nf.grid_dy as i64;

        let minimap = nf.region(x1, y1, (x2 - x1) as u32, (y2 - y1) as u32);
        if minimap.width() == 0 || minimap.height() == 0 {
            return 0;
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
        if max_bright < 60.0 {
            return 0;
        }
        let threshold = (max_bright * 0.7).max(50.0);

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

        let components = crate::calibration::bounding_boxes(&mask, minimap.width(), minimap.height(), 1.0, f64::MAX);
        let Some(best) = components
            .iter()
            .max_by_key(|c| c.w as u64 * c.h as u64)
        else {
            return 0;
        };

        let center_x = best.x as f64 + best.w as f64 / 2.0;
        let center_y = best.y as f64 + best.h as f64 / 2.0;

        let map_w = (x2 - x1) as f64;
        let map_h = (y2 - y1) as f64;
        let col = ((center_x / map_w * grid_cols as f64) as i64).clamp(0, grid_cols - 1);
        let row = ((center_y / map_h * 8.0) as i64).clamp(0, 7);

        (row * grid_cols + col) as u16
    }

    /// Read a multi-digit counter across grid-aligned tile columns.
    /// `dy_adj` offsets the extraction by that many NES pixels relative to
    /// the baseline row, used when a row is known to sit 1px off-grid.
    fn read_counter_tiles(
        &self,
        nf: &NesFrame,
        digit_reader: &DigitReader,
        cols: &[i64],
        row: i64,
        dy_adj: i64,
        min_score: f32,
    ) -> u16 {
        let mut digits = Vec::new();
        for &col in cols {
            let tile = if dy_adj != 0 {
                nf.extract(col * 8 + nf.grid_dx as i64, row * 8 + nf.grid_dy as i64 + dy_adj, 8, 8)
            } else {
                nf.tile(col, row)
            };
            if tile.mean_brightness() < 10.0 {
                continue;
            }
            let (d, score) = digit_reader.read_digit_with_score(&tile);
            if let Some(d) = d {
                if score >= min_score {
                    digits.push(d);
                }
            }
        }
        if digits.is_empty() {
            return 0;
        }
        digits.iter().fold(0u16, |acc, &d| acc * 10 + d as u16)
    }
}

fn mean_rgb(tile: &BgrImage) -> (f64, f64, f64) {
    let total = tile.width() as u64 * tile.height() as u64;
    if total == 0 {
        return (0.0, 0.0, 0.0);
    }
    let (mut sr, mut sg, mut sb) = (0u64, 0u64, 0u64);
    for y in 0..tile.height() {
        for x in 0..tile.width() {
            let px = tile.get(x, y);
            sr += px.r as u64;
            sg += px.g as u64;
            sb += px.b as u64;
        }
    }
    (sr as f64 / total as f64, sg as f64 / total as f64, sb as f64 / total as f64)
}

/// Fraction of red-dominant pixels (R>100, R>G*1.5, R>B*1.5).
fn red_ratio(tile: &BgrImage) -> f64 {
    if tile.width() == 0 || tile.height() == 0 {
        return 0.0;
    }
    let mut count = 0u64;
    let total = tile.width() as u64 * tile.height() as u64;
    for y in 0..tile.height() {
        for x in 0..tile.width() {
            let px = tile.get(x, y);
            let (r, g, b) = (px.r as f64, px.g as f64, px.b as f64);
            if r > 100.0 && r > g * 1.5 && r > b * 1.5 {
                count += 1;
            }
        }
    }
    count as f64 / total as f64
}

/// Heart container outline: bright but not red (empty heart slot).
fn has_heart_outline(tile: &BgrImage) -> bool {
    tile.mean_brightness() as f64 > 40.0 && red_ratio(tile) < 0.1
}

/// White-text ratio using an HSV-equivalent test (V>180, S<40) so that the
/// overworld minimap's medium-grey fill doesn't get counted as LEVEL text.
fn white_ratio(tile: &BgrImage) -> f64 {
    if tile.width() == 0 || tile.height() == 0 {
        return 0.0;
    }
    let mut count = 0u64;
    let total = tile.width() as u64 * tile.height() as u64;
    for y in 0..tile.height() {
        for x in 0..tile.width() {
            let px = tile.get(x, y);
            let (r, g, b) = (px.r as f64, px.g as f64, px.b as f64);
            let max_c = r.max(g).max(b);
            let min_c = r.min(g).min(b);
            let v = max_c;
            let s = if max_c > 0.0 { (max_c - min_c) / max_c * 255.0 } else { 0.0 };
            if v > 180.0 && s < 40.0 {
                count += 1;
            }
        }
    }
    count as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buf::Bgr;

    fn make_frame() -> (BgrImage, NesFrame) {
        let img = BgrImage::new(256, 240);
        (img.clone(), NesFrame::new(img, 0, 0))
    }

    #[test]
    fn is_hud_present_detects_red_life_text() {
        let (mut img, _) = make_frame();
        for y in 40..48 {
            for x in 176..184 {
                img.set(x, y, Bgr { b: 0, g: 0, r: 200 });
            }
        }
        let nf = NesFrame::new(img, 0, 0);
        let reader = HudReader::new(5);
        assert!(reader.is_hud_present(&nf));
    }

    #[test]
    fn is_hud_present_false_on_black_frame() {
        let (_, nf) = make_frame();
        let reader = HudReader::new(5);
        assert!(!reader.is_hud_present(&nf));
    }

    #[test]
    fn read_hearts_counts_full_hearts() {
        let (mut img, _) = make_frame();
        for i in 0..3i64 {
            let x0 = (HEART_START_X + i * HEART_SPACING) as u32;
            for y in 32..40 {
                for x in x0..x0 + 8 {
                    img.set(x, y, Bgr { b: 0, g: 0, r: 200 });
                }
            }
        }
        let nf = NesFrame::new(img, 0, 0);
        let reader = HudReader::new(5);
        let (current, max_hearts, half) = reader.read_hearts(&nf);
        assert_eq!(current, 3);
        assert_eq!(max_hearts, 3);
        assert!(!half);
    }

    #[test]
    fn read_sword_detects_magical_by_blue_dominance() {
        let (mut img, _) = make_frame();
        let x0 = (SWORD_COL * 8) as u32;
        let y0 = 24u32;
        for y in y0..y0 + 8 {
            for x in x0..x0 + 8 {
                img.set(x, y, Bgr { b: 200, g: 100, r: 50 });
            }
        }
        let nf = NesFrame::new(img, 0, 0);
        let reader = HudReader::new(5);
        assert_eq!(reader.read_sword(&nf), 3);
    }

    #[test]
    fn read_sword_no_sword_on_dark_tile() {
        let (_, nf) = make_frame();
        let reader = HudReader::new(5);
        assert_eq!(reader.read_sword(&nf), 0);
    }

    #[test]
    fn life_row_shift_moves_all_hud_rows() {
        let reader = HudReader::new(3);
        assert_eq!(reader.life_text_row, 3);
        assert_eq!(reader.heart_row_1, 16);
        assert_eq!(reader.sword_row, 1);
    }
}
