//! Triforce-piece reader for the NES Zelda 1 subscreen.
//!
//! Detects which of the 8 triforce pieces have been collected by scanning
//! for gold/orange pixel clusters above the "-LIFE-" text. The subscreen
//! scroll position varies between captures, so "-LIFE-" is located first
//! and the triforce region is defined relative to it.

use crate::frame::NesFrame;
use crate::image_buf::BgrImage;

const MIN_GOLD_PIXELS: u32 = 15;

const TRIFORCE_Y_OFFSET_MIN: i64 = 45;
const TRIFORCE_Y_OFFSET_MAX: i64 = 100;
const TRIFORCE_X_START: i64 = 85;
const TRIFORCE_X_END: i64 = 170;

const LIFE_TEXT_COL: i64 = 22;
const LIFE_Y_SCAN_START: i64 = 100;
const LIFE_Y_SCAN_END: i64 = 232;

#[derive(Default)]
pub struct TriforceReader {
    last_cluster_centers: Vec<i64>,
}

impl TriforceReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detect which of the 8 triforce pieces (dungeons 1-8) are collected.
    pub fn read_triforce(&mut self, nf: &NesFrame) -> [bool; 8] {
        let Some(life_y) = self.find_life_y(nf) else {
            return [false; 8];
        };

        let y_start = (life_y - TRIFORCE_Y_OFFSET_MAX).max(0);
        let y_end = (life_y - TRIFORCE_Y_OFFSET_MIN).max(0);
        if y_end <= y_start || TRIFORCE_X_END <= TRIFORCE_X_START {
            return [false; 8];
        }

        let region = nf.region(TRIFORCE_X_START, y_start, (TRIFORCE_X_END - TRIFORCE_X_START) as u32, (y_end - y_start) as u32);
        if region.width() == 0 || region.height() == 0 {
            return [false; 8];
        }

        let mut gold_xs: Vec<i64> = Vec::new();
        for y in 0..region.height() {
            for x in 0..region.width() {
                let px = region.get(x, y);
                if is_gold(px.r, px.g, px.b) {
                    gold_xs.push(x as i64);
                }
            }
        }
        if gold_xs.len() < MIN_GOLD_PIXELS as usize {
            return [false; 8];
        }

        gold_xs.sort_unstable();
        let gap_threshold = 8i64.max((8.0 * nf.scale_x()).round() as i64);
        let min_cluster_pixels = 3u32.max((3.0 * nf.scale_x().max(nf.scale_y())).round() as u32);

        let mut clusters = Vec::new();
        let mut cluster_start = gold_xs[0];
        let mut cluster_end = gold_xs[0];
        let mut cluster_count = 1u32;
        for &x in &gold_xs[1..] {
            if x - cluster_end < gap_threshold {
                cluster_end = x;
                cluster_count += 1;
            } else {
                if cluster_count >= min_cluster_pixels {
                    clusters.push((cluster_start + cluster_end) / 2);
                }
                cluster_start = x;
                cluster_end = x;
                cluster_count = 1;
            }
        }
        if cluster_count >= min_cluster_pixels {
            clusters.push((cluster_start + cluster_end) / 2);
        }

        self.last_cluster_centers = clusters.clone();

        let mut result = [false; 8];
        for slot in result.iter_mut().take(clusters.len().min(8)) {
            *slot = true;
        }
        result
    }

    /// Scan down the fixed LIFE-text column for the first row of strong red.
    fn find_life_y(&self, nf: &NesFrame) -> Option<i64> {
        let x = LIFE_TEXT_COL * 8 + nf.grid_dx as i64;
        for y in LIFE_Y_SCAN_START..LIFE_Y_SCAN_END {
            let tile = nf.region(x, y, 8, 1);
            if tile.width() == 0 || tile.height() == 0 {
                continue;
            }
            let (mut r_sum, mut g_sum, mut b_sum) = (0u64, 0u64, 0u64);
            let n = (tile.width() * tile.height()) as u64;
            for py in 0..tile.height() {
                for px in 0..tile.width() {
                    let c = tile.get(px, py);
                    r_sum += c.r as u64;
                    g_sum += c.g as u64;
                    b_sum += c.b as u64;
                }
            }
            let (r, g, b) = (r_sum as f64 / n as f64, g_sum as f64 / n as f64, b_sum as f64 / n as f64);
            if r > 50.0 && r > g * 2.0 && r > b * 2.0 {
                return Some(y);
            }
        }
        None
    }

    pub fn last_cluster_centers(&self) -> &[i64] {
        &self.last_cluster_centers
    }
}

fn is_gold(r: u8, g: u8, b: u8) -> bool {
    r > 150 && g > 80 && b < 70 && r > g
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buf::Bgr;

    fn frame_with_life_and_gold(num_pieces: usize) -> NesFrame {
        let mut img = BgrImage::new(256, 240);
        // "-LIFE-" red tile at the fixed column, y=150.
        let life_x = (22 * 8) as u32;
        for dy in 0..8 {
            for dx in 0..8 {
                img.set(life_x + dx, 150 + dy, Bgr { b: 10, g: 10, r: 180 });
            }
        }
        // Gold clusters above LIFE, spaced well past the gap threshold.
        let y = 150 - 70;
        for i in 0..num_pieces {
            let x0 = TRIFORCE_X_START as u32 + (i as u32) * 10;
            for dx in 0..4u32 {
                for dy in 0..4u32 {
                    img.set(x0 + dx, y as u32 + dy, Bgr { b: 20, g: 120, r: 200 });
                }
            }
        }
        NesFrame::new(img, 0, 0)
    }

    #[test]
    fn no_life_text_returns_all_false() {
        let img = BgrImage::new(256, 240);
        let nf = NesFrame::new(img, 0, 0);
        let mut reader = TriforceReader::new();
        assert_eq!(reader.read_triforce(&nf), [false; 8]);
    }

    #[test]
    fn detects_three_collected_pieces() {
        let nf = frame_with_life_and_gold(3);
        let mut reader = TriforceReader::new();
        let result = reader.read_triforce(&nf);
        assert_eq!(result.iter().filter(|&&b| b).count(), 3);
        assert!(result[0] && result[1] && result[2]);
        assert!(!result[3]);
    }

    #[test]
    fn detects_all_eight_pieces() {
        let nf = frame_with_life_and_gold(8);
        let mut reader = TriforceReader::new();
        let result = reader.read_triforce(&nf);
        assert_eq!(result, [true; 8]);
    }

    #[test]
    fn gold_mask_rejects_non_gold_colors() {
        assert!(!is_gold(100, 100, 100));
        assert!(!is_gold(200, 50, 200));
        assert!(is_gold(200, 130, 30));
    }
}
