//! Floor item detection via full-color sliding template matching.
//!
//! Detects item sprites sitting on dungeon/overworld floors at arbitrary
//! positions against textured backgrounds. Color information (rather than
//! the binary shape matching used for HUD slots) discriminates items from
//! wall/door edges that would otherwise confuse a shape-only matcher.
//!
//! A frame-diff guard skips the scan (the expensive part) when the game
//! area hasn't visibly changed since the last call.

use crate::frame::NesFrame;
use crate::image_buf::BgrImage;
use crate::state::FloorItem;
use crate::template::{match_template_bgr_positions, shape_twins, ItemReader};

/// Pixels of border excluded from detections: items sit on the playable
/// interior, not in the outer wall/door tiles.
const WALL_MARGIN: i64 = 16;

/// NMS suppression distance (pixels). Items are 8x16, so detections within
/// this window of an already-kept one are considered duplicates.
const NMS_X_DIST: i64 = 8;
const NMS_Y_DIST: i64 = 16;

/// Minimum change in mean pixel value to consider the frame "different"
/// from the previous one.
const FRAME_DIFF_THRESHOLD: f32 = 0.5;

pub struct FloorItemDetector {
    score_threshold: f32,
    wall_margin: i64,
    prev_game_area: Option<BgrImage>,
    prev_detections: Vec<FloorItem>,
}

impl FloorItemDetector {
    pub fn new(score_threshold: f32) -> Self {
        Self {
            score_threshold,
            wall_margin: WALL_MARGIN,
            prev_game_area: None,
            prev_detections: Vec::new(),
        }
    }

    /// Detect floor items in the NES game area. Only runs on dungeon or
    /// overworld screens; returns an empty list for other screen types or
    /// when the game area is unchanged since the previous call.
    pub fn detect(&mut self, nf: &NesFrame, screen_type: &str, item_reader: &ItemReader) -> Vec<FloorItem> {
        if screen_type != "dungeon" && screen_type != "overworld" {
            self.prev_game_area = None;
            return Vec::new();
        }

        let game_area = nf.game_area_canonical();

        if let Some(prev) = &self.prev_game_area {
            if mean_abs_diff(prev, &game_area) < FRAME_DIFF_THRESHOLD {
                self.prev_game_area = Some(game_area);
                return self.prev_detections.clone();
            }
        }
        self.prev_game_area = Some(game_area.clone());

        let detections = self.scan(&game_area, item_reader);
        self.prev_detections = detections.clone();
        detections
    }

    /// Detect floor items directly on a game_area (256x176 BGR), bypassing
    /// the screen-type check and frame-diff guard. Useful for one-shot runs.
    pub fn detect_game_area(&self, game_area: &BgrImage, item_reader: &ItemReader) -> Vec<FloorItem> {
        self.scan(game_area, item_reader)
    }

    fn scan(&self, game_area: &BgrImage, item_reader: &ItemReader) -> Vec<FloorItem> {
        let (w, h) = (game_area.width() as i64, game_area.height() as i64);
        let margin = self.wall_margin;

        let mut raw: Vec<(String, i64, i64, f32)> = Vec::new();
        for (name, tmpl) in item_reader.templates() {
            let (tw, th) = (tmpl.width() as i64, tmpl.height() as i64);
            if h < th || w < tw {
                continue;
            }
            for (x, y, score) in match_template_bgr_positions(game_area, tmpl, self.score_threshold) {
                if x < margin || x + tw > w - margin || y < margin || y + th > h - margin {
                    continue;
                }
                raw.push((name.clone(), x, y, score));
            }
        }

        let kept = nms(raw, NMS_X_DIST, NMS_Y_DIST);

        kept.into_iter()
            .map(|(name, x, y, score)| {
                let final_name = self.disambiguate(&name, game_area, x, y, item_reader);
                FloorItem { name: final_name, x: x as i32, y: y as i32, score }
            })
            .collect()
    }

    /// Resolve shape twins (e.g. blue_candle vs red_candle) by color.
    fn disambiguate(&self, name: &str, game_area: &BgrImage, x: i64, y: i64, item_reader: &ItemReader) -> String {
        let Some(&(partner, _)) = shape_twins().get(name) else {
            return name.to_string();
        };
        let Some(tmpl) = item_reader.templates().get(name) else {
            return name.to_string();
        };
        let tile = game_area.crop_padded(x, y, tmpl.width(), tmpl.height());
        item_reader.pick_by_color(&tile, name, partner)
    }
}

fn mean_abs_diff(a: &BgrImage, b: &BgrImage) -> f32 {
    if a.width() != b.width() || a.height() != b.height() || a.width() == 0 || a.height() == 0 {
        return f32::MAX;
    }
    let mut sum = 0u64;
    let total = a.width() as u64 * a.height() as u64 * 3;
    for y in 0..a.height() {
        for x in 0..a.width() {
            let pa = a.get(x, y);
            let pb = b.get(x, y);
            sum += pa.b.abs_diff(pb.b) as u64 + pa.g.abs_diff(pb.g) as u64 + pa.r.abs_diff(pb.r) as u64;
        }
    }
    sum as f32 / total as f32
}

/// Non-maximum suppression: keep the highest-scoring detection per location.
fn nms(mut detections: Vec<(String, i64, i64, f32)>, x_dist: i64, y_dist: i64) -> Vec<(String, i64, i64, f32)> {
    detections.sort_by(|a, b| b.3.partial_cmp(&a.3).unwrap_or(std::cmp::Ordering::Equal));
    let mut kept: Vec<(String, i64, i64, f32)> = Vec::new();
    for det in detections {
        let (_, x, y, _) = &det;
        let dup = kept.iter().any(|(_, kx, ky, _)| (x - kx).abs() < x_dist && (y - ky).abs() < y_dist);
        if dup {
            continue;
        }
        kept.push(det);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buf::Bgr;

    fn solid(w: u32, h: u32, px: Bgr) -> BgrImage {
        let mut img = BgrImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                img.set(x, y, px);
            }
        }
        img
    }

    #[test]
    fn mean_abs_diff_zero_for_identical_images() {
        let a = solid(8, 8, Bgr { b: 10, g: 20, r: 30 });
        let b = a.clone();
        assert_eq!(mean_abs_diff(&a, &b), 0.0);
    }

    #[test]
    fn mean_abs_diff_nonzero_for_different_images() {
        let a = solid(8, 8, Bgr { b: 0, g: 0, r: 0 });
        let b = solid(8, 8, Bgr { b: 50, g: 50, r: 50 });
        assert!(mean_abs_diff(&a, &b) > 10.0);
    }

    #[test]
    fn nms_keeps_only_highest_scoring_duplicate() {
        let dets = vec![
            ("bomb".to_string(), 10, 10, 0.9f32),
            ("bomb".to_string(), 12, 11, 0.95f32),
            ("bow".to_string(), 100, 100, 0.88f32),
        ];
        let kept = nms(dets, NMS_X_DIST, NMS_Y_DIST);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().any(|(n, _, _, s)| n == "bomb" && (*s - 0.95).abs() < 1e-6));
        assert!(kept.iter().any(|(n, _, _, _)| n == "bow"));
    }

    #[test]
    fn detect_skips_non_gameplay_screens() {
        let mut detector = FloorItemDetector::new(0.85);
        let img = BgrImage::new(256, 240);
        let nf = NesFrame::new(img, 0, 0);
        let reader = ItemReader::default();
        assert!(detector.detect(&nf, "title", &reader).is_empty());
    }
}
