//! Ganon sprite detection via template matching.
//!
//! Detects the Ganon boss sprite in the D9 game area as a fallback when
//! "-ROAR-" text detection is unreliable. Ganon is a 2x2 NES metatile
//! (32x32 pixels), much larger than item sprites (8x16), with blue
//! (visible) and red (hit-flash) animation-frame templates.
//!
//! Only scans when `screen_type == "dungeon"` and `dungeon_level == 9`,
//! to keep the cost of a full-color sliding match out of every other frame.

use std::path::Path;

use crate::frame::NesFrame;
use crate::image_buf::BgrImage;
use crate::template::{load_png_bgr, match_template_bgr_max};

/// Slightly lower than floor items (0.85): enemy sprites suffer more from
/// stream-compression variance.
const DEFAULT_THRESHOLD: f32 = 0.80;

pub struct GanonDetector {
    templates: Vec<BgrImage>,
    score_threshold: f32,
}

impl GanonDetector {
    pub fn new(templates: Vec<BgrImage>) -> Self {
        Self { templates, score_threshold: DEFAULT_THRESHOLD }
    }

    pub fn with_threshold(templates: Vec<BgrImage>, score_threshold: f32) -> Self {
        Self { templates, score_threshold }
    }

    /// Load every `*.png` in `dir` as a Ganon sprite template. A missing
    /// directory yields an empty detector (never matches) rather than an
    /// error, matching `BinaryShapeMatcher::load_dir`'s degrade-gracefully
    /// behavior.
    pub fn load_dir(dir: impl AsRef<Path>) -> crate::Result<Self> {
        let mut templates = Vec::new();
        let dir = dir.as_ref();
        if dir.is_dir() {
            let mut entries: Vec<_> = walkdir::WalkDir::new(dir)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().map(|ext| ext == "png").unwrap_or(false))
                .collect();
            entries.sort_by_key(|e| e.file_name().to_owned());
            for entry in entries {
                templates.push(load_png_bgr(entry.path())?);
            }
        }
        Ok(Self::new(templates))
    }

    /// Check whether Ganon's sprite is visible in the game area. Only
    /// scans in dungeon 9; returns false immediately otherwise.
    pub fn detect(&self, nf: &NesFrame, screen_type: &str, dungeon_level: u8) -> bool {
        if screen_type != "dungeon" || dungeon_level != 9 {
            return false;
        }
        if self.templates.is_empty() {
            return false;
        }

        let game_area = nf.game_area_canonical();
        self.templates.iter().any(|tmpl| {
            if game_area.height() < tmpl.height() || game_area.width() < tmpl.width() {
                return false;
            }
            match_template_bgr_max(&game_area, tmpl) >= self.score_threshold
        })
    }
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
    fn no_templates_never_detects() {
        let detector = GanonDetector::new(Vec::new());
        let img = BgrImage::new(256, 240);
        let nf = NesFrame::new(img, 0, 0);
        assert!(!detector.detect(&nf, "dungeon", 9));
    }

    #[test]
    fn only_scans_dungeon_level_nine() {
        let tmpl = solid(32, 32, Bgr { b: 184, g: 36, r: 68 });
        let detector = GanonDetector::new(vec![tmpl]);
        let img = BgrImage::new(256, 240);
        let nf = NesFrame::new(img, 0, 0);
        assert!(!detector.detect(&nf, "dungeon", 3));
        assert!(!detector.detect(&nf, "overworld", 9));
    }

    #[test]
    fn detects_matching_sprite_in_game_area() {
        let tmpl = solid(32, 32, Bgr { b: 184, g: 36, r: 68 });
        let detector = GanonDetector::new(vec![tmpl.clone()]);
        let mut img = BgrImage::new(256, 240);
        for y in 64..96 {
            for x in 100..132 {
                img.set(x, y, Bgr { b: 184, g: 36, r: 68 });
            }
        }
        let nf = NesFrame::new(img, 0, 0);
        assert!(detector.detect(&nf, "dungeon", 9));
    }
}
