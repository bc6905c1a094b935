//! Color matching and utility functions, ported from the NES palette helper
//! module. The NES has a fixed 64-color palette; Zelda 1 uses specific
//! entries for hearts, items, terrain. These helpers match pixels against
//! approximate BGR references with an Euclidean-distance tolerance, to
//! absorb analog-capture / re-encode variance.

use crate::image_buf::{Bgr, BgrImage};

/// Approximate BGR values for NES colors commonly referenced by the Zelda 1
/// detectors.
pub mod nes_colors {
    use crate::image_buf::Bgr;

    pub const BLACK: Bgr = Bgr { b: 0, g: 0, r: 0 };
    pub const WHITE: Bgr = Bgr { b: 255, g: 255, r: 255 };
    /// Heart red.
    pub const RED: Bgr = Bgr { b: 68, g: 36, r: 184 };
    /// Blue ring / candle.
    pub const BLUE: Bgr = Bgr { b: 184, g: 68, r: 0 };
    /// Overworld green.
    pub const GREEN: Bgr = Bgr { b: 0, g: 168, r: 0 };
    /// Triforce gold.
    pub const GOLD: Bgr = Bgr { b: 0, g: 168, r: 216 };
    /// Dungeon walls.
    pub const BROWN: Bgr = Bgr { b: 0, g: 80, r: 120 };
    /// Dungeon floors.
    pub const DARK_BLUE: Bgr = Bgr { b: 100, g: 24, r: 0 };
}

/// Euclidean distance between two BGR pixel values.
#[inline]
pub fn color_distance(pixel: Bgr, reference: Bgr) -> f64 {
    let db = pixel.b as f64 - reference.b as f64;
    let dg = pixel.g as f64 - reference.g as f64;
    let dr = pixel.r as f64 - reference.r as f64;
    (db * db + dg * dg + dr * dr).sqrt()
}

/// Ratio of pixels in `tile` matching `reference` within `tolerance`
/// (Euclidean BGR distance). Returns 0.0 for an empty tile.
pub fn color_ratio(tile: &BgrImage, reference: Bgr, tolerance: f64) -> f64 {
    let total = tile.width() as u64 * tile.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let mut matches = 0u64;
    for y in 0..tile.height() {
        for x in 0..tile.width() {
            if color_distance(tile.get(x, y), reference) < tolerance {
                matches += 1;
            }
        }
    }
    matches as f64 / total as f64
}

/// Default tolerance used by `color_ratio` call-sites that don't specify
/// their own — matches the original's `tolerance: float = 40.0` default.
pub const DEFAULT_TOLERANCE: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DominantChannel {
    Blue,
    Green,
    Red,
}

/// Which BGR channel has the highest mean over the tile.
pub fn dominant_channel(tile: &BgrImage) -> DominantChannel {
    let (mut sb, mut sg, mut sr) = (0u64, 0u64, 0u64);
    for y in 0..tile.height() {
        for x in 0..tile.width() {
            let px = tile.get(x, y);
            sb += px.b as u64;
            sg += px.g as u64;
            sr += px.r as u64;
        }
    }
    if sr >= sb && sr >= sg {
        DominantChannel::Red
    } else if sb >= sg {
        DominantChannel::Blue
    } else {
        DominantChannel::Green
    }
}

/// Average BGR color of a tile. Returns black for an empty tile.
pub fn average_color(tile: &BgrImage) -> Bgr {
    let total = tile.width() as u64 * tile.height() as u64;
    if total == 0 {
        return Bgr::BLACK;
    }
    let (mut sb, mut sg, mut sr) = (0u64, 0u64, 0u64);
    for y in 0..tile.height() {
        for x in 0..tile.width() {
            let px = tile.get(x, y);
            sb += px.b as u64;
            sg += px.g as u64;
            sr += px.r as u64;
        }
    }
    Bgr {
        b: (sb / total) as u8,
        g: (sg / total) as u8,
        r: (sr / total) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_ratio_all_match() {
        let mut img = BgrImage::new(2, 2);
        for y in 0..2 {
            for x in 0..2 {
                img.set(x, y, nes_colors::RED);
            }
        }
        assert_eq!(color_ratio(&img, nes_colors::RED, DEFAULT_TOLERANCE), 1.0);
    }

    #[test]
    fn color_ratio_empty_tile_is_zero() {
        let img = BgrImage::new(0, 0);
        assert_eq!(color_ratio(&img, nes_colors::RED, DEFAULT_TOLERANCE), 0.0);
    }

    #[test]
    fn dominant_channel_picks_red() {
        let mut img = BgrImage::new(1, 1);
        img.set(0, 0, Bgr { b: 10, g: 10, r: 200 });
        assert_eq!(dominant_channel(&img), DominantChannel::Red);
    }
}
