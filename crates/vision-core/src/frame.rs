//! `NESFrame`: native-resolution NES crop plus the linear mapping back to
//! NES pixel space (256x240), per spec §A.3/§A.4.3.

use crate::image_buf::BgrImage;

/// Wraps one native-resolution crop of the emulator region plus a linear
/// mapping from NES pixel space to the crop's own native pixel space.
///
/// One instance per input frame; immutable once constructed (the grid
/// offset is the sole exception — auto-calibration refines it in place
/// before the rest of the pipeline reads the frame).
#[derive(Debug, Clone)]
pub struct NesFrame {
    crop: BgrImage,
    scale_x: f64,
    scale_y: f64,
    pub grid_dx: u8,
    pub grid_dy: u8,
}

/// NES canonical resolution.
pub const NES_WIDTH: u32 = 256;
pub const NES_HEIGHT: u32 = 240;
/// Row below which the gameplay area begins (above is the HUD strip).
pub const HUD_ROWS: u32 = 64;

impl NesFrame {
    pub fn new(crop: BgrImage, grid_dx: u8, grid_dy: u8) -> Self {
        let scale_x = crop.width() as f64 / NES_WIDTH as f64;
        let scale_y = crop.height() as f64 / NES_HEIGHT as f64;
        Self {
            crop,
            scale_x,
            scale_y,
            grid_dx,
            grid_dy,
        }
    }

    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    pub fn crop(&self) -> &BgrImage {
        &self.crop
    }

    /// Extract a tile/sprite at NES coordinates, resized to (w, h) via
    /// nearest-neighbor. Out-of-bounds source area is zero-padded.
    pub fn extract(&self, nes_x: i64, nes_y: i64, w: u32, h: u32) -> BgrImage {
        let sx = nes_x as f64 * self.scale_x;
        let sy = nes_y as f64 * self.scale_y;
        let sw = w as f64 * self.scale_x;
        let sh = h as f64 * self.scale_y;

        let sx1 = sx.round() as i64;
        let sy1 = sy.round() as i64;
        let sx2 = (sx + sw).round() as i64;
        let sy2 = (sy + sh).round() as i64;

        let region_w = (sx2 - sx1).max(1) as u32;
        let region_h = (sy2 - sy1).max(1) as u32;
        let region = self.crop.crop_padded(sx1, sy1, region_w, region_h);
        region.resize_nearest(w, h)
    }

    /// Extract a grid-aligned 8x8 tile at tile-coord (col, row), applying
    /// the current grid offset.
    pub fn tile(&self, col: i64, row: i64) -> BgrImage {
        let x = col * 8 + self.grid_dx as i64;
        let y = row * 8 + self.grid_dy as i64;
        self.extract(x, y, 8, 8)
    }

    /// Extract a native-resolution region (no resize) — use where pixel
    /// count matters more than tile alignment (brightness/color scans).
    pub fn region(&self, nes_x: i64, nes_y: i64, nes_w: u32, nes_h: u32) -> BgrImage {
        let sx1 = (nes_x as f64 * self.scale_x).round() as i64;
        let sy1 = (nes_y as f64 * self.scale_y).round() as i64;
        let sx2 = ((nes_x + nes_w as i64) as f64 * self.scale_x).round() as i64;
        let sy2 = ((nes_y + nes_h as i64) as f64 * self.scale_y).round() as i64;
        let w = (sx2 - sx1).max(1) as u32;
        let h = (sy2 - sy1).max(1) as u32;
        self.crop.crop_padded(sx1, sy1, w, h)
    }

    /// Below-HUD game area at native resolution (NES rows 64-239).
    pub fn game_area(&self) -> BgrImage {
        let hud_h = (HUD_ROWS as f64 * self.scale_y).round() as i64;
        let h = self.crop.height() as i64 - hud_h;
        self.crop.crop_padded(0, hud_h, self.crop.width(), h.max(0) as u32)
    }

    /// Below-HUD game area resized to canonical 256x176.
    pub fn game_area_canonical(&self) -> BgrImage {
        self.game_area().resize_nearest(256, 240 - HUD_ROWS)
    }

    /// Scale an NES coordinate to native pixels along the given axis.
    pub fn scale_coord_x(&self, nes_val: f64) -> i64 {
        (nes_val * self.scale_x).round() as i64
    }

    pub fn scale_coord_y(&self, nes_val: f64) -> i64 {
        (nes_val * self.scale_y).round() as i64
    }

    /// Resize the whole crop to canonical 256x240, for calibration and
    /// display/debugging only — detectors should use `extract`/`tile`
    /// against the native crop instead.
    pub fn to_canonical(&self) -> BgrImage {
        self.crop.resize_nearest(NES_WIDTH, NES_HEIGHT)
    }
}

/// Extract the NES game region from a full stream frame, given a crop
/// rectangle in stream coordinates. Negative/overflowing crop coordinates
/// are zero-padded rather than erroring.
pub fn extract_nes_crop(stream_frame: &BgrImage, crop_x: i64, crop_y: i64, crop_w: u32, crop_h: u32) -> BgrImage {
    stream_frame.crop_padded(crop_x, crop_y, crop_w, crop_h)
}
