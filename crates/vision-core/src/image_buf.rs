//! Minimal owned BGR24 pixel buffer shared by every detector.
//!
//! Frames arrive off the wire as packed BGR24 (see `vision-engine`'s stdin
//! reader); this type is the common currency the whole detection pipeline
//! passes around instead of a raw `Vec<u8>` plus width/height.

/// An owned BGR24 image. Row-major, no padding (`stride == width * 3`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrImage {
    width: u32,
    height: u32,
    data: Box<[u8]>,
}

/// A single BGR pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bgr {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

impl Bgr {
    pub const BLACK: Bgr = Bgr { b: 0, g: 0, r: 0 };

    #[inline]
    pub fn max_channel(self) -> u8 {
        self.b.max(self.g).max(self.r)
    }

    #[inline]
    pub fn luma(self) -> f32 {
        0.114 * self.b as f32 + 0.587 * self.g as f32 + 0.299 * self.r as f32
    }
}

impl BgrImage {
    /// Allocate a black image of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 3;
        Self {
            width,
            height,
            data: vec![0u8; len].into_boxed_slice(),
        }
    }

    /// Wrap a pre-filled, tightly packed BGR24 buffer.
    ///
    /// Panics if `data.len() != width * height * 3`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize * 3,
            "BgrImage::from_raw: buffer length does not match width*height*3"
        );
        Self {
            width,
            height,
            data: data.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Bgr {
        if x >= self.width || y >= self.height {
            return Bgr::BLACK;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        Bgr {
            b: self.data[idx],
            g: self.data[idx + 1],
            r: self.data[idx + 2],
        }
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, px: Bgr) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        self.data[idx] = px.b;
        self.data[idx + 1] = px.g;
        self.data[idx + 2] = px.r;
    }

    /// Crop a sub-rectangle, clamped to image bounds. Out-of-bounds area is
    /// padded with black, matching `extract_nes_crop`'s zero-padding.
    pub fn crop_padded(&self, x: i64, y: i64, w: u32, h: u32) -> BgrImage {
        let mut out = BgrImage::new(w, h);
        let sx1 = x.max(0);
        let sy1 = y.max(0);
        let sx2 = (x + w as i64).min(self.width as i64);
        let sy2 = (y + h as i64).min(self.height as i64);
        if sx2 <= sx1 || sy2 <= sy1 {
            return out;
        }
        for sy in sy1..sy2 {
            for sx in sx1..sx2 {
                let px = self.get(sx as u32, sy as u32);
                out.set((sx - x) as u32, (sy - y) as u32, px);
            }
        }
        out
    }

    /// Nearest-neighbor resize, matching `cv2.resize(..., INTER_NEAREST)`.
    pub fn resize_nearest(&self, new_w: u32, new_h: u32) -> BgrImage {
        if new_w == 0 || new_h == 0 {
            return BgrImage::new(new_w, new_h);
        }
        let mut out = BgrImage::new(new_w, new_h);
        for dy in 0..new_h {
            let sy = (dy as u64 * self.height as u64 / new_h as u64) as u32;
            let sy = sy.min(self.height.saturating_sub(1));
            for dx in 0..new_w {
                let sx = (dx as u64 * self.width as u64 / new_w as u64) as u32;
                let sx = sx.min(self.width.saturating_sub(1));
                out.set(dx, dy, self.get(sx, sy));
            }
        }
        out
    }

    /// Mean brightness (per-pixel max-channel average) over the whole image.
    pub fn mean_brightness(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            return 0.0;
        }
        let mut total = 0u64;
        for chunk in self.data.chunks_exact(3) {
            total += chunk[0].max(chunk[1]).max(chunk[2]) as u64;
        }
        total as f32 / (self.width as u64 * self.height as u64) as f32
    }

    /// Mean of the red channel only.
    pub fn mean_red(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            return 0.0;
        }
        let mut total = 0u64;
        for chunk in self.data.chunks_exact(3) {
            total += chunk[2] as u64;
        }
        total as f32 / (self.width as u64 * self.height as u64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_padded_exact_slice_when_in_bounds() {
        let mut img = BgrImage::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                img.set(x, y, Bgr { b: 0, g: 0, r: (x + y * 4) as u8 });
            }
        }
        let cropped = img.crop_padded(1, 1, 2, 2);
        assert_eq!(cropped.get(0, 0), img.get(1, 1));
        assert_eq!(cropped.get(1, 1), img.get(2, 2));
    }

    #[test]
    fn crop_padded_out_of_bounds_is_black() {
        let img = BgrImage::new(4, 4);
        let cropped = img.crop_padded(-2, -2, 4, 4);
        assert_eq!(cropped.get(0, 0), Bgr::BLACK);
        assert_eq!(cropped.get(3, 3), img.get(1, 1));
    }

    #[test]
    fn resize_nearest_identity() {
        let mut img = BgrImage::new(4, 4);
        img.set(2, 2, Bgr { b: 9, g: 8, r: 7 });
        let same = img.resize_nearest(4, 4);
        assert_eq!(same, img);
    }
}
