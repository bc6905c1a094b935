//! Inventory reader for the NES Zelda 1 subscreen (Select-button screen).
//!
//! Reads fixed-position item slots, sword level, and the HUD B-item. Unlike
//! gameplay-screen readers, subscreen slot positions are NOT grid-shifted —
//! the subscreen layout is fixed regardless of auto-crop grid alignment.
//!
//! Z1R (a popular randomizer) replaces the vanilla item grid with a "SWAP"
//! interface showing only the B-item selector and triforce display; when
//! that layout is detected, [`InventoryReader::read_items`] returns an empty
//! map rather than garbage slot reads.

use std::collections::HashMap;

use crate::color::dominant_channel;
use crate::color::DominantChannel;
use crate::frame::NesFrame;
use crate::image_buf::BgrImage;

/// (y, x, h, w) in NES pixel space.
type SlotRect = (i64, i64, u32, u32);

const ACTIVE_ITEM_SLOTS: &[(&str, SlotRect)] = &[
    ("boomerang", (72, 128, 8, 8)),
    ("bombs", (72, 152, 8, 8)),
    ("bow", (72, 176, 8, 8)),
    ("candle", (72, 200, 8, 8)),
    ("recorder", (88, 128, 8, 8)),
    ("food", (88, 152, 8, 8)),
    ("potion", (88, 176, 8, 8)),
    ("magic_rod", (88, 200, 8, 8)),
];

const PASSIVE_ITEM_SLOTS: &[(&str, SlotRect)] = &[
    ("raft", (112, 128, 8, 8)),
    ("book", (112, 144, 8, 8)),
    ("ring", (112, 160, 8, 8)),
    ("ladder", (112, 176, 8, 8)),
    ("magic_key", (112, 192, 8, 8)),
    ("power_bracelet", (112, 208, 8, 8)),
];

const SWORD_REGION: SlotRect = (24, 152, 8, 8);
const B_ITEM_REGION: SlotRect = (16, 128, 16, 16);

const EMPTY_THRESHOLD: f64 = 15.0;

#[derive(Default)]
pub struct InventoryReader;

impl InventoryReader {
    pub fn new() -> Self {
        Self
    }

    /// Read all inventory item slots. Returns an empty map for a detected
    /// Z1R SWAP layout.
    pub fn read_items(&self, nf: &NesFrame) -> HashMap<String, bool> {
        if self.is_z1r_swap(nf) {
            return HashMap::new();
        }

        let mut items = HashMap::new();
        for &(name, (y, x, h, w)) in ACTIVE_ITEM_SLOTS.iter().chain(PASSIVE_ITEM_SLOTS.iter()) {
            let tile = nf.extract(x, y, w, h);
            items.insert(name.to_string(), tile_occupied(&tile));
        }

        self.detect_upgrades(nf, &mut items);
        items
    }

    /// Detect the Z1R SWAP subscreen layout: red "SWAP" text near the top,
    /// or a partial-scroll frame where a dark subscreen top overlaps a
    /// still-bright game-area bottom.
    fn is_z1r_swap(&self, nf: &NesFrame) -> bool {
        let region = nf.region(24, 0, 48, 40);
        if region.width() > 0 && region.height() > 0 {
            let mut red_count = 0u32;
            for y in 0..region.height() {
                for x in 0..region.width() {
                    let px = region.get(x, y);
                    let (r, g, b) = (px.r as f64, px.g as f64, px.b as f64);
                    if r > 50.0 && r > g * 2.0 && r > b * 2.0 {
                        red_count += 1;
                    }
                }
            }
            if red_count >= 10 {
                return true;
            }
        }

        let top_region = nf.region(0, 0, 256, 60);
        let bot_region = nf.region(0, 160, 256, 60);
        if top_region.width() > 0 && bot_region.width() > 0 {
            let top_bright = top_region.mean_brightness();
            let bottom_bright = bot_region.mean_brightness();
            if top_bright < 30.0 && bottom_bright > 80.0 {
                return true;
            }
        }

        false
    }

    /// Detect sword level from the HUD sword indicator.
    /// 0 = no sword, 1 = wood, 2 = white, 3 = magical.
    pub fn read_sword_level(&self, nf: &NesFrame) -> u8 {
        let (y, x, h, w) = SWORD_REGION;
        let tile = nf.extract(x, y, w, h);
        if !tile_occupied(&tile) {
            return 0;
        }

        let avg = crate::color::average_color(&tile);
        let brightness = (avg.b as f64 + avg.g as f64 + avg.r as f64) / 3.0;

        if avg.b as f64 > avg.r as f64 + 20.0 {
            return 3;
        }
        if brightness > 160.0 {
            return 2;
        }
        1
    }

    /// Detect the currently selected B-item from the HUD, by dominant color.
    pub fn read_b_item(&self, nf: &NesFrame) -> Option<String> {
        let (y, x, h, w) = B_ITEM_REGION;
        let tile = nf.extract(x, y, w, h);
        if !tile_occupied(&tile) {
            return None;
        }

        match dominant_channel(&tile) {
            DominantChannel::Red => Some("candle".to_string()),
            DominantChannel::Blue => Some("boomerang".to_string()),
            DominantChannel::Green => Some("recorder".to_string()),
        }
    }

    /// Resolve in-place item upgrades (color-coded, not a separate slot):
    /// boomerang -> magic boomerang, blue candle -> red candle,
    /// letter -> blue/red potion, blue ring -> red ring.
    fn detect_upgrades(&self, nf: &NesFrame, items: &mut HashMap<String, bool>) {
        if items.get("boomerang").copied().unwrap_or(false) {
            let (y, x, h, w) = slot(ACTIVE_ITEM_SLOTS, "boomerang");
            let tile = nf.extract(x, y, w, h);
            if dominant_channel(&tile) == DominantChannel::Red {
                items.insert("boomerang".to_string(), false);
                items.insert("magic_boomerang".to_string(), true);
            } else {
                items.insert("magic_boomerang".to_string(), false);
            }
        }

        if items.get("candle").copied().unwrap_or(false) {
            let (y, x, h, w) = slot(ACTIVE_ITEM_SLOTS, "candle");
            let tile = nf.extract(x, y, w, h);
            if dominant_channel(&tile) == DominantChannel::Red {
                items.insert("red_candle".to_string(), true);
                items.insert("blue_candle".to_string(), false);
            } else {
                items.insert("blue_candle".to_string(), true);
                items.insert("red_candle".to_string(), false);
            }
        }

        if items.get("potion").copied().unwrap_or(false) {
            let (y, x, h, w) = slot(ACTIVE_ITEM_SLOTS, "potion");
            let tile = nf.extract(x, y, w, h);
            match dominant_channel(&tile) {
                DominantChannel::Red => {
                    items.insert("red_potion".to_string(), true);
                    items.insert("blue_potion".to_string(), false);
                    items.insert("letter".to_string(), false);
                }
                DominantChannel::Blue => {
                    items.insert("blue_potion".to_string(), true);
                    items.insert("red_potion".to_string(), false);
                    items.insert("letter".to_string(), false);
                }
                DominantChannel::Green => {
                    items.insert("letter".to_string(), true);
                    items.insert("blue_potion".to_string(), false);
                    items.insert("red_potion".to_string(), false);
                }
            }
        }

        if items.get("ring").copied().unwrap_or(false) {
            let (y, x, h, w) = slot(PASSIVE_ITEM_SLOTS, "ring");
            let tile = nf.extract(x, y, w, h);
            if dominant_channel(&tile) == DominantChannel::Red {
                items.insert("red_ring".to_string(), true);
                items.insert("blue_ring".to_string(), false);
            } else {
                items.insert("blue_ring".to_string(), true);
                items.insert("red_ring".to_string(), false);
            }
        }
    }
}

fn slot(slots: &[(&str, SlotRect)], name: &str) -> SlotRect {
    slots.iter().find(|&&(n, _)| n == name).map(|&(_, r)| r).unwrap_or((0, 0, 0, 0))
}

fn tile_occupied(tile: &BgrImage) -> bool {
    tile.mean_brightness() > EMPTY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buf::Bgr;

    fn fill(nf_img: &mut BgrImage, x: i64, y: i64, w: u32, h: u32, px: Bgr) {
        for dy in 0..h as i64 {
            for dx in 0..w as i64 {
                let (px_, py_) = (x + dx, y + dy);
                if px_ >= 0 && py_ >= 0 && (px_ as u32) < nf_img.width() && (py_ as u32) < nf_img.height() {
                    nf_img.set(px_ as u32, py_ as u32, px);
                }
            }
        }
    }

    #[test]
    fn empty_subscreen_reports_no_items() {
        let img = BgrImage::new(256, 240);
        let nf = NesFrame::new(img, 0, 0);
        let reader = InventoryReader::new();
        let items = reader.read_items(&nf);
        assert!(items.values().all(|&v| !v));
    }

    #[test]
    fn occupied_boomerang_slot_detected() {
        let mut img = BgrImage::new(256, 240);
        fill(&mut img, 128, 72, 8, 8, Bgr { b: 184, g: 68, r: 0 });
        let nf = NesFrame::new(img, 0, 0);
        let reader = InventoryReader::new();
        let items = reader.read_items(&nf);
        assert!(items["boomerang"] || items.get("magic_boomerang").copied().unwrap_or(false));
    }

    #[test]
    fn z1r_swap_layout_returns_empty() {
        let mut img = BgrImage::new(256, 240);
        fill(&mut img, 24, 0, 48, 40, Bgr { b: 10, g: 10, r: 180 });
        let nf = NesFrame::new(img, 0, 0);
        let reader = InventoryReader::new();
        assert!(reader.read_items(&nf).is_empty());
    }

    #[test]
    fn no_sword_on_dark_tile() {
        let img = BgrImage::new(256, 240);
        let nf = NesFrame::new(img, 0, 0);
        let reader = InventoryReader::new();
        assert_eq!(reader.read_sword_level(&nf), 0);
    }

    #[test]
    fn magical_sword_detected_by_blue_dominance() {
        let mut img = BgrImage::new(256, 240);
        fill(&mut img, 152, 24, 8, 8, Bgr { b: 200, g: 100, r: 50 });
        let nf = NesFrame::new(img, 0, 0);
        let reader = InventoryReader::new();
        assert_eq!(reader.read_sword_level(&nf), 3);
    }

    #[test]
    fn b_item_none_on_empty_tile() {
        let img = BgrImage::new(256, 240);
        let nf = NesFrame::new(img, 0, 0);
        let reader = InventoryReader::new();
        assert_eq!(reader.read_b_item(&nf), None);
    }
}
