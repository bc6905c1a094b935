//! Screen-type classification from pixel statistics at fixed NES positions.
//!
//! Mirrors `screen_classifier.py`'s decision table: gameplay screens are
//! routed first by presence of the red "-LIFE-"/"-ROAR-" HUD text, then by
//! brightness; everything else falls through an ordered list of brightness
//! and red/white-pixel heuristics.

use crate::frame::NesFrame;
use crate::image_buf::BgrImage;

const TRANSITION_BRIGHTNESS_MAX: f32 = 8.0;
const LOW_BRIGHTNESS_MAX: f32 = 25.0;
const SUBSCREEN_DARK_GAME_MAX: f32 = 30.0;

const DUNGEON_BRIGHTNESS_MAX: f32 = 35.0;
const CAVE_BRIGHTNESS_MAX: f32 = 55.0;

const RED_CHANNEL_MIN: f64 = 50.0;
const RED_TO_GREEN_RATIO: f64 = 2.0;
const RED_TO_BLUE_RATIO: f64 = 2.0;

const DEATH_FLASH_RED_MIN: f64 = 100.0;

const DEATH_MENU_BRIGHTNESS_MAX: f32 = 30.0;
const DEATH_MENU_BRIGHTNESS_MIN: f32 = 3.0;
const DEATH_MENU_CENTER_Y: (i64, i64) = (80, 180);
const DEATH_MENU_CENTER_X: (i64, i64) = (80, 220);
const DEATH_MENU_CENTER_BRIGHT_MIN: f32 = 5.0;
const DEATH_MENU_CENTER_BRIGHT_MAX: f32 = 60.0;
const WHITE_PIXEL_THRESHOLD: f64 = 150.0;
const WHITE_RATIO_MIN: f64 = 0.02;
const WHITE_RATIO_MAX: f64 = 0.15;

const TITLE_TOP_ROWS: u32 = 30;
const TITLE_TOP_BRIGHTNESS_MAX: f32 = 10.0;

const SHIFTED_HUD_Y_START: i64 = 100;
const SHIFTED_HUD_Y_END: i64 = 232;
const CONSECUTIVE_RED_ROWS_MIN: i64 = 4;

const MINIMAP_X_START: i64 = 16;
const MINIMAP_X_END: i64 = 80;
const MINIMAP_Y_ABOVE_LIFE: i64 = 8;
const MINIMAP_Y_BELOW_LIFE: i64 = 24;
const MINIMAP_CHANNEL_SPREAD_MAX: f64 = 30.0;
const MINIMAP_BRIGHTNESS_MIN: f64 = 40.0;
const MINIMAP_BRIGHTNESS_MAX: f64 = 140.0;

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

fn is_red(r: f64, g: f64, b: f64) -> bool {
    r > RED_CHANNEL_MIN && r > g * RED_TO_GREEN_RATIO && r > b * RED_TO_BLUE_RATIO
}

/// Classify the current NES screen from a native crop.
pub fn classify(nf: &NesFrame, life_row: u8) -> String {
    if has_life_text(nf, life_row) {
        return classify_gameplay(nf);
    }

    let full_brightness = nf.crop().mean_brightness();
    let game_area = nf.game_area();

    if full_brightness < TRANSITION_BRIGHTNESS_MAX {
        return "transition".to_string();
    }
    if is_death_flash(&game_area) {
        return "death".to_string();
    }
    if has_shifted_hud(nf) {
        return "subscreen".to_string();
    }
    if is_death_menu(nf) {
        return "death".to_string();
    }
    if is_title(nf) {
        return "title".to_string();
    }
    if full_brightness < LOW_BRIGHTNESS_MAX {
        return "transition".to_string();
    }
    let game_brightness = game_area.mean_brightness();
    if game_brightness < SUBSCREEN_DARK_GAME_MAX {
        return "subscreen".to_string();
    }
    "unknown".to_string()
}

/// Check for "-LIFE-"/"-ROAR-" red text in the standard HUD position.
pub fn has_life_text(nf: &NesFrame, life_row: u8) -> bool {
    let tile = nf.tile(22, life_row as i64);
    let (r, g, b) = mean_rgb(&tile);
    is_red(r, g, b)
}

fn classify_gameplay(nf: &NesFrame) -> String {
    let avg_brightness = nf.game_area().mean_brightness();
    if avg_brightness < DUNGEON_BRIGHTNESS_MAX {
        "dungeon".to_string()
    } else if avg_brightness < CAVE_BRIGHTNESS_MAX {
        "cave".to_string()
    } else {
        "overworld".to_string()
    }
}

fn is_death_flash(game_area: &BgrImage) -> bool {
    let (r, g, b) = mean_rgb(game_area);
    r > DEATH_FLASH_RED_MIN && r > g * RED_TO_GREEN_RATIO && r > b * RED_TO_BLUE_RATIO
}

fn is_death_menu(nf: &NesFrame) -> bool {
    let full_brightness = nf.crop().mean_brightness();
    if full_brightness > DEATH_MENU_BRIGHTNESS_MAX || full_brightness < DEATH_MENU_BRIGHTNESS_MIN {
        return false;
    }
    let center = nf.region(
        DEATH_MENU_CENTER_X.0,
        DEATH_MENU_CENTER_Y.0,
        (DEATH_MENU_CENTER_X.1 - DEATH_MENU_CENTER_X.0) as u32,
        (DEATH_MENU_CENTER_Y.1 - DEATH_MENU_CENTER_Y.0) as u32,
    );
    if center.width() == 0 || center.height() == 0 {
        return false;
    }
    let center_brightness = center.mean_brightness();
    if center_brightness < DEATH_MENU_CENTER_BRIGHT_MIN || center_brightness > DEATH_MENU_CENTER_BRIGHT_MAX {
        return false;
    }
    let mut white = 0u64;
    let total = center.width() as u64 * center.height() as u64;
    for y in 0..center.height() {
        for x in 0..center.width() {
            let px = center.get(x, y);
            let mean = (px.b as f64 + px.g as f64 + px.r as f64) / 3.0;
            if mean > WHITE_PIXEL_THRESHOLD {
                white += 1;
            }
        }
    }
    let white_ratio = white as f64 / total.max(1) as f64;
    white_ratio > WHITE_RATIO_MIN && white_ratio < WHITE_RATIO_MAX
}

fn is_title(nf: &NesFrame) -> bool {
    let top = nf.region(0, 0, 256, TITLE_TOP_ROWS);
    top.mean_brightness() < TITLE_TOP_BRIGHTNESS_MAX
}

/// Check if the HUD has scrolled down (subscreen opening animation):
/// a red LIFE-text row found below the normal position, with a grey
/// minimap-colored rectangle nearby.
fn has_shifted_hud(nf: &NesFrame) -> bool {
    let src = nf.crop();
    let tw = nf.scale_coord_x(8.0);
    let th = nf.scale_coord_y(8.0);
    let x = nf.scale_coord_x((22 * 8 + nf.grid_dx as i64) as f64);
    if x + tw > src.width() as i64 {
        return false;
    }

    let y_start = nf.scale_coord_y(SHIFTED_HUD_Y_START as f64);
    let y_end = nf.scale_coord_y(SHIFTED_HUD_Y_END as f64).min(src.height() as i64 - th);
    let step = (nf.scale_y().round() as i64).max(1);

    let mut life_y: Option<i64> = None;
    let mut consecutive_red = 0i64;
    let mut y = y_start;
    while y < y_end {
        let tile = src.crop_padded(x, y, tw.max(1) as u32, th.max(1) as u32);
        let (r, g, b) = mean_rgb(&tile);
        if is_red(r, g, b) {
            consecutive_red += 1;
            if consecutive_red >= CONSECUTIVE_RED_ROWS_MIN && life_y.is_none() {
                life_y = Some(y - (CONSECUTIVE_RED_ROWS_MIN - 1) * step);
            }
        } else {
            consecutive_red = 0;
        }
        y += step;
    }

    let Some(life_y) = life_y else {
        return false;
    };

    let map_y_above = nf.scale_coord_y(MINIMAP_Y_ABOVE_LIFE as f64);
    let map_y_below = nf.scale_coord_y(MINIMAP_Y_BELOW_LIFE as f64);
    let mx1 = nf.scale_coord_x(MINIMAP_X_START as f64);
    let mx2 = nf.scale_coord_x(MINIMAP_X_END as f64);
    let map_y = (life_y - map_y_above).max(0);
    let map_y2 = (life_y + map_y_below).min(src.height() as i64);
    if map_y2 - map_y < th || mx2 <= mx1 {
        return false;
    }
    let map_region = src.crop_padded(mx1, map_y, (mx2 - mx1) as u32, (map_y2 - map_y) as u32);
    let (r, g, b) = mean_rgb(&map_region);
    let channel_spread = (r.max(g).max(b)) - (r.min(g).min(b));
    let brightness = (r + g + b) / 3.0;
    channel_spread < MINIMAP_CHANNEL_SPREAD_MAX
        && brightness > MINIMAP_BRIGHTNESS_MIN
        && brightness < MINIMAP_BRIGHTNESS_MAX
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buf::Bgr;

    #[test]
    fn classifies_transition_on_black_frame() {
        let img = BgrImage::new(256, 240);
        let nf = NesFrame::new(img, 0, 0);
        assert_eq!(classify(&nf, 5), "transition");
    }

    #[test]
    fn life_text_present_routes_to_gameplay() {
        let mut img = BgrImage::new(256, 240);
        for y in 40..48 {
            for x in 176..184 {
                img.set(x, y, Bgr { b: 0, g: 0, r: 200 });
            }
        }
        // make the game area bright -> overworld
        for y in 64..240 {
            for x in 0..256 {
                img.set(x, y, Bgr { b: 150, g: 150, r: 150 });
            }
        }
        let nf = NesFrame::new(img, 0, 0);
        assert_eq!(classify(&nf, 5), "overworld");
    }

    #[test]
    fn dark_game_area_with_life_text_is_dungeon() {
        let mut img = BgrImage::new(256, 240);
        for y in 40..48 {
            for x in 176..184 {
                img.set(x, y, Bgr { b: 0, g: 0, r: 200 });
            }
        }
        let nf = NesFrame::new(img, 0, 0);
        assert_eq!(classify(&nf, 5), "dungeon");
    }
}
