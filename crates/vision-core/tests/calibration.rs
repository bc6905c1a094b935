//! Grid-alignment boundary behaviors on synthetic canonical frames. These
//! complement `calibration.rs`'s own inline unit tests with the
//! hearts-confusion guard case, where a second red cluster at column 27
//! competes for the LIFE-row slot.

use vision_core::calibration::find_grid_alignment;
use vision_core::image_buf::{Bgr, BgrImage};

const RED: Bgr = Bgr { b: 0, g: 0, r: 200 };
const GREEN: Bgr = Bgr { b: 0, g: 180, r: 0 };

fn paint_rect(img: &mut BgrImage, x0: u32, y0: u32, w: u32, h: u32, color: Bgr) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            img.set(x, y, color);
        }
    }
}

/// Canonical 256x240 frame: dark HUD strip above row 8, bright green body
/// below, with red 8x8 tiles painted at the given tile columns on a single
/// row.
fn life_frame(row: u32, cols: &[u32]) -> BgrImage {
    let mut img = BgrImage::new(256, 240);
    paint_rect(&mut img, 0, 64, 256, 176, GREEN);
    for &col in cols {
        paint_rect(&mut img, col * 8, row * 8, 8, 8, RED);
    }
    img
}

#[test]
fn standard_life_frame_locates_exact_grid_offset() {
    let img = life_frame(5, &[22, 23, 24]);
    let (dx, dy, row) = find_grid_alignment(&img).expect("a candidate must be found");
    assert_eq!((dx, dy, row), (0, 0, 5));
}

#[test]
fn hearts_confusion_guard_still_prefers_life_row_despite_col27_penalty() {
    // Same LIFE-row cluster, plus a second red run at cols 25-29 (hearts)
    // that lands squarely on the col-27 penalty check. The penalized row is
    // still the only row with any red in it, so it still wins.
    let img = life_frame(5, &[22, 23, 24, 25, 26, 27, 28, 29]);
    let (dx, dy, row) = find_grid_alignment(&img).expect("a candidate must be found");
    assert_eq!(row, 5);
    assert_eq!((dx, dy), (0, 0));
}

#[test]
fn no_red_anywhere_yields_no_candidate() {
    let img = BgrImage::new(256, 240);
    assert!(find_grid_alignment(&img).is_none());
}
