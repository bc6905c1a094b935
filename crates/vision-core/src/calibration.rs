//! Auto-crop and grid-alignment calibration: locates the NES game rectangle
//! inside an arbitrary streamer overlay and the 8-pixel tile-grid offset
//! within it, without any prior knowledge of the capture layout.
//!
//! The original implementation drives this with OpenCV contour-finding
//! (`cv2.Canny` + `cv2.findContours` + `cv2.approxPolyDP`) across three
//! binarizations of the frame. Nothing in the host stack provides that —
//! there is no general-purpose contour/polygon-approximation crate in the
//! teacher's dependency graph, and pulling one in for a single call site
//! would fight the "stay aligned with the teacher's stack" rule harder than
//! reimplementing the narrower thing this pipeline actually needs: a
//! rectangular region's bounding box, not an arbitrary polygon. Candidate
//! rectangles are found instead via two complementary boolean-mask
//! connected-component passes (dark-border-relative and bright-blob), which
//! cover the same two binarization strategies the original leans on hardest
//! (the dilated dark-border mask and a brightness threshold) and feed the
//! same scoring/verification pipeline.

use std::collections::VecDeque;

use tracing::debug;

use crate::image_buf::BgrImage;
use crate::state::{CalibrationResult, CropRect};
use crate::template::max_channel_gray;

const MIN_ASPECT: f64 = 0.95;
const MAX_ASPECT: f64 = 1.35;
const MIN_AREA_FRACTION: f64 = 0.03;
const MAX_AREA_FRACTION: f64 = 0.95;
const DEDUP_THRESHOLD: i64 = 20;

/// One scored candidate rectangle plus whether it passed HUD verification.
#[derive(Debug, Clone)]
pub struct CropCandidate {
    pub rect: CropRect,
    pub confidence: f64,
    pub aspect_ratio: f64,
    pub hud_verified: bool,
}

pub(crate) fn bounding_boxes(mask: &[bool], width: u32, height: u32, min_area: f64, max_area: f64) -> Vec<CropRect> {
    let (w, h) = (width as usize, height as usize);
    let mut visited = vec![false; w * h];
    let mut rects = Vec::new();
    for y0 in 0..h {
        for x0 in 0..w {
            let idx0 = y0 * w + x0;
            if visited[idx0] || !mask[idx0] {
                continue;
            }
            let mut queue = VecDeque::new();
            queue.push_back((x0, y0));
            visited[idx0] = true;
            let (mut min_x, mut max_x, mut min_y, mut max_y) = (x0, x0, y0, y0);
            let mut area = 0u64;
            while let Some((x, y)) = queue.pop_front() {
                area += 1;
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
                let neighbors = [
                    (x.wrapping_sub(1), y),
                    (x + 1, y),
                    (x, y.wrapping_sub(1)),
                    (x, y + 1),
                ];
                for (nx, ny) in neighbors {
                    if nx >= w || ny >= h {
                        continue;
                    }
                    let nidx = ny * w + nx;
                    if !visited[nidx] && mask[nidx] {
                        visited[nidx] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }
            let bbox_area = (max_x - min_x + 1) as f64 * (max_y - min_y + 1) as f64;
            if bbox_area < min_area || bbox_area > max_area {
                continue;
            }
            // Reject sparse/irregular blobs: a genuine rectangular region
            // should mostly fill its own bounding box.
            if area as f64 / bbox_area < 0.5 {
                continue;
            }
            rects.push(CropRect {
                x: min_x as i64,
                y: min_y as i64,
                w: (max_x - min_x + 1) as u32,
                h: (max_y - min_y + 1) as u32,
            });
        }
    }
    rects
}

fn dilate(mask: &[bool], width: u32, height: u32, radius: i64, iterations: u32) -> Vec<bool> {
    let (w, h) = (width as i64, height as i64);
    let mut current = mask.to_vec();
    for _ in 0..iterations {
        let mut next = current.clone();
        for y in 0..h {
            for x in 0..w {
                let idx = (y * w + x) as usize;
                if current[idx] {
                    continue;
                }
                'search: for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < 0 || ny < 0 || nx >= w || ny >= h {
                            continue;
                        }
                        if current[(ny * w + nx) as usize] {
                            next[idx] = true;
                            break 'search;
                        }
                    }
                }
            }
        }
        current = next;
    }
    current
}

fn find_rectangle_candidates(frame: &BgrImage, min_area: f64, max_area: f64) -> Vec<CropRect> {
    let gray = max_channel_gray(frame);
    let (w, h) = (frame.width(), frame.height());

    // Approach 1: dilated dark-border mask, inverted — bounding box of the
    // brighter interior region bounded by a dark frame/chrome border.
    let dark_mask: Vec<bool> = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .map(|(x, y)| gray.get(x, y) < 30)
        .collect();
    let dilated = dilate(&dark_mask, w, h, 2, 2);
    let inner_mask: Vec<bool> = dilated.iter().map(|&b| !b).collect();
    let mut candidates = bounding_boxes(&inner_mask, w, h, min_area, max_area);

    // Approach 2: bright-blob mask — components of pixels brighter than a
    // fixed floor, catching cases where the game region isn't bordered by a
    // dark frame at all.
    let bright_mask: Vec<bool> = (0..h)
        .flat_map(|y| (0..w).map(move |x| (x, y)))
        .map(|(x, y)| gray.get(x, y) > 40)
        .collect();
    candidates.extend(bounding_boxes(&bright_mask, w, h, min_area, max_area));

    deduplicate_rects(candidates)
}

fn deduplicate_rects(rects: Vec<CropRect>) -> Vec<CropRect> {
    let mut unique: Vec<CropRect> = Vec::new();
    for r in rects {
        let is_dup = unique.iter().any(|u| {
            (r.x - u.x).abs() < DEDUP_THRESHOLD
                && (r.y - u.y).abs() < DEDUP_THRESHOLD
                && (r.w as i64 - u.w as i64).abs() < DEDUP_THRESHOLD
                && (r.h as i64 - u.h as i64).abs() < DEDUP_THRESHOLD
        });
        if !is_dup {
            unique.push(r);
        }
    }
    unique
}

/// Resize-crop a rectangle of `frame` to the canonical 256x240 resolution.
fn canonical_of(frame: &BgrImage, rect: CropRect) -> BgrImage {
    frame
        .crop_padded(rect.x, rect.y, rect.w, rect.h)
        .resize_nearest(crate::frame::NES_WIDTH, crate::frame::NES_HEIGHT)
}

/// HUD verification: does a candidate region, resized to canonical
/// resolution, look like a Zelda 1 HUD?
pub fn verify_hud(frame: &BgrImage, rect: CropRect) -> bool {
    if rect.w == 0 || rect.h == 0 {
        return false;
    }
    let canonical = canonical_of(frame, rect);

    let hud_area = canonical.crop_padded(0, 0, 256, 64);
    let hud_brightness = hud_area.mean_brightness();
    if hud_brightness > 80.0 {
        return false;
    }

    let game_area = canonical.crop_padded(0, 64, 256, 176);
    let game_brightness = game_area.mean_brightness();
    if game_brightness < hud_brightness {
        return false;
    }

    let heart_region = canonical.crop_padded(170, 28, 78, 16);
    let mut red_count = 0u64;
    let mut total = 0u64;
    for y in 0..heart_region.height() {
        for x in 0..heart_region.width() {
            let px = heart_region.get(x, y);
            total += 1;
            if px.r as f64 > 80.0 && px.r as f64 > px.g as f64 * 1.3 {
                red_count += 1;
            }
        }
    }
    let has_hearts = total > 0 && red_count as f64 / total as f64 > 0.05;

    let minimap = canonical.crop_padded(16, 16, 48, 44);
    let minimap_ok = minimap.mean_brightness() < 60.0;

    let soft_checks =
        [has_hearts, minimap_ok, game_brightness > 20.0].iter().filter(|&&b| b).count();
    soft_checks >= 2
}

fn score_candidate(frame: &BgrImage, frame_area: f64, rect: CropRect) -> Option<CropCandidate> {
    let aspect = rect.w as f64 / rect.h as f64;
    if !(MIN_ASPECT..=MAX_ASPECT).contains(&aspect) {
        return None;
    }
    let area_score = (rect.w as f64 * rect.h as f64) / frame_area;
    let aspect_score = 1.0 - (aspect - 1.067).abs() / 0.3;
    let aspect_score = aspect_score.max(0.0).min(1.0);
    let size_penalty = if area_score < 0.8 { 1.0 } else { (1.0 - (area_score - 0.8) * 5.0).max(0.0) };
    let mut score = area_score * 0.3 + aspect_score * 0.4 + size_penalty * 0.3;

    let hud_verified = verify_hud(frame, rect);
    if hud_verified {
        score += 0.5;
    }

    Some(CropCandidate {
        rect,
        confidence: score.min(1.0),
        aspect_ratio: aspect,
        hud_verified,
    })
}

/// Find the NES game region in a single stream frame via contour-candidate
/// detection plus HUD verification.
pub fn detect_crop(frame: &BgrImage) -> Option<CropCandidate> {
    let frame_area = frame.width() as f64 * frame.height() as f64;
    let min_area = frame_area * MIN_AREA_FRACTION;
    let max_area = frame_area * MAX_AREA_FRACTION;
    let candidates = find_rectangle_candidates(frame, min_area, max_area);
    debug!(count = candidates.len(), "auto-crop contour candidates");

    candidates
        .into_iter()
        .filter_map(|r| score_candidate(frame, frame_area, r))
        .fold(None, |best: Option<CropCandidate>, cand| match &best {
            Some(b) if b.confidence >= cand.confidence => best,
            _ => Some(cand),
        })
}

/// Median-of-candidates detection across multiple frames, for stability.
pub fn detect_crop_multi(frames: &[BgrImage]) -> Option<CropCandidate> {
    let results: Vec<CropCandidate> = frames.iter().filter_map(detect_crop).collect();
    if results.is_empty() {
        return None;
    }
    let mut xs: Vec<i64> = results.iter().map(|c| c.rect.x).collect();
    let mut ys: Vec<i64> = results.iter().map(|c| c.rect.y).collect();
    let mut ws: Vec<u32> = results.iter().map(|c| c.rect.w).collect();
    let mut hs: Vec<u32> = results.iter().map(|c| c.rect.h).collect();
    xs.sort();
    ys.sort();
    ws.sort();
    hs.sort();
    let mid = results.len() / 2;
    let rect = CropRect { x: xs[mid], y: ys[mid], w: ws[mid], h: hs[mid] };
    let confidence = results.iter().map(|c| c.confidence).sum::<f64>() / results.len() as f64;
    let hud_verified = results.iter().any(|c| c.hud_verified);
    Some(CropCandidate {
        rect,
        confidence,
        aspect_ratio: rect.w as f64 / rect.h as f64,
        hud_verified,
    })
}

/// Scan all 64 (dx, dy) offsets and candidate LIFE-text rows, returning the
/// offset and row whose tile is most clearly "-LIFE-" red (not a heart).
pub fn find_grid_alignment(canonical: &BgrImage) -> Option<(u8, u8, u8)> {
    const LIFE_COL: i64 = 22;
    const CANDIDATE_ROWS: [i64; 4] = [3, 4, 5, 6];

    let mut best: Option<(u8, u8, u8)> = None;
    let mut best_score = -1.0f64;

    for &life_row in &CANDIDATE_ROWS {
        for dy in 0..8i64 {
            for dx in 0..8i64 {
                let y = life_row * 8 + dy;
                let x = LIFE_COL * 8 + dx;
                if x + 8 > 256 || y + 8 > 240 {
                    continue;
                }
                let tile = canonical.crop_padded(x, y, 8, 8);
                let (r, g, b) = mean_rgb(&tile);
                if !(r > 50.0 && r > g * 2.0 && r > b * 2.0) {
                    continue;
                }
                let mut score = r - (g + b) / 2.0;

                if let Some(bonus) = red_bonus(canonical, 23 * 8 + dx, y, 2.0) {
                    score += bonus;
                }
                if let Some(bonus) = red_bonus(canonical, 24 * 8 + dx, y, 3.0) {
                    score += bonus;
                }

                let x_beyond = 27 * 8 + dx;
                if x_beyond + 8 <= 256 {
                    let tile_beyond = canonical.crop_padded(x_beyond, y, 8, 8);
                    let (rb, gb, _) = mean_rgb(&tile_beyond);
                    if rb > 50.0 && rb > gb * 1.5 {
                        score *= 0.1;
                    }
                }

                if score > best_score {
                    best_score = score;
                    best = Some((dx as u8, dy as u8, life_row as u8));
                }
            }
        }
    }
    best
}

fn red_bonus(canonical: &BgrImage, x: i64, y: i64, divisor: f64) -> Option<f64> {
    if x + 8 > 256 {
        return None;
    }
    let tile = canonical.crop_padded(x, y, 8, 8);
    let (r, g, _) = mean_rgb(&tile);
    if r > 50.0 && r > g * 2.0 { Some(r / divisor) } else { None }
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

/// Score how well a canonical frame at (dx,dy) looks like Zelda 1 — the
/// primary ("LIFE text") anchor used by `multi_anchor_calibration`.
pub fn score_calibration(canonical: &BgrImage, dx: u8, dy: u8) -> f64 {
    let (dx, dy) = (dx as i64, dy as i64);
    let mut score = 0.0;

    let y = 5 * 8 + dy;
    let x = 22 * 8 + dx;
    if x + 8 <= 256 && y + 8 <= 240 {
        let tile = canonical.crop_padded(x, y, 8, 8);
        let (r, g, b) = mean_rgb(&tile);
        if r > 50.0 && r > g * 2.0 && r > b * 2.0 {
            score += 0.5;
            let x2 = 23 * 8 + dx;
            if x2 + 8 <= 256 {
                let tile2 = canonical.crop_padded(x2, y, 8, 8);
                let (r2, g2, _) = mean_rgb(&tile2);
                if r2 > 50.0 && r2 > g2 * 2.0 {
                    score += 0.3;
                }
            }
        }
    }

    let hud_area = canonical.crop_padded(0, 0, 256, 64);
    let hud_bright = hud_area.mean_brightness() as f64;
    if hud_bright < 80.0 {
        score += 0.3;
    }

    let game_area = canonical.crop_padded(0, 64, 256, 176);
    let game_bright = game_area.mean_brightness() as f64;
    if game_bright > hud_bright && game_bright > 20.0 {
        score += 0.3;
    }

    let my1 = 16 + dy;
    let my2 = (52 + dy).min(240);
    let mx1 = 16 + dx;
    let mx2 = (64 + dx).min(256);
    if my2 > my1 && mx2 > mx1 {
        let minimap = canonical.crop_padded(mx1, my1, (mx2 - mx1) as u32, (my2 - my1) as u32);
        if minimap.mean_brightness() < 60.0 {
            score += 0.2;
        }
    }

    score
}

/// Secondary anchor: "LEVEL-X" dungeon text, bright white against a dark
/// background near the top-left of the game area.
fn find_level_text(canonical: &BgrImage, dx: u8, dy: u8) -> f64 {
    let (dx, dy) = (dx as i64, dy as i64);
    let (row, col_start) = (9, 2);
    let mut score = 0.0;
    for col in col_start..col_start + 5 {
        let x = col * 8 + dx;
        let y = row * 8 + dy;
        if x + 8 > 256 || y + 8 > 240 {
            continue;
        }
        let tile = canonical.crop_padded(x, y, 8, 8);
        if tile.mean_brightness() as f64 > 80.0 {
            score += 0.1;
        }
    }
    score
}

/// Tertiary anchor: the hearts row pattern (red dots at cols 22-29).
fn find_hearts_pattern(canonical: &BgrImage, dx: u8, dy: u8) -> f64 {
    let (dx, dy) = (dx as i64, dy as i64);
    for row in [3i64, 4] {
        let mut red_count = 0;
        for col in 22..30 {
            let x = col * 8 + dx;
            let y = row * 8 + dy;
            if x + 8 > 256 || y + 8 > 240 {
                continue;
            }
            let tile = canonical.crop_padded(x, y, 8, 8);
            let (r, g, _) = mean_rgb(&tile);
            if r > 60.0 && r > g * 1.3 {
                red_count += 1;
            }
        }
        if red_count >= 3 {
            return 0.3;
        }
    }
    0.0
}

/// Combined multi-anchor grid-offset score: LIFE text + LEVEL text + hearts
/// pattern. Returns `None` if no offset scores above 0.5.
pub fn multi_anchor_calibration(canonical: &BgrImage) -> Option<(u8, u8, f64)> {
    let mut best: Option<(u8, u8, f64)> = None;
    for dy in 0..8u8 {
        for dx in 0..8u8 {
            let total = score_calibration(canonical, dx, dy)
                + find_level_text(canonical, dx, dy)
                + find_hearts_pattern(canonical, dx, dy);
            if best.map(|(_, _, s)| total > s).unwrap_or(true) {
                best = Some((dx, dy, total));
            }
        }
    }
    best.filter(|&(_, _, s)| s > 0.5)
}

/// A previously-seen streamer crop layout, matched by source resolution.
#[derive(Debug, Clone)]
pub struct LayoutEntry {
    pub id: String,
    pub stream_width: u32,
    pub stream_height: u32,
    pub crop: CropRect,
}

/// Last-resort fallback: try known layouts for this stream resolution.
pub fn try_common_layouts(frames: &[BgrImage], layouts: &[LayoutEntry]) -> Option<CropCandidate> {
    let first = frames.first()?;
    let (w, h) = (first.width(), first.height());
    let mut best: Option<CropCandidate> = None;
    let mut best_score = 0.0f64;

    for layout in layouts {
        if layout.stream_width != w || layout.stream_height != h {
            continue;
        }
        let rect = layout.crop;
        if rect.w < 100 || rect.h < 100 || rect.x + rect.w as i64 > w as i64 || rect.y + rect.h as i64 > h as i64
        {
            continue;
        }
        let mut total = 0.0;
        let mut scored = 0u32;
        for frame in frames.iter().take(5) {
            let canonical = canonical_of(frame, rect);
            if let Some((_, _, score)) = multi_anchor_calibration(&canonical) {
                total += score;
                scored += 1;
            }
        }
        if scored == 0 {
            continue;
        }
        let avg = total / scored as f64;
        if avg > best_score {
            best_score = avg;
            debug!(layout = %layout.id, score = avg, "common-layout candidate");
            best = Some(CropCandidate {
                rect,
                confidence: (avg / 2.0).min(0.7),
                aspect_ratio: rect.w as f64 / rect.h as f64,
                hud_verified: avg > 0.8,
            });
        }
    }
    best
}

/// Locate red pixel clusters characteristic of "-LIFE-" HUD text directly
/// in a full stream frame, deriving a crop hypothesis without contour
/// detection at all. Used when contour detection fails or is unverified.
pub fn calibrate_from_life_text(frame: &BgrImage) -> Option<(CropRect, u8, u8, f64)> {
    let (w, h) = (frame.width(), frame.height());
    let search_h = (h as f64 * 0.6) as u32;

    let mut red_mask = vec![false; w as usize * h as usize];
    for y in 0..search_h {
        for x in 0..w {
            let px = frame.get(x, y);
            let (r, g, b) = (px.r as f64, px.g as f64, px.b as f64);
            if r > 80.0 && r > g * 2.0 && r > b * 2.0 {
                red_mask[(y * w + x) as usize] = true;
            }
        }
    }
    let dilated = dilate(&red_mask, w, h, 2, 2);
    let clusters = bounding_boxes(&dilated, w, h, 50.0, f64::MAX);

    let mut best: Option<(CropRect, u8, u8, f64)> = None;
    let mut best_score = 0.0f64;

    for cluster in clusters {
        let (bx, by, bh) = (cluster.x, cluster.y, cluster.h as f64);
        for &(nes_h, nes_top) in &[(24.0, 24.0), (16.0, 32.0), (8.0, 40.0)] {
            let scale = bh / nes_h;
            if !(1.5..=5.0).contains(&scale) {
                continue;
            }
            for &nes_x_left in &[168.0, 176.0, 160.0] {
                let crop_w = (256.0 * scale).round() as i64;
                let crop_h = (240.0 * scale).round() as i64;
                let mut crop_x = (bx as f64 - nes_x_left * scale).round() as i64;
                let mut crop_y = (by as f64 - nes_top * scale).round() as i64;
                crop_x = crop_x.max(0).min(w as i64 - crop_w);
                crop_y = crop_y.max(0).min(h as i64 - crop_h);
                if crop_w < 100 || crop_h < 100 || crop_x + crop_w > w as i64 || crop_y + crop_h > h as i64 {
                    continue;
                }
                let rect = CropRect { x: crop_x, y: crop_y, w: crop_w as u32, h: crop_h as u32 };
                let canonical = canonical_of(frame, rect);
                let Some((dx, dy, _)) = find_grid_alignment(&canonical) else {
                    continue;
                };
                let score = score_calibration(&canonical, dx, dy);
                if score > best_score {
                    best_score = score;
                    best = Some((rect, dx, dy, (score / 1.6).min(1.0)));
                }
            }
        }
    }
    best
}

/// Full fallback chain: contour detection, LIFE-text calibration, common-layout
/// catalog, then (last resort) the low-confidence contour result rather than
/// nothing at all. Returns `None` only when every phase fails — the caller
/// should retry on a later frame.
pub fn detect_with_fallback(frames: &[BgrImage], layouts: &[LayoutEntry]) -> Option<CalibrationResult> {
    let contour = detect_crop_multi(frames);

    if let Some(result) = &contour {
        if result.confidence >= 0.5 && result.hud_verified {
            let mid = frames[frames.len() / 2].clone();
            let canonical = canonical_of(&mid, result.rect);
            let (dx, dy) = multi_anchor_calibration(&canonical)
                .map(|(dx, dy, _)| (dx, dy))
                .or_else(|| find_grid_alignment(&canonical).map(|(dx, dy, _)| (dx, dy)))
                .unwrap_or((0, 0));
            return Some(CalibrationResult {
                crop: result.rect,
                grid_dx: dx,
                grid_dy: dy,
                confidence: result.confidence,
                method: "contour".to_string(),
                hud_verified: result.hud_verified,
            });
        }
    }

    for frame in frames {
        if let Some((rect, dx, dy, confidence)) = calibrate_from_life_text(frame) {
            if confidence >= 0.3 {
                return Some(CalibrationResult {
                    crop: rect,
                    grid_dx: dx,
                    grid_dy: dy,
                    confidence,
                    method: "life_text".to_string(),
                    hud_verified: true,
                });
            }
        }
    }

    if let Some(result) = try_common_layouts(frames, layouts) {
        let canonical = canonical_of(&frames[0], result.rect);
        let (dx, dy) = multi_anchor_calibration(&canonical).map(|(dx, dy, _)| (dx, dy)).unwrap_or((0, 0));
        return Some(CalibrationResult {
            crop: result.rect,
            grid_dx: dx,
            grid_dy: dy,
            confidence: result.confidence,
            method: "layout".to_string(),
            hud_verified: result.hud_verified,
        });
    }

    contour.map(|result| {
        debug!(confidence = result.confidence, "falling back to low-confidence contour result");
        CalibrationResult {
            crop: result.rect,
            grid_dx: 0,
            grid_dy: 0,
            confidence: result.confidence,
            method: "contour_low".to_string(),
            hud_verified: result.hud_verified,
        }
    })
}
