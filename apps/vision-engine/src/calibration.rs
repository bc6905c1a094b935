//! Startup auto-crop: buffers the first few stdin frames, runs the
//! contour/LIFE-text/common-layout fallback chain, and PUTs the result as a
//! crop profile when `--crop-profile-id` is set. Skipped entirely when
//! `--crop` is given explicitly.

use std::io::Read;

use anyhow::{Context, Result};
use tracing::{info, warn};
use vision_core::calibration::{detect_with_fallback, LayoutEntry};
use vision_core::image_buf::BgrImage;
use vision_core::state::{CalibrationResult, CropRect};
use vision_proto::catalog::CommonLayoutCatalog;
use vision_proto::crop_profile::CropProfile;
use vision_transport::client::VisionClient;

use crate::args::Args;
use crate::pipeline::FrameProducer;

/// Number of leading frames buffered for multi-frame auto-crop voting.
const CALIBRATION_FRAMES: usize = 10;

/// Loads `<data_dir>/common-crop-layouts.json`, if present, for the
/// last-resort common-layout fallback phase. Absence is not an error: most
/// streams calibrate via contour or LIFE-text alone.
fn load_layouts(args: &Args) -> Vec<LayoutEntry> {
    let path = args.data_dir.join("common-crop-layouts.json");
    match std::fs::read_to_string(&path) {
        Ok(json) => match CommonLayoutCatalog::from_json(&json) {
            Ok(catalog) => catalog.to_layout_entries(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "malformed common-layout catalog, ignoring");
                Vec::new()
            }
        },
        Err(_) => Vec::new(),
    }
}

/// Buffers `CALIBRATION_FRAMES` frames from `producer` and runs the
/// fallback chain. Returns `None` if the chain itself finds nothing (the
/// caller falls back to the full frame), distinct from the explicit
/// `--crop` override which skips this function entirely.
pub(crate) fn auto_calibrate<R: Read>(
    producer: &mut FrameProducer<R>,
    args: &Args,
) -> Result<(Option<CalibrationResult>, Vec<BgrImage>)> {
    let mut frames = Vec::with_capacity(CALIBRATION_FRAMES);
    for _ in 0..CALIBRATION_FRAMES {
        match producer.next_frame().context("reading calibration frames")? {
            Some(frame) => frames.push(frame),
            None => break,
        }
    }

    if frames.is_empty() {
        return Ok((None, frames));
    }

    let layouts = load_layouts(args);
    let result = detect_with_fallback(&frames, &layouts);
    match &result {
        Some(r) => info!(method = r.method, confidence = r.confidence, "auto-crop calibrated"),
        None => warn!("auto-crop found no candidate, using full frame"),
    }
    Ok((result, frames))
}

/// PUTs the crop profile derived from `calibration` when both `--server` and
/// `--crop-profile-id` are set.
pub(crate) fn publish_profile(
    args: &Args,
    client: Option<&VisionClient>,
    calibration: &CalibrationResult,
) {
    let (Some(client), Some(profile_id)) = (client, &args.crop_profile_id) else {
        return;
    };
    let profile = CropProfile {
        stream_width: args.width,
        stream_height: args.height,
        crop: CropRect {
            x: calibration.crop.x,
            y: calibration.crop.y,
            w: calibration.crop.w,
            h: calibration.crop.h,
        },
        grid_dx: calibration.grid_dx,
        grid_dy: calibration.grid_dy,
        life_row: crate::pipeline::DEFAULT_LIFE_ROW as u32,
        landmarks: Vec::new(),
    };
    if let Err(err) = client.put_crop_profile(profile_id, &profile) {
        warn!(error = %err, profile_id, "failed to publish crop profile");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with_data_dir(dir: std::path::PathBuf) -> Args {
        Args {
            racer: "racer-1".to_string(),
            crop: None,
            grid_offset: None,
            width: 1920,
            height: 1080,
            templates: "templates".into(),
            server: None,
            landmarks: None,
            crop_profile_id: None,
            data_dir: dir,
            learn: false,
            session_id: None,
            snapshot_interval_frames: 1800,
            verbose: 0,
        }
    }

    #[test]
    fn missing_catalog_file_yields_an_empty_layout_list() {
        let args = args_with_data_dir(std::env::temp_dir().join("vision-engine-test-no-such-dir"));
        assert!(load_layouts(&args).is_empty());
    }

    #[test]
    fn malformed_catalog_file_yields_an_empty_layout_list() {
        let dir = std::env::temp_dir().join("vision-engine-test-malformed-catalog");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("common-crop-layouts.json"), "not json").unwrap();
        let args = args_with_data_dir(dir.clone());
        assert!(load_layouts(&args).is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
