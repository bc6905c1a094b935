//! Snapshot decimation policy and JPEG file writers for the two file
//! outputs named in §A.6: the always-latest live frame, and learn-mode's
//! indexed snapshot trail.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageBuffer, Rgb};
use vision_core::image_buf::BgrImage;

use crate::error::TransportError;

const JPEG_QUALITY: u8 = 85;

/// Decides when a learn-mode session should take a snapshot: on every
/// screen-type transition, or every `interval_frames` frames otherwise.
pub struct SnapshotPolicy {
    interval_frames: u64,
    last_snapshot_frame: u64,
}

impl SnapshotPolicy {
    pub fn new(interval_frames: u64) -> Self {
        Self { interval_frames, last_snapshot_frame: 0 }
    }

    /// Returns the reason tag for this frame's snapshot, or `None` if no
    /// snapshot is due.
    pub fn should_snapshot(
        &mut self,
        frame_number: u64,
        screen_type: &str,
        prev_screen_type: &str,
    ) -> Option<&'static str> {
        if screen_type != prev_screen_type {
            self.last_snapshot_frame = frame_number;
            return Some("transition");
        }
        if frame_number.saturating_sub(self.last_snapshot_frame) >= self.interval_frames {
            self.last_snapshot_frame = frame_number;
            return Some("interval");
        }
        None
    }
}

fn bgr_to_rgb_image(frame: &BgrImage) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    let (w, h) = (frame.width(), frame.height());
    let mut rgb = Vec::with_capacity(frame.as_bytes().len());
    for chunk in frame.as_bytes().chunks_exact(3) {
        rgb.push(chunk[2]);
        rgb.push(chunk[1]);
        rgb.push(chunk[0]);
    }
    ImageBuffer::from_raw(w, h, rgb).expect("BgrImage buffer length matches width*height*3")
}

fn write_jpeg(path: &Path, frame: &BgrImage) -> Result<(), TransportError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let rgb = DynamicImage::ImageRgb8(bgr_to_rgb_image(frame));
    let mut out = fs::File::create(path)?;
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;
    Ok(())
}

/// `data/vision-frame-<racer>.jpg`: always the latest frame, overwritten.
pub fn write_live_frame(data_dir: &Path, racer: &str, frame: &BgrImage) -> Result<PathBuf, TransportError> {
    let path = data_dir.join(format!("vision-frame-{racer}.jpg"));
    write_jpeg(&path, frame)?;
    Ok(path)
}

/// `data/learn-snapshots/<session>/NNNN_<reason>_<ts>.jpg`.
pub fn write_learn_snapshot(
    data_dir: &Path,
    session_id: &str,
    index: u32,
    reason: &str,
    timestamp: u64,
    frame: &BgrImage,
) -> Result<PathBuf, TransportError> {
    let path = data_dir
        .join("learn-snapshots")
        .join(session_id)
        .join(format!("{index:04}_{reason}_{timestamp}.jpg"));
    write_jpeg(&path, frame)?;
    Ok(path)
}
