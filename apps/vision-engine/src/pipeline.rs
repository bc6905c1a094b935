//! Per-frame driver: reads raw BGR24 frames from stdin, runs detection and
//! validation, and streams state deltas to the dashboard. Learn mode's
//! batch driver lives alongside this in [`crate::learn`], sharing
//! [`FrameProducer`]/[`crop_rect`]/[`resolve_layout`]/[`DEFAULT_LIFE_ROW`].

use std::io::{self, Read};

use anyhow::{Context, Result};
use tracing::{info, warn};
use vision_core::detector::FrameDetector;
use vision_core::frame::NesFrame;
use vision_core::image_buf::BgrImage;
use vision_core::state::{CalibrationResult, CropRect};
use vision_logic::temporal::TemporalBuffer;
use vision_logic::validator::GameLogicValidator;
use vision_proto::delta::compute_delta;
use vision_transport::client::VisionClient;
use vision_transport::snapshot::write_live_frame;

use crate::args::Args;
use crate::calibration::{auto_calibrate, publish_profile};

/// Reads one fixed-size raw BGR24 frame per call from a `Read`.
pub(crate) struct FrameProducer<R> {
    reader: R,
    width: u32,
    height: u32,
    buf: Vec<u8>,
}

impl<R: Read> FrameProducer<R> {
    pub(crate) fn new(reader: R, width: u32, height: u32) -> Self {
        let frame_bytes = width as usize * height as usize * 3;
        Self { reader, width, height, buf: vec![0u8; frame_bytes] }
    }

    /// Returns `Ok(None)` on a clean EOF between frames, `Ok(Some(_))` on a
    /// full frame read, `Err` on a short read mid-frame (stream corruption).
    pub(crate) fn next_frame(&mut self) -> Result<Option<BgrImage>> {
        match self.reader.read_exact(&mut self.buf) {
            Ok(()) => Ok(Some(BgrImage::from_raw(self.width, self.height, self.buf.clone()))),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(err) => Err(err).context("short read from stdin mid-frame"),
        }
    }
}

pub(crate) fn crop_rect(args: &Args) -> CropRect {
    match args.crop {
        Some(c) => CropRect { x: c.x, y: c.y, w: c.w, h: c.h },
        None => CropRect { x: 0, y: 0, w: args.width, h: args.height },
    }
}

/// Resolves the crop rectangle and grid offset to run with, buffering and
/// returning any frames consumed along the way so the caller doesn't lose
/// them. `--crop` is an explicit override and skips auto-calibration
/// entirely; otherwise this buffers a handful of frames and runs the
/// contour/LIFE-text/common-layout fallback chain.
pub(crate) fn resolve_layout<R: Read>(
    producer: &mut FrameProducer<R>,
    args: &Args,
    client: Option<&VisionClient>,
) -> Result<(CropRect, u8, u8, Vec<BgrImage>, Option<CalibrationResult>)> {
    if args.crop.is_some() {
        let (gdx, gdy) = args.grid_offset.map(|g| (g.dx, g.dy)).unwrap_or((0, 0));
        return Ok((crop_rect(args), gdx, gdy, Vec::new(), None));
    }

    let (calibration, buffered) = auto_calibrate(producer, args)?;
    match calibration {
        Some(result) => {
            publish_profile(args, client, &result);
            let crop = result.crop;
            let (gdx, gdy) = (result.grid_dx, result.grid_dy);
            Ok((crop, gdx, gdy, buffered, Some(result)))
        }
        None => Ok((crop_rect(args), 0, 0, buffered, None)),
    }
}

/// Startup guess for the HUD's life row, used only to construct the
/// `HudReader`/`FrameDetector`. `--grid-offset`/`--crop` only cover tile
/// alignment and source cropping; there is no CLI flag for life_row since
/// per-frame grid alignment (`find_grid_alignment`) and `refine_grid`
/// already correct tile-level offset drift after this initial guess.
pub(crate) const DEFAULT_LIFE_ROW: u8 = 5;

/// Streams per-frame state deltas to the dashboard until stdin reaches EOF.
pub fn run_streaming(args: &Args) -> Result<()> {
    let template_dir = args.templates.to_string_lossy().into_owned();
    let mut detector = FrameDetector::new(&template_dir, DEFAULT_LIFE_ROW)
        .context("failed to load detector templates")?;
    let mut temporal = TemporalBuffer::new(vision_logic::temporal::DEFAULT_BUFFER_SIZE);
    let mut validator = GameLogicValidator::new(Default::default());
    let client = args.server.as_ref().map(|url| VisionClient::new(url.clone()));

    let stdin = io::stdin();
    let mut producer = FrameProducer::new(stdin.lock(), args.width, args.height);
    let (crop, gdx, gdy, buffered, _calibration) = resolve_layout(&mut producer, args, client.as_ref())?;

    let mut prev_sent = None;
    let mut frame_number = 0u64;
    let mut buffered = buffered.into_iter();

    loop {
        let raw = match buffered.next() {
            Some(frame) => frame,
            None => match producer.next_frame()? {
                Some(frame) => frame,
                None => {
                    info!(frame_number, "stdin EOF, shutting down");
                    break;
                }
            },
        };

        let cropped = raw.crop_padded(crop.x, crop.y, crop.w, crop.h);
        let mut nf = NesFrame::new(cropped, gdx, gdy);
        let detected = detector.detect(&mut nf);
        let stable = temporal.process(detected);
        let validated = validator.validate(stable, frame_number);

        if let Some(client) = &client {
            let delta = compute_delta(prev_sent.as_ref(), &validated);
            if !delta.is_empty() {
                client.post_delta(&args.racer, &delta);
            }
        }

        if let Err(err) = write_live_frame(&args.data_dir, &args.racer, nf.crop()) {
            warn!(error = %err, "failed to write live frame snapshot");
        }

        prev_sent = Some(validated);
        frame_number += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::CropArg;

    fn base_args() -> Args {
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
            data_dir: "data".into(),
            learn: false,
            session_id: None,
            snapshot_interval_frames: 1800,
            verbose: 0,
        }
    }

    #[test]
    fn explicit_crop_bypasses_auto_calibration_and_consumes_no_frames() {
        let mut args = base_args();
        args.crop = Some(CropArg { x: 10, y: 20, w: 256, h: 240 });
        args.grid_offset = None;

        let empty: &[u8] = &[];
        let mut producer = FrameProducer::new(empty, args.width, args.height);
        let (crop, gdx, gdy, buffered, calibration) = resolve_layout(&mut producer, &args, None).unwrap();

        assert_eq!(crop, CropRect { x: 10, y: 20, w: 256, h: 240 });
        assert_eq!((gdx, gdy), (0, 0));
        assert!(buffered.is_empty());
        assert!(calibration.is_none());
    }

    #[test]
    fn auto_calibration_on_empty_stream_falls_back_to_full_frame() {
        let args = base_args();
        let empty: &[u8] = &[];
        let mut producer = FrameProducer::new(empty, args.width, args.height);
        let (crop, gdx, gdy, buffered, calibration) = resolve_layout(&mut producer, &args, None).unwrap();

        assert_eq!(crop, CropRect { x: 0, y: 0, w: args.width, h: args.height });
        assert_eq!((gdx, gdy), (0, 0));
        assert!(buffered.is_empty());
        assert!(calibration.is_none());
    }
}
