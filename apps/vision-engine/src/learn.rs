//! Learn-mode batch driver: runs the same detection/validation pipeline as
//! [`crate::pipeline::run_streaming`] but accumulates a
//! [`vision_proto::report::LearnReport`] instead of streaming per-frame
//! deltas, POSTing and writing it once at EOF.

use std::io;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use vision_core::detector::FrameDetector;
use vision_core::frame::NesFrame;
use vision_logic::temporal::TemporalBuffer;
use vision_logic::validator::GameLogicValidator;
use vision_proto::report::LearnReportBuilder;
use vision_transport::client::VisionClient;
use vision_transport::snapshot::{write_learn_snapshot, SnapshotPolicy};

use crate::args::Args;
use crate::pipeline::{resolve_layout, FrameProducer, DEFAULT_LIFE_ROW};

pub fn run_learn(args: &Args) -> Result<()> {
    let session_id = args.session_id.as_deref().context("--learn requires --session-id")?;

    let template_dir = args.templates.to_string_lossy().into_owned();
    let mut detector = FrameDetector::new(&template_dir, DEFAULT_LIFE_ROW)
        .context("failed to load detector templates")?;
    let mut temporal = TemporalBuffer::new(vision_logic::temporal::DEFAULT_BUFFER_SIZE);
    let mut validator = GameLogicValidator::new(Default::default());
    let client = args.server.as_ref().map(|url| VisionClient::new(url.clone()));

    let stdin = io::stdin();
    let mut producer = FrameProducer::new(stdin.lock(), args.width, args.height);
    let (crop, gdx, gdy, buffered, calibration) = resolve_layout(&mut producer, args, client.as_ref())?;

    let mut report = LearnReportBuilder::new(session_id, &args.racer);
    if let Some(calibration) = calibration {
        report.set_calibration(calibration);
    }
    let mut snapshot_policy = SnapshotPolicy::new(args.snapshot_interval_frames);
    let mut snapshot_index = 0u32;

    let mut prev_screen_type = String::new();
    let mut frame_number = 0u64;
    let mut anomalies_drained = 0usize;
    let mut buffered = buffered.into_iter();

    loop {
        let raw = match buffered.next() {
            Some(frame) => frame,
            None => match producer.next_frame()? {
                Some(frame) => frame,
                None => {
                    info!(frame_number, "stdin EOF, assembling learn report");
                    break;
                }
            },
        };

        let cropped = raw.crop_padded(crop.x, crop.y, crop.w, crop.h);
        let mut nf = NesFrame::new(cropped, gdx, gdy);
        let detected = detector.detect(&mut nf);
        let stable = temporal.process(detected);
        let validated = validator.validate(stable, frame_number);

        report.record_frame(frame_number, &validated.screen_type, &validated.events);

        let anomalies = validator.get_anomalies();
        for anomaly in &anomalies[anomalies_drained..] {
            report.record_anomaly(anomaly.clone());
        }
        anomalies_drained = anomalies.len();

        if let Some(reason) =
            snapshot_policy.should_snapshot(frame_number, &validated.screen_type, &prev_screen_type)
        {
            match write_learn_snapshot(&args.data_dir, session_id, snapshot_index, reason, frame_number, nf.crop()) {
                Ok(path) => {
                    report.record_snapshot(frame_number, reason, path.to_string_lossy());
                    snapshot_index += 1;
                }
                Err(err) => warn!(error = %err, "failed to write learn snapshot"),
            }
        }

        prev_screen_type = validated.screen_type;
        frame_number += 1;
    }

    let report = report.finish();
    debug!(frames = report.frame_count, events = report.events.len(), "learn report assembled");

    if let Err(err) = vision_transport::report_writer::write_report(&args.data_dir, session_id, &report) {
        warn!(error = %err, "failed to write learn report to disk");
    }

    if let Some(client) = &client {
        client.post_learn_report(session_id, &report)?;
    }

    Ok(())
}
