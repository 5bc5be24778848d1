//! Object detection pipeline

use crate::error::VisionError;
use crate::models::ObjectDetector;
use crate::processing::detection::{Detection, DetectionResponse};
use crate::processing::frame::decode_frame;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Minimum confidence a detection needs to be reported to clients
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.65;

/// Decode, detect, filter
pub struct DetectionPipeline {
    detector: Arc<dyn ObjectDetector>,
    confidence_threshold: f32,
}

impl DetectionPipeline {
    pub fn new(detector: Arc<dyn ObjectDetector>, confidence_threshold: f32) -> Self {
        Self {
            detector,
            confidence_threshold,
        }
    }

    pub fn with_default_threshold(detector: Arc<dyn ObjectDetector>) -> Self {
        Self::new(detector, DEFAULT_CONFIDENCE_THRESHOLD)
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Process one encoded frame.
    ///
    /// Frames that fail to decode yield an empty response without touching
    /// the model. Model failures are returned to the caller.
    pub fn process(&self, frame_bytes: &[u8]) -> Result<DetectionResponse, VisionError> {
        self.analyze(frame_bytes).map(|report| report.response)
    }

    /// Like [`process`](Self::process), but also reports what happened to the frame
    pub fn analyze(&self, frame_bytes: &[u8]) -> Result<FrameReport, VisionError> {
        let frame = match decode_frame(frame_bytes) {
            Some(frame) => frame,
            None => {
                return Ok(FrameReport {
                    response: DetectionResponse::empty(),
                    decoded: false,
                    raw_detections: 0,
                    inference_time: Duration::ZERO,
                })
            }
        };

        debug!("Running object detection on {}x{} frame", frame.width(), frame.height());
        let started = Instant::now();
        let objects = self.detector.detect(&frame)?;
        let inference_time = started.elapsed();

        let detections: Vec<Detection> = objects
            .iter()
            .filter(|obj| obj.confidence >= self.confidence_threshold)
            .map(Detection::from)
            .collect();

        debug!(
            "Kept {} of {} detections at threshold {}",
            detections.len(),
            objects.len(),
            self.confidence_threshold
        );

        Ok(FrameReport {
            response: DetectionResponse { detections },
            decoded: true,
            raw_detections: objects.len(),
            inference_time,
        })
    }
}

/// Outcome of a single frame
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub response: DetectionResponse,
    /// False when the payload was not a decodable image
    pub decoded: bool,
    /// Detections returned by the model before confidence filtering
    pub raw_detections: usize,
    /// Time spent inside the detector only
    pub inference_time: Duration,
}
