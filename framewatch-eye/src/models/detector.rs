//! Detector abstraction shared by the pipeline and the model backends

use crate::error::VisionError;
use image::DynamicImage;

/// Object reported by a detection model, in original-image pixels
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedObject {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f32,
    pub bbox: (f32, f32, f32, f32), // x1, y1, x2, y2
}

/// A loaded model that turns a decoded frame into detections.
///
/// Implementations are shared between inference workers, so `detect` takes
/// `&self` and must be safe to call from several threads at once.
#[cfg_attr(test, mockall::automock)]
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, frame: &DynamicImage) -> Result<Vec<DetectedObject>, VisionError>;
}
