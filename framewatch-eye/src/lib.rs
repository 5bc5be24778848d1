//! framewatch-eye: detection core for the framewatch relay
//!
//! Decodes encoded video frames, runs them through a pretrained YOLO model
//! exported to ONNX, and filters the results into wire-ready detection
//! records.

pub mod config;
pub mod error;
pub mod models;
pub mod processing;
mod utils;

pub use config::ModelConfig;
pub use error::VisionError;
pub use models::{DetectedObject, ObjectDetector, YoloModel};
pub use processing::{Detection, DetectionPipeline, DetectionResponse, FrameReport, DEFAULT_CONFIDENCE_THRESHOLD};
