//! Configuration for framewatch-eye

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Detection model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the exported ONNX weights
    pub path: PathBuf,
    /// HTTPS location to fetch the weights from when `path` is missing
    pub url: Option<String>,
    /// Expected SHA-256 of the weights (hex)
    pub sha256: Option<String>,
    /// Optional class-name file, one name per line
    pub labels: Option<PathBuf>,
    /// Square network input size in pixels
    pub input_size: u32,
    /// Score below which raw candidates are discarded before NMS
    pub model_confidence: f32,
    /// IoU above which overlapping boxes of the same class are suppressed
    pub iou_threshold: f32,
    /// Maximum detections kept per frame after NMS
    pub max_detections: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let path = dirs::home_dir()
            .map(|mut p| {
                p.push(".framewatch");
                p.push("models");
                p.push("best.onnx");
                p
            })
            .unwrap_or_else(|| PathBuf::from("./models/best.onnx"));

        Self {
            path,
            url: None,
            sha256: None,
            labels: None,
            input_size: 640,
            model_confidence: 0.25,
            iou_threshold: 0.45,
            max_detections: 1000,
        }
    }
}

impl ModelConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.input_size == 0 || self.input_size > 4096 {
            return Err("Input size must be between 1 and 4096".to_string());
        }

        // YOLO strides are 8/16/32, so the input must tile evenly
        if self.input_size % 32 != 0 {
            return Err("Input size must be a multiple of 32".to_string());
        }

        if !(0.0..=1.0).contains(&self.model_confidence) {
            return Err("Model confidence must be between 0 and 1".to_string());
        }

        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err("IoU threshold must be between 0 and 1".to_string());
        }

        if self.max_detections == 0 {
            return Err("Max detections must be non-zero".to_string());
        }

        if let Some(url) = &self.url {
            if !url.starts_with("https://") {
                return Err("Model URL must use HTTPS".to_string());
            }
        }

        if let Some(checksum) = &self.sha256 {
            if checksum.len() != 64 || !checksum.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err("SHA-256 checksum must be 64 hex characters".to_string());
            }
        }

        Ok(())
    }
}
