//! YOLO object detection model

use crate::config::ModelConfig;
use crate::error::VisionError;
use crate::models::detector::{DetectedObject, ObjectDetector};
use crate::models::labels::ClassNames;
use crate::utils::{compute_iou, letterbox_chw_tensor, Letterbox};
use image::DynamicImage;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use parking_lot::{Mutex, MutexGuard};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Memory layout of the raw prediction tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// `[1, N, 5 + nc]`: cx, cy, w, h, objectness, class scores
    V5 { candidates: usize, classes: usize },
    /// `[1, 4 + nc, N]`: cx, cy, w, h, class scores
    V8 { candidates: usize, classes: usize },
}

impl OutputLayout {
    /// Infer the layout from the output tensor shape. Candidates always
    /// outnumber attributes for real exports, which is what tells the two apart.
    pub fn detect(shape: &[i64]) -> Result<Self, VisionError> {
        if shape.len() != 3 || shape[0] != 1 {
            return Err(VisionError::Ort(format!("Unexpected YOLO output shape: {:?}", shape)));
        }
        let (a, b) = (
            usize::try_from(shape[1]).map_err(|_| VisionError::Ort("Negative output dimension".to_string()))?,
            usize::try_from(shape[2]).map_err(|_| VisionError::Ort("Negative output dimension".to_string()))?,
        );

        if a >= b && b > 5 {
            Ok(OutputLayout::V5 { candidates: a, classes: b - 5 })
        } else if b > a && a > 4 {
            Ok(OutputLayout::V8 { candidates: b, classes: a - 4 })
        } else {
            Err(VisionError::Ort(format!("Unrecognised YOLO output shape: {:?}", shape)))
        }
    }

    fn candidates(&self) -> usize {
        match self {
            OutputLayout::V5 { candidates, .. } | OutputLayout::V8 { candidates, .. } => *candidates,
        }
    }
}

/// Box in network-input space before NMS
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: (f32, f32, f32, f32), // x1, y1, x2, y2
}

/// Turn a raw prediction tensor into scored candidates above `min_confidence`
pub fn decode_predictions(
    shape: &[i64],
    data: &[f32],
    min_confidence: f32,
) -> Result<Vec<Candidate>, VisionError> {
    let layout = OutputLayout::detect(shape)?;
    let expected = shape[1..].iter().product::<i64>() as usize;
    if data.len() < expected {
        return Err(VisionError::Ort(format!(
            "Output tensor holds {} values, shape {:?} needs {}",
            data.len(),
            shape,
            expected
        )));
    }

    let mut candidates = Vec::new();
    for i in 0..layout.candidates() {
        let (geometry, class_id, confidence) = match layout {
            OutputLayout::V5 { classes, .. } => {
                let row = &data[i * (classes + 5)..(i + 1) * (classes + 5)];
                let objectness = row[4];
                if objectness < min_confidence {
                    continue;
                }
                let (class_id, score) = best_class(row[5..].iter().copied());
                ([row[0], row[1], row[2], row[3]], class_id, objectness * score)
            }
            OutputLayout::V8 { candidates, classes } => {
                let at = |attr: usize| data[attr * candidates + i];
                let (class_id, score) = best_class((0..classes).map(|c| at(4 + c)));
                ([at(0), at(1), at(2), at(3)], class_id, score)
            }
        };

        if !confidence.is_finite() || confidence < min_confidence {
            continue;
        }

        let [cx, cy, w, h] = geometry;
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
            continue;
        }

        candidates.push(Candidate {
            class_id,
            confidence,
            bbox: (cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0),
        });
    }

    Ok(candidates)
}

fn best_class(scores: impl Iterator<Item = f32>) -> (usize, f32) {
    scores
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (idx, score)| {
            if score > best.1 {
                (idx, score)
            } else {
                best
            }
        })
}

/// Class-aware non-maximum suppression, highest confidence first
pub fn non_max_suppression(
    mut candidates: Vec<Candidate>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if keep.len() >= max_detections {
            break;
        }
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id && compute_iou(&kept.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            keep.push(candidate);
        }
    }

    keep
}

/// YOLO model for object detection
pub struct YoloModel {
    sessions: Vec<Mutex<Session>>,
    next_session: AtomicUsize,
    input_size: u32,
    model_confidence: f32,
    iou_threshold: f32,
    max_detections: usize,
    class_names: ClassNames,
    source: PathBuf,
}

impl YoloModel {
    /// Load the model at `model_path`, creating one ONNX session per
    /// concurrent caller so workers do not queue behind each other
    pub fn load(model_path: &Path, config: &ModelConfig, instances: usize) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;

        let class_names = match &config.labels {
            Some(path) => ClassNames::from_file(path)?,
            None => ClassNames::coco(),
        };

        let instances = instances.max(1);
        let mut sessions = Vec::with_capacity(instances);
        for _ in 0..instances {
            let session = Session::builder()
                .map_err(|e| VisionError::Ort(format!("Failed to create session builder: {}", e)))?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(|e| VisionError::Ort(format!("Failed to set optimization level: {}", e)))?
                .with_intra_threads(1)
                .map_err(|e| VisionError::Ort(format!("Failed to set intra-op threads: {}", e)))?
                .commit_from_file(model_path)
                .map_err(|e| VisionError::Ort(format!("Failed to load YOLO model: {}", e)))?;
            sessions.push(Mutex::new(session));
        }

        info!("YOLO model loaded from {:?} ({} sessions)", model_path, instances);

        Ok(Self {
            sessions,
            next_session: AtomicUsize::new(0),
            input_size: config.input_size,
            model_confidence: config.model_confidence,
            iou_threshold: config.iou_threshold,
            max_detections: config.max_detections,
            class_names,
            source: model_path.to_path_buf(),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Prefer an idle session; otherwise wait on the next one in rotation
    fn acquire_session(&self) -> MutexGuard<'_, Session> {
        let start = self.next_session.fetch_add(1, Ordering::Relaxed) % self.sessions.len();
        for offset in 0..self.sessions.len() {
            let idx = (start + offset) % self.sessions.len();
            if let Some(guard) = self.sessions[idx].try_lock() {
                return guard;
            }
        }
        self.sessions[start].lock()
    }

    fn infer(&self, input: Vec<f32>) -> Result<Vec<Candidate>, VisionError> {
        let size = self.input_size as i64;
        let tensor = Tensor::from_array((vec![1i64, 3, size, size], input))
            .map_err(|e| VisionError::Ort(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self.acquire_session();
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| VisionError::Ort(format!("YOLO inference failed: {}", e)))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Ort(format!("Failed to extract output tensor: {}", e)))?;
        let shape: Vec<i64> = shape.iter().copied().collect();
        debug!("YOLO output shape: {:?}", shape);

        decode_predictions(&shape, data, self.model_confidence)
    }
}

/// Map surviving candidates from network-input space onto the source frame.
/// Boxes that collapse after clipping (padding-only boxes) are dropped.
fn map_to_frame(letterbox: &Letterbox, kept: Vec<Candidate>, class_names: &ClassNames) -> Vec<DetectedObject> {
    kept.into_iter()
        .filter_map(|c| {
            let (x1, y1) = letterbox.to_original(c.bbox.0, c.bbox.1);
            let (x2, y2) = letterbox.to_original(c.bbox.2, c.bbox.3);
            if x2 <= x1 || y2 <= y1 {
                return None;
            }
            Some(DetectedObject {
                class_id: c.class_id,
                class_name: class_names.name(c.class_id),
                confidence: c.confidence,
                bbox: (x1, y1, x2, y2),
            })
        })
        .collect()
}

impl ObjectDetector for YoloModel {
    fn detect(&self, frame: &DynamicImage) -> Result<Vec<DetectedObject>, VisionError> {
        let letterbox = Letterbox::fit(frame.width(), frame.height(), self.input_size)?;
        let input = letterbox_chw_tensor(frame, &letterbox, self.input_size)?;

        let candidates = self.infer(input)?;
        let kept = non_max_suppression(candidates, self.iou_threshold, self.max_detections);

        let detections = map_to_frame(&letterbox, kept, &self.class_names);
        debug!("YOLO detected {} objects", detections.len());
        Ok(detections)
    }
}
