//! Tests for the detection pipeline through the public API

use framewatch_eye::error::VisionError;
use framewatch_eye::models::{DetectedObject, ObjectDetector};
use framewatch_eye::processing::{DetectionPipeline, DetectionResponse, DEFAULT_CONFIDENCE_THRESHOLD};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Detector that returns a fixed set of objects and counts its calls
struct FixedDetector {
    objects: Vec<DetectedObject>,
    calls: AtomicUsize,
}

impl FixedDetector {
    fn new(objects: Vec<DetectedObject>) -> Arc<Self> {
        Arc::new(Self {
            objects,
            calls: AtomicUsize::new(0),
        })
    }
}

impl ObjectDetector for FixedDetector {
    fn detect(&self, _frame: &DynamicImage) -> Result<Vec<DetectedObject>, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects.clone())
    }
}

fn create_detection(class_id: usize, confidence: f32, bbox: (f32, f32, f32, f32)) -> DetectedObject {
    DetectedObject {
        class_id,
        class_name: format!("class_{}", class_id),
        confidence,
        bbox,
    }
}

fn jpeg_frame() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([128, 64, 32])));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
    buf.into_inner()
}

#[test]
fn test_undecodable_frames_produce_empty_list() {
    let detector = FixedDetector::new(vec![create_detection(0, 0.99, (0.0, 0.0, 5.0, 5.0))]);
    let pipeline = DetectionPipeline::with_default_threshold(detector.clone());

    for payload in [&b""[..], &b"\xff\xd8\xff"[..], &b"hello"[..]] {
        let response = pipeline.process(payload).unwrap();
        assert!(response.detections.is_empty());
    }
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_low_confidence_never_emitted() {
    let objects = (0..100)
        .map(|i| create_detection(i, i as f32 / 100.0, (0.0, 0.0, 10.0, 10.0)))
        .collect();
    let detector = FixedDetector::new(objects);
    let pipeline = DetectionPipeline::with_default_threshold(detector);

    let response = pipeline.process(&jpeg_frame()).unwrap();
    assert!(!response.detections.is_empty());
    assert!(response
        .detections
        .iter()
        .all(|d| d.confidence >= DEFAULT_CONFIDENCE_THRESHOLD));
    assert_eq!(response.detections.first().map(|d| d.class_id), Some(65));
}

#[test]
fn test_response_always_has_detections_key() {
    let detector = FixedDetector::new(vec![create_detection(0, 0.2, (0.0, 0.0, 1.0, 1.0))]);
    let pipeline = DetectionPipeline::with_default_threshold(detector);

    for payload in [jpeg_frame(), b"broken".to_vec()] {
        let json = pipeline.process(&payload).unwrap().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("detections").map(|d| d.is_array()).unwrap_or(false));
    }
}

#[test]
fn test_pipeline_is_shareable_across_threads() {
    let detector = FixedDetector::new(vec![create_detection(7, 0.8, (1.0, 1.0, 9.0, 9.0))]);
    let pipeline = Arc::new(DetectionPipeline::with_default_threshold(detector.clone()));
    let frame = Arc::new(jpeg_frame());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = pipeline.clone();
            let frame = frame.clone();
            std::thread::spawn(move || pipeline.process(&frame).unwrap())
        })
        .collect();

    for handle in handles {
        let response: DetectionResponse = handle.join().unwrap();
        assert_eq!(response.detections.len(), 1);
        assert_eq!(response.detections[0].bbox, [1, 1, 9, 9]);
    }
    assert_eq!(detector.calls.load(Ordering::SeqCst), 4);
}
