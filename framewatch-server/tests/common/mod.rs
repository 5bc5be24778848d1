//! Shared fixtures for relay integration tests

#![allow(dead_code)]

use framewatch_eye::error::VisionError;
use framewatch_eye::models::{DetectedObject, ObjectDetector};
use framewatch_eye::DetectionPipeline;
use framewatch_server::executor::InferenceExecutor;
use framewatch_server::{serve, AppState};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Detector returning a canned result and counting its calls
pub struct FakeDetector {
    result: Result<Vec<DetectedObject>, String>,
    pub calls: AtomicUsize,
}

impl FakeDetector {
    pub fn returning(objects: Vec<DetectedObject>) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(objects),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ObjectDetector for FakeDetector {
    fn detect(&self, _frame: &DynamicImage) -> Result<Vec<DetectedObject>, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(objects) => Ok(objects.clone()),
            Err(message) => Err(VisionError::Processing(message.clone())),
        }
    }
}

pub fn object(class_id: usize, confidence: f32, bbox: (f32, f32, f32, f32)) -> DetectedObject {
    DetectedObject {
        class_id,
        class_name: format!("class_{}", class_id),
        confidence,
        bbox,
    }
}

/// Objects straddling the 0.65 threshold
pub fn mixed_objects() -> Vec<DetectedObject> {
    vec![
        object(1, 0.91, (10.7, 20.2, 110.9, 220.5)),
        object(2, 0.40, (0.0, 0.0, 5.0, 5.0)),
        object(3, 0.65, (1.0, 2.0, 3.0, 4.0)),
        object(4, 0.64, (1.0, 1.0, 2.0, 2.0)),
    ]
}

pub fn png_frame() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb([200, 10, 10])));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn app_state(detector: Arc<FakeDetector>, workers: usize) -> AppState {
    let pipeline = DetectionPipeline::with_default_threshold(detector);
    let executor = InferenceExecutor::new(workers).unwrap();
    AppState::new(pipeline, executor, "fake.onnx")
}

/// Start a relay on an ephemeral port and return its address
pub async fn spawn_relay(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        serve(listener, state, std::future::pending()).await.unwrap();
    });
    addr
}
