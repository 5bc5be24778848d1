//! Detection model management and inference

pub mod detector;
pub mod labels;
pub mod manager;
pub mod yolo;

pub use detector::{DetectedObject, ObjectDetector};
pub use labels::{ClassNames, COCO_CLASSES};
pub use manager::ModelManager;
pub use yolo::YoloModel;
