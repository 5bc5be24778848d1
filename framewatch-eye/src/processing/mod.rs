//! Frame processing: decoding, detection records and the per-frame pipeline

pub mod detection;
pub mod frame;
pub mod pipeline;

pub use detection::{Detection, DetectionResponse};
pub use frame::decode_frame;
pub use pipeline::{DetectionPipeline, FrameReport, DEFAULT_CONFIDENCE_THRESHOLD};
