//! Wire-level detection records

use crate::models::DetectedObject;
use serde::{Deserialize, Serialize};

/// One detection as sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` in source-frame pixels
    pub bbox: [i32; 4],
}

impl From<&DetectedObject> for Detection {
    fn from(obj: &DetectedObject) -> Self {
        let (x1, y1, x2, y2) = obj.bbox;
        Self {
            class_id: obj.class_id as u32,
            confidence: obj.confidence,
            // Truncate toward zero
            bbox: [x1 as i32, y1 as i32, x2 as i32, y2 as i32],
        }
    }
}

/// Reply for a single frame. The `detections` key is always serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub detections: Vec<Detection>,
}

impl DetectionResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
