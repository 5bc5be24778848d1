use framewatch_eye::FrameReport;
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Relay counters, mirrored into the `metrics` facade
#[derive(Default)]
pub struct RelayMetrics {
    frames_total: AtomicU64,
    frames_undecodable: AtomicU64,
    detections_total: AtomicU64,
    inference_errors: AtomicU64,
    active_connections: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_total: u64,
    pub frames_undecodable: u64,
    pub detections_total: u64,
    pub inference_errors: u64,
    pub active_connections: u64,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&self, report: &FrameReport) {
        self.frames_total.fetch_add(1, Ordering::Relaxed);
        counter!("framewatch_frames_total").increment(1);

        if !report.decoded {
            self.frames_undecodable.fetch_add(1, Ordering::Relaxed);
            counter!("framewatch_frames_undecodable_total").increment(1);
            return;
        }

        let sent = report.response.len() as u64;
        self.detections_total.fetch_add(sent, Ordering::Relaxed);
        counter!("framewatch_detections_total").increment(sent);
        histogram!("framewatch_inference_duration_ms")
            .record(report.inference_time.as_secs_f64() * 1000.0);
    }

    pub fn record_inference_error(&self) {
        self.frames_total.fetch_add(1, Ordering::Relaxed);
        self.inference_errors.fetch_add(1, Ordering::Relaxed);
        counter!("framewatch_frames_total").increment(1);
        counter!("framewatch_inference_errors_total").increment(1);
    }

    pub fn connection_opened(&self) {
        let now = self.active_connections.fetch_add(1, Ordering::Relaxed) + 1;
        gauge!("framewatch_active_connections").set(now as f64);
    }

    pub fn connection_closed(&self) {
        let previous = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        gauge!("framewatch_active_connections").set(previous.saturating_sub(1) as f64);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_total: self.frames_total.load(Ordering::Relaxed),
            frames_undecodable: self.frames_undecodable.load(Ordering::Relaxed),
            detections_total: self.detections_total.load(Ordering::Relaxed),
            inference_errors: self.inference_errors.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
        }
    }
}
