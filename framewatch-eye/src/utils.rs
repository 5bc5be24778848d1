//! Utility functions for vision processing

use crate::error::VisionError;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};

/// Gray used by YOLO letterboxing
const PAD_VALUE: u8 = 114;

/// Geometry of an aspect-preserving resize into a square network input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub resized_width: u32,
    pub resized_height: u32,
    pub original_width: u32,
    pub original_height: u32,
}

impl Letterbox {
    /// Compute the letterbox that fits `width x height` into `target x target`
    pub fn fit(width: u32, height: u32, target: u32) -> Result<Self, VisionError> {
        if width == 0 || height == 0 {
            return Err(VisionError::Processing("Invalid image dimensions".to_string()));
        }
        if target == 0 {
            return Err(VisionError::Processing("Target dimensions cannot be zero".to_string()));
        }

        let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
        let resized_width = ((width as f32 * scale).round() as u32).clamp(1, target);
        let resized_height = ((height as f32 * scale).round() as u32).clamp(1, target);

        Ok(Self {
            scale,
            pad_x: (target - resized_width) / 2,
            pad_y: (target - resized_height) / 2,
            resized_width,
            resized_height,
            original_width: width,
            original_height: height,
        })
    }

    /// Map a point from network-input space back onto the original image,
    /// clamped to its bounds
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let ox = (x - self.pad_x as f32) / self.scale;
        let oy = (y - self.pad_y as f32) / self.scale;
        (
            ox.clamp(0.0, self.original_width as f32),
            oy.clamp(0.0, self.original_height as f32),
        )
    }
}

/// Letterbox a frame into a normalized RGB tensor laid out as [3, H, W]
pub fn letterbox_chw_tensor(
    frame: &DynamicImage,
    letterbox: &Letterbox,
    target: u32,
) -> Result<Vec<f32>, VisionError> {
    let total = (target as usize)
        .checked_mul(target as usize)
        .and_then(|p| p.checked_mul(3))
        .ok_or_else(|| VisionError::Processing("Target dimensions too large, would overflow".to_string()))?;

    let rgb = frame.to_rgb8();
    let resized = imageops::resize(
        &rgb,
        letterbox.resized_width,
        letterbox.resized_height,
        FilterType::Triangle,
    );

    let mut canvas = RgbImage::from_pixel(target, target, Rgb([PAD_VALUE; 3]));
    imageops::overlay(&mut canvas, &resized, letterbox.pad_x as i64, letterbox.pad_y as i64);

    let plane = (target as usize) * (target as usize);
    let mut chw = vec![0.0f32; total];
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let idx = y as usize * target as usize + x as usize;
        chw[idx] = pixel[0] as f32 / 255.0;
        chw[plane + idx] = pixel[1] as f32 / 255.0;
        chw[2 * plane + idx] = pixel[2] as f32 / 255.0;
    }

    Ok(chw)
}

/// Intersection over union of two (x1, y1, x2, y2) boxes
pub fn compute_iou(a: &(f32, f32, f32, f32), b: &(f32, f32, f32, f32)) -> f32 {
    let inter_w = (a.2.min(b.2) - a.0.max(b.0)).max(0.0);
    let inter_h = (a.3.min(b.3) - a.1.max(b.1)).max(0.0);
    let inter_area = inter_w * inter_h;

    let area_a = (a.2 - a.0).max(0.0) * (a.3 - a.1).max(0.0);
    let area_b = (b.2 - b.0).max(0.0) * (b.3 - b.1).max(0.0);
    let union_area = area_a + area_b - inter_area;

    if union_area <= 0.0 || !union_area.is_finite() {
        return 0.0;
    }

    let iou = inter_area / union_area;
    if iou.is_finite() {
        iou.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
