//! Frame decoding

use image::DynamicImage;
use tracing::debug;

/// Decode an encoded frame (JPEG, PNG, WebP, ...) into an image buffer.
///
/// Returns `None` for anything that is not a decodable, non-empty image.
pub fn decode_frame(bytes: &[u8]) -> Option<DynamicImage> {
    if bytes.is_empty() {
        debug!("Received empty frame");
        return None;
    }

    match image::load_from_memory(bytes) {
        Ok(image) if image.width() > 0 && image.height() > 0 => Some(image),
        Ok(_) => {
            debug!("Decoded frame has zero area");
            None
        }
        Err(e) => {
            debug!("Failed to decode frame of {} bytes: {}", bytes.len(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn encode(format: ImageFormat) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 9, Rgb([10, 200, 30])));
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let frame = decode_frame(&encode(ImageFormat::Png)).unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 9));
    }

    #[test]
    fn test_decode_jpeg() {
        let frame = decode_frame(&encode(ImageFormat::Jpeg)).unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 9));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode_frame(b"not an image at all").is_none());
        assert!(decode_frame(&[]).is_none());
    }

    #[test]
    fn test_decode_truncated() {
        let png = encode(ImageFormat::Png);
        assert!(decode_frame(&png[..png.len() / 2]).is_none());
    }
}
