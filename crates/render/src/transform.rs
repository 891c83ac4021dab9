use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::instrument;

pub const DEFAULT_QUALITY: u8 = 85;
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 200;
pub const MAX_THUMBNAIL_SIZE: u32 = 500;

/// A requested resize, in pixels, plus the JPEG quality of the output.
///
/// A zero dimension means "derive from the other one"; both zero means
/// "keep the original size".
///
/// - **Both set:** shrink to fit inside the box, keeping the aspect ratio.
///   Images already inside the box are not enlarged.
/// - **Only one set:** scale to exactly that dimension, keeping the aspect
///   ratio (this may enlarge).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl Transform {
    /// Quality is clamped to 1..=100.
    pub fn new(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width,
            height,
            quality: quality.clamp(1, 100),
        }
    }

    /// A square bounding box for thumbnails. Sizes of 0 or above
    /// [`MAX_THUMBNAIL_SIZE`] fall back to [`DEFAULT_THUMBNAIL_SIZE`].
    pub fn thumbnail(size: u32) -> Self {
        let size = if (1..=MAX_THUMBNAIL_SIZE).contains(&size) { size } else { DEFAULT_THUMBNAIL_SIZE };
        Self::new(size, size, DEFAULT_QUALITY)
    }

    /// Whether applying this transform changes the image's dimensions at all.
    pub fn is_resize(&self) -> bool {
        self.width > 0 || self.height > 0
    }

    /// Cap requested dimensions at `max_width` × `max_height`. Unset (zero)
    /// dimensions stay unset.
    #[must_use]
    pub fn clamp(self, max_width: u32, max_height: u32) -> Self {
        Self {
            width: self.width.min(max_width),
            height: self.height.min(max_height),
            ..self
        }
    }

    /// Output dimensions for a source image of `width` × `height`.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if width == 0 || height == 0 {
            return (width, height);
        }
        let scale = |value: u32, numerator: u32, denominator: u32| -> u32 {
            let scaled = (u64::from(value) * u64::from(numerator) + u64::from(denominator) / 2) / u64::from(denominator);
            u32::try_from(scaled).unwrap_or(u32::MAX).max(1)
        };
        match (self.width, self.height) {
            (0, 0) => (width, height),
            (w, 0) => (w, scale(height, w, width)),
            (0, h) => (scale(width, h, height), h),
            (w, h) if width <= w && height <= h => (width, height),
            // Compare w/width against h/height without floating point.
            (w, h) if u64::from(w) * u64::from(height) <= u64::from(h) * u64::from(width) => {
                (w, scale(height, w, width))
            },
            (_, h) => (scale(width, h, height), h),
        }
    }

    /// Decode `input`, resize it, and re-encode it as JPEG.
    #[instrument(skip(input), fields(input_size = input.len(), output_size))]
    pub fn apply(&self, input: &[u8]) -> Result<Vec<u8>> {
        let source = image::load_from_memory(input).or_raise(|| ErrorKind::Decode)?;
        let (width, height) = source.dimensions();
        let (target_width, target_height) = self.target_dimensions(width, height);
        let resized = if (target_width, target_height) == (width, height) {
            source
        } else {
            source.resize_exact(target_width, target_height, FilterType::Lanczos3)
        };
        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
        let mut output = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut output, self.quality))
            .or_raise(|| ErrorKind::Encode)?;
        tracing::Span::current().record("output_size", output.len());
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use rstest::rstest;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 128]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[rstest]
    // Keep
    #[case((0, 0), (800, 1200), (800, 1200))]
    // Width only, shrink and enlarge
    #[case((400, 0), (800, 1200), (400, 600))]
    #[case((1600, 0), (800, 1200), (1600, 2400))]
    // Height only
    #[case((0, 300), (800, 1200), (200, 300))]
    // Box, limited by height
    #[case((1000, 600), (800, 1200), (400, 600))]
    // Box, limited by width
    #[case((200, 1000), (800, 1200), (200, 300))]
    // Box larger than the image: untouched
    #[case((1920, 1080), (640, 480), (640, 480))]
    // Never collapses to zero
    #[case((1, 0), (1000, 10), (1, 1))]
    fn test_target_dimensions(#[case] request: (u32, u32), #[case] source: (u32, u32), #[case] expected: (u32, u32)) {
        let transform = Transform::new(request.0, request.1, DEFAULT_QUALITY);
        assert_eq!(transform.target_dimensions(source.0, source.1), expected);
    }

    #[rstest]
    #[case(0, DEFAULT_THUMBNAIL_SIZE)]
    #[case(1, 1)]
    #[case(320, 320)]
    #[case(500, 500)]
    #[case(501, DEFAULT_THUMBNAIL_SIZE)]
    fn test_thumbnail_size(#[case] size: u32, #[case] expected: u32) {
        let transform = Transform::thumbnail(size);
        assert_eq!((transform.width, transform.height), (expected, expected));
        assert_eq!(transform.quality, DEFAULT_QUALITY);
    }

    #[test]
    fn test_quality_and_clamp() {
        assert_eq!(Transform::new(0, 0, 0).quality, 1);
        assert_eq!(Transform::new(0, 0, 255).quality, 100);
        let clamped = Transform::new(4000, 0, 90).clamp(1920, 1080);
        assert_eq!(clamped, Transform::new(1920, 0, 90));
        assert!(!Transform::default().is_resize());
        assert!(clamped.is_resize());
    }

    #[test]
    fn test_apply_resizes_and_encodes_jpeg() {
        let output = Transform::new(30, 0, 80).apply(&png(60, 40)).unwrap();
        let decoded = image::load_from_memory(&output).unwrap();
        assert_eq!(decoded.dimensions(), (30, 20));
        assert_eq!(image::guess_format(&output).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_apply_rejects_garbage() {
        let err = Transform::thumbnail(100).apply(b"definitely not an image").unwrap_err();
        assert_eq!(*err, ErrorKind::Decode);
    }
}
