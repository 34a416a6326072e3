//! @ai:module:intent Lossy compression attack: in-memory JPEG encode/decode
//! @ai:module:layer domain
//! @ai:module:public_api jpeg
//! @ai:module:stateless true

use crate::attacks::error::TransformError;
use crate::dataset::raster::conform;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage, ImageFormat};

/// @ai:intent Re-encode as JPEG at the given quality and decode back
/// @ai:post output has the input's dimensions and color type; alpha comes back opaque
/// @ai:example quality 0 is treated as 1, quality above 100 as 100
/// @ai:effects pure
pub fn jpeg(image: &DynamicImage, quality: i64) -> Result<DynamicImage, TransformError> {
    let quality = quality.clamp(1, 100) as u8;
    let color = image.color();

    let rgb;
    let encodable = if color == ColorType::Rgba8 {
        rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        &rgb
    } else {
        image
    };

    let mut buffer = Vec::new();
    encodable.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, quality))?;

    let decoded = image::load_from_memory_with_format(&buffer, ImageFormat::Jpeg)?;
    Ok(conform(decoded, color))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbaImage};

    fn textured() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(32, 32, |x, y| Luma([((x * 31 + y * 17) % 256) as u8])))
    }

    #[test]
    fn test_jpeg_preserves_geometry_and_color() {
        let out = jpeg(&textured(), 50).unwrap();
        assert_eq!((out.width(), out.height()), (32, 32));
        assert_eq!(out.color(), ColorType::L8);

        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, image::Rgba([10, 20, 30, 40])));
        let out = jpeg(&rgba, 90).unwrap();
        assert_eq!(out.color(), ColorType::Rgba8);
    }

    #[test]
    fn test_jpeg_is_deterministic() {
        assert_eq!(jpeg(&textured(), 75).unwrap(), jpeg(&textured(), 75).unwrap());
    }

    #[test]
    fn test_jpeg_quality_out_of_range_is_clamped() {
        assert_eq!(jpeg(&textured(), 0).unwrap(), jpeg(&textured(), 1).unwrap());
        assert_eq!(jpeg(&textured(), 250).unwrap(), jpeg(&textured(), 100).unwrap());
    }

    #[test]
    fn test_lower_quality_distorts_more() {
        let image = textured();
        let err = |q| {
            let out = jpeg(&image, q).unwrap();
            image
                .as_bytes()
                .iter()
                .zip(out.as_bytes())
                .map(|(a, b)| (*a as i64 - *b as i64).abs())
                .sum::<i64>()
        };
        assert!(err(10) > err(95));
    }
}
