//! @ai:module:intent Flat 8-bit sample view over normalized images for per-sample transforms
//! @ai:module:layer domain
//! @ai:module:public_api Raster, normalize, conform
//! @ai:module:stateless true

use image::{ColorType, DynamicImage, GrayImage, RgbImage, RgbaImage};

/// @ai:intent Reduce any decoded image to 8-bit Luma, RGB or RGBA
/// @ai:post color() is one of L8, Rgb8, Rgba8
/// @ai:effects pure
pub fn normalize(image: DynamicImage) -> DynamicImage {
    match image.color() {
        ColorType::L8 | ColorType::Rgb8 | ColorType::Rgba8 => image,
        ColorType::L16 => DynamicImage::ImageLuma8(image.to_luma8()),
        color if color.has_alpha() => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

/// @ai:intent Convert an image to the given normalized color type
/// @ai:effects pure
pub fn conform(image: DynamicImage, color: ColorType) -> DynamicImage {
    if image.color() == color {
        return image;
    }
    match color {
        ColorType::L8 => DynamicImage::ImageLuma8(image.to_luma8()),
        ColorType::Rgba8 => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

/// @ai:intent Interleaved sample buffer with its geometry and color type
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    color: ColorType,
    samples: Vec<u8>,
}

impl Raster {
    /// @ai:intent Copy the samples of an image, normalizing its color type first
    /// @ai:effects pure
    pub fn from_image(image: &DynamicImage) -> Self {
        let normalized = match image.color() {
            ColorType::L8 | ColorType::Rgb8 | ColorType::Rgba8 => None,
            _ => Some(normalize(image.clone())),
        };
        let source = normalized.as_ref().unwrap_or(image);

        Self {
            width: source.width(),
            height: source.height(),
            color: source.color(),
            samples: source.as_bytes().to_vec(),
        }
    }

    /// @ai:intent Zero-filled raster with the same color type and new dimensions
    /// @ai:effects pure
    pub fn blank_like(&self, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * self.channels();
        Self {
            width,
            height,
            color: self.color,
            samples: vec![0; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color(&self) -> ColorType {
        self.color
    }

    pub fn channels(&self) -> usize {
        self.color.channel_count() as usize
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [u8] {
        &mut self.samples
    }

    /// @ai:intent Offset of sample (x, y, channel) in the interleaved buffer
    /// @ai:pre x < width, y < height, channel < channels
    /// @ai:effects pure
    pub fn offset(&self, x: u32, y: u32, channel: usize) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels() + channel
    }

    pub fn get(&self, x: u32, y: u32, channel: usize) -> u8 {
        self.samples[self.offset(x, y, channel)]
    }

    pub fn set(&mut self, x: u32, y: u32, channel: usize, value: u8) {
        let offset = self.offset(x, y, channel);
        self.samples[offset] = value;
    }

    /// @ai:intent One channel as a row-major f64 plane
    /// @ai:effects pure
    pub fn plane(&self, channel: usize) -> Vec<f64> {
        self.samples
            .iter()
            .skip(channel)
            .step_by(self.channels())
            .map(|&v| v as f64)
            .collect()
    }

    /// @ai:intent Rebuild a DynamicImage of the recorded color type
    /// @ai:post None only if the buffer length disagrees with the geometry
    /// @ai:effects pure
    pub fn into_image(self) -> Option<DynamicImage> {
        let Raster {
            width,
            height,
            color,
            samples,
        } = self;

        match color {
            ColorType::L8 => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
            ColorType::Rgba8 => {
                RgbaImage::from_raw(width, height, samples).map(DynamicImage::ImageRgba8)
            }
            _ => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_raster_roundtrip_preserves_pixels() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_fn(3, 2, |x, y| Luma([(x + 10 * y) as u8])));
        let raster = Raster::from_image(&image);

        assert_eq!(raster.channels(), 1);
        assert_eq!(raster.get(2, 1, 0), 12);

        let back = raster.into_image().unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn test_normalize_drops_sixteen_bit_depth() {
        let image = DynamicImage::new_luma16(4, 4);
        assert_eq!(normalize(image).color(), ColorType::L8);

        let image = DynamicImage::new_luma_a8(4, 4);
        assert_eq!(normalize(image).color(), ColorType::Rgba8);
    }

    #[test]
    fn test_plane_extracts_single_channel() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 1, image::Rgb([1, 2, 3])));
        let raster = Raster::from_image(&image);
        assert_eq!(raster.plane(1), vec![2.0, 2.0]);
    }
}
