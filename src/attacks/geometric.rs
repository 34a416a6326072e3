//! @ai:module:intent Geometric attacks: rotation, scaling, cropping and resizing
//! @ai:module:layer domain
//! @ai:module:public_api rotation, scaling, cropping, resize, Affine
//! @ai:module:stateless true

use crate::attacks::error::TransformError;
use crate::dataset::raster::Raster;
use image::imageops::FilterType;
use image::DynamicImage;

/// @ai:intent 2x3 affine matrix mapping source coordinates to destination coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine(pub [[f64; 3]; 2]);

impl Affine {
    /// @ai:intent Rotation by `angle` degrees (counter-clockwise) about a center, with scale
    /// @ai:effects pure
    pub fn rotation(cx: f64, cy: f64, angle: f64, scale: f64) -> Self {
        let theta = angle.to_radians();
        let alpha = scale * theta.cos();
        let beta = scale * theta.sin();
        Self([
            [alpha, beta, (1.0 - alpha) * cx - beta * cy],
            [-beta, alpha, beta * cx + (1.0 - alpha) * cy],
        ])
    }

    /// @ai:post None when the linear part is singular
    /// @ai:effects pure
    pub fn invert(&self) -> Option<Self> {
        let [[a, b, c], [d, e, f]] = self.0;
        let det = a * e - b * d;
        if det == 0.0 {
            return None;
        }
        let (ia, ib, id, ie) = (e / det, -b / det, -d / det, a / det);
        Some(Self([
            [ia, ib, -(ia * c + ib * f)],
            [id, ie, -(id * c + ie * f)],
        ]))
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [[a, b, c], [d, e, f]] = self.0;
        (a * x + b * y + c, d * x + e * y + f)
    }
}

/// @ai:intent Bilinear sample of one channel plane, zero outside the image
/// @ai:effects pure
pub(crate) fn sample_bilinear(plane: &[f64], width: usize, height: usize, x: f64, y: f64) -> f64 {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let at = |xi: f64, yi: f64| -> f64 {
        if xi < 0.0 || yi < 0.0 || xi >= width as f64 || yi >= height as f64 {
            0.0
        } else {
            plane[yi as usize * width + xi as usize]
        }
    };

    let top = at(x0, y0) * (1.0 - fx) + at(x0 + 1.0, y0) * fx;
    let bottom = at(x0, y0 + 1.0) * (1.0 - fx) + at(x0 + 1.0, y0 + 1.0) * fx;
    top * (1.0 - fy) + bottom * fy
}

/// @ai:intent Warp an image with an affine forward map into a canvas of the given size
/// @ai:post uncovered canvas pixels are zero
/// @ai:effects pure
fn warp_affine(
    image: &DynamicImage,
    matrix: &Affine,
    width: u32,
    height: u32,
) -> Result<DynamicImage, TransformError> {
    let inverse = matrix.invert().ok_or(TransformError::Geometry {
        width: width as i64,
        height: height as i64,
    })?;

    let source = Raster::from_image(image);
    let (sw, sh) = (source.width() as usize, source.height() as usize);
    let mut target = source.blank_like(width, height);

    for channel in 0..source.channels() {
        let plane = source.plane(channel);
        for y in 0..height {
            for x in 0..width {
                let (sx, sy) = inverse.apply(x as f64, y as f64);
                let value = sample_bilinear(&plane, sw, sh, sx, sy);
                target.set(x, y, channel, value.round().clamp(0.0, 255.0) as u8);
            }
        }
    }

    target.into_image().ok_or(TransformError::Geometry {
        width: width as i64,
        height: height as i64,
    })
}

/// @ai:intent Rotate about the center onto an expanded canvas that holds the whole rotated image
/// @ai:post exposed corners are black
/// @ai:effects pure
pub fn rotation(image: &DynamicImage, angle: f64) -> Result<DynamicImage, TransformError> {
    let (w, h) = (image.width() as f64, image.height() as f64);
    let (cx, cy) = (w / 2.0, h / 2.0);

    let mut matrix = Affine::rotation(cx, cy, angle, 1.0);
    let cos = matrix.0[0][0].abs();
    let sin = matrix.0[0][1].abs();
    let new_w = (h * sin + w * cos) as i64;
    let new_h = (h * cos + w * sin) as i64;

    if new_w <= 0 || new_h <= 0 {
        return Err(TransformError::Geometry {
            width: new_w,
            height: new_h,
        });
    }

    matrix.0[0][2] += new_w as f64 / 2.0 - cx;
    matrix.0[1][2] += new_h as f64 / 2.0 - cy;

    warp_affine(image, &matrix, new_w as u32, new_h as u32)
}

/// @ai:intent Bilinear resize by a uniform factor, truncating the new dimensions
/// @ai:effects pure
pub fn scaling(image: &DynamicImage, scale_factor: f64) -> Result<DynamicImage, TransformError> {
    let new_w = (image.width() as f64 * scale_factor) as i64;
    let new_h = (image.height() as f64 * scale_factor) as i64;
    resize_checked(image, new_w, new_h)
}

/// @ai:intent Remove `percentage` of each dimension from every side
/// @ai:post unchanged copy when the crop would remove half of a dimension or more
/// @ai:effects pure
pub fn cropping(image: &DynamicImage, percentage: f64) -> Result<DynamicImage, TransformError> {
    if !(percentage >= 0.0) {
        return Err(TransformError::InvalidArgument {
            name: "percentage".to_string(),
            reason: format!("must be non-negative, got {percentage}"),
        });
    }

    let (w, h) = (image.width(), image.height());
    let crop_h = (h as f64 * percentage) as u32;
    let crop_w = (w as f64 * percentage) as u32;

    if crop_h >= h / 2 || crop_w >= w / 2 {
        return Ok(image.clone());
    }

    Ok(image.crop_imm(crop_w, crop_h, w - 2 * crop_w, h - 2 * crop_h))
}

/// @ai:intent Bilinear resize to exact dimensions
/// @ai:effects pure
pub fn resize(image: &DynamicImage, size: (u32, u32)) -> Result<DynamicImage, TransformError> {
    resize_checked(image, size.0 as i64, size.1 as i64)
}

fn resize_checked(image: &DynamicImage, width: i64, height: i64) -> Result<DynamicImage, TransformError> {
    if width <= 0 || height <= 0 || width > u32::MAX as i64 || height > u32::MAX as i64 {
        return Err(TransformError::Geometry { width, height });
    }
    Ok(image.resize_exact(width as u32, height as u32, FilterType::Triangle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(w, h, |x, y| Luma([((x * 7 + y * 3) % 256) as u8])))
    }

    #[test]
    fn test_rotation_zero_is_identity() {
        let image = gradient(16, 12);
        let rotated = rotation(&image, 0.0).unwrap();
        assert_eq!(rotated, image);
    }

    #[test]
    fn test_rotation_expands_canvas() {
        let image = gradient(100, 50);
        let rotated = rotation(&image, 90.0).unwrap();
        // cos(90deg) is not exactly zero, so truncation can drop a pixel
        assert!((49..=50).contains(&rotated.width()));
        assert!((99..=100).contains(&rotated.height()));

        let rotated = rotation(&image, 45.0).unwrap();
        assert!(rotated.width() > 100);
        assert!(rotated.height() > 50);
    }

    #[test]
    fn test_rotation_fills_corners_black() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, image::Rgb([200, 200, 200])));
        let rotated = rotation(&image, 45.0).unwrap().to_rgb8();
        assert_eq!(rotated.get_pixel(0, 0).0, [0, 0, 0]);
        let c = rotated.width() / 2;
        assert_eq!(rotated.get_pixel(c, c).0, [200, 200, 200]);
    }

    #[test]
    fn test_affine_inverse_roundtrip() {
        let m = Affine::rotation(3.0, 4.0, 30.0, 1.0);
        let inv = m.invert().unwrap();
        let (x, y) = m.apply(10.0, -2.0);
        let (bx, by) = inv.apply(x, y);
        assert!((bx - 10.0).abs() < 1e-9);
        assert!((by + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_scaling_truncates_dimensions() {
        let scaled = scaling(&gradient(10, 7), 1.5).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (15, 10));
        assert!(scaling(&gradient(10, 7), 0.0).is_err());
    }

    #[test]
    fn test_cropping_removes_border() {
        let cropped = cropping(&gradient(100, 50), 0.1).unwrap();
        assert_eq!((cropped.width(), cropped.height()), (80, 40));
    }

    #[test]
    fn test_cropping_too_aggressive_copies() {
        let image = gradient(20, 20);
        assert_eq!(cropping(&image, 0.5).unwrap(), image);
        assert!(cropping(&image, -0.1).is_err());
    }

    #[test]
    fn test_resize_exact() {
        let resized = resize(&gradient(20, 20), (8, 4)).unwrap();
        assert_eq!((resized.width(), resized.height()), (8, 4));
        assert!(resize(&gradient(20, 20), (0, 4)).is_err());
    }
}
