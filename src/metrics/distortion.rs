//! @ai:module:intent Visual distortion metrics between a cover image and a stego or attacked image
//! @ai:module:layer domain
//! @ai:module:public_api match_dims, calculate_distortion, calculate_mse, calculate_rmse, calculate_psnr, calculate_ssim, calculate_aad, calculate_nad, calculate_correlation_coefficient
//! @ai:module:stateless true

use crate::dataset::raster::{conform, Raster};
use crate::metrics::types::DistortionMetrics;
use image::imageops::FilterType;
use image::DynamicImage;
use std::borrow::Cow;

const MAX_PIXEL: f64 = 255.0;
const SSIM_K1: f64 = 0.01;
const SSIM_K2: f64 = 0.03;
const SSIM_MAX_WINDOW: u32 = 7;

/// @ai:intent Resize (and recolor) the second image to the first's geometry before comparison
/// @ai:effects pure
pub fn match_dims<'a>(reference: &DynamicImage, other: &'a DynamicImage) -> Cow<'a, DynamicImage> {
    let same_dims = reference.width() == other.width() && reference.height() == other.height();
    if same_dims && reference.color() == other.color() {
        return Cow::Borrowed(other);
    }

    let resized = if same_dims {
        other.clone()
    } else {
        other.resize_exact(reference.width(), reference.height(), FilterType::Triangle)
    };
    Cow::Owned(conform(resized, reference.color()))
}

/// @ai:intent Compute all seven distortion metrics with a single dimension normalization
/// @ai:effects pure
pub fn calculate_distortion(cover: &DynamicImage, other: &DynamicImage) -> DistortionMetrics {
    let other = match_dims(cover, other);
    let a = Raster::from_image(cover);
    let b = Raster::from_image(&other);

    let mse = mse_samples(a.samples(), b.samples());
    DistortionMetrics {
        mse,
        rmse: mse.sqrt(),
        psnr: psnr_from_mse(mse),
        ssim: ssim_rasters(&a, &b),
        aad: aad_samples(a.samples(), b.samples()),
        nad: nad_samples(a.samples(), b.samples()),
        ncc_image: correlation_samples(a.samples(), b.samples()),
    }
}

/// @ai:intent Mean squared error over all samples
/// @ai:effects pure
pub fn calculate_mse(cover: &DynamicImage, other: &DynamicImage) -> f64 {
    let (a, b) = rasters(cover, other);
    mse_samples(a.samples(), b.samples())
}

/// @ai:intent Root mean squared error
/// @ai:effects pure
pub fn calculate_rmse(cover: &DynamicImage, other: &DynamicImage) -> f64 {
    calculate_mse(cover, other).sqrt()
}

/// @ai:intent Peak signal-to-noise ratio in dB
/// @ai:post +infinity when mse == 0
/// @ai:effects pure
pub fn calculate_psnr(cover: &DynamicImage, other: &DynamicImage) -> f64 {
    psnr_from_mse(calculate_mse(cover, other))
}

/// @ai:intent Structural similarity averaged over channels
/// @ai:effects pure
pub fn calculate_ssim(cover: &DynamicImage, other: &DynamicImage) -> f64 {
    let (a, b) = rasters(cover, other);
    ssim_rasters(&a, &b)
}

/// @ai:intent Average absolute difference
/// @ai:effects pure
pub fn calculate_aad(cover: &DynamicImage, other: &DynamicImage) -> f64 {
    let (a, b) = rasters(cover, other);
    aad_samples(a.samples(), b.samples())
}

/// @ai:intent Absolute difference normalized by the cover's absolute sum
/// @ai:post 0.0 for an all-black cover
/// @ai:effects pure
pub fn calculate_nad(cover: &DynamicImage, other: &DynamicImage) -> f64 {
    let (a, b) = rasters(cover, other);
    nad_samples(a.samples(), b.samples())
}

/// @ai:intent Pearson correlation of the flattened samples
/// @ai:post 0.0 substituted when undefined (constant image)
/// @ai:effects pure
pub fn calculate_correlation_coefficient(cover: &DynamicImage, other: &DynamicImage) -> f64 {
    let (a, b) = rasters(cover, other);
    correlation_samples(a.samples(), b.samples())
}

fn rasters(cover: &DynamicImage, other: &DynamicImage) -> (Raster, Raster) {
    let other = match_dims(cover, other);
    (Raster::from_image(cover), Raster::from_image(&other))
}

fn mse_samples(a: &[u8], b: &[u8]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    sum / a.len() as f64
}

fn psnr_from_mse(mse: f64) -> f64 {
    if mse == 0.0 {
        return f64::INFINITY;
    }
    20.0 * (MAX_PIXEL / mse.sqrt()).log10()
}

fn aad_samples(a: &[u8], b: &[u8]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let sum: f64 = a.iter().zip(b).map(|(&x, &y)| (x as f64 - y as f64).abs()).sum();
    sum / a.len() as f64
}

fn nad_samples(a: &[u8], b: &[u8]) -> f64 {
    let reference: f64 = a.iter().map(|&x| x as f64).sum();
    if reference == 0.0 {
        return 0.0;
    }
    let diff: f64 = a.iter().zip(b).map(|(&x, &y)| (x as f64 - y as f64).abs()).sum();
    diff / reference
}

fn correlation_samples(a: &[u8], b: &[u8]) -> f64 {
    let n = a.len() as f64;
    if a.is_empty() {
        return 0.0;
    }

    let mean_a = a.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = b.iter().map(|&v| v as f64).sum::<f64>() / n;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let r = cov / (var_a * var_b).sqrt();
    if r.is_nan() {
        0.0
    } else {
        r.clamp(-1.0, 1.0)
    }
}

/// @ai:intent Odd comparison window no larger than the smaller dimension, at least 3
/// @ai:effects pure
fn ssim_window(width: u32, height: u32) -> u32 {
    let mut win = SSIM_MAX_WINDOW.min(width.min(height));
    if win % 2 == 0 {
        win = win.saturating_sub(1);
    }
    win.max(3)
}

fn ssim_rasters(a: &Raster, b: &Raster) -> f64 {
    let channels = a.channels();
    if channels == 0 || a.samples().is_empty() {
        return 0.0;
    }

    let total: f64 = (0..channels)
        .map(|c| {
            ssim_plane(
                &a.plane(c),
                &b.plane(c),
                a.width() as usize,
                a.height() as usize,
            )
        })
        .sum();
    total / channels as f64
}

/// Summed-area table with a zero row and column prepended.
struct Integral {
    stride: usize,
    sums: Vec<f64>,
}

impl Integral {
    fn new(values: impl Fn(usize) -> f64, width: usize, height: usize) -> Self {
        let stride = width + 1;
        let mut sums = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += values(y * width + x);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { stride, sums }
    }

    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        let s = self.stride;
        self.sums[(y + h) * s + x + w] - self.sums[y * s + x + w] - self.sums[(y + h) * s + x]
            + self.sums[y * s + x]
    }
}

/// Mean SSIM over every window fully inside the plane.
fn ssim_plane(x: &[f64], y: &[f64], width: usize, height: usize) -> f64 {
    let win = ssim_window(width as u32, height as u32) as usize;
    let (ww, wh) = if width >= win && height >= win {
        (win, win)
    } else {
        (width, height)
    };

    let np = (ww * wh) as f64;
    let cov_norm = if np > 1.0 { np / (np - 1.0) } else { 1.0 };
    let c1 = (SSIM_K1 * MAX_PIXEL).powi(2);
    let c2 = (SSIM_K2 * MAX_PIXEL).powi(2);

    let ix = Integral::new(|i| x[i], width, height);
    let iy = Integral::new(|i| y[i], width, height);
    let ixx = Integral::new(|i| x[i] * x[i], width, height);
    let iyy = Integral::new(|i| y[i] * y[i], width, height);
    let ixy = Integral::new(|i| x[i] * y[i], width, height);

    let mut total = 0.0;
    let mut count = 0usize;

    for top in 0..=(height - wh) {
        for left in 0..=(width - ww) {
            let ux = ix.window(left, top, ww, wh) / np;
            let uy = iy.window(left, top, ww, wh) / np;
            let uxx = ixx.window(left, top, ww, wh) / np;
            let uyy = iyy.window(left, top, ww, wh) / np;
            let uxy = ixy.window(left, top, ww, wh) / np;

            let vx = cov_norm * (uxx - ux * ux);
            let vy = cov_norm * (uyy - uy * uy);
            let vxy = cov_norm * (uxy - ux * uy);

            let a1 = 2.0 * ux * uy + c1;
            let a2 = 2.0 * vxy + c2;
            let b1 = ux * ux + uy * uy + c1;
            let b2 = vx + vy + c2;

            total += (a1 * a2) / (b1 * b2);
            count += 1;
        }
    }

    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
            Luma([((x * 13 + y * 7) % 256) as u8])
        }))
    }

    #[test]
    fn test_identical_images_are_undistorted() {
        let image = gradient(16, 16);
        let m = calculate_distortion(&image, &image);

        assert_eq!(m.mse, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert!(m.psnr.is_infinite() && m.psnr > 0.0);
        assert_eq!(m.ssim, 1.0);
        assert_eq!(m.aad, 0.0);
        assert_eq!(m.nad, 0.0);
        assert!((m.ncc_image - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_image_correlation_is_zero() {
        let flat = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([128])));
        assert_eq!(calculate_correlation_coefficient(&flat, &flat), 0.0);
        assert_eq!(calculate_ssim(&flat, &flat), 1.0);
    }

    #[test]
    fn test_mse_and_psnr_for_uniform_offset() {
        let a = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([100])));
        let b = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([110])));

        assert_eq!(calculate_mse(&a, &b), 100.0);
        assert_eq!(calculate_rmse(&a, &b), 10.0);
        assert!((calculate_psnr(&a, &b) - 20.0 * (25.5f64).log10()).abs() < 1e-9);
        assert_eq!(calculate_aad(&a, &b), 10.0);
        assert!((calculate_nad(&a, &b) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_nad_black_cover() {
        let black = DynamicImage::ImageLuma8(GrayImage::new(4, 4));
        let white = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([255])));
        assert_eq!(calculate_nad(&black, &white), 0.0);
    }

    #[test]
    fn test_mismatched_dimensions_are_resized() {
        let cover = gradient(16, 16);
        let smaller = gradient(8, 8);
        let resized = match_dims(&cover, &smaller);

        assert_eq!(resized.width(), 16);
        assert_eq!(resized.height(), 16);
        assert!(calculate_mse(&cover, &smaller).is_finite());
    }

    #[test]
    fn test_color_mismatch_is_conformed() {
        let gray = gradient(8, 8);
        let color = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([10, 20, 30])));
        assert_eq!(match_dims(&gray, &color).color(), gray.color());
    }

    #[test]
    fn test_ssim_window_selection() {
        assert_eq!(ssim_window(512, 512), 7);
        assert_eq!(ssim_window(6, 100), 5);
        assert_eq!(ssim_window(4, 4), 3);
        assert_eq!(ssim_window(2, 2), 3);
    }

    #[test]
    fn test_ssim_tiny_image_uses_whole_image() {
        let a = gradient(2, 2);
        assert_eq!(calculate_ssim(&a, &a), 1.0);
    }

    #[test]
    fn test_ssim_drops_under_noise() {
        let a = gradient(32, 32);
        let b = DynamicImage::ImageLuma8(GrayImage::from_fn(32, 32, |x, y| {
            Luma([((x * 13 + y * 7) % 256) as u8 ^ ((x * y) % 64) as u8])
        }));
        let ssim = calculate_ssim(&a, &b);
        assert!(ssim < 1.0);
        assert!(ssim > -1.0);
    }
}
