//! @ai:module:intent Additive and multiplicative noise attacks driven by a caller-supplied RNG
//! @ai:module:layer domain
//! @ai:module:public_api gaussian, salt_pepper, speckle, poisson
//! @ai:module:stateless true

use crate::attacks::error::TransformError;
use crate::dataset::raster::Raster;
use image::{ColorType, DynamicImage};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashSet;

/// Poisson draws switch to the normal approximation above this mean.
const POISSON_EXACT_LIMIT: f64 = 30.0;

/// @ai:intent Standard normal draw (Box-Muller)
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// @ai:intent Poisson draw with the given mean
fn poisson_draw(lambda: f64, rng: &mut StdRng) -> f64 {
    if lambda <= 0.0 {
        return 0.0;
    }
    if lambda < POISSON_EXACT_LIMIT {
        let limit = (-lambda).exp();
        let mut k = 0u32;
        let mut p = 1.0;
        loop {
            p *= rng.gen::<f64>();
            if p <= limit {
                return k as f64;
            }
            k += 1;
        }
    }
    (lambda + lambda.sqrt() * standard_normal(rng)).round().max(0.0)
}

/// Number of leading channels that carry color; alpha is left untouched.
fn color_channels(raster: &Raster) -> usize {
    match raster.color() {
        ColorType::Rgba8 => 3,
        _ => raster.channels(),
    }
}

/// @ai:intent Apply a per-sample function to every color sample
fn map_color_samples<F>(image: &DynamicImage, mut f: F) -> Result<DynamicImage, TransformError>
where
    F: FnMut(f64) -> f64,
{
    let mut raster = Raster::from_image(image);
    let channels = raster.channels();
    let colors = color_channels(&raster);

    for pixel in raster.samples_mut().chunks_mut(channels) {
        for sample in pixel.iter_mut().take(colors) {
            *sample = f(*sample as f64).clamp(0.0, 255.0) as u8;
        }
    }

    rebuild(raster)
}

fn rebuild(raster: Raster) -> Result<DynamicImage, TransformError> {
    let (width, height) = (raster.width() as i64, raster.height() as i64);
    raster
        .into_image()
        .ok_or(TransformError::Geometry { width, height })
}

fn non_negative(name: &str, value: f64) -> Result<f64, TransformError> {
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(TransformError::InvalidArgument {
            name: name.to_string(),
            reason: format!("must be non-negative, got {value}"),
        })
    }
}

/// @ai:intent Add N(mean, var) noise scaled to the 0..255 range
/// @ai:effects pure
pub fn gaussian(image: &DynamicImage, mean: f64, var: f64, rng: &mut StdRng) -> Result<DynamicImage, TransformError> {
    let sigma = non_negative("var", var)?.sqrt();
    map_color_samples(image, |v| v + (mean + sigma * standard_normal(rng)) * 255.0)
}

/// @ai:intent Force a fraction of samples to 255 (salt) or 0 (pepper)
/// @ai:post positions are drawn per axis; the last index of each axis is never hit
/// @ai:effects pure
pub fn salt_pepper(
    image: &DynamicImage,
    amount: f64,
    salt_vs_pepper: f64,
    rng: &mut StdRng,
) -> Result<DynamicImage, TransformError> {
    let amount = non_negative("amount", amount)?;
    let mut raster = Raster::from_image(image);
    let total = raster.samples().len() as f64;
    let (w, h, c) = (raster.width(), raster.height(), color_channels(&raster));

    let axis = |rng: &mut StdRng, len: u32| -> u32 {
        if len <= 1 {
            0
        } else {
            rng.gen_range(0..len - 1)
        }
    };

    let salt = (amount * total * salt_vs_pepper).ceil().max(0.0) as usize;
    let pepper = (amount * total * (1.0 - salt_vs_pepper)).ceil().max(0.0) as usize;

    for (count, value) in [(salt, 255u8), (pepper, 0u8)] {
        for _ in 0..count {
            let y = axis(rng, h);
            let x = axis(rng, w);
            if c == 1 {
                raster.set(x, y, 0, value);
            } else {
                let channel = axis(rng, c as u32) as usize;
                raster.set(x, y, channel, value);
            }
        }
    }

    rebuild(raster)
}

/// @ai:intent Multiplicative noise: v + v * N(0, var)
/// @ai:effects pure
pub fn speckle(image: &DynamicImage, var: f64, rng: &mut StdRng) -> Result<DynamicImage, TransformError> {
    let sigma = non_negative("var", var)?.sqrt();
    map_color_samples(image, |v| v + v * sigma * standard_normal(rng))
}

/// @ai:intent Shot noise with a quantization level derived from the number of distinct sample values
/// @ai:effects pure
pub fn poisson(image: &DynamicImage, rng: &mut StdRng) -> Result<DynamicImage, TransformError> {
    let raster = Raster::from_image(image);
    let channels = raster.channels();
    let colors = color_channels(&raster);

    let distinct: HashSet<u8> = raster
        .samples()
        .chunks(channels)
        .flat_map(|pixel| pixel.iter().take(colors).copied())
        .collect();
    let levels = 2f64.powf((distinct.len().max(1) as f64).log2().ceil());

    map_color_samples(image, |v| poisson_draw((v + 1e-6) * levels, rng) / levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbaImage};
    use rand::SeedableRng;

    fn gray(value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([value])))
    }

    #[test]
    fn test_gaussian_zero_variance_is_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let image = gray(100);
        assert_eq!(gaussian(&image, 0.0, 0.0, &mut rng).unwrap(), image);
    }

    #[test]
    fn test_gaussian_same_seed_same_output() {
        let image = gray(128);
        let a = gaussian(&image, 0.0, 0.01, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = gaussian(&image, 0.0, 0.01, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, image);
    }

    #[test]
    fn test_gaussian_rejects_negative_variance() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(gaussian(&gray(1), 0.0, -1.0, &mut rng).is_err());
    }

    #[test]
    fn test_salt_pepper_only_writes_extremes() {
        let mut rng = StdRng::seed_from_u64(3);
        let noisy = salt_pepper(&gray(128), 0.2, 0.5, &mut rng).unwrap().to_luma8();
        assert!(noisy.pixels().all(|p| [0, 128, 255].contains(&p[0])));
        assert!(noisy.pixels().any(|p| p[0] == 255));
        assert!(noisy.pixels().any(|p| p[0] == 0));
        // last row and column are out of reach
        assert!((0..32).all(|i| noisy.get_pixel(31, i)[0] == 128));
    }

    #[test]
    fn test_speckle_leaves_black_untouched() {
        let mut rng = StdRng::seed_from_u64(5);
        let image = gray(0);
        assert_eq!(speckle(&image, 0.04, &mut rng).unwrap(), image);
    }

    #[test]
    fn test_noise_keeps_alpha() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, image::Rgba([50, 60, 70, 200])));
        let mut rng = StdRng::seed_from_u64(9);
        let noisy = gaussian(&image, 0.0, 0.05, &mut rng).unwrap().to_rgba8();
        assert!(noisy.pixels().all(|p| p[3] == 200));
    }

    #[test]
    fn test_poisson_stays_close_to_input() {
        let mut rng = StdRng::seed_from_u64(11);
        let black = poisson(&gray(0), &mut rng).unwrap().to_luma8();
        assert!(black.pixels().all(|p| p[0] <= 1));

        let noisy = poisson(&gray(100), &mut rng).unwrap().to_luma8();
        let mean = noisy.pixels().map(|p| p[0] as f64).sum::<f64>() / 1024.0;
        assert!((mean - 100.0).abs() < 5.0);
    }
}
