//! @ai:module:intent Filtering attacks: gaussian blur, median filter and motion blur
//! @ai:module:layer domain
//! @ai:module:public_api gaussian_blur, median, motion_blur
//! @ai:module:stateless true

use crate::attacks::error::TransformError;
use crate::attacks::geometric::{sample_bilinear, Affine};
use crate::dataset::raster::Raster;
use image::DynamicImage;

/// @ai:intent Reflect an index into [0, len) without repeating the edge sample
/// @ai:example (-1, 5) -> 1
/// @ai:example (5, 5) -> 3
/// @ai:effects pure
fn reflect101(mut index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    loop {
        if index < 0 {
            index = -index;
        } else if index > last {
            index = 2 * last - index;
        } else {
            return index as usize;
        }
    }
}

fn odd_kernel(name: &str, size: i64) -> Result<usize, TransformError> {
    if size <= 0 {
        return Err(TransformError::InvalidArgument {
            name: name.to_string(),
            reason: format!("must be positive, got {size}"),
        });
    }
    let size = if size % 2 == 0 { size + 1 } else { size };
    Ok(size as usize)
}

fn rebuild(raster: Raster) -> Result<DynamicImage, TransformError> {
    let (width, height) = (raster.width() as i64, raster.height() as i64);
    raster
        .into_image()
        .ok_or(TransformError::Geometry { width, height })
}

/// @ai:intent Gaussian blur with a square kernel, sigma derived from the kernel size
/// @ai:post even kernel sizes are bumped to the next odd size
/// @ai:effects pure
pub fn gaussian_blur(image: &DynamicImage, kernel_size: i64) -> Result<DynamicImage, TransformError> {
    let k = odd_kernel("kernel_size", kernel_size)?;
    let sigma = 0.3 * ((k as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (k / 2) as f64;

    let mut kernel: Vec<f64> = (0..k)
        .map(|i| (-((i as f64 - center).powi(2)) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|v| *v /= total);

    let source = Raster::from_image(image);
    let (w, h) = (source.width() as usize, source.height() as usize);
    let radius = (k / 2) as isize;
    let mut target = source.clone();

    for channel in 0..source.channels() {
        let plane = source.plane(channel);

        let mut horizontal = vec![0.0; w * h];
        for y in 0..h {
            for x in 0..w {
                horizontal[y * w + x] = kernel
                    .iter()
                    .enumerate()
                    .map(|(i, weight)| {
                        let sx = reflect101(x as isize + i as isize - radius, w);
                        weight * plane[y * w + sx]
                    })
                    .sum();
            }
        }

        for y in 0..h {
            for x in 0..w {
                let value: f64 = kernel
                    .iter()
                    .enumerate()
                    .map(|(i, weight)| {
                        let sy = reflect101(y as isize + i as isize - radius, h);
                        weight * horizontal[sy * w + x]
                    })
                    .sum();
                target.set(x as u32, y as u32, channel, value.round().clamp(0.0, 255.0) as u8);
            }
        }
    }

    rebuild(target)
}

/// @ai:intent Per-channel median over a square window, replicating edge samples
/// @ai:post even kernel sizes are bumped to the next odd size
/// @ai:effects pure
pub fn median(image: &DynamicImage, kernel_size: i64) -> Result<DynamicImage, TransformError> {
    let k = odd_kernel("kernel_size", kernel_size)?;
    let source = Raster::from_image(image);
    if k == 1 {
        return rebuild(source);
    }

    let (w, h) = (source.width() as i64, source.height() as i64);
    let radius = (k / 2) as i64;
    let mut target = source.clone();
    let mut window = Vec::with_capacity(k * k);

    for channel in 0..source.channels() {
        for y in 0..h {
            for x in 0..w {
                window.clear();
                for dy in -radius..=radius {
                    let sy = (y + dy).clamp(0, h - 1) as u32;
                    for dx in -radius..=radius {
                        let sx = (x + dx).clamp(0, w - 1) as u32;
                        window.push(source.get(sx, sy, channel));
                    }
                }
                let mid = window.len() / 2;
                let (_, value, _) = window.select_nth_unstable(mid);
                target.set(x as u32, y as u32, channel, *value);
            }
        }
    }

    rebuild(target)
}

/// @ai:intent Build the normalized line kernel of a motion blur, rotated by `angle` degrees
/// @ai:effects pure
fn motion_kernel(size: usize, angle: f64) -> Vec<f64> {
    let mut line = vec![0.0; size * size];
    let row = (size - 1) / 2;
    for x in 0..size {
        line[row * size + x] = 1.0 / size as f64;
    }

    let c = size as f64 / 2.0 - 0.5;
    let Some(inverse) = Affine::rotation(c, c, angle, 1.0).invert() else {
        return line;
    };

    let mut kernel = vec![0.0; size * size];
    for y in 0..size {
        for x in 0..size {
            let (sx, sy) = inverse.apply(x as f64, y as f64);
            kernel[y * size + x] = sample_bilinear(&line, size, size, sx, sy);
        }
    }
    kernel
}

/// @ai:intent Directional blur along a line of `size` pixels at `angle` degrees
/// @ai:effects pure
pub fn motion_blur(image: &DynamicImage, size: i64, angle: f64) -> Result<DynamicImage, TransformError> {
    if size <= 0 {
        return Err(TransformError::InvalidArgument {
            name: "size".to_string(),
            reason: format!("must be positive, got {size}"),
        });
    }
    let k = size as usize;
    let kernel = motion_kernel(k, angle);

    let source = Raster::from_image(image);
    let (w, h) = (source.width() as usize, source.height() as usize);
    let anchor = (k / 2) as isize;
    let mut target = source.clone();

    for channel in 0..source.channels() {
        let plane = source.plane(channel);
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0.0;
                for ky in 0..k {
                    let sy = reflect101(y as isize + ky as isize - anchor, h);
                    for kx in 0..k {
                        let weight = kernel[ky * k + kx];
                        if weight == 0.0 {
                            continue;
                        }
                        let sx = reflect101(x as isize + kx as isize - anchor, w);
                        acc += weight * plane[sy * w + sx];
                    }
                }
                target.set(x as u32, y as u32, channel, acc.round().clamp(0.0, 255.0) as u8);
            }
        }
    }

    rebuild(target)
}
