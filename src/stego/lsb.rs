//! @ai:module:intent Reference least-significant-bit algorithm over flattened image samples
//! @ai:module:layer domain
//! @ai:module:public_api LsbStego
//! @ai:module:stateless true

use crate::dataset::raster::Raster;
use crate::metrics::robustness::payload_bits;
use crate::stego::{StegoAlgorithm, StegoError};
use image::DynamicImage;

const TERMINATOR_BITS: usize = 8;

/// @ai:intent Writes payload bits into sample LSBs, followed by a null byte
#[derive(Debug, Clone, Copy, Default)]
pub struct LsbStego;

impl LsbStego {
    pub fn new() -> Self {
        Self
    }
}

impl StegoAlgorithm for LsbStego {
    fn name(&self) -> &str {
        "example_lsb"
    }

    /// @ai:intent Embed the payload bits plus an 8-bit null terminator
    /// @ai:pre payload bits + 8 <= width * height * channels
    /// @ai:effects pure
    fn embed(&self, cover: &DynamicImage, payload: &str) -> Result<DynamicImage, StegoError> {
        let mut bits = payload_bits(payload);
        bits.extend(std::iter::repeat(0).take(TERMINATOR_BITS));

        let mut raster = Raster::from_image(cover);
        let capacity = raster.samples().len();
        if bits.len() > capacity {
            return Err(StegoError::PayloadTooLarge {
                bits: bits.len(),
                capacity,
            });
        }

        for (sample, bit) in raster.samples_mut().iter_mut().zip(&bits) {
            *sample = (*sample & 0xFE) | bit;
        }

        raster
            .into_image()
            .ok_or_else(|| StegoError::Other("stego buffer does not match cover geometry".to_string()))
    }

    /// @ai:intent Read LSBs up to the first null byte
    /// @ai:post without a terminator every sample is read; a trailing partial byte becomes one char
    /// @ai:effects pure
    fn extract(&self, stego: &DynamicImage) -> Result<String, StegoError> {
        let raster = Raster::from_image(stego);
        let mut bits: Vec<u8> = Vec::new();

        for sample in raster.samples() {
            bits.push(sample & 1);
            if bits.len() % 8 == 0 && bits[bits.len() - 8..].iter().all(|b| *b == 0) {
                bits.truncate(bits.len() - 8);
                break;
            }
        }

        Ok(bits
            .chunks(8)
            .map(|chunk| char::from(chunk.iter().fold(0u8, |acc, b| (acc << 1) | b)))
            .collect())
    }
}
