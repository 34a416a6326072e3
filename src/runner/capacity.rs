//! @ai:module:intent Binary search for the largest payload an algorithm round-trips on a cover
//! @ai:module:layer domain
//! @ai:module:public_api CapacitySearch
//! @ai:module:stateless true

use crate::dataset::CoverImage;
use crate::metrics::distortion::calculate_distortion;
use crate::metrics::robustness::calculate_ber;
use crate::metrics::types::{CapacityProbe, CapacityResult, DistortionMetrics};
use crate::runner::payload::generate_payload;
use crate::stego::StegoAlgorithm;
use rand::Rng;
use tracing::debug;

/// @ai:intent Capacity search bounds
///
/// The search stops once at most `tolerance` candidate lengths remain
/// unprobed, so `max_valid_length` may sit up to `tolerance` below the true
/// maximum. A zero tolerance gives the exact maximum for algorithms whose
/// success is monotone in payload length. With `tolerance >= upper_bound` no
/// length is probed and the result is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacitySearch {
    pub upper_bound: usize,
    pub tolerance: usize,
}

impl CapacitySearch {
    pub fn new(upper_bound: usize, tolerance: usize) -> Self {
        Self {
            upper_bound,
            tolerance,
        }
    }

    /// @ai:intent Whether a fresh payload of `length` embeds and extracts with zero bit errors
    /// @ai:post any embed or extract error counts as failure
    fn round_trips<R: Rng>(algorithm: &dyn StegoAlgorithm, cover: &CoverImage, length: usize, rng: &mut R) -> bool {
        let payload = generate_payload(length, rng);
        algorithm
            .embed(&cover.image, &payload)
            .and_then(|stego| algorithm.extract(&stego))
            .map(|extracted| calculate_ber(&payload, &extracted) == 0.0)
            .unwrap_or(false)
    }

    /// @ai:intent Search [1, upper_bound] and measure distortion at the length found
    /// @ai:post every probed length below max_valid_length succeeded
    /// @ai:post distortion is zeroed when nothing succeeded or the final embed fails
    /// @ai:effects pure (algorithm side effects aside)
    pub fn run<R: Rng>(&self, algorithm: &dyn StegoAlgorithm, cover: &CoverImage, rng: &mut R) -> CapacityResult {
        let mut low = 1usize;
        let mut high = self.upper_bound;
        let mut best = 0usize;
        let mut probes = Vec::new();

        while low <= high && high - low + 1 > self.tolerance {
            let mid = low + (high - low) / 2;
            let success = Self::round_trips(algorithm, cover, mid, rng);
            probes.push(CapacityProbe {
                length: mid,
                success,
            });

            if success {
                best = mid;
                low = mid + 1;
            } else {
                high = mid - 1;
            }
        }

        debug!(
            "Capacity of {} on {}: {} after {} probes",
            algorithm.name(),
            cover.id,
            best,
            probes.len()
        );

        let distortion = if best == 0 {
            DistortionMetrics::zeroed()
        } else {
            let payload = generate_payload(best, rng);
            algorithm
                .embed(&cover.image, &payload)
                .map(|stego| calculate_distortion(&cover.image, &stego))
                .unwrap_or_else(|_| DistortionMetrics::zeroed())
        };

        CapacityResult {
            image_id: cover.id.clone(),
            algorithm: algorithm.name().to_string(),
            max_valid_length: best,
            upper_bound: self.upper_bound,
            tolerance: self.tolerance,
            distortion,
            probes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stego::{LsbStego, StegoError};
    use image::{DynamicImage, GrayImage, Luma};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    /// Round-trips payloads up to a fixed length.
    struct FixedCapacity {
        capacity: usize,
        stored: Mutex<String>,
    }

    impl FixedCapacity {
        fn new(capacity: usize) -> Self {
            Self {
                capacity,
                stored: Mutex::new(String::new()),
            }
        }
    }

    impl StegoAlgorithm for FixedCapacity {
        fn name(&self) -> &str {
            "fixed"
        }

        fn embed(&self, cover: &DynamicImage, payload: &str) -> Result<DynamicImage, StegoError> {
            if payload.len() > self.capacity {
                return Err(StegoError::PayloadTooLarge {
                    bits: payload.len() * 8,
                    capacity: self.capacity * 8,
                });
            }
            *self.stored.lock().unwrap() = payload.to_string();
            Ok(cover.clone())
        }

        fn extract(&self, _stego: &DynamicImage) -> Result<String, StegoError> {
            Ok(self.stored.lock().unwrap().clone())
        }
    }

    fn cover(side: u32) -> CoverImage {
        CoverImage::new(
            "c.png",
            "c.png",
            DynamicImage::ImageLuma8(GrayImage::from_fn(side, side, |x, y| Luma([((x * 5 + y * 11) % 256) as u8]))),
        )
    }

    #[test]
    fn test_exact_search_with_zero_tolerance() {
        let search = CapacitySearch::new(1000, 0);
        let result = search.run(&FixedCapacity::new(337), &cover(8), &mut StdRng::seed_from_u64(1));
        assert_eq!(result.max_valid_length, 337);
        assert!(result.probes.len() <= 11);
    }

    #[test]
    fn test_tolerance_bounds_the_error() {
        let search = CapacitySearch::new(100_000, 50);
        let result = search.run(&FixedCapacity::new(4321), &cover(8), &mut StdRng::seed_from_u64(2));
        assert!(result.max_valid_length <= 4321);
        assert!(4321 - result.max_valid_length <= 50);
    }

    #[test]
    fn test_probes_are_consistent_with_result() {
        let search = CapacitySearch::new(5000, 7);
        let result = search.run(&FixedCapacity::new(1234), &cover(8), &mut StdRng::seed_from_u64(3));
        for probe in &result.probes {
            if probe.length <= result.max_valid_length {
                assert!(probe.success, "probe {} below the result failed", probe.length);
            }
        }
    }

    #[test]
    fn test_nothing_fits_yields_zero_and_zeroed_distortion() {
        let search = CapacitySearch::new(100, 0);
        let result = search.run(&FixedCapacity::new(0), &cover(8), &mut StdRng::seed_from_u64(4));
        assert_eq!(result.max_valid_length, 0);
        assert_eq!(result.distortion, DistortionMetrics::zeroed());
        assert!(result.probes.iter().all(|p| !p.success));
    }

    #[test]
    fn test_tolerance_wider_than_range_probes_nothing() {
        let search = CapacitySearch::new(40, 50);
        let result = search.run(&FixedCapacity::new(30), &cover(8), &mut StdRng::seed_from_u64(5));
        assert!(result.probes.is_empty());
        assert_eq!(result.max_valid_length, 0);
    }

    #[test]
    fn test_lsb_capacity_on_small_cover() {
        // 16x16 gray: 256 sample bits, 8 reserved for the terminator -> 31 chars
        let search = CapacitySearch::new(200, 0);
        let result = search.run(&LsbStego::new(), &cover(16), &mut StdRng::seed_from_u64(6));
        assert_eq!(result.max_valid_length, 31);
        assert!(result.distortion.psnr > 40.0);
    }
}
