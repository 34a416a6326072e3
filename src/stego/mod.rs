//! @ai:module:intent Capability contract for steganography algorithms under test
//! @ai:module:layer domain
//! @ai:module:public_api StegoAlgorithm, StegoError, LsbStego, ExternalAlgorithm, build_algorithms

pub mod external;
pub mod lsb;

pub use external::ExternalAlgorithm;
pub use lsb::LsbStego;

use crate::config::AlgorithmConfig;
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// @ai:intent Errors raised by algorithm implementations
#[derive(Error, Debug)]
pub enum StegoError {
    #[error("payload too large for cover image: {bits} bits needed, {capacity} available")]
    PayloadTooLarge { bits: usize, capacity: usize },

    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("command '{program}' failed ({status}): {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("command did not produce {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("{0}")]
    Other(String),
}

/// @ai:intent Embed/extract capability implemented by every algorithm under test
pub trait StegoAlgorithm: Send + Sync {
    /// @ai:intent Stable identifier used as the grouping key in records and reports
    fn name(&self) -> &str;

    /// @ai:intent Hide a payload in a cover image
    /// @ai:post fails when the payload exceeds the cover's capacity
    fn embed(&self, cover: &DynamicImage, payload: &str) -> Result<DynamicImage, StegoError>;

    /// @ai:intent Recover a payload; may return garbage or fail on corrupted input
    fn extract(&self, stego: &DynamicImage) -> Result<String, StegoError>;

    /// @ai:intent Whether embed/extract pairs from different trials may interleave on one instance
    /// @ai:post false makes the evaluator run this algorithm's units one at a time
    fn reentrant(&self) -> bool {
        true
    }
}

/// @ai:intent Instantiate the configured algorithms
/// @ai:effects fs:write (external adapters create a scratch directory)
pub fn build_algorithms(configs: &[AlgorithmConfig]) -> Result<Vec<Arc<dyn StegoAlgorithm>>, StegoError> {
    configs
        .iter()
        .map(|config| -> Result<Arc<dyn StegoAlgorithm>, StegoError> {
            match config {
                AlgorithmConfig::Lsb => Ok(Arc::new(LsbStego::new())),
                AlgorithmConfig::External {
                    name,
                    program,
                    embed_args,
                    extract_args,
                } => Ok(Arc::new(ExternalAlgorithm::new(
                    name,
                    program,
                    embed_args.clone(),
                    extract_args.clone(),
                )?)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_algorithms_from_config() {
        let configs = vec![
            AlgorithmConfig::Lsb,
            AlgorithmConfig::External {
                name: "paper".to_string(),
                program: "true".to_string(),
                embed_args: vec![],
                extract_args: vec![],
            },
        ];
        let algorithms = build_algorithms(&configs).unwrap();
        let names: Vec<_> = algorithms.iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["example_lsb", "paper"]);
        assert!(algorithms[0].reentrant());
        assert!(!algorithms[1].reentrant());
    }
}
