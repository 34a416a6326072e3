//! @ai:module:intent JSON persistence of a complete run
//! @ai:module:layer infrastructure
//! @ai:module:public_api JsonReporter, JsonReporterTrait
//! @ai:module:stateless true

use crate::metrics::types::RunResults;
use anyhow::{Context, Result};
use std::path::Path;

/// @ai:intent Trait for JSON report generation
pub trait JsonReporterTrait: Send + Sync {
    /// @ai:intent Generate JSON report from results
    fn generate(&self, results: &RunResults, output_path: &Path) -> Result<()>;

    /// @ai:intent Read back a results.json written by `generate`
    fn load(&self, path: &Path) -> Result<RunResults>;
}

/// @ai:intent Writes and reads results.json
pub struct JsonReporter;

impl JsonReporter {
    /// @ai:intent Create a new JSON reporter
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReporterTrait for JsonReporter {
    /// @ai:effects fs:write
    fn generate(&self, results: &RunResults, output_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(output_path, json)?;
        Ok(())
    }

    /// @ai:effects fs:read
    fn load(&self, path: &Path) -> Result<RunResults> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::types::{
        AttackCategory, CapacityResult, DistortionMetrics, RobustnessMetrics, TrialKey, TrialRecord,
    };
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_generate_and_load_json_report() {
        let reporter = JsonReporter::new();
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("results.json");

        let key = TrialKey {
            image_id: "a.png".to_string(),
            algorithm: "example_lsb".to_string(),
            payload_size: 2,
        };
        let results = RunResults {
            timestamp: "2026-01-19_00-00-00".to_string(),
            run_name: "smoke".to_string(),
            records: vec![
                TrialRecord::measured(
                    &key,
                    AttackCategory::None,
                    "clean",
                    "none",
                    DistortionMetrics {
                        psnr: f64::INFINITY,
                        ssim: 1.0,
                        ncc_image: 1.0,
                        ..Default::default()
                    },
                    RobustnessMetrics::from_payloads("ab", "ab"),
                    "ab",
                    "ab",
                ),
                TrialRecord::failed(&key, "ab", "boom"),
            ],
            capacity: vec![CapacityResult {
                image_id: "a.png".to_string(),
                algorithm: "example_lsb".to_string(),
                max_valid_length: 31,
                upper_bound: 100,
                tolerance: 0,
                distortion: DistortionMetrics::zeroed(),
                probes: vec![],
            }],
            category_scores: vec![],
            scores: vec![],
        };

        reporter.generate(&results, &output).unwrap();
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("\"run_name\": \"smoke\""));
        assert!(!content.contains("\"error\": null"));

        let loaded = reporter.load(&output).unwrap();
        assert_eq!(loaded.records, results.records);
        assert_eq!(loaded.capacity, results.capacity);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("results.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(JsonReporter::new().load(&path).is_err());
    }
}
