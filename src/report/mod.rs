//! @ai:module:intent Report generation for evaluation runs
//! @ai:module:layer infrastructure
//! @ai:module:public_api ReportGenerator, CsvReporter, JsonReporter, MarkdownReporter, ChartGenerator, assemble_results, run_directory

pub mod charts;
pub mod csv_report;
pub mod json_report;
pub mod markdown_report;

pub use charts::{ChartGenerator, ChartGeneratorTrait};
pub use csv_report::{CsvReporter, CsvReporterTrait};
pub use json_report::{JsonReporter, JsonReporterTrait};
pub use markdown_report::{MarkdownReporter, MarkdownReporterTrait};

use crate::metrics::types::RunResults;
use crate::metrics::{ScoreAggregator, ScoreAggregatorTrait};
use crate::runner::EvaluationOutput;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// @ai:intent Score a finished evaluation and package it for the report sinks
/// @ai:pre output holds the complete record stream of the run
/// @ai:effects pure
pub fn assemble_results(run_name: &str, timestamp: &str, output: EvaluationOutput) -> RunResults {
    let aggregator = ScoreAggregator::new();
    RunResults {
        timestamp: timestamp.to_string(),
        run_name: run_name.to_string(),
        category_scores: aggregator.by_category(&output.records),
        scores: aggregator.overall(&output.records),
        records: output.records,
        capacity: output.capacity,
    }
}

/// @ai:intent `<output_root>/<run_name>_<timestamp>`
/// @ai:effects pure
pub fn run_directory(output_root: &Path, run_name: &str, timestamp: &str) -> PathBuf {
    output_root.join(format!("{run_name}_{timestamp}"))
}

/// @ai:intent Combined report generator
pub struct ReportGenerator {
    csv: CsvReporter,
    json: JsonReporter,
    markdown: MarkdownReporter,
    charts: ChartGenerator,
}

impl ReportGenerator {
    /// @ai:intent Create a new report generator
    /// @ai:effects pure
    pub fn new() -> Self {
        Self {
            csv: CsvReporter::new(),
            json: JsonReporter::new(),
            markdown: MarkdownReporter::new(),
            charts: ChartGenerator::new(),
        }
    }

    /// @ai:intent Generate all reports
    /// @ai:post chart failures are logged, tabular reports are always written
    /// @ai:effects fs:write
    pub fn generate_all(&self, results: &RunResults, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        self.csv.generate(results, &output_dir.join("results.csv"))?;
        self.json.generate(results, &output_dir.join("results.json"))?;
        self.markdown.generate(results, &output_dir.join("summary.md"))?;
        match self.charts.generate_all(results, output_dir) {
            Ok(charts) => tracing::debug!("Charts written: {:?}", charts),
            Err(e) => tracing::warn!("Chart generation failed: {:#}", e),
        }

        tracing::info!("Reports generated in {}", output_dir.display());
        Ok(())
    }

    /// @ai:intent Load a saved results.json
    /// @ai:effects fs:read
    pub fn load(&self, path: &Path) -> Result<RunResults> {
        self.json.load(path)
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::types::{AttackCategory, DistortionMetrics, RobustnessMetrics, TrialKey, TrialRecord};
    use tempfile::TempDir;

    fn output() -> EvaluationOutput {
        let key = TrialKey {
            image_id: "a.png".to_string(),
            algorithm: "example_lsb".to_string(),
            payload_size: 2,
        };
        let metrics = DistortionMetrics {
            psnr: 42.0,
            ssim: 0.99,
            ..Default::default()
        };
        EvaluationOutput {
            records: vec![
                TrialRecord::measured(
                    &key,
                    AttackCategory::None,
                    "clean",
                    "none",
                    metrics,
                    RobustnessMetrics::from_payloads("AB", "AB"),
                    "AB",
                    "AB",
                ),
                TrialRecord::measured(
                    &key,
                    AttackCategory::Compression,
                    "jpeg",
                    "quality=75",
                    metrics,
                    RobustnessMetrics::from_payloads("AB", "AB"),
                    "AB",
                    "AB",
                ),
            ],
            capacity: vec![],
        }
    }

    #[test]
    fn test_assemble_scores_the_stream() {
        let results = assemble_results("smoke", "2026-01-19_00-00-00", output());
        assert_eq!(results.records.len(), 2);
        assert_eq!(results.category_scores.len(), 1);
        assert_eq!(results.category_scores[0].attack_category, AttackCategory::Compression);
        assert_eq!(results.scores.len(), 1);
        assert!(results.scores[0].overall_score.is_some());
    }

    #[test]
    fn test_generate_all_writes_tabular_reports() {
        let temp = TempDir::new().unwrap();
        let dir = run_directory(temp.path(), "smoke", "2026-01-19_00-00-00");
        assert!(dir.ends_with("smoke_2026-01-19_00-00-00"));

        let generator = ReportGenerator::new();
        let results = assemble_results("smoke", "2026-01-19_00-00-00", output());
        generator.generate_all(&results, &dir).unwrap();

        for file in ["results.csv", "results.json", "summary.md"] {
            assert!(dir.join(file).exists(), "{file} missing");
        }
        let reloaded = generator.load(&dir.join("results.json")).unwrap();
        assert_eq!(reloaded.records, results.records);
        assert_eq!(reloaded.scores, results.scores);
    }
}
