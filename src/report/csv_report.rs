//! @ai:module:intent Flat CSV export of the trial record stream
//! @ai:module:layer infrastructure
//! @ai:module:public_api CsvReporter, CsvReporterTrait
//! @ai:module:stateless true

use crate::metrics::types::{format_float, RunResults, TrialRecord};
use anyhow::{Context, Result};
use std::path::Path;

const HEADER: [&str; 19] = [
    "image_id",
    "algorithm",
    "payload_size",
    "attack_category",
    "attack_name",
    "attack_params",
    "mse",
    "rmse",
    "psnr",
    "ssim",
    "aad",
    "nad",
    "ncc_image",
    "ber",
    "ncc_secret",
    "payload_recovered",
    "embedded_payload",
    "extracted_payload",
    "error",
];

/// @ai:intent Trait for CSV report generation
pub trait CsvReporterTrait: Send + Sync {
    /// @ai:intent Write one row per trial record
    fn generate(&self, results: &RunResults, output_path: &Path) -> Result<()>;
}

/// @ai:intent Writes results.csv
pub struct CsvReporter;

impl CsvReporter {
    /// @ai:intent Create a new CSV reporter
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }

    /// @ai:intent Quote a field when it holds a separator, quote or line break
    /// @ai:effects pure
    fn escape(field: &str) -> String {
        if field.contains([',', '"', '\n', '\r']) {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn number(value: f64) -> String {
        if value.is_finite() {
            value.to_string()
        } else {
            format_float(value, 0)
        }
    }

    /// @ai:intent Render a record as one CSV line; missing measurements are empty cells
    /// @ai:effects pure
    fn row(record: &TrialRecord) -> String {
        let mut fields = vec![
            Self::escape(&record.image_id),
            Self::escape(&record.algorithm),
            record.payload_size.to_string(),
            record.attack_category.to_string(),
            Self::escape(&record.attack_name),
            Self::escape(&record.attack_params),
        ];

        match &record.distortion {
            Some(d) => fields.extend(
                [d.mse, d.rmse, d.psnr, d.ssim, d.aad, d.nad, d.ncc_image].map(Self::number),
            ),
            None => fields.extend(std::iter::repeat(String::new()).take(7)),
        }

        match &record.robustness {
            Some(r) => {
                fields.push(Self::number(r.ber));
                fields.push(Self::number(r.ncc_secret));
                fields.push(r.payload_recovered.to_string());
            }
            None => fields.extend(std::iter::repeat(String::new()).take(3)),
        }

        fields.push(Self::escape(&record.embedded_payload));
        fields.push(Self::escape(&record.extracted_payload));
        fields.push(Self::escape(record.error.as_deref().unwrap_or("")));
        fields.join(",")
    }

    /// @ai:intent Full CSV document for a record stream
    /// @ai:effects pure
    pub fn render(records: &[TrialRecord]) -> String {
        let mut output = HEADER.join(",");
        output.push('\n');
        for record in records {
            output.push_str(&Self::row(record));
            output.push('\n');
        }
        output
    }
}

impl Default for CsvReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvReporterTrait for CsvReporter {
    /// @ai:effects fs:write
    fn generate(&self, results: &RunResults, output_path: &Path) -> Result<()> {
        std::fs::write(output_path, Self::render(&results.records))
            .with_context(|| format!("Failed to write {}", output_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::types::{AttackCategory, DistortionMetrics, RobustnessMetrics, TrialKey};
    use pretty_assertions::assert_eq;

    fn key() -> TrialKey {
        TrialKey {
            image_id: "cover, 1.png".to_string(),
            algorithm: "example_lsb".to_string(),
            payload_size: 3,
        }
    }

    #[test]
    fn test_measured_row_spells_out_infinity() {
        let record = TrialRecord::measured(
            &key(),
            AttackCategory::None,
            "clean",
            "none",
            DistortionMetrics {
                psnr: f64::INFINITY,
                ssim: 1.0,
                ncc_image: 1.0,
                ..Default::default()
            },
            RobustnessMetrics::from_payloads("abc", "abc"),
            "abc",
            "abc",
        );

        let csv = CsvReporter::render(&[record]);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "\"cover, 1.png\",example_lsb,3,none,clean,none,0,0,inf,1,0,0,1,0,1,true,abc,abc,"
        );
    }

    #[test]
    fn test_error_row_has_empty_metric_cells() {
        let record = TrialRecord::failed(&key(), "say \"hi\"", "payload too large");
        let csv = CsvReporter::render(&[record]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(",\"say \"\"hi\"\"\",,payload too large"));
        assert_eq!(row.matches(",,").count(), 6);
    }
}
