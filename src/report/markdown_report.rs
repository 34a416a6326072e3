//! @ai:module:intent Markdown summary of a run: attack averages, score tables and capacity
//! @ai:module:layer infrastructure
//! @ai:module:public_api MarkdownReporter, MarkdownReporterTrait
//! @ai:module:stateless true

use crate::metrics::types::{format_float, AttackCategory, RunResults, TrialRecord};
use anyhow::Result;
use std::fmt::Write as FmtWrite;
use std::path::Path;

/// @ai:intent Trait for Markdown report generation
pub trait MarkdownReporterTrait: Send + Sync {
    /// @ai:intent Generate Markdown report from results
    fn generate(&self, results: &RunResults, output_path: &Path) -> Result<()>;
}

/// @ai:intent Generates summary.md
pub struct MarkdownReporter;

/// Mean metrics of one (algorithm, category, attack) group.
#[derive(Debug, Clone, PartialEq)]
struct AttackAverage {
    algorithm: String,
    category: AttackCategory,
    attack: String,
    count: usize,
    psnr: f64,
    ssim: f64,
    ber: f64,
    ncc_secret: f64,
}

impl MarkdownReporter {
    /// @ai:intent Create a new Markdown reporter
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }

    fn optional(score: Option<f64>) -> String {
        score.map(|s| format_float(s, 1)).unwrap_or_else(|| "-".to_string())
    }

    /// @ai:intent Average measured records per (algorithm, category, attack) in first-appearance order
    /// @ai:effects pure
    fn attack_averages(records: &[TrialRecord]) -> Vec<AttackAverage> {
        let mut groups: Vec<AttackAverage> = Vec::new();

        for record in records {
            let (Some(d), Some(r)) = (&record.distortion, &record.robustness) else {
                continue;
            };
            if record.error.is_some() {
                continue;
            }

            let position = groups.iter().position(|g| {
                g.algorithm == record.algorithm
                    && g.category == record.attack_category
                    && g.attack == record.attack_name
            });
            let group = match position {
                Some(i) => &mut groups[i],
                None => {
                    groups.push(AttackAverage {
                        algorithm: record.algorithm.clone(),
                        category: record.attack_category,
                        attack: record.attack_name.clone(),
                        count: 0,
                        psnr: 0.0,
                        ssim: 0.0,
                        ber: 0.0,
                        ncc_secret: 0.0,
                    });
                    let last = groups.len() - 1;
                    &mut groups[last]
                }
            };

            group.count += 1;
            group.psnr += d.psnr;
            group.ssim += d.ssim;
            group.ber += r.ber;
            group.ncc_secret += r.ncc_secret;
        }

        for group in &mut groups {
            let n = group.count as f64;
            group.psnr /= n;
            group.ssim /= n;
            group.ber /= n;
            group.ncc_secret /= n;
        }
        groups
    }

    /// @ai:effects pure
    fn generate_header(results: &RunResults) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        let errors = results.records.iter().filter(|r| r.error.is_some()).count();

        writeln!(output, "# Steganography Evaluation: {}", results.run_name)?;
        writeln!(output)?;
        writeln!(output, "**Date:** {}", results.timestamp)?;
        writeln!(output, "**Records:** {}", results.records.len())?;
        writeln!(output, "**Failed trials:** {}", errors)?;
        writeln!(output)?;
        Ok(output)
    }

    /// @ai:effects pure
    fn generate_score_table(results: &RunResults) -> Result<String, std::fmt::Error> {
        let mut output = String::new();

        writeln!(output, "## Scores")?;
        writeln!(output)?;
        if results.scores.is_empty() {
            writeln!(output, "No scored trials.")?;
            writeln!(output)?;
            return Ok(output);
        }

        writeln!(
            output,
            "| Algorithm | Compression | Blur | Noise | Geometric | Combo | Capacity | Overall | Recovery |"
        )?;
        writeln!(output, "|-----------|-------------|------|-------|-----------|-------|----------|---------|----------|")?;
        for row in &results.scores {
            writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {} | {:.1}% |",
                row.algorithm,
                Self::optional(row.compression_score),
                Self::optional(row.blur_score),
                Self::optional(row.noise_score),
                Self::optional(row.geometric_score),
                Self::optional(row.combo_score),
                Self::optional(row.capacity_score),
                Self::optional(row.overall_score),
                row.recovery_rate * 100.0
            )?;
        }
        writeln!(output)?;
        Ok(output)
    }

    /// @ai:effects pure
    fn generate_category_section(results: &RunResults) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        if results.category_scores.is_empty() {
            return Ok(output);
        }

        writeln!(output, "## Scores by Category")?;
        writeln!(output)?;
        writeln!(
            output,
            "| Algorithm | Category | Trials | SSIM | PSNR | BER | Recovery | Distortion | Robustness | Score |"
        )?;
        writeln!(output, "|-----------|----------|--------|------|------|-----|----------|------------|------------|-------|")?;
        for score in &results.category_scores {
            writeln!(
                output,
                "| {} | {} | {} | {:.4} | {} | {:.4} | {:.1}% | {:.1} | {:.1} | {:.1} |",
                score.algorithm,
                score.attack_category,
                score.records,
                score.avg_ssim,
                format_float(score.avg_psnr, 2),
                score.avg_ber,
                score.recovery_rate * 100.0,
                score.distortion_score,
                score.robustness_score,
                score.overall_score
            )?;
        }
        writeln!(output)?;
        Ok(output)
    }

    /// @ai:effects pure
    fn generate_attack_section(results: &RunResults) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        let averages = Self::attack_averages(&results.records);
        if averages.is_empty() {
            return Ok(output);
        }

        writeln!(output, "## Averages by Attack")?;
        writeln!(output)?;
        writeln!(output, "| Algorithm | Category | Attack | Trials | PSNR | SSIM | BER | NCC (secret) |")?;
        writeln!(output, "|-----------|----------|--------|--------|------|------|-----|--------------|")?;
        for avg in &averages {
            writeln!(
                output,
                "| {} | {} | {} | {} | {} | {:.4} | {:.4} | {:.4} |",
                avg.algorithm,
                avg.category,
                avg.attack,
                avg.count,
                format_float(avg.psnr, 2),
                avg.ssim,
                avg.ber,
                avg.ncc_secret
            )?;
        }
        writeln!(output)?;
        Ok(output)
    }

    /// @ai:effects pure
    fn generate_capacity_section(results: &RunResults) -> Result<String, std::fmt::Error> {
        let mut output = String::new();
        if results.capacity.is_empty() {
            return Ok(output);
        }

        writeln!(output, "## Capacity")?;
        writeln!(output)?;
        writeln!(
            output,
            "Lengths are within the search tolerance of the true maximum, not exact."
        )?;
        writeln!(output)?;
        writeln!(output, "| Image | Algorithm | Max Length | Tolerance | Probes | PSNR | SSIM |")?;
        writeln!(output, "|-------|-----------|------------|-----------|--------|------|------|")?;
        for result in &results.capacity {
            writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {:.4} |",
                result.image_id,
                result.algorithm,
                result.max_valid_length,
                result.tolerance,
                result.probes.len(),
                format_float(result.distortion.psnr, 2),
                result.distortion.ssim
            )?;
        }
        writeln!(output)?;
        Ok(output)
    }

    /// @ai:intent Full summary document
    /// @ai:effects pure
    pub fn render(results: &RunResults) -> Result<String, std::fmt::Error> {
        let mut content = String::new();
        content.push_str(&Self::generate_header(results)?);
        content.push_str(&Self::generate_score_table(results)?);
        content.push_str(&Self::generate_category_section(results)?);
        content.push_str(&Self::generate_attack_section(results)?);
        content.push_str(&Self::generate_capacity_section(results)?);
        Ok(content)
    }
}

impl Default for MarkdownReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownReporterTrait for MarkdownReporter {
    /// @ai:effects fs:write
    fn generate(&self, results: &RunResults, output_path: &Path) -> Result<()> {
        std::fs::write(output_path, Self::render(results)?)?;
        Ok(())
    }
}
