//! @ai:module:intent Chart generation for evaluation results
//! @ai:module:layer infrastructure
//! @ai:module:public_api ChartGenerator, ChartGeneratorTrait
//! @ai:module:stateless true

use crate::metrics::types::{AttackCategory, RunResults, TrialRecord};
use anyhow::Result;
use plotters::prelude::*;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

/// @ai:intent Trait for chart generation
pub trait ChartGeneratorTrait: Send + Sync {
    /// @ai:intent Generate all charts that have data; returns the file names written
    fn generate_all(&self, results: &RunResults, output_dir: &Path) -> Result<Vec<String>>;
}

/// PSNR by JPEG quality for one algorithm, ascending quality.
type QualitySeries = (String, Vec<(i64, f64)>);

/// @ai:intent Generates PNG charts from evaluation results
pub struct ChartGenerator;

impl ChartGenerator {
    /// @ai:intent Create a new chart generator
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }

    /// @ai:intent Overall score per algorithm, skipping algorithms without one
    /// @ai:effects pure
    fn overall_scores(results: &RunResults) -> Vec<(String, f64)> {
        results
            .scores
            .iter()
            .filter_map(|row| row.overall_score.map(|s| (row.algorithm.clone(), s)))
            .collect()
    }

    /// @ai:intent Mean finite PSNR of JPEG-attacked records by quality, per algorithm
    /// @ai:post quality is parsed from attack_params; records without it are ignored
    /// @ai:effects pure
    fn jpeg_psnr_series(records: &[TrialRecord]) -> Result<Vec<QualitySeries>> {
        let quality_pattern = Regex::new(r"quality=(\d+)")?;
        let mut series: Vec<(String, BTreeMap<i64, (f64, usize)>)> = Vec::new();

        for record in records {
            if record.is_baseline()
                || record.attack_category != AttackCategory::Compression
                || record.attack_name != "jpeg"
            {
                continue;
            }
            let Some(psnr) = record.distortion.map(|d| d.psnr).filter(|p| p.is_finite()) else {
                continue;
            };
            let Some(quality) = quality_pattern
                .captures(&record.attack_params)
                .and_then(|c| c[1].parse::<i64>().ok())
            else {
                continue;
            };

            let index = match series.iter().position(|(a, _)| *a == record.algorithm) {
                Some(i) => i,
                None => {
                    series.push((record.algorithm.clone(), BTreeMap::new()));
                    series.len() - 1
                }
            };
            let entry = series[index].1.entry(quality).or_insert((0.0, 0));
            entry.0 += psnr;
            entry.1 += 1;
        }

        Ok(series
            .into_iter()
            .map(|(algorithm, points)| {
                let points = points
                    .into_iter()
                    .map(|(quality, (sum, n))| (quality, sum / n as f64))
                    .collect();
                (algorithm, points)
            })
            .collect())
    }

    /// @ai:intent Bar chart of overall score per algorithm
    /// @ai:effects fs:write
    fn generate_score_chart(&self, scores: &[(String, f64)], output_path: &Path) -> Result<()> {
        let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Overall Score by Algorithm", ("sans-serif", 25))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0..scores.len() as i32, 0f64..100f64)?;

        chart
            .configure_mesh()
            .x_labels(scores.len())
            .y_desc("Score")
            .x_label_formatter(&|x| {
                scores
                    .get(*x as usize)
                    .map(|(name, _)| name.to_string())
                    .unwrap_or_default()
            })
            .draw()?;

        chart.draw_series(scores.iter().enumerate().map(|(i, (_, score))| {
            Rectangle::new(
                [(i as i32, 0.0), (i as i32 + 1, score.clamp(0.0, 100.0))],
                BLUE.mix(0.7).filled(),
            )
        }))?;

        root.present()?;
        Ok(())
    }

    /// @ai:intent Line chart of PSNR against JPEG quality, one line per algorithm
    /// @ai:effects fs:write
    fn generate_jpeg_chart(&self, series: &[QualitySeries], output_path: &Path) -> Result<()> {
        let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
        root.fill(&WHITE)?;

        let points = series.iter().flat_map(|(_, p)| p.iter());
        let max_psnr = points.clone().map(|(_, p)| *p).fold(0.0, f64::max);
        let min_quality = points.clone().map(|(q, _)| *q).min().unwrap_or(0);
        let max_quality = points.map(|(q, _)| *q).max().unwrap_or(100);

        let mut chart = ChartBuilder::on(&root)
            .caption("PSNR vs JPEG Quality", ("sans-serif", 25))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(min_quality..max_quality.max(min_quality + 1), 0f64..(max_psnr * 1.1).max(1.0))?;

        chart
            .configure_mesh()
            .x_desc("JPEG quality")
            .y_desc("PSNR (dB)")
            .draw()?;

        for (i, (algorithm, points)) in series.iter().enumerate() {
            let color = Palette99::pick(i).to_rgba();
            chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(2)))?
                .label(algorithm.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .border_style(BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    }
}

impl Default for ChartGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartGeneratorTrait for ChartGenerator {
    /// @ai:effects fs:write
    fn generate_all(&self, results: &RunResults, output_dir: &Path) -> Result<Vec<String>> {
        std::fs::create_dir_all(output_dir)?;

        let mut generated = Vec::new();

        let scores = Self::overall_scores(results);
        if !scores.is_empty() {
            self.generate_score_chart(&scores, &output_dir.join("scores.png"))?;
            generated.push("scores.png".to_string());
        }

        let series = Self::jpeg_psnr_series(&results.records)?;
        if !series.is_empty() {
            self.generate_jpeg_chart(&series, &output_dir.join("psnr_vs_jpeg.png"))?;
            generated.push("psnr_vs_jpeg.png".to_string());
        }

        Ok(generated)
    }
}
