//! @ai:module:intent Reduce the trial record stream into comparable per-algorithm quality scores
//! @ai:module:layer application
//! @ai:module:public_api ScoreAggregator, ScoreAggregatorTrait, calculate_scores_by_category, calculate_overall_scores, calculate_distortion_score, calculate_robustness_score, calculate_combined_score
//! @ai:module:stateless true

use crate::metrics::types::{AttackCategory, CategoryScore, ScoreRow, TrialRecord};

pub const DISTORTION_WEIGHT: f64 = 0.4;
pub const ROBUSTNESS_WEIGHT: f64 = 0.6;
const SSIM_WEIGHT: f64 = 0.7;
const PSNR_WEIGHT: f64 = 0.3;
const PSNR_FLOOR_DB: f64 = 20.0;
const PSNR_SPAN_DB: f64 = 30.0;

/// @ai:intent Trait for scoring a complete record stream
pub trait ScoreAggregatorTrait: Send + Sync {
    /// @ai:intent Scores per (algorithm, attack category)
    fn by_category(&self, records: &[TrialRecord]) -> Vec<CategoryScore>;

    /// @ai:intent Per-algorithm category sub-scores and overall score
    fn overall(&self, records: &[TrialRecord]) -> Vec<ScoreRow>;
}

/// @ai:intent Stateless scoring engine over trial records
pub struct ScoreAggregator;

impl ScoreAggregator {
    /// @ai:intent Create a new score aggregator
    /// @ai:effects pure
    pub fn new() -> Self {
        Self
    }
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreAggregatorTrait for ScoreAggregator {
    fn by_category(&self, records: &[TrialRecord]) -> Vec<CategoryScore> {
        calculate_scores_by_category(records)
    }

    fn overall(&self, records: &[TrialRecord]) -> Vec<ScoreRow> {
        calculate_overall_scores(records)
    }
}

/// @ai:intent Distortion score from SSIM and PSNR
/// @ai:post psnr >= 50 saturates to full credit, psnr <= 20 to none
/// @ai:effects pure
pub fn calculate_distortion_score(ssim: f64, psnr: f64) -> f64 {
    let psnr_score = ((psnr - PSNR_FLOOR_DB) / PSNR_SPAN_DB).clamp(0.0, 1.0) * 100.0;
    ssim * 100.0 * SSIM_WEIGHT + psnr_score * PSNR_WEIGHT
}

/// @ai:intent Robustness score from average BER, zero when nothing was recovered
/// @ai:effects pure
pub fn calculate_robustness_score(avg_ber: f64, recovery_rate: f64) -> f64 {
    if recovery_rate == 0.0 {
        return 0.0;
    }
    (1.0 - avg_ber) * 100.0
}

/// @ai:intent Weighted combination of distortion and robustness scores
/// @ai:effects pure
pub fn calculate_combined_score(distortion_score: f64, robustness_score: f64) -> f64 {
    distortion_score * DISTORTION_WEIGHT + robustness_score * ROBUSTNESS_WEIGHT
}

/// Averages of one group of measured records.
struct GroupStats {
    avg_ssim: f64,
    avg_psnr: f64,
    avg_ber: f64,
    recovery_rate: f64,
    records: usize,
}

impl GroupStats {
    /// @ai:intent Average the measured records of a group
    /// @ai:post None when the group has no measured records
    fn collect<'a, I: IntoIterator<Item = &'a TrialRecord>>(records: I) -> Option<Self> {
        let (mut ssim, mut psnr, mut ber, mut recovered, mut n) = (0.0, 0.0, 0.0, 0usize, 0usize);

        for record in records {
            let (Some(distortion), Some(robustness)) = (&record.distortion, &record.robustness)
            else {
                continue;
            };
            if record.error.is_some() {
                continue;
            }
            ssim += distortion.ssim;
            psnr += distortion.psnr;
            ber += robustness.ber;
            recovered += robustness.payload_recovered as usize;
            n += 1;
        }

        if n == 0 {
            return None;
        }

        let count = n as f64;
        Some(Self {
            avg_ssim: ssim / count,
            avg_psnr: psnr / count,
            avg_ber: ber / count,
            recovery_rate: recovered as f64 / count,
            records: n,
        })
    }

    fn distortion_score(&self) -> f64 {
        calculate_distortion_score(self.avg_ssim, self.avg_psnr)
    }

    fn robustness_score(&self) -> f64 {
        calculate_robustness_score(self.avg_ber, self.recovery_rate)
    }

    fn score(&self) -> f64 {
        calculate_combined_score(self.distortion_score(), self.robustness_score())
    }
}

/// @ai:intent Records that take part in scoring: measured, not baseline, not clean
/// @ai:effects pure
fn is_scored(record: &TrialRecord) -> bool {
    record.is_measured() && !record.is_baseline() && record.attack_category != AttackCategory::None
}

/// @ai:intent Distinct values in first-appearance order
/// @ai:effects pure
fn first_appearance<T: PartialEq + Clone, I: IntoIterator<Item = T>>(values: I) -> Vec<T> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// @ai:intent Score every (algorithm, attack category) group present in the stream
/// @ai:post never contains the `none` category or the baseline pseudo-algorithm
/// @ai:effects pure
pub fn calculate_scores_by_category(records: &[TrialRecord]) -> Vec<CategoryScore> {
    let scored: Vec<&TrialRecord> = records.iter().filter(|r| is_scored(r)).collect();
    let algorithms = first_appearance(scored.iter().map(|r| r.algorithm.as_str()));

    let mut scores = Vec::new();
    for algorithm in algorithms {
        let algo_records: Vec<&TrialRecord> = scored
            .iter()
            .copied()
            .filter(|r| r.algorithm == algorithm)
            .collect();
        let categories = first_appearance(algo_records.iter().map(|r| r.attack_category));

        for category in categories {
            let group = algo_records
                .iter()
                .copied()
                .filter(|r| r.attack_category == category);
            let Some(stats) = GroupStats::collect(group) else {
                continue;
            };

            scores.push(CategoryScore {
                algorithm: algorithm.to_string(),
                attack_category: category,
                avg_ssim: stats.avg_ssim,
                avg_psnr: stats.avg_psnr,
                avg_ber: stats.avg_ber,
                recovery_rate: stats.recovery_rate,
                distortion_score: stats.distortion_score(),
                robustness_score: stats.robustness_score(),
                overall_score: stats.score(),
                records: stats.records,
            });
        }
    }

    scores
}

/// @ai:intent Per-algorithm score rows with nullable category sub-scores
/// @ai:post overall_score is None for an algorithm with no scored records
/// @ai:effects pure
pub fn calculate_overall_scores(records: &[TrialRecord]) -> Vec<ScoreRow> {
    let algorithms = first_appearance(
        records
            .iter()
            .filter(|r| !r.is_baseline())
            .map(|r| r.algorithm.as_str()),
    );

    algorithms
        .into_iter()
        .map(|algorithm| {
            let algo_records: Vec<&TrialRecord> =
                records.iter().filter(|r| r.algorithm == algorithm).collect();
            let scored: Vec<&TrialRecord> =
                algo_records.iter().copied().filter(|r| is_scored(r)).collect();

            let category_score = |categories: &[AttackCategory]| {
                GroupStats::collect(
                    scored
                        .iter()
                        .copied()
                        .filter(|r| categories.contains(&r.attack_category)),
                )
                .map(|s| s.score())
            };

            let overall = GroupStats::collect(scored.iter().copied());

            ScoreRow {
                algorithm: algorithm.to_string(),
                compression_score: category_score(&[AttackCategory::Compression]),
                blur_score: category_score(&[AttackCategory::Filtering]),
                noise_score: category_score(&[AttackCategory::Noise]),
                geometric_score: category_score(&[AttackCategory::Geometric]),
                combo_score: category_score(&[AttackCategory::Combo]),
                capacity_score: category_score(&[AttackCategory::Capacity]),
                overall_score: overall.as_ref().map(|s| s.score()),
                recovery_rate: overall.as_ref().map(|s| s.recovery_rate).unwrap_or(0.0),
                total_records: algo_records.len(),
                total_payloads_recovered: algo_records
                    .iter()
                    .filter(|r| r.robustness.map(|m| m.payload_recovered).unwrap_or(false))
                    .count(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::types::{
        DistortionMetrics, RobustnessMetrics, TrialKey, BASELINE_ALGORITHM,
    };
    use pretty_assertions::assert_eq;

    fn record(algorithm: &str, category: AttackCategory, ssim: f64, psnr: f64, ber: f64) -> TrialRecord {
        let key = TrialKey {
            image_id: "img.png".to_string(),
            algorithm: algorithm.to_string(),
            payload_size: 10,
        };
        TrialRecord::measured(
            &key,
            category,
            "attack",
            "p=1",
            DistortionMetrics {
                ssim,
                psnr,
                ..Default::default()
            },
            RobustnessMetrics {
                ber,
                ncc_secret: 1.0 - ber,
                payload_recovered: ber == 0.0,
            },
            "payload",
            "payload",
        )
    }

    #[test]
    fn test_distortion_score_clamps_psnr() {
        assert_eq!(calculate_distortion_score(1.0, 60.0), 100.0);
        assert_eq!(calculate_distortion_score(1.0, f64::INFINITY), 100.0);
        assert_eq!(calculate_distortion_score(0.0, 10.0), 0.0);
        assert!((calculate_distortion_score(0.5, 35.0) - (35.0 + 15.0)).abs() < 1e-9);
    }

    #[test]
    fn test_robustness_score_zero_without_recovery() {
        assert_eq!(calculate_robustness_score(0.1, 0.0), 0.0);
        assert!((calculate_robustness_score(0.1, 0.5) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_category_scores_exclude_clean_and_baseline() {
        let records = vec![
            record("lsb", AttackCategory::None, 1.0, f64::INFINITY, 0.0),
            record("lsb", AttackCategory::Compression, 0.9, 40.0, 0.5),
            record(BASELINE_ALGORITHM, AttackCategory::Baseline, 0.95, 38.0, 0.0),
        ];

        let scores = calculate_scores_by_category(&records);
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].attack_category, AttackCategory::Compression);
        assert_eq!(scores[0].algorithm, "lsb");
        assert!(scores.iter().all(|s| s.attack_category != AttackCategory::None));
    }

    #[test]
    fn test_category_score_formula() {
        let records = vec![
            record("lsb", AttackCategory::Noise, 0.8, 35.0, 0.0),
            record("lsb", AttackCategory::Noise, 0.6, 25.0, 0.2),
        ];

        let scores = calculate_scores_by_category(&records);
        let noise = &scores[0];

        // avg ssim 0.7, avg psnr 30, avg ber 0.1, recovery 0.5
        let distortion = 0.7 * 100.0 * 0.7 + (10.0 / 30.0) * 100.0 * 0.3;
        let robustness = 90.0;
        assert!((noise.distortion_score - distortion).abs() < 1e-9);
        assert!((noise.robustness_score - robustness).abs() < 1e-9);
        assert!((noise.overall_score - (0.4 * distortion + 0.6 * robustness)).abs() < 1e-9);
        assert_eq!(noise.records, 2);
    }

    #[test]
    fn test_overall_score_null_without_attack_records() {
        let records = vec![record("lsb", AttackCategory::None, 1.0, 60.0, 0.0)];

        let rows = calculate_overall_scores(&records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].overall_score, None);
        assert_eq!(rows[0].compression_score, None);
        assert_eq!(rows[0].recovery_rate, 0.0);
        assert_eq!(rows[0].total_payloads_recovered, 1);
    }

    #[test]
    fn test_missing_categories_are_null_not_zero() {
        let records = vec![
            record("lsb", AttackCategory::Geometric, 0.5, 20.0, 0.5),
            record("lsb", AttackCategory::Filtering, 0.9, 45.0, 0.0),
        ];

        let row = &calculate_overall_scores(&records)[0];
        assert!(row.geometric_score.is_some());
        assert!(row.blur_score.is_some());
        assert_eq!(row.noise_score, None);
        assert_eq!(row.combo_score, None);
        assert_eq!(row.capacity_score, None);
        assert!(row.overall_score.is_some());
    }

    #[test]
    fn test_error_records_are_ignored() {
        let key = TrialKey {
            image_id: "img.png".to_string(),
            algorithm: "lsb".to_string(),
            payload_size: 5000,
        };
        let records = vec![
            TrialRecord::failed(&key, "x", "payload too large"),
            record("lsb", AttackCategory::Noise, 0.9, 40.0, 0.0),
        ];

        let rows = calculate_overall_scores(&records);
        assert_eq!(rows[0].total_records, 2);
        assert!(rows[0].noise_score.is_some());
        assert_eq!(calculate_scores_by_category(&records).len(), 1);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let records = vec![
            record("a", AttackCategory::Noise, 0.81, 33.3, 0.01),
            record("b", AttackCategory::Compression, 0.72, 29.1, 0.2),
            record("a", AttackCategory::Combo, 0.5, 22.0, 0.4),
        ];

        let aggregator = ScoreAggregator::new();
        assert_eq!(aggregator.overall(&records), aggregator.overall(&records));
        assert_eq!(aggregator.by_category(&records), aggregator.by_category(&records));
    }

    #[test]
    fn test_algorithms_keep_first_appearance_order() {
        let records = vec![
            record("zeta", AttackCategory::Noise, 0.9, 40.0, 0.0),
            record("alpha", AttackCategory::Noise, 0.9, 40.0, 0.0),
        ];
        let names: Vec<_> = calculate_overall_scores(&records)
            .into_iter()
            .map(|r| r.algorithm)
            .collect();
        assert_eq!(names, vec!["zeta".to_string(), "alpha".to_string()]);
    }
}
