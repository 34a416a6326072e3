//! @ai:module:intent Record types emitted by an evaluation run and consumed by scoring and reports
//! @ai:module:layer domain
//! @ai:module:public_api AttackCategory, TrialKey, TrialRecord, DistortionMetrics, RobustnessMetrics, CapacityResult, CapacityProbe, CategoryScore, ScoreRow, RunResults
//! @ai:module:stateless true

use crate::metrics::robustness::{calculate_ber, calculate_ncc_text};
use serde::{Deserialize, Serialize};

/// Pseudo-algorithm identifier carried by baseline re-save records.
pub const BASELINE_ALGORITHM: &str = "__baseline__";

/// Marker stored as the extracted payload when extraction raised.
pub const EXTRACTION_FAILED_PREFIX: &str = "[extraction failed]";

/// @ai:intent Category of the transform applied before extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackCategory {
    None,
    Baseline,
    Compression,
    Noise,
    Filtering,
    Geometric,
    Combo,
    Capacity,
}

impl AttackCategory {
    /// @ai:intent Convert category to string representation
    /// @ai:effects pure
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackCategory::None => "none",
            AttackCategory::Baseline => "baseline",
            AttackCategory::Compression => "compression",
            AttackCategory::Noise => "noise",
            AttackCategory::Filtering => "filtering",
            AttackCategory::Geometric => "geometric",
            AttackCategory::Combo => "combo",
            AttackCategory::Capacity => "capacity",
        }
    }

    /// @ai:intent Parse a category name used as a key under `[attacks]` in the config
    /// @ai:post only the four transform categories are configurable
    /// @ai:effects pure
    pub fn from_config_key(key: &str) -> Option<Self> {
        match key {
            "compression" => Some(AttackCategory::Compression),
            "noise" => Some(AttackCategory::Noise),
            "filtering" => Some(AttackCategory::Filtering),
            "geometric" => Some(AttackCategory::Geometric),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttackCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// @ai:intent Identity of one (image, algorithm, payload size) trial
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrialKey {
    pub image_id: String,
    pub algorithm: String,
    pub payload_size: usize,
}

/// @ai:intent Visual distortion between a cover image and a stego or attacked image
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DistortionMetrics {
    pub mse: f64,
    pub rmse: f64,
    /// Positive infinity when the two images are identical.
    #[serde(with = "lossless_float")]
    pub psnr: f64,
    pub ssim: f64,
    pub aad: f64,
    pub nad: f64,
    pub ncc_image: f64,
}

impl DistortionMetrics {
    /// @ai:intent Zero-valued metrics reported when no measurement was possible
    /// @ai:effects pure
    pub fn zeroed() -> Self {
        Self::default()
    }
}

/// @ai:intent Payload survival between the embedded and extracted payloads
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobustnessMetrics {
    pub ber: f64,
    pub ncc_secret: f64,
    pub payload_recovered: bool,
}

impl RobustnessMetrics {
    /// @ai:intent Compare embedded and extracted payloads
    /// @ai:post payload_recovered == (ber == 0.0)
    /// @ai:effects pure
    pub fn from_payloads(embedded: &str, extracted: &str) -> Self {
        let ber = calculate_ber(embedded, extracted);
        Self {
            ber,
            ncc_secret: calculate_ncc_text(embedded, extracted),
            payload_recovered: ber == 0.0,
        }
    }

    /// @ai:intent Sentinel used when extraction raised instead of returning a payload
    /// @ai:effects pure
    pub fn degraded() -> Self {
        Self {
            ber: 1.0,
            ncc_secret: 0.0,
            payload_recovered: false,
        }
    }
}

/// @ai:intent One output row of an evaluation run, immutable once emitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub image_id: String,
    pub algorithm: String,
    pub payload_size: usize,
    pub attack_category: AttackCategory,
    pub attack_name: String,
    pub attack_params: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distortion: Option<DistortionMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robustness: Option<RobustnessMetrics>,
    pub embedded_payload: String,
    pub extracted_payload: String,
    /// When set, distortion and robustness are absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrialRecord {
    /// @ai:intent Build a measured record for a trial key and attack label
    /// @ai:effects pure
    #[allow(clippy::too_many_arguments)]
    pub fn measured(
        key: &TrialKey,
        category: AttackCategory,
        attack_name: impl Into<String>,
        attack_params: impl Into<String>,
        distortion: DistortionMetrics,
        robustness: RobustnessMetrics,
        embedded_payload: &str,
        extracted_payload: impl Into<String>,
    ) -> Self {
        Self {
            image_id: key.image_id.clone(),
            algorithm: key.algorithm.clone(),
            payload_size: key.payload_size,
            attack_category: category,
            attack_name: attack_name.into(),
            attack_params: attack_params.into(),
            distortion: Some(distortion),
            robustness: Some(robustness),
            embedded_payload: embedded_payload.to_string(),
            extracted_payload: extracted_payload.into(),
            error: None,
        }
    }

    /// @ai:intent Build the error record standing in for a trial that could not run
    /// @ai:post distortion and robustness are None
    /// @ai:effects pure
    pub fn failed(key: &TrialKey, embedded_payload: &str, error: impl Into<String>) -> Self {
        Self {
            image_id: key.image_id.clone(),
            algorithm: key.algorithm.clone(),
            payload_size: key.payload_size,
            attack_category: AttackCategory::None,
            attack_name: "clean".to_string(),
            attack_params: "none".to_string(),
            distortion: None,
            robustness: None,
            embedded_payload: embedded_payload.to_string(),
            extracted_payload: String::new(),
            error: Some(error.into()),
        }
    }

    /// @ai:intent Whether the record carries measurements
    /// @ai:effects pure
    pub fn is_measured(&self) -> bool {
        self.error.is_none() && self.distortion.is_some() && self.robustness.is_some()
    }

    /// @ai:intent Whether the record belongs to the baseline pseudo-algorithm
    /// @ai:effects pure
    pub fn is_baseline(&self) -> bool {
        self.algorithm == BASELINE_ALGORITHM
    }
}

/// @ai:intent One length probed by the capacity search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityProbe {
    pub length: usize,
    pub success: bool,
}

/// @ai:intent Approximate maximum round-trippable payload length for an (image, algorithm) pair
///
/// `max_valid_length` is within `tolerance` characters of the true supremum,
/// not guaranteed to be the supremum itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityResult {
    pub image_id: String,
    pub algorithm: String,
    pub max_valid_length: usize,
    pub upper_bound: usize,
    pub tolerance: usize,
    pub distortion: DistortionMetrics,
    pub probes: Vec<CapacityProbe>,
}

/// @ai:intent Score for one (algorithm, attack category) group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub algorithm: String,
    pub attack_category: AttackCategory,
    pub avg_ssim: f64,
    #[serde(with = "lossless_float")]
    pub avg_psnr: f64,
    pub avg_ber: f64,
    pub recovery_rate: f64,
    pub distortion_score: f64,
    pub robustness_score: f64,
    pub overall_score: f64,
    pub records: usize,
}

/// @ai:intent Per-algorithm aggregate scores, each absent when no trials exist for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub algorithm: String,
    pub compression_score: Option<f64>,
    pub blur_score: Option<f64>,
    pub noise_score: Option<f64>,
    pub geometric_score: Option<f64>,
    pub combo_score: Option<f64>,
    pub capacity_score: Option<f64>,
    pub overall_score: Option<f64>,
    pub recovery_rate: f64,
    pub total_records: usize,
    pub total_payloads_recovered: usize,
}

/// @ai:intent Complete output of a run as persisted to results.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResults {
    pub timestamp: String,
    pub run_name: String,
    pub records: Vec<TrialRecord>,
    #[serde(default)]
    pub capacity: Vec<CapacityResult>,
    #[serde(default)]
    pub category_scores: Vec<CategoryScore>,
    #[serde(default)]
    pub scores: Vec<ScoreRow>,
}

/// @ai:intent Format a float for tables, spelling out non-finite values
/// @ai:effects pure
pub fn format_float(value: f64, precision: usize) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        format!("{:.*}", precision, value)
    }
}

/// JSON has no infinity, so non-finite floats round-trip as strings.
pub mod lossless_float {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_str(&super::format_float(*value, 0))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "NaN" => Ok(f64::NAN),
                other => Err(D::Error::custom(format!("invalid float literal: {other}"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> TrialKey {
        TrialKey {
            image_id: "a.png".to_string(),
            algorithm: "example_lsb".to_string(),
            payload_size: 2,
        }
    }

    #[test]
    fn test_robustness_recovered_iff_zero_ber() {
        let exact = RobustnessMetrics::from_payloads("AB", "AB");
        assert_eq!(exact.ber, 0.0);
        assert!(exact.payload_recovered);

        let off = RobustnessMetrics::from_payloads("AB", "AC");
        assert!((off.ber - 1.0 / 16.0).abs() < 1e-12);
        assert!(!off.payload_recovered);
    }

    #[test]
    fn test_failed_record_has_no_measurements() {
        let record = TrialRecord::failed(&key(), "HI", "payload too large");
        assert!(!record.is_measured());
        assert_eq!(record.attack_category, AttackCategory::None);
        assert_eq!(record.error.as_deref(), Some("payload too large"));
    }

    #[test]
    fn test_infinite_psnr_survives_json() {
        let metrics = DistortionMetrics {
            psnr: f64::INFINITY,
            ssim: 1.0,
            ncc_image: 1.0,
            ..Default::default()
        };
        let record = TrialRecord::measured(
            &key(),
            AttackCategory::None,
            "clean",
            "none",
            metrics,
            RobustnessMetrics::from_payloads("AB", "AB"),
            "AB",
            "AB",
        );

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"psnr\":\"inf\""));

        let back: TrialRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_category_config_keys() {
        assert_eq!(
            AttackCategory::from_config_key("noise"),
            Some(AttackCategory::Noise)
        );
        assert_eq!(AttackCategory::from_config_key("combo"), None);
        assert_eq!(AttackCategory::from_config_key("blur"), None);
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(f64::INFINITY, 2), "inf");
        assert_eq!(format_float(1.23456, 2), "1.23");
    }
}
