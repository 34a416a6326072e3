//! @ai:module:intent Trial records, distortion and robustness metrics, and score aggregation
//! @ai:module:layer domain
//! @ai:module:public_api TrialRecord, DistortionMetrics, RobustnessMetrics, RunResults, ScoreAggregator

pub mod aggregator;
pub mod distortion;
pub mod robustness;
pub mod types;

pub use aggregator::{ScoreAggregator, ScoreAggregatorTrait};
pub use distortion::calculate_distortion;
pub use robustness::{calculate_ber, calculate_ncc_text};
pub use types::{
    AttackCategory, CapacityProbe, CapacityResult, CategoryScore, DistortionMetrics,
    RobustnessMetrics, RunResults, ScoreRow, TrialKey, TrialRecord, BASELINE_ALGORITHM,
};
