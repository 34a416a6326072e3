//! @ai:module:intent Steganography robustness benchmark library
//! @ai:module:layer application
//! @ai:module:public_api config, dataset, attacks, metrics, stego, runner, report, fetch

pub mod attacks;
pub mod config;
pub mod dataset;
pub mod fetch;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod stego;

pub use attacks::{AttackRegistry, AttackKind};
pub use config::EvalConfig;
pub use dataset::{CoverImage, DatasetLoader};
pub use metrics::{RunResults, ScoreAggregator, TrialRecord};
pub use report::ReportGenerator;
pub use runner::{EvaluationOutput, Evaluator};
pub use stego::{StegoAlgorithm, StegoError};
