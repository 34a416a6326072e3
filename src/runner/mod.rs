//! @ai:module:intent Evaluation orchestration: payloads, capacity search, progress and the trial loop
//! @ai:module:layer application
//! @ai:module:public_api Evaluator, EvaluationOutput, CapacitySearch, Progress, generate_payload, payload_rng

pub mod capacity;
pub mod executor;
pub mod payload;
pub mod progress;

pub use capacity::CapacitySearch;
pub use executor::{EvaluationOutput, Evaluator, BASELINE_JPEG_QUALITY};
pub use payload::{generate_payload, payload_rng, PAYLOAD_CHARSET};
pub use progress::{total_steps, Progress};
