//! @ai:module:intent Evaluation orchestrator: embed, attack, extract and measure over the whole work grid
//! @ai:module:layer application
//! @ai:module:public_api Evaluator, EvaluationOutput, BASELINE_JPEG_QUALITY
//! @ai:module:stateless false

use crate::attacks::{compression, AttackCombination, AttackDescriptor, AttackRegistry};
use crate::config::EvalConfig;
use crate::dataset::{CoverImage, DatasetLoader, DatasetLoaderTrait};
use crate::metrics::distortion::calculate_distortion;
use crate::metrics::types::{
    AttackCategory, CapacityResult, RobustnessMetrics, TrialKey, TrialRecord, BASELINE_ALGORITHM,
    EXTRACTION_FAILED_PREFIX,
};
use crate::runner::capacity::CapacitySearch;
use crate::runner::payload::{generate_payload, payload_rng};
use crate::runner::progress::{total_steps, Progress};
use crate::stego::StegoAlgorithm;
use anyhow::{bail, Context, Result};
use image::DynamicImage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Quality of the plain re-save measured once per cover.
pub const BASELINE_JPEG_QUALITY: i64 = 95;

/// @ai:intent Everything an evaluation run produced, ordered by work unit
#[derive(Debug, Clone, Default)]
pub struct EvaluationOutput {
    pub records: Vec<TrialRecord>,
    pub capacity: Vec<CapacityResult>,
}

/// One independently schedulable piece of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkUnit {
    Trial {
        image: usize,
        algorithm: usize,
        payload_size: usize,
    },
    Capacity {
        image: usize,
        algorithm: usize,
    },
    Baseline {
        image: usize,
    },
}

#[derive(Debug, Default)]
struct UnitOutput {
    records: Vec<TrialRecord>,
    capacity: Option<CapacityResult>,
}

/// Read-only state shared by all workers of one run.
struct TrialContext {
    covers: Vec<CoverImage>,
    algorithms: Vec<Arc<dyn StegoAlgorithm>>,
    registry: AttackRegistry,
    descriptors: Vec<AttackDescriptor>,
    combinations: Vec<AttackCombination>,
    capacity: CapacitySearch,
    seed: Option<u64>,
    /// One lock per algorithm that is not reentrant.
    exclusive: Vec<Option<Arc<Mutex<()>>>>,
}

impl TrialContext {
    /// @ai:intent Work units in (image, algorithm, size) order, capacity after sizes, baseline last per image
    /// @ai:effects pure
    fn plan(&self, payload_sizes: &[usize], capacity_enabled: bool) -> Vec<WorkUnit> {
        let mut units = Vec::new();
        for image in 0..self.covers.len() {
            for algorithm in 0..self.algorithms.len() {
                units.extend(payload_sizes.iter().map(|&payload_size| WorkUnit::Trial {
                    image,
                    algorithm,
                    payload_size,
                }));
                if capacity_enabled {
                    units.push(WorkUnit::Capacity { image, algorithm });
                }
            }
            units.push(WorkUnit::Baseline { image });
        }
        units
    }

    /// @ai:intent Progress steps a unit accounts for
    fn steps(&self, unit: &WorkUnit) -> u64 {
        match unit {
            WorkUnit::Trial { .. } => (1 + self.descriptors.len() + self.combinations.len()) as u64,
            WorkUnit::Capacity { .. } => 1,
            WorkUnit::Baseline { .. } => 0,
        }
    }

    /// @ai:intent Lock a unit must hold while it runs, if its algorithm cannot share state
    fn exclusive_lock(&self, unit: &WorkUnit) -> Option<Arc<Mutex<()>>> {
        match *unit {
            WorkUnit::Trial { algorithm, .. } | WorkUnit::Capacity { algorithm, .. } => {
                self.exclusive[algorithm].clone()
            }
            WorkUnit::Baseline { .. } => None,
        }
    }

    fn key(&self, image: usize, algorithm: &str, payload_size: usize) -> TrialKey {
        TrialKey {
            image_id: self.covers[image].id.clone(),
            algorithm: algorithm.to_string(),
            payload_size,
        }
    }

    /// @ai:intent Error output standing in for a unit that timed out or panicked
    /// @ai:effects pure
    fn failed_unit(&self, unit: &WorkUnit, error: String) -> UnitOutput {
        let record = match *unit {
            WorkUnit::Trial {
                image,
                algorithm,
                payload_size,
            } => TrialRecord::failed(
                &self.key(image, self.algorithms[algorithm].name(), payload_size),
                "",
                error,
            ),
            WorkUnit::Capacity { image, algorithm } => TrialRecord {
                attack_category: AttackCategory::Capacity,
                attack_name: "binary_search".to_string(),
                ..TrialRecord::failed(&self.key(image, self.algorithms[algorithm].name(), 0), "", error)
            },
            WorkUnit::Baseline { image } => self.failed_baseline(image, error),
        };
        UnitOutput {
            records: vec![record],
            capacity: None,
        }
    }

    /// @ai:intent Execute one unit to completion; never fails
    /// @ai:effects algorithm side effects
    fn execute(&self, index: usize, unit: WorkUnit) -> UnitOutput {
        match unit {
            WorkUnit::Trial {
                image,
                algorithm,
                payload_size,
            } => UnitOutput {
                records: self.run_trial(index, image, algorithm, payload_size),
                capacity: None,
            },
            WorkUnit::Capacity { image, algorithm } => self.run_capacity(index, image, algorithm),
            WorkUnit::Baseline { image } => UnitOutput {
                records: vec![self.run_baseline(image)],
                capacity: None,
            },
        }
    }

    /// @ai:intent Embed once, then measure the clean extraction and every attack on the stego image
    /// @ai:post an embed failure yields exactly one error record
    fn run_trial(&self, index: usize, image: usize, algorithm: usize, payload_size: usize) -> Vec<TrialRecord> {
        let cover = &self.covers[image];
        let algorithm = self.algorithms[algorithm].as_ref();
        let key = self.key(image, algorithm.name(), payload_size);

        let mut rng = payload_rng(self.seed, index as u64);
        let payload = generate_payload(payload_size, &mut rng);

        let stego = match algorithm.embed(&cover.image, &payload) {
            Ok(stego) => stego,
            Err(e) => {
                warn!(
                    "Embed failed for {} on {} ({} chars): {}",
                    algorithm.name(),
                    cover.id,
                    payload_size,
                    e
                );
                return vec![TrialRecord::failed(&key, &payload, e.to_string())];
            }
        };

        let mut records = Vec::with_capacity(1 + self.descriptors.len() + self.combinations.len());
        records.push(measure(
            &key,
            algorithm,
            &cover.image,
            &stego,
            &payload,
            (AttackCategory::None, "clean".to_string(), "none".to_string()),
        ));

        for descriptor in &self.descriptors {
            match self.registry.apply(&stego, descriptor) {
                Ok(attacked) => records.push(measure(
                    &key,
                    algorithm,
                    &cover.image,
                    &attacked,
                    &payload,
                    (
                        descriptor.category(),
                        descriptor.name().to_string(),
                        descriptor.params_label(),
                    ),
                )),
                Err(e) => warn!("Skipping attack on {}: {}", cover.id, e),
            }
        }

        for combination in &self.combinations {
            match self.registry.apply_combination(&stego, combination) {
                Ok(attacked) => records.push(measure(
                    &key,
                    algorithm,
                    &cover.image,
                    &attacked,
                    &payload,
                    (AttackCategory::Combo, combination.name(), combination.params_label()),
                )),
                Err(e) => warn!("Skipping combination {} on {}: {}", combination.name(), cover.id, e),
            }
        }

        debug!(
            "Trial {} / {} / {} produced {} records",
            cover.id,
            algorithm.name(),
            payload_size,
            records.len()
        );
        records
    }

    /// @ai:intent Capacity search plus the record summarizing it
    fn run_capacity(&self, index: usize, image: usize, algorithm: usize) -> UnitOutput {
        let cover = &self.covers[image];
        let algorithm = self.algorithms[algorithm].as_ref();

        let mut rng = payload_rng(self.seed, index as u64);
        let result = self.capacity.run(algorithm, cover, &mut rng);

        let found = result.max_valid_length;
        let robustness = if found > 0 {
            RobustnessMetrics {
                ber: 0.0,
                ncc_secret: 1.0,
                payload_recovered: true,
            }
        } else {
            RobustnessMetrics::degraded()
        };
        let record = TrialRecord::measured(
            &self.key(image, algorithm.name(), found),
            AttackCategory::Capacity,
            "binary_search",
            format!("max_valid_length={found}"),
            result.distortion,
            robustness,
            "",
            "",
        );

        UnitOutput {
            records: vec![record],
            capacity: Some(result),
        }
    }

    /// @ai:intent Plain JPEG re-save of the cover, independent of any algorithm
    fn run_baseline(&self, image: usize) -> TrialRecord {
        let cover = &self.covers[image];
        let key = self.key(image, BASELINE_ALGORITHM, 0);

        match compression::jpeg(&cover.image, BASELINE_JPEG_QUALITY) {
            Ok(resaved) => TrialRecord::measured(
                &key,
                AttackCategory::Baseline,
                "jpeg",
                format!("quality={BASELINE_JPEG_QUALITY}"),
                calculate_distortion(&cover.image, &resaved),
                RobustnessMetrics::from_payloads("", ""),
                "",
                "",
            ),
            Err(e) => {
                warn!("Baseline re-save failed for {}: {}", cover.id, e);
                self.failed_baseline(image, e.to_string())
            }
        }
    }

    fn failed_baseline(&self, image: usize, error: String) -> TrialRecord {
        TrialRecord {
            attack_category: AttackCategory::Baseline,
            attack_name: "jpeg".to_string(),
            attack_params: format!("quality={BASELINE_JPEG_QUALITY}"),
            ..TrialRecord::failed(&self.key(image, BASELINE_ALGORITHM, 0), "", error)
        }
    }
}

/// @ai:intent Extract from an image and build its record against the cover
/// @ai:post extraction errors degrade robustness and are kept as the extracted payload
fn measure(
    key: &TrialKey,
    algorithm: &dyn StegoAlgorithm,
    cover: &DynamicImage,
    image: &DynamicImage,
    payload: &str,
    (category, name, params): (AttackCategory, String, String),
) -> TrialRecord {
    let distortion = calculate_distortion(cover, image);
    let (robustness, extracted) = match algorithm.extract(image) {
        Ok(extracted) => (RobustnessMetrics::from_payloads(payload, &extracted), extracted),
        Err(e) => (RobustnessMetrics::degraded(), format!("{EXTRACTION_FAILED_PREFIX} {e}")),
    };
    TrialRecord::measured(key, category, name, params, distortion, robustness, payload, extracted)
}

/// @ai:intent Runs the configured algorithms against a dataset and collects every record
pub struct Evaluator {
    config: EvalConfig,
    algorithms: Vec<Arc<dyn StegoAlgorithm>>,
    registry: AttackRegistry,
    show_progress: bool,
    trial_timeout: Duration,
}

impl Evaluator {
    /// @ai:intent Create an evaluator for a configuration and a set of algorithms
    /// @ai:effects pure
    pub fn new(config: EvalConfig, algorithms: Vec<Arc<dyn StegoAlgorithm>>) -> Self {
        let registry = AttackRegistry::new(config.seed);
        let trial_timeout = Duration::from_secs(config.trial_timeout_secs);
        Self {
            config,
            algorithms,
            registry,
            show_progress: true,
            trial_timeout,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_trial_timeout(mut self, timeout: Duration) -> Self {
        self.trial_timeout = timeout;
        self
    }

    /// @ai:intent Validate the configuration, load the dataset and evaluate it
    /// @ai:pre dataset_path holds at least one decodable image
    /// @ai:effects fs:read
    pub async fn run(&self) -> Result<EvaluationOutput> {
        self.config.validate().context("Configuration rejected")?;
        let covers = DatasetLoader::new().load(&self.config.dataset_path, self.config.dataset_limit);
        if covers.is_empty() {
            bail!("No images found in {}", self.config.dataset_path.display());
        }
        self.evaluate(covers).await
    }

    /// @ai:intent Evaluate already-loaded covers
    /// @ai:post records are grouped by work unit in plan order
    /// @ai:post a unit that times out or panics contributes one error record
    /// @ai:post units of a non-reentrant algorithm run one at a time
    /// @ai:effects spawns blocking tasks
    pub async fn evaluate(&self, covers: Vec<CoverImage>) -> Result<EvaluationOutput> {
        if covers.is_empty() {
            bail!("No cover images to evaluate");
        }
        if self.algorithms.is_empty() {
            bail!("No algorithms to evaluate");
        }

        let descriptors = self.registry.expand(&self.config.attacks);
        let combinations = if self.config.combo_attacks {
            AttackRegistry::combinations(&descriptors)
        } else {
            Vec::new()
        };
        let capacity_enabled = self.config.capacity.enabled;

        let total = total_steps(
            covers.len(),
            self.algorithms.len(),
            self.config.payload_sizes.len(),
            descriptors.len(),
            combinations.len(),
            capacity_enabled,
        );
        info!(
            "Evaluating {} images x {} algorithms x {} payload sizes ({} attacks, {} combinations, {} steps)",
            covers.len(),
            self.algorithms.len(),
            self.config.payload_sizes.len(),
            descriptors.len(),
            combinations.len(),
            total
        );

        let context = Arc::new(TrialContext {
            covers,
            algorithms: self.algorithms.clone(),
            registry: self.registry.clone(),
            descriptors,
            combinations,
            capacity: CapacitySearch::new(self.config.capacity.max_payload, self.config.capacity.tolerance),
            seed: self.config.seed,
            exclusive: self
                .algorithms
                .iter()
                .map(|a| (!a.reentrant()).then(|| Arc::new(Mutex::new(()))))
                .collect(),
        });
        let units = context.plan(&self.config.payload_sizes, capacity_enabled);
        let unit_count = units.len();

        let progress = Progress::new(total, self.show_progress);
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let timeout = self.trial_timeout;
        let mut join_set = JoinSet::new();

        for (index, unit) in units.into_iter().enumerate() {
            let context = Arc::clone(&context);
            let semaphore = Arc::clone(&semaphore);
            let progress = progress.clone();

            join_set.spawn(async move {
                // Moved into the blocking task: held until the unit really ends, even past its timeout.
                let exclusive = match context.exclusive_lock(&unit) {
                    Some(lock) => Some(lock.lock_owned().await),
                    None => None,
                };
                let permit = semaphore.acquire_owned().await;

                let worker = Arc::clone(&context);
                let handle = tokio::task::spawn_blocking(move || {
                    let _held = (permit, exclusive);
                    worker.execute(index, unit)
                });
                let output = match tokio::time::timeout(timeout, handle).await {
                    Ok(Ok(output)) => output,
                    Ok(Err(e)) => {
                        warn!("Work unit {} panicked: {}", index, e);
                        context.failed_unit(&unit, format!("worker panicked: {e}"))
                    }
                    Err(_) => {
                        warn!("Work unit {} timed out after {:?}", index, timeout);
                        context.failed_unit(&unit, format!("timed out after {timeout:?}"))
                    }
                };

                progress.inc(context.steps(&unit));
                (index, output)
            });
        }

        let mut outputs = Vec::with_capacity(unit_count);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => outputs.push(result),
                Err(e) => warn!("Work unit task failed: {}", e),
            }
        }
        progress.finish();
        outputs.sort_by_key(|(index, _)| *index);

        let mut evaluation = EvaluationOutput::default();
        for (_, output) in outputs {
            evaluation.records.extend(output.records);
            evaluation.capacity.extend(output.capacity);
        }

        info!(
            "Evaluation finished: {} records, {} capacity results",
            evaluation.records.len(),
            evaluation.capacity.len()
        );
        Ok(evaluation)
    }
}
