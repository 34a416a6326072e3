//! @ai:module:intent Configuration structs for evaluation runs
//! @ai:module:layer infrastructure
//! @ai:module:public_api EvalConfig, CapacityConfig, AlgorithmConfig, ConfigError
//! @ai:module:stateless true

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// @ai:intent Configuration problems that abort a run before any trial executes
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to write config: {0}")]
    Write(#[from] std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// @ai:intent Main configuration for an evaluation run
/// @ai:effects pure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalConfig {
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_limit: Option<usize>,
    #[serde(default = "default_payload_sizes")]
    pub payload_sizes: Vec<usize>,
    #[serde(default = "default_run_name")]
    pub run_name: String,
    #[serde(default)]
    pub combo_attacks: bool,
    /// Fixes payload contents and noise attacks when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_trial_timeout")]
    pub trial_timeout_secs: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub capacity: CapacityConfig,
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<AlgorithmConfig>,
    /// category -> attack name -> parameter value or list of values
    #[serde(default)]
    pub attacks: toml::Table,
}

/// @ai:intent Capacity search settings
/// @ai:effects pure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_payload")]
    pub max_payload: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: usize,
}

/// @ai:intent Algorithm under test, selected by `kind`
/// @ai:effects pure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AlgorithmConfig {
    Lsb,
    External {
        name: String,
        program: String,
        #[serde(default)]
        embed_args: Vec<String>,
        #[serde(default)]
        extract_args: Vec<String>,
    },
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            dataset_limit: None,
            payload_sizes: default_payload_sizes(),
            run_name: default_run_name(),
            combo_attacks: false,
            seed: None,
            workers: default_workers(),
            trial_timeout_secs: default_trial_timeout(),
            output_dir: default_output_dir(),
            capacity: CapacityConfig::default(),
            algorithms: default_algorithms(),
            attacks: toml::Table::new(),
        }
    }
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_payload: default_max_payload(),
            tolerance: default_tolerance(),
        }
    }
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("./data")
}

fn default_payload_sizes() -> Vec<usize> {
    vec![10, 100, 1000, 5000, 10000]
}

fn default_run_name() -> String {
    "default".to_string()
}

fn default_workers() -> usize {
    1
}

fn default_trial_timeout() -> u64 {
    600
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_max_payload() -> usize {
    100_000
}

fn default_tolerance() -> usize {
    50
}

fn default_algorithms() -> Vec<AlgorithmConfig> {
    vec![AlgorithmConfig::Lsb]
}

/// Attack grid written by `init`.
const SAMPLE_ATTACKS: &str = r#"
[compression]
jpeg = [95, 75, 50]

[noise]
gaussian = [{ mean = 0.0, var = 0.001 }]
salt_pepper = [0.01]

[filtering]
gaussian_blur = [3, 5]
median = [3]

[geometric]
rotation = [1.0]
scaling = [0.5]
cropping = [0.05]
"#;

impl EvalConfig {
    /// @ai:intent Load configuration from a TOML file
    /// @ai:pre path exists and is readable
    /// @ai:effects fs:read
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// @ai:intent Save configuration to a TOML file
    /// @ai:effects fs:write
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// @ai:intent Default configuration with a representative attack grid
    /// @ai:effects pure
    pub fn sample() -> Self {
        Self {
            dataset_limit: Some(10),
            payload_sizes: vec![10, 100, 1000],
            attacks: toml::from_str(SAMPLE_ATTACKS).unwrap_or_default(),
            ..Self::default()
        }
    }

    /// @ai:intent Reject configurations that cannot produce a meaningful run
    /// @ai:post unknown attack categories and names are not rejected here
    /// @ai:effects pure
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.payload_sizes.is_empty() {
            return invalid("payload_sizes must not be empty");
        }
        if self.workers == 0 {
            return invalid("workers must be at least 1");
        }
        if self.trial_timeout_secs == 0 {
            return invalid("trial_timeout_secs must be positive");
        }
        if self.capacity.max_payload == 0 {
            return invalid("capacity.max_payload must be positive");
        }
        if self.run_name.trim().is_empty() {
            return invalid("run_name must not be empty");
        }
        if self.algorithms.is_empty() {
            return invalid("at least one algorithm must be configured");
        }

        for algorithm in &self.algorithms {
            if let AlgorithmConfig::External { name, program, .. } = algorithm {
                if name.trim().is_empty() {
                    return invalid("external algorithm needs a name");
                }
                if program.trim().is_empty() {
                    return invalid(&format!("external algorithm '{name}' needs a program"));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: EvalConfig = toml::from_str("run_name = \"quick\"").unwrap();
        assert_eq!(config.run_name, "quick");
        assert_eq!(config.payload_sizes, vec![10, 100, 1000, 5000, 10000]);
        assert_eq!(config.capacity, CapacityConfig::default());
        assert_eq!(config.algorithms, vec![AlgorithmConfig::Lsb]);
        assert_eq!(config.workers, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let config: EvalConfig = toml::from_str(
            r#"
            dataset_path = "./covers"
            dataset_limit = 3
            payload_sizes = [16]
            combo_attacks = true
            seed = 7

            [capacity]
            enabled = true
            tolerance = 10

            [[algorithms]]
            kind = "external"
            name = "paper"
            program = "python3"
            embed_args = ["tool.py", "embed", "{cover}"]

            [attacks.noise]
            gaussian = [0.0]

            [attacks.compression]
            jpeg = 90
            "#,
        )
        .unwrap();

        assert_eq!(config.dataset_limit, Some(3));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.capacity.max_payload, 100_000);
        assert_eq!(config.capacity.tolerance, 10);
        assert!(matches!(&config.algorithms[0], AlgorithmConfig::External { name, extract_args, .. } if name == "paper" && extract_args.is_empty()));
        let categories: Vec<_> = config.attacks.keys().cloned().collect();
        assert_eq!(categories, vec!["noise", "compression"]);
    }

    #[test]
    fn test_validate_rejects_fatal_settings() {
        let cases: Vec<Box<dyn Fn(&mut EvalConfig)>> = vec![
            Box::new(|c: &mut EvalConfig| c.payload_sizes.clear()),
            Box::new(|c: &mut EvalConfig| c.workers = 0),
            Box::new(|c: &mut EvalConfig| c.trial_timeout_secs = 0),
            Box::new(|c: &mut EvalConfig| c.capacity.max_payload = 0),
            Box::new(|c: &mut EvalConfig| c.algorithms.clear()),
            Box::new(|c: &mut EvalConfig| {
                c.algorithms = vec![AlgorithmConfig::External {
                    name: "x".to_string(),
                    program: " ".to_string(),
                    embed_args: vec![],
                    extract_args: vec![],
                }]
            }),
        ];

        for mutate in cases {
            let mut config = EvalConfig::default();
            mutate(&mut config);
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_unknown_attacks_pass_validation() {
        let config: EvalConfig = toml::from_str("[attacks.warp]\ntwist = [1]").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let config = EvalConfig::sample();
        config.save(&path).unwrap();
        let loaded = EvalConfig::load(&path).unwrap();

        assert_eq!(loaded, config);
        assert!(loaded.attacks.contains_key("geometric"));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        std::fs::write(&path, "payload_sizes = \"many\"").unwrap();
        assert!(matches!(EvalConfig::load(&path), Err(ConfigError::Parse { .. })));
    }
}
