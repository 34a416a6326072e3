//! @ai:module:intent CLI for the steganography robustness benchmark
//! @ai:module:layer presentation

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use stegoeval::{
    attacks::{AttackKind, AttackRegistry},
    config::EvalConfig,
    dataset::{DatasetLoader, DatasetLoaderTrait},
    fetch::{DatasetFetcher, PicsumVariant},
    metrics::{types::format_float, RunResults},
    report::{assemble_results, run_directory, ReportGenerator},
    runner::{total_steps, Evaluator},
    stego::build_algorithms,
};

const DEFAULT_CONFIG: &str = "stegoeval.toml";

#[derive(Parser)]
#[command(name = "stegoeval")]
#[command(about = "Benchmark how steganographic payloads survive image attacks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an evaluation
    Run {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum number of cover images
        #[arg(long)]
        limit: Option<usize>,

        /// Number of work units evaluated concurrently
        #[arg(short, long)]
        workers: Option<usize>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,

        /// Root directory for run reports
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Regenerate reports from a saved results.json
    Report {
        /// Path to results JSON file
        #[arg(short, long)]
        results: PathBuf,

        /// Output directory for reports (defaults to the results file's directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available attacks and their parameters
    Attacks,

    /// Initialize a sample configuration
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        output: PathBuf,
    },

    /// Download and generate cover images
    Fetch {
        /// Dataset directory
        #[arg(short, long, default_value = "data")]
        output: PathBuf,

        /// Images per Picsum flavor (grayscale and color)
        #[arg(long, default_value = "100")]
        count: usize,

        /// Number of synthetic covers
        #[arg(long, default_value = "5")]
        synthetic: usize,

        /// Only generate synthetic covers
        #[arg(long)]
        offline: bool,

        /// Seed for synthetic covers
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show what a configuration would evaluate
    Info {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("stegoeval=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            limit,
            workers,
            no_progress,
            output,
        } => {
            run_evaluation(RunArgs {
                config,
                limit,
                workers,
                no_progress,
                output,
            })
            .await
        }
        Commands::Report { results, output } => generate_reports(results, output),
        Commands::Attacks => list_attacks(),
        Commands::Init { output } => init_config(output),
        Commands::Fetch {
            output,
            count,
            synthetic,
            offline,
            seed,
        } => fetch_dataset(output, count, synthetic, offline, seed).await,
        Commands::Info { config } => show_info(config),
    }
}

struct RunArgs {
    config: Option<PathBuf>,
    limit: Option<usize>,
    workers: Option<usize>,
    no_progress: bool,
    output: Option<PathBuf>,
}

/// @ai:intent Run a full evaluation and write its reports
/// @ai:effects fs:read, fs:write
async fn run_evaluation(args: RunArgs) -> Result<()> {
    let mut config = load_or_default_config(args.config)?;

    if let Some(limit) = args.limit {
        config.dataset_limit = Some(limit);
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }
    config.validate()?;

    let algorithms = build_algorithms(&config.algorithms).context("Failed to set up algorithms")?;
    tracing::info!(
        "Algorithms: {}",
        algorithms.iter().map(|a| a.name()).collect::<Vec<_>>().join(", ")
    );

    let evaluator = Evaluator::new(config.clone(), algorithms).with_progress(!args.no_progress);
    let output = evaluator.run().await?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let results = assemble_results(&config.run_name, &timestamp, output);

    let output_dir = run_directory(&config.output_dir, &config.run_name, &timestamp);
    ReportGenerator::new().generate_all(&results, &output_dir)?;
    tracing::info!("Output directory: {}", output_dir.display());

    print_summary(&results);
    Ok(())
}

/// @ai:intent Rebuild every report from a saved results file
/// @ai:effects fs:read, fs:write
fn generate_reports(results_path: PathBuf, output_dir: Option<PathBuf>) -> Result<()> {
    let reporter = ReportGenerator::new();
    let results = reporter.load(&results_path)?;

    let output_dir = output_dir.unwrap_or_else(|| {
        results_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    });
    reporter.generate_all(&results, &output_dir)?;

    println!("Reports generated in {}", output_dir.display());
    Ok(())
}

fn list_attacks() -> Result<()> {
    println!("{:<14} {:<15} Parameters", "Category", "Attack");
    println!("{}", "-".repeat(60));
    for kind in AttackKind::ALL {
        let params = kind
            .params()
            .iter()
            .map(|p| match p.default {
                Some(default) => format!("{}={}", p.name, default),
                None => format!("{} (required)", p.name),
            })
            .collect::<Vec<_>>()
            .join(", ");
        println!("{:<14} {:<15} {}", kind.category(), kind.name(), params);
    }
    println!();
    println!("A bare value binds to the first parameter listed.");
    Ok(())
}

fn init_config(output: PathBuf) -> Result<()> {
    let config = EvalConfig::sample();
    config.save(&output)?;
    println!("Configuration saved to {}", output.display());
    Ok(())
}

/// @ai:intent Populate a dataset directory
/// @ai:effects network, fs:write
async fn fetch_dataset(
    output: PathBuf,
    count: usize,
    synthetic: usize,
    offline: bool,
    seed: Option<u64>,
) -> Result<()> {
    let fetcher = DatasetFetcher::new(output, true)?;

    if !offline {
        for variant in [PicsumVariant::Gray, PicsumVariant::Color] {
            fetcher.download_picsum(variant, count).await?;
        }
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    fetcher.generate_synthetic(synthetic, &mut rng)?;

    println!("Dataset ready in {}", fetcher.root().display());
    Ok(())
}

/// @ai:intent Describe the grid a configuration expands to without running it
/// @ai:effects fs:read
fn show_info(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_or_default_config(config_path)?;
    config.validate()?;

    let images = DatasetLoader::new().find_images(&config.dataset_path);
    let image_count = config
        .dataset_limit
        .map(|limit| images.len().min(limit))
        .unwrap_or(images.len());

    let descriptors = AttackRegistry::new(config.seed).expand(&config.attacks);
    let combinations = if config.combo_attacks {
        AttackRegistry::combinations(&descriptors).len()
    } else {
        0
    };

    println!("Run:           {}", config.run_name);
    println!("Dataset:       {} ({} images)", config.dataset_path.display(), image_count);
    println!("Algorithms:    {}", config.algorithms.len());
    println!("Payload sizes: {:?}", config.payload_sizes);
    println!("Attacks:       {}", descriptors.len());
    for descriptor in &descriptors {
        println!(
            "  {}.{} ({})",
            descriptor.category(),
            descriptor.name(),
            descriptor.params_label()
        );
    }
    println!("Combinations:  {}", combinations);
    println!(
        "Capacity:      {}",
        if config.capacity.enabled {
            format!(
                "up to {} chars, tolerance {}",
                config.capacity.max_payload, config.capacity.tolerance
            )
        } else {
            "disabled".to_string()
        }
    );
    println!(
        "Total steps:   {}",
        total_steps(
            image_count,
            config.algorithms.len(),
            config.payload_sizes.len(),
            descriptors.len(),
            combinations,
            config.capacity.enabled,
        )
    );
    Ok(())
}

fn load_or_default_config(path: Option<PathBuf>) -> Result<EvalConfig> {
    match path {
        Some(p) => Ok(EvalConfig::load(&p)?),
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG);
            if default_path.exists() {
                Ok(EvalConfig::load(&default_path)?)
            } else {
                tracing::info!("No {} found, using defaults", DEFAULT_CONFIG);
                Ok(EvalConfig::default())
            }
        }
    }
}

fn print_summary(results: &RunResults) {
    println!();
    println!("Steganography Evaluation Results: {}", results.run_name);
    println!("==================================");
    println!();

    let failed = results.records.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        println!("Warnings:");
        println!("  {} trial(s) failed, see the error column in results.csv", failed);
        println!();
    }

    let score = |s: Option<f64>| s.map(|v| format_float(v, 1)).unwrap_or_else(|| "-".to_string());

    println!(
        "{:<20} {:>11} {:>7} {:>7} {:>9} {:>7} {:>8} {:>8} {:>9}",
        "Algorithm", "Compression", "Blur", "Noise", "Geometric", "Combo", "Capacity", "Overall", "Recovery"
    );
    println!("{}", "-".repeat(96));
    for row in &results.scores {
        println!(
            "{:<20} {:>11} {:>7} {:>7} {:>9} {:>7} {:>8} {:>8} {:>8.1}%",
            row.algorithm,
            score(row.compression_score),
            score(row.blur_score),
            score(row.noise_score),
            score(row.geometric_score),
            score(row.combo_score),
            score(row.capacity_score),
            score(row.overall_score),
            row.recovery_rate * 100.0
        );
    }
    println!();
}
