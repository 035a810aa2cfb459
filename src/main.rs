use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use bacebench_data::{BaceLoader, Dataset, Mode, SplitRatio};
use bacebench_eval::{
    Evaluator, HyperparamSearch, Metric, ModelBuilder, ParamGrid, ParamValue, SearchOutcome,
};

#[derive(Parser)]
#[command(name = "bacebench")]
#[command(about = "Random-forest property prediction on the BACE benchmark")]
#[command(version)]
struct Cli {
    /// Path to the BACE CSV file
    #[arg(long)]
    data: PathBuf,

    /// Prediction mode: "classification" or "regression" (default: both)
    #[arg(long)]
    mode: Option<String>,

    /// Curated split ratio: "20-80" or "80-20" (default: both)
    #[arg(long)]
    split: Option<String>,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct RunSummary {
    mode: String,
    split: String,
    objective: String,
    best_params: Vec<ParamEntry>,
    best_validation_score: f64,
    n_grid_points: usize,
    partitions: Vec<PartitionScores>,
}

#[derive(Serialize)]
struct ParamEntry {
    name: String,
    value: String,
}

#[derive(Serialize)]
struct PartitionScores {
    partition: String,
    n_samples: usize,
    scores: BTreeMap<String, f64>,
}

/// The reference search grid: 2 tree counts x 4 feature strategies.
fn reference_grid() -> Result<ParamGrid> {
    let grid = ParamGrid::new()
        .with_axis(
            "n_estimators",
            vec![ParamValue::Int(10), ParamValue::Int(100)],
        )?
        .with_axis(
            "max_features",
            vec![
                ParamValue::Str("auto".into()),
                ParamValue::Str("sqrt".into()),
                ParamValue::Str("log2".into()),
                ParamValue::None,
            ],
        )?;
    Ok(grid)
}

/// Run one mode/split combination end to end.
fn run_workflow(cli: &Cli, mode: Mode, ratio: SplitRatio) -> Result<RunSummary> {
    // 1. Load partitions and transformers.
    let loaded = BaceLoader::new(&cli.data)
        .load(mode, false, ratio)
        .context("failed to load BACE dataset")?;

    let metrics = Metric::set_for(mode);
    let objective = Metric::objective(mode);
    let grid = reference_grid()?;

    // 2. Grid search on the validation partition.
    let model_dir = cli.output_dir.join(format!("models_rf_{mode}_{ratio}"));
    let builder = ModelBuilder::new(mode, loaded.tasks.clone(), &model_dir, cli.seed)
        .context("failed to prepare model directory")?;
    let outcome: SearchOutcome = HyperparamSearch::new(builder)
        .search(
            &grid,
            &loaded.train,
            &loaded.valid,
            &loaded.transformers,
            objective,
        )
        .context("hyperparameter search failed")?;
    info!(best_params = %outcome.best_params, "search selected model");

    // 3. Persist the winning model.
    let best_path = cli.output_dir.join(format!("rf_{mode}_{ratio}_best.bin"));
    outcome
        .best_model
        .save(&best_path)
        .context("failed to save best model")?;

    // 4. Evaluate every non-empty partition.
    let named: [(&str, &Dataset); 4] = [
        ("train", &loaded.train),
        ("valid", &loaded.valid),
        ("test", &loaded.test),
        ("crystal", &loaded.crystal),
    ];
    let mut partitions = Vec::new();
    for (name, dataset) in named {
        if dataset.is_empty() {
            info!(partition = name, "skipping empty partition");
            continue;
        }
        let csv_out = cli
            .output_dir
            .join(format!("rf_{mode}_{ratio}_{name}.csv"));
        let stats_out = cli
            .output_dir
            .join(format!("rf_{mode}_{ratio}_{name}_stats.txt"));
        let scores = Evaluator::new(&outcome.best_model, dataset, &loaded.transformers)?
            .compute_performance(&metrics, &csv_out, &stats_out)
            .with_context(|| format!("failed to evaluate {name} partition"))?;
        println!("RF {mode} {ratio} {name} scores: {scores:?}");
        partitions.push(PartitionScores {
            partition: name.to_string(),
            n_samples: dataset.len(),
            scores,
        });
    }

    Ok(RunSummary {
        mode: mode.to_string(),
        split: ratio.to_string(),
        objective: objective.name().to_string(),
        best_params: outcome
            .best_params
            .entries()
            .iter()
            .map(|(name, value)| ParamEntry {
                name: name.clone(),
                value: value.to_string(),
            })
            .collect(),
        best_validation_score: outcome.best_score,
        n_grid_points: outcome.results.len(),
        partitions,
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    // Fail fast on bad axis values before touching any data.
    let modes: Vec<Mode> = match &cli.mode {
        Some(raw) => vec![raw.parse()?],
        None => vec![Mode::Classification, Mode::Regression],
    };
    let ratios: Vec<SplitRatio> = match &cli.split {
        Some(raw) => vec![raw.parse()?],
        None => vec![SplitRatio::TwentyEighty, SplitRatio::EightyTwenty],
    };

    std::fs::create_dir_all(&cli.output_dir).context("failed to create output directory")?;

    // The four runs are independent; nothing is shared between them
    // except the CLI config, and output names embed mode and split.
    for &mode in &modes {
        for &ratio in &ratios {
            println!("RF {mode} {ratio}:");
            println!("--------------------------------");
            let summary = run_workflow(&cli, mode, ratio)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
