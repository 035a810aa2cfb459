//! End-to-end workflow tests on a synthetic BACE table.
//!
//! Exercises the same load → search → evaluate pipeline the binary runs,
//! and pins down the workflow-level contracts: fail-fast mode parsing,
//! the metric sets per mode, the 8-point reference grid, empty-partition
//! skipping, and byte-for-byte determinism of the output files.

use std::io::Write;
use std::path::Path;

use tempfile::TempDir;

use bacebench_data::{BaceLoader, DataError, LoadedBace, Mode, SplitRatio};
use bacebench_eval::{
    Evaluator, HyperparamSearch, Metric, ModelBuilder, ParamGrid, ParamValue, SearchOutcome,
};

/// Write a 40-molecule synthetic BACE CSV.
///
/// Feature `f0` carries the signal for both label columns; assignments
/// cycle Train/Train/Train/Train/Train/Train/Valid/Valid/Test/Crystal.
fn write_bace_csv(dir: &Path, with_crystal: bool) -> std::path::PathBuf {
    let path = dir.join("bace.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "mol,CID,Class,pIC50,split_20_80,f0,f1").unwrap();
    for i in 0..40 {
        let class = u8::from(i >= 20);
        let pic50 = 2.0 + 0.2 * f64::from(i);
        let assignment = match i % 10 {
            6 | 7 => "Valid",
            8 => "Test",
            9 => {
                if with_crystal {
                    "Crystal"
                } else {
                    "Test"
                }
            }
            _ => "Train",
        };
        let f0 = f64::from(i) + f64::from(class) * 30.0;
        let f1 = f64::from(i % 3);
        writeln!(
            f,
            "CCO,BACE_{i},{class},{pic50},{assignment},{f0},{f1}"
        )
        .unwrap();
    }
    f.flush().unwrap();
    path
}

fn reference_grid() -> ParamGrid {
    ParamGrid::new()
        .with_axis(
            "n_estimators",
            vec![ParamValue::Int(10), ParamValue::Int(100)],
        )
        .unwrap()
        .with_axis(
            "max_features",
            vec![
                ParamValue::Str("auto".into()),
                ParamValue::Str("sqrt".into()),
                ParamValue::Str("log2".into()),
                ParamValue::None,
            ],
        )
        .unwrap()
}

/// Run one mode/split combination the way the binary does, writing the
/// per-partition CSV/stats files into `out_dir`.
fn run_combination(
    data: &Path,
    out_dir: &Path,
    mode: Mode,
    ratio: SplitRatio,
    seed: u64,
) -> (LoadedBace, SearchOutcome) {
    let loaded = BaceLoader::new(data).load(mode, false, ratio).unwrap();
    let builder = ModelBuilder::new(
        mode,
        loaded.tasks.clone(),
        &out_dir.join(format!("models_rf_{mode}_{ratio}")),
        seed,
    )
    .unwrap();
    let outcome = HyperparamSearch::new(builder)
        .search(
            &reference_grid(),
            &loaded.train,
            &loaded.valid,
            &loaded.transformers,
            Metric::objective(mode),
        )
        .unwrap();

    let metrics = Metric::set_for(mode);
    for (name, dataset) in [
        ("train", &loaded.train),
        ("valid", &loaded.valid),
        ("test", &loaded.test),
        ("crystal", &loaded.crystal),
    ] {
        if dataset.is_empty() {
            continue;
        }
        Evaluator::new(&outcome.best_model, dataset, &loaded.transformers)
            .unwrap()
            .compute_performance(
                &metrics,
                &out_dir.join(format!("rf_{mode}_{ratio}_{name}.csv")),
                &out_dir.join(format!("rf_{mode}_{ratio}_{name}_stats.txt")),
            )
            .unwrap();
    }
    (loaded, outcome)
}

#[test]
fn invalid_mode_fails_before_any_loading() {
    let err = "bogus".parse::<Mode>().unwrap_err();
    assert!(matches!(err, DataError::InvalidMode { mode } if mode == "bogus"));
}

#[test]
fn classification_run_produces_all_outputs() {
    let dir = TempDir::new().unwrap();
    let data = write_bace_csv(dir.path(), true);
    let (loaded, outcome) = run_combination(
        &data,
        dir.path(),
        Mode::Classification,
        SplitRatio::TwentyEighty,
        42,
    );

    // Partitions exhaust the table.
    assert_eq!(
        loaded.train.len() + loaded.valid.len() + loaded.test.len() + loaded.crystal.len(),
        40
    );

    // 2 x 4 grid: exactly 8 evaluations, every candidate persisted.
    assert_eq!(outcome.results.len(), 8);
    for result in &outcome.results {
        assert!(result.model_path.exists());
    }

    // One CSV + stats pair per non-empty partition, rf_{mode}_{split}_{partition} naming.
    for name in ["train", "valid", "test", "crystal"] {
        assert!(dir
            .path()
            .join(format!("rf_classification_20-80_{name}.csv"))
            .exists());
        assert!(dir
            .path()
            .join(format!("rf_classification_20-80_{name}_stats.txt"))
            .exists());
    }

    // Classification stats report the four classification metrics.
    let stats = std::fs::read_to_string(
        dir.path().join("rf_classification_20-80_test_stats.txt"),
    )
    .unwrap();
    for metric in ["accuracy", "matthews_corrcoef", "recall", "roc_auc"] {
        assert!(stats.contains(metric), "stats missing {metric}");
    }

    // The signal is trivially strong: train ROC-AUC should be high.
    let train_stats = std::fs::read_to_string(
        dir.path().join("rf_classification_20-80_train_stats.txt"),
    )
    .unwrap();
    let auc_line = train_stats
        .lines()
        .find(|l| l.starts_with("roc_auc:"))
        .unwrap();
    let auc: f64 = auc_line.split(':').nth(1).unwrap().trim().parse().unwrap();
    assert!(auc > 0.9, "train roc_auc {auc} <= 0.9");
}

#[test]
fn regression_run_reports_regression_metrics() {
    let dir = TempDir::new().unwrap();
    let data = write_bace_csv(dir.path(), true);
    run_combination(
        &data,
        dir.path(),
        Mode::Regression,
        SplitRatio::TwentyEighty,
        42,
    );

    let stats =
        std::fs::read_to_string(dir.path().join("rf_regression_20-80_train_stats.txt")).unwrap();
    for metric in ["r2", "rms", "mae"] {
        assert!(stats.contains(&format!("{metric}: ")), "stats missing {metric}");
    }
    assert!(stats.contains("task: pIC50"));

    // Predictions land in raw pIC50 space, not normalized space.
    let csv =
        std::fs::read_to_string(dir.path().join("rf_regression_20-80_train.csv")).unwrap();
    let first_pred: f64 = csv
        .lines()
        .nth(1)
        .unwrap()
        .split(',')
        .nth(3)
        .unwrap()
        .parse()
        .unwrap();
    assert!(
        (2.0..=10.0).contains(&first_pred),
        "prediction {first_pred} outside raw label range"
    );
}

#[test]
fn empty_crystal_partition_is_skipped_without_files() {
    let dir = TempDir::new().unwrap();
    let data = write_bace_csv(dir.path(), false);
    let (loaded, _) = run_combination(
        &data,
        dir.path(),
        Mode::Classification,
        SplitRatio::TwentyEighty,
        42,
    );

    assert!(loaded.crystal.is_empty());
    assert!(!dir
        .path()
        .join("rf_classification_20-80_crystal.csv")
        .exists());
    assert!(!dir
        .path()
        .join("rf_classification_20-80_crystal_stats.txt")
        .exists());
}

#[test]
fn identical_runs_write_identical_files() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let data = write_bace_csv(dir_a.path(), true);

    run_combination(
        &data,
        dir_a.path(),
        Mode::Classification,
        SplitRatio::TwentyEighty,
        42,
    );
    run_combination(
        &data,
        dir_b.path(),
        Mode::Classification,
        SplitRatio::TwentyEighty,
        42,
    );

    for name in ["train", "valid", "test", "crystal"] {
        for suffix in ["csv", "stats"] {
            let file = match suffix {
                "csv" => format!("rf_classification_20-80_{name}.csv"),
                _ => format!("rf_classification_20-80_{name}_stats.txt"),
            };
            let a = std::fs::read(dir_a.path().join(&file)).unwrap();
            let b = std::fs::read(dir_b.path().join(&file)).unwrap();
            assert_eq!(a, b, "{file} differs between identical runs");
        }
    }
}

#[test]
fn different_seeds_change_the_models() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let data = write_bace_csv(dir_a.path(), true);

    let (_, outcome_a) = run_combination(
        &data,
        dir_a.path(),
        Mode::Regression,
        SplitRatio::TwentyEighty,
        1,
    );
    let (loaded, outcome_b) = run_combination(
        &data,
        dir_b.path(),
        Mode::Regression,
        SplitRatio::TwentyEighty,
        2,
    );

    let preds_a = outcome_a
        .best_model
        .predict(&loaded.train, &loaded.transformers)
        .unwrap();
    let preds_b = outcome_b
        .best_model
        .predict(&loaded.train, &loaded.transformers)
        .unwrap();
    assert_ne!(preds_a, preds_b, "different seeds produced identical predictions");
}
