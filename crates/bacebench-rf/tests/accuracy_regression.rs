//! Accuracy regression tests for bacebench-rf.
//!
//! These tests verify that algorithmic changes do not degrade random
//! forest quality on deterministic synthetic datasets, for both the
//! classification and regression tasks.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use bacebench_rf::{MaxFeatures, RandomForestConfig};

// ---------------------------------------------------------------------------
// Helpers: deterministic synthetic datasets
// ---------------------------------------------------------------------------

/// Generate a 300-sample, 10-feature, 3-class classification dataset.
///
/// Features 0-2 are informative (class * 3.0 + noise in [0, 0.5]).
/// Features 3-9 are pure noise in [0, 0.5].
fn make_classification() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let n_samples = 300;
    let n_features = 10;
    let n_classes = 3;

    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % n_classes;
        labels.push(class);
        let row: Vec<f64> = (0..n_features)
            .map(|f| {
                let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
                base + rng.r#gen::<f64>() * 0.5
            })
            .collect();
        features.push(row);
    }
    let names: Vec<String> = (0..n_features).map(|f| format!("f{f}")).collect();
    (features, labels, names)
}

/// Generate a 300-sample, 5-feature regression dataset.
///
/// Target is 3*x0 - 2*x1 plus noise in [0, 0.25]; features 2-4 are noise.
fn make_regression() -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let n_samples = 300;
    let n_features = 5;

    let mut features = Vec::with_capacity(n_samples);
    let mut values = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let row: Vec<f64> = (0..n_features).map(|_| rng.r#gen::<f64>() * 4.0).collect();
        let target = 3.0 * row[0] - 2.0 * row[1] + rng.r#gen::<f64>() * 0.25;
        features.push(row);
        values.push(target);
    }
    let names: Vec<String> = (0..n_features).map(|f| format!("f{f}")).collect();
    (features, values, names)
}

// ---------------------------------------------------------------------------
// Classification accuracy floor
// ---------------------------------------------------------------------------

/// Training accuracy must exceed 0.95 on the informative synthetic set.
#[test]
fn classification_accuracy_above_threshold() {
    let (features, labels, names) = make_classification();
    let forest = RandomForestConfig::new(100)
        .unwrap()
        .with_seed(42)
        .fit_classifier(&features, &labels, &names)
        .unwrap();

    let predictions = forest.predict_class_batch(&features).unwrap();
    let correct = predictions
        .iter()
        .zip(&labels)
        .filter(|&(&p, &l)| p == l)
        .count();
    let accuracy = correct as f64 / labels.len() as f64;
    assert!(accuracy > 0.95, "accuracy {accuracy} <= 0.95");
}

// ---------------------------------------------------------------------------
// Regression quality floor
// ---------------------------------------------------------------------------

/// Training R² must exceed 0.9 on the noisy linear target.
#[test]
fn regression_r2_above_threshold() {
    let (features, values, names) = make_regression();
    let forest = RandomForestConfig::new(100)
        .unwrap()
        .with_max_features(MaxFeatures::All)
        .with_seed(42)
        .fit_regressor(&features, &values, &names)
        .unwrap();

    let predictions = forest.predict_value_batch(&features).unwrap();
    let mean: f64 = values.iter().sum::<f64>() / values.len() as f64;
    let ss_res: f64 = predictions
        .iter()
        .zip(&values)
        .map(|(p, v)| (v - p).powi(2))
        .sum();
    let ss_tot: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    let r2 = 1.0 - ss_res / ss_tot;
    assert!(r2 > 0.9, "r2 {r2} <= 0.9");
}

// ---------------------------------------------------------------------------
// Determinism across processes
// ---------------------------------------------------------------------------

/// Identical seed and data must reproduce identical predictions.
#[test]
fn fixed_seed_reproduces_predictions() {
    let (features, labels, names) = make_classification();
    let fit = || {
        RandomForestConfig::new(25)
            .unwrap()
            .with_seed(1234)
            .fit_classifier(&features, &labels, &names)
            .unwrap()
    };
    let a = fit().predict_proba_batch(&features).unwrap();
    let b = fit().predict_proba_batch(&features).unwrap();
    for (da, db) in a.iter().zip(&b) {
        assert_eq!(da.as_slice(), db.as_slice());
    }
}

/// Different seeds should produce a different ensemble.
#[test]
fn different_seeds_differ() {
    let (features, labels, names) = make_classification();
    let fit = |seed| {
        RandomForestConfig::new(25)
            .unwrap()
            .with_seed(seed)
            .fit_classifier(&features, &labels, &names)
            .unwrap()
    };
    let a = fit(1).predict_proba_batch(&features).unwrap();
    let b = fit(2).predict_proba_batch(&features).unwrap();
    let any_differs = a
        .iter()
        .zip(&b)
        .any(|(da, db)| da.as_slice() != db.as_slice());
    assert!(any_differs, "seeds 1 and 2 produced identical ensembles");
}
