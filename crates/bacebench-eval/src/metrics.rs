//! Scoring metrics for classification and regression.
//!
//! Classification metrics take class-1 probabilities as predictions;
//! label-based metrics (accuracy, MCC, recall) threshold at 0.5, ROC-AUC
//! ranks the raw probabilities. Regression metrics compare raw values.

use bacebench_data::Mode;

/// Whether larger or smaller scores are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    /// Return `true` if `candidate` strictly improves on `incumbent`.
    ///
    /// Strict comparison makes ties keep the incumbent (first-seen wins).
    #[must_use]
    pub fn improves(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::Maximize => candidate > incumbent,
            Direction::Minimize => candidate < incumbent,
        }
    }
}

/// A named scoring metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Fraction of correct thresholded predictions.
    Accuracy,
    /// Matthews correlation coefficient for binary labels.
    MatthewsCorrcoef,
    /// Sensitivity: TP / (TP + FN).
    Recall,
    /// Area under the ROC curve, rank-based with tie correction.
    RocAuc,
    /// Coefficient of determination.
    R2,
    /// Root-mean-square error.
    Rms,
    /// Mean absolute error.
    Mae,
}

impl Metric {
    /// Return the metric's display name (used in output files).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::MatthewsCorrcoef => "matthews_corrcoef",
            Metric::Recall => "recall",
            Metric::RocAuc => "roc_auc",
            Metric::R2 => "r2",
            Metric::Rms => "rms",
            Metric::Mae => "mae",
        }
    }

    /// Return the optimization direction.
    #[must_use]
    pub fn direction(self) -> Direction {
        match self {
            Metric::Rms | Metric::Mae => Direction::Minimize,
            _ => Direction::Maximize,
        }
    }

    /// The full metric set reported for a mode.
    #[must_use]
    pub fn set_for(mode: Mode) -> Vec<Metric> {
        match mode {
            Mode::Classification => vec![
                Metric::Accuracy,
                Metric::MatthewsCorrcoef,
                Metric::Recall,
                Metric::RocAuc,
            ],
            Mode::Regression => vec![Metric::R2, Metric::Rms, Metric::Mae],
        }
    }

    /// The metric the hyperparameter search optimizes for a mode.
    #[must_use]
    pub fn objective(mode: Mode) -> Metric {
        match mode {
            Mode::Classification => Metric::RocAuc,
            Mode::Regression => Metric::R2,
        }
    }

    /// Compute the score over parallel truth/prediction slices.
    ///
    /// Slices must be non-empty and of equal length.
    #[must_use]
    pub fn compute(self, y_true: &[f64], y_pred: &[f64]) -> f64 {
        debug_assert!(!y_true.is_empty(), "metrics need at least one sample");
        debug_assert_eq!(y_true.len(), y_pred.len());
        match self {
            Metric::Accuracy => accuracy(y_true, y_pred),
            Metric::MatthewsCorrcoef => matthews_corrcoef(y_true, y_pred),
            Metric::Recall => recall(y_true, y_pred),
            Metric::RocAuc => roc_auc(y_true, y_pred),
            Metric::R2 => r2(y_true, y_pred),
            Metric::Rms => rms(y_true, y_pred),
            Metric::Mae => mae(y_true, y_pred),
        }
    }
}

/// Binary confusion counts at the 0.5 threshold.
fn confusion_counts(y_true: &[f64], y_pred: &[f64]) -> (f64, f64, f64, f64) {
    let mut tp = 0.0;
    let mut tn = 0.0;
    let mut fp = 0.0;
    let mut fn_ = 0.0;
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t >= 0.5, p >= 0.5) {
            (true, true) => tp += 1.0,
            (false, false) => tn += 1.0,
            (false, true) => fp += 1.0,
            (true, false) => fn_ += 1.0,
        }
    }
    (tp, tn, fp, fn_)
}

fn accuracy(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let (tp, tn, fp, fn_) = confusion_counts(y_true, y_pred);
    (tp + tn) / (tp + tn + fp + fn_)
}

fn recall(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let (tp, _, _, fn_) = confusion_counts(y_true, y_pred);
    if tp + fn_ == 0.0 {
        0.0
    } else {
        tp / (tp + fn_)
    }
}

fn matthews_corrcoef(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let (tp, tn, fp, fn_) = confusion_counts(y_true, y_pred);
    let denom = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        (tp * tn - fp * fn_) / denom
    }
}

/// Rank-based ROC-AUC (Mann-Whitney U) with average ranks for tied scores.
///
/// Returns 0.5 when only one class is present.
fn roc_auc(y_true: &[f64], y_score: &[f64]) -> f64 {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&t| t >= 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    // Assign 1-based ranks, averaging over tied score runs.
    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|&(&t, _)| t >= 0.5)
        .map(|(_, &r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    (rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg)
}

fn r2(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len() as f64;
    let mean = y_true.iter().sum::<f64>() / n;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        if ss_res == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - ss_res / ss_tot
    }
}

fn rms(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len() as f64;
    (y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / n)
        .sqrt()
}

fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len() as f64;
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / n
}
