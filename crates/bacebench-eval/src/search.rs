//! Hyperparameter grid search.
//!
//! The search space is the full Cartesian product of the grid axes, in
//! declaration order with the last axis varying fastest. Every point is
//! trained on the training partition and scored on the validation
//! partition with the objective metric; the best point wins, ties going
//! to the first-encountered point. Each candidate's model binary is
//! persisted under the builder's model directory.

use std::fmt;
use std::path::PathBuf;

use tracing::{info, instrument};

use bacebench_data::{Dataset, Transformer};

use crate::EvalError;
use crate::metrics::Metric;
use crate::model::{FittedModel, ModelBuilder};

/// A candidate value for one grid axis.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Integer value.
    Int(u64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    Str(String),
    /// Explicit absence (e.g. `max_features = none`).
    None,
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::None => f.write_str("none"),
        }
    }
}

/// One point of the search space: a named value per grid axis, in axis
/// declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamPoint {
    entries: Vec<(String, ParamValue)>,
}

impl ParamPoint {
    /// Look up a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Return all entries in axis order.
    #[must_use]
    pub fn entries(&self) -> &[(String, ParamValue)] {
        &self.entries
    }

    /// Filename-safe label for this point, e.g.
    /// `n_estimators-10_max_features-sqrt`.
    #[must_use]
    pub fn label(&self) -> String {
        self.entries
            .iter()
            .map(|(n, v)| format!("{n}-{v}"))
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for ParamPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .entries
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect();
        f.write_str(&rendered.join(", "))
    }
}

/// An ordered hyperparameter grid.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    axes: Vec<(String, Vec<ParamValue>)>,
}

impl ParamGrid {
    /// Create an empty grid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an axis with its candidate values.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyGridAxis`] | `values` is empty |
    /// | [`EvalError::DuplicateGridAxis`] | axis name already declared |
    pub fn with_axis(
        mut self,
        name: impl Into<String>,
        values: Vec<ParamValue>,
    ) -> Result<Self, EvalError> {
        let name = name.into();
        if values.is_empty() {
            return Err(EvalError::EmptyGridAxis { name });
        }
        if self.axes.iter().any(|(n, _)| *n == name) {
            return Err(EvalError::DuplicateGridAxis { name });
        }
        self.axes.push((name, values));
        Ok(self)
    }

    /// Return the number of axes.
    #[must_use]
    pub fn n_axes(&self) -> usize {
        self.axes.len()
    }

    /// Return the number of points in the Cartesian product.
    #[must_use]
    pub fn n_points(&self) -> usize {
        if self.axes.is_empty() {
            return 0;
        }
        self.axes.iter().map(|(_, values)| values.len()).product()
    }

    /// Enumerate the full Cartesian product.
    ///
    /// Axes vary in declaration order with the last axis fastest.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::EmptyGrid`] when no axes are declared.
    pub fn points(&self) -> Result<Vec<ParamPoint>, EvalError> {
        if self.axes.is_empty() {
            return Err(EvalError::EmptyGrid);
        }
        let mut points: Vec<Vec<(String, ParamValue)>> = vec![Vec::new()];
        for (name, values) in &self.axes {
            let mut expanded = Vec::with_capacity(points.len() * values.len());
            for prefix in &points {
                for value in values {
                    let mut entries = prefix.clone();
                    entries.push((name.clone(), value.clone()));
                    expanded.push(entries);
                }
            }
            points = expanded;
        }
        Ok(points
            .into_iter()
            .map(|entries| ParamPoint { entries })
            .collect())
    }
}

/// The score one grid point achieved on the validation partition.
#[derive(Debug)]
pub struct SearchResult {
    /// The evaluated parameter point.
    pub params: ParamPoint,
    /// Validation score under the objective metric.
    pub score: f64,
    /// Where this candidate's model binary was persisted.
    pub model_path: PathBuf,
}

/// Outcome of a full grid search.
#[derive(Debug)]
pub struct SearchOutcome {
    /// The winning model.
    pub best_model: FittedModel,
    /// The winning parameter point.
    pub best_params: ParamPoint,
    /// The winning validation score.
    pub best_score: f64,
    /// Every evaluated point, in grid order.
    pub results: Vec<SearchResult>,
}

/// Exhaustive grid search over forest hyperparameters.
#[derive(Debug, Clone)]
pub struct HyperparamSearch {
    builder: ModelBuilder,
}

impl HyperparamSearch {
    /// Create a search driven by the given model builder.
    #[must_use]
    pub fn new(builder: ModelBuilder) -> Self {
        Self { builder }
    }

    /// Evaluate every grid point and return the best model.
    ///
    /// Trains each candidate on `train` (transformed), scores it on
    /// `valid` with `metric` (honoring the metric's direction), and
    /// persists each candidate's binary under the model directory.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyGrid`] | the grid has no axes |
    /// | [`EvalError::EmptyPartition`] | train or valid has zero samples |
    /// | Other | parameter extraction, training, or persistence failures |
    #[instrument(skip_all, fields(n_points = grid.n_points(), metric = metric.name()))]
    pub fn search(
        &self,
        grid: &ParamGrid,
        train: &Dataset,
        valid: &Dataset,
        transformers: &[Transformer],
        metric: Metric,
    ) -> Result<SearchOutcome, EvalError> {
        if train.is_empty() || valid.is_empty() {
            return Err(EvalError::EmptyPartition);
        }

        let truths = valid.labels_for_task(0)?;
        let direction = metric.direction();

        let mut results = Vec::new();
        let mut best: Option<(FittedModel, f64)> = None;

        for point in grid.points()? {
            let model = self.builder.fit(&point, train, transformers)?;
            let predictions = model.predict(valid, transformers)?;
            let score = metric.compute(&truths, &predictions);

            let model_path = self
                .builder
                .model_dir()
                .join(format!("rf_{}.bin", point.label()));
            model.save(&model_path)?;

            info!(params = %point, score, "grid point evaluated");

            let improves = match &best {
                Some((_, incumbent)) => direction.improves(score, *incumbent),
                None => true,
            };
            if improves {
                best = Some((model, score));
            }
            results.push(SearchResult {
                params: point,
                score,
                model_path,
            });
        }

        let (best_model, best_score) = best.expect("grid.points() is non-empty");
        let best_params = best_model.params().clone();

        info!(
            best_params = %best_params,
            best_score,
            n_evaluated = results.len(),
            "hyperparameter search complete"
        );

        Ok(SearchOutcome {
            best_model,
            best_params,
            best_score,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bacebench_data::{Mode, MoleculeId, TaskName};
    use tempfile::TempDir;

    fn separable_dataset(n_per_class: usize) -> Dataset {
        let n = n_per_class * 2;
        Dataset::new(
            (0..n).map(|i| MoleculeId::new(format!("M{i}"))).collect(),
            vec!["CCO".to_string(); n],
            vec![TaskName::new("Class")],
            vec!["f0".into(), "f1".into()],
            (0..n)
                .map(|i| {
                    let base = if i < n_per_class { 0.0 } else { 10.0 };
                    vec![base + (i % n_per_class) as f64 * 0.1, 0.5]
                })
                .collect(),
            (0..n)
                .map(|i| vec![f64::from(u8::from(i >= n_per_class))])
                .collect(),
            vec![1.0; n],
        )
        .unwrap()
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

    #[test]
    fn cartesian_product_order() {
        let grid = ParamGrid::new()
            .with_axis("a", vec![ParamValue::Int(1), ParamValue::Int(2)])
            .unwrap()
            .with_axis(
                "b",
                vec![ParamValue::Str("x".into()), ParamValue::Str("y".into())],
            )
            .unwrap();
        let points = grid.points().unwrap();
        assert_eq!(points.len(), 4);
        // Last axis fastest.
        assert_eq!(points[0].label(), "a-1_b-x");
        assert_eq!(points[1].label(), "a-1_b-y");
        assert_eq!(points[2].label(), "a-2_b-x");
        assert_eq!(points[3].label(), "a-2_b-y");
    }

    #[test]
    fn reference_grid_has_eight_points() {
        assert_eq!(reference_grid().n_points(), 8);
        assert_eq!(reference_grid().points().unwrap().len(), 8);
    }

    #[test]
    fn grid_validation() {
        assert!(matches!(
            ParamGrid::new().points().unwrap_err(),
            EvalError::EmptyGrid
        ));
        assert!(matches!(
            ParamGrid::new().with_axis("a", vec![]).unwrap_err(),
            EvalError::EmptyGridAxis { .. }
        ));
        let dup = ParamGrid::new()
            .with_axis("a", vec![ParamValue::Int(1)])
            .unwrap()
            .with_axis("a", vec![ParamValue::Int(2)]);
        assert!(matches!(dup.unwrap_err(), EvalError::DuplicateGridAxis { .. }));
    }

    #[test]
    fn search_evaluates_every_point_and_persists_models() {
        let dir = TempDir::new().unwrap();
        let train = separable_dataset(10);
        let valid = separable_dataset(5);
        let builder = ModelBuilder::new(
            Mode::Classification,
            train.tasks().to_vec(),
            dir.path(),
            42,
        )
        .unwrap();

        let outcome = HyperparamSearch::new(builder)
            .search(&reference_grid(), &train, &valid, &[], Metric::RocAuc)
            .unwrap();

        assert_eq!(outcome.results.len(), 8);
        for result in &outcome.results {
            assert!(result.model_path.exists(), "missing {:?}", result.model_path);
        }
    }

    #[test]
    fn ties_keep_first_seen_point() {
        // Trivially separable data: every grid point scores a perfect
        // ROC-AUC, so the first point must win.
        let dir = TempDir::new().unwrap();
        let train = separable_dataset(10);
        let valid = separable_dataset(5);
        let builder = ModelBuilder::new(
            Mode::Classification,
            train.tasks().to_vec(),
            dir.path(),
            42,
        )
        .unwrap();

        let outcome = HyperparamSearch::new(builder)
            .search(&reference_grid(), &train, &valid, &[], Metric::RocAuc)
            .unwrap();

        assert!(outcome.results.iter().all(|r| (r.score - 1.0).abs() < 1e-12));
        assert_eq!(outcome.best_params.label(), "n_estimators-10_max_features-auto");
        assert!((outcome.best_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_partitions_rejected() {
        let dir = TempDir::new().unwrap();
        let train = separable_dataset(5);
        let empty = train.subset(&[]).unwrap();
        let builder = ModelBuilder::new(
            Mode::Classification,
            train.tasks().to_vec(),
            dir.path(),
            42,
        )
        .unwrap();
        let err = HyperparamSearch::new(builder)
            .search(&reference_grid(), &train, &empty, &[], Metric::RocAuc)
            .unwrap_err();
        assert!(matches!(err, EvalError::EmptyPartition));
    }
}
