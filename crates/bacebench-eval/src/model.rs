//! Model construction and the fitted-model wrapper.
//!
//! The builder turns a hyperparameter point into a trained forest of the
//! kind the mode demands; the wrapper gives the search and the evaluator
//! one prediction surface (class-1 probability for classification, raw
//! value for regression) with label transforms undone.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use bacebench_data::{Dataset, Mode, TaskName, Transformer};
use bacebench_rf::{MaxFeatures, RandomForest, RandomForestConfig};

use crate::EvalError;
use crate::search::{ParamPoint, ParamValue};

/// Apply every transformer in order, producing a new partition.
pub(crate) fn apply_all(transformers: &[Transformer], dataset: &Dataset) -> Dataset {
    transformers
        .iter()
        .fold(dataset.clone(), |acc, t| t.apply(&acc))
}

/// Builds candidate models for the hyperparameter search.
///
/// Bound to a prediction mode, the task list, a directory where candidate
/// model binaries are persisted, and the training seed.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    mode: Mode,
    tasks: Vec<TaskName>,
    model_dir: PathBuf,
    seed: u64,
}

impl ModelBuilder {
    /// Create a builder, creating the model directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ModelDirCreate`] when the directory cannot be
    /// created.
    pub fn new(
        mode: Mode,
        tasks: Vec<TaskName>,
        model_dir: &Path,
        seed: u64,
    ) -> Result<Self, EvalError> {
        fs::create_dir_all(model_dir).map_err(|e| EvalError::ModelDirCreate {
            path: model_dir.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            mode,
            tasks,
            model_dir: model_dir.to_path_buf(),
            seed,
        })
    }

    /// Return the prediction mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Return the directory candidate models are persisted under.
    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Train a model at one hyperparameter point.
    ///
    /// Transformers are applied to the training partition before fitting,
    /// so the forest learns in the transformed label space.
    ///
    /// # Errors
    ///
    /// Parameter extraction errors ([`EvalError::MissingParam`],
    /// [`EvalError::InvalidParamValue`]) or forest training errors.
    #[instrument(skip(self, train, transformers), fields(mode = %self.mode, params = %params))]
    pub fn fit(
        &self,
        params: &ParamPoint,
        train: &Dataset,
        transformers: &[Transformer],
    ) -> Result<FittedModel, EvalError> {
        let config = forest_config(self.mode, params, self.seed)?;
        let train = apply_all(transformers, train);
        let targets = train.labels_for_task(0)?;

        let forest = match self.mode {
            Mode::Classification => {
                let labels: Vec<usize> = targets.iter().map(|&v| usize::from(v >= 0.5)).collect();
                config.fit_classifier(train.features(), &labels, train.feature_names())?
            }
            Mode::Regression => {
                config.fit_regressor(train.features(), &targets, train.feature_names())?
            }
        };
        debug!(n_trees = forest.n_trees(), "candidate model trained");

        Ok(FittedModel {
            forest,
            mode: self.mode,
            tasks: self.tasks.clone(),
            params: params.clone(),
        })
    }
}

/// Translate a parameter point into a forest configuration.
///
/// Recognized parameters: `n_estimators` (positive integer) and
/// `max_features` (`auto` | `sqrt` | `log2` | none). `auto` follows the
/// estimator family convention: square root of the feature count for
/// classification, all features for regression.
fn forest_config(
    mode: Mode,
    params: &ParamPoint,
    seed: u64,
) -> Result<RandomForestConfig, EvalError> {
    let n_estimators = match params.get("n_estimators") {
        Some(ParamValue::Int(n)) if *n > 0 => *n as usize,
        Some(other) => {
            return Err(EvalError::InvalidParamValue {
                name: "n_estimators".to_string(),
                value: other.to_string(),
                expected: "a positive integer",
            });
        }
        None => {
            return Err(EvalError::MissingParam {
                name: "n_estimators".to_string(),
            });
        }
    };

    let max_features = match params.get("max_features") {
        Some(ParamValue::Str(s)) => match s.as_str() {
            "auto" => match mode {
                Mode::Classification => MaxFeatures::Sqrt,
                Mode::Regression => MaxFeatures::All,
            },
            "sqrt" => MaxFeatures::Sqrt,
            "log2" => MaxFeatures::Log2,
            other => {
                return Err(EvalError::InvalidParamValue {
                    name: "max_features".to_string(),
                    value: other.to_string(),
                    expected: "auto, sqrt, log2, or none",
                });
            }
        },
        Some(ParamValue::None) => MaxFeatures::All,
        Some(other) => {
            return Err(EvalError::InvalidParamValue {
                name: "max_features".to_string(),
                value: other.to_string(),
                expected: "auto, sqrt, log2, or none",
            });
        }
        None => {
            return Err(EvalError::MissingParam {
                name: "max_features".to_string(),
            });
        }
    };

    Ok(RandomForestConfig::new(n_estimators)?
        .with_max_features(max_features)
        .with_seed(seed))
}

/// A trained model bound to the task list and hyperparameter point it was
/// built from. Used read-only after construction.
#[derive(Debug)]
pub struct FittedModel {
    forest: RandomForest,
    mode: Mode,
    tasks: Vec<TaskName>,
    params: ParamPoint,
}

impl FittedModel {
    /// Predict over a partition, in the original label space.
    ///
    /// Feature-side transforms are applied to the input; label-side
    /// transforms are undone on the outputs (in reverse order).
    /// Classification predictions are class-1 probabilities.
    ///
    /// # Errors
    ///
    /// Propagates forest prediction errors.
    pub fn predict(
        &self,
        dataset: &Dataset,
        transformers: &[Transformer],
    ) -> Result<Vec<f64>, EvalError> {
        let dataset = apply_all(transformers, dataset);
        let mut predictions = match self.mode {
            Mode::Classification => self
                .forest
                .predict_proba_batch(dataset.features())?
                .iter()
                .map(|dist| dist.prob_of(1))
                .collect(),
            Mode::Regression => self.forest.predict_value_batch(dataset.features())?,
        };
        for t in transformers.iter().rev() {
            t.undo_predictions(0, &mut predictions);
        }
        Ok(predictions)
    }

    /// Persist the model binary.
    ///
    /// # Errors
    ///
    /// Propagates forest serialization errors.
    pub fn save(&self, path: &Path) -> Result<(), EvalError> {
        self.forest.save(path)?;
        Ok(())
    }

    /// Return the underlying forest.
    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Return the prediction mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Return the tasks this model predicts.
    #[must_use]
    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    /// Return the hyperparameter point this model was built from.
    #[must_use]
    pub fn params(&self) -> &ParamPoint {
        &self.params
    }
}
