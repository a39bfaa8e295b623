//! Gradient boosted regression trees
//!
//! Squared-error boosting: start from the mean target, then repeatedly fit
//! a shallow tree to the current residuals on a random subsample of the
//! rows and add a shrunken copy of it to the ensemble.

use super::tree::{RegressionTree, TreeParams};
use super::PriceModel;
use crate::error::ModelError;
use crate::models::{FeatureVector, NUM_FEATURES};
use crate::training::metrics::rmse;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    n_estimators: usize,
    learning_rate: f64,
    tree_params: TreeParams,
    /// Fraction of rows drawn (without replacement) for each tree
    subsample: f64,
    random_state: u64,
    init_prediction: Option<f64>,
    estimators: Vec<RegressionTree>,
    feature_importances: [f64; NUM_FEATURES],
}

impl GradientBoostingRegressor {
    /// Defaults match the production training configuration:
    /// 200 trees, learning rate 0.1, depth 5, subsample 0.8, seed 42,
    /// min 5 samples to split, min 3 samples per leaf.
    pub fn new() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.1,
            tree_params: TreeParams {
                max_depth: 5,
                min_samples_split: 5,
                min_samples_leaf: 3,
            },
            subsample: 0.8,
            random_state: 42,
            init_prediction: None,
            estimators: Vec::new(),
            feature_importances: [0.0; NUM_FEATURES],
        }
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.tree_params.max_depth = max_depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.tree_params.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.tree_params.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Clamped to `(0, 1]`
    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample.clamp(f64::MIN_POSITIVE, 1.0);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the ensemble, replacing any previous fit
    pub fn fit(&mut self, x: &[[f64; NUM_FEATURES]], y: &[f64]) -> Result<(), ModelError> {
        if x.len() != y.len() {
            return Err(ModelError::InvalidTrainingData(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(ModelError::InvalidTrainingData("no samples".to_string()));
        }
        if x.iter().flatten().chain(y).any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidTrainingData(
                "training data contains non-finite values".to_string(),
            ));
        }

        let n_samples = y.len();
        let init = y.iter().sum::<f64>() / n_samples as f64;
        let mut raw_predictions = vec![init; n_samples];
        let mut importances = [0.0; NUM_FEATURES];
        let mut rng = StdRng::seed_from_u64(self.random_state);
        let n_subsample =
            ((self.subsample * n_samples as f64).round() as usize).clamp(1, n_samples);

        self.estimators = Vec::with_capacity(self.n_estimators);

        for round in 0..self.n_estimators {
            let residuals: Vec<f64> = y
                .iter()
                .zip(&raw_predictions)
                .map(|(target, pred)| target - pred)
                .collect();

            let indices = if n_subsample < n_samples {
                rand::seq::index::sample(&mut rng, n_samples, n_subsample).into_vec()
            } else {
                (0..n_samples).collect()
            };

            let tree =
                RegressionTree::fit(x, &residuals, indices, self.tree_params, &mut importances);

            for (pred, row) in raw_predictions.iter_mut().zip(x) {
                *pred += self.learning_rate * tree.predict(row);
            }
            self.estimators.push(tree);

            if round % 50 == 0 {
                debug!(round, train_rmse = rmse(y, &raw_predictions), "Boosting round");
            }
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for value in importances.iter_mut() {
                *value /= total;
            }
        }
        self.feature_importances = importances;
        self.init_prediction = Some(init);

        Ok(())
    }

    /// Raw prediction for a single row
    pub fn predict_row(&self, row: &[f64; NUM_FEATURES]) -> Result<f64, ModelError> {
        let init = self.init_prediction.ok_or(ModelError::NotFitted)?;
        let value = self
            .estimators
            .iter()
            .fold(init, |acc, tree| acc + self.learning_rate * tree.predict(row));

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ModelError::NonFinite(value))
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.init_prediction.is_some()
    }

    /// Number of fitted trees
    pub fn n_trees(&self) -> usize {
        self.estimators.len()
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn max_depth(&self) -> usize {
        self.tree_params.max_depth
    }

    /// Normalized squared-error reduction per feature, in feature order
    pub fn feature_importances(&self) -> &[f64; NUM_FEATURES] {
        &self.feature_importances
    }
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceModel for GradientBoostingRegressor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        self.predict_row(&features.to_array())
    }
}
