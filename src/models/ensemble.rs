//! Ансамбли деревьев: случайный лес smartcore и градиентный бустинг

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor as SmartForest, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

use super::tree::DecisionTreeRegressor;
use super::{backend_error, check_fit_inputs, check_predict_inputs, to_dense, ModelError, Regressor};

type Forest = SmartForest<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Бэггинг деревьев на bootstrap-выборках; выборки определяются `seed`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    n_estimators: usize,
    max_depth: usize,
    min_samples_split: usize,
    seed: u64,
    n_features: usize,
    model: Option<Forest>,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize, max_depth: usize, min_samples_split: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            max_depth,
            min_samples_split,
            seed,
            n_features: 0,
            model: None,
        }
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        check_fit_inputs(X, y)?;

        let mut params = RandomForestRegressorParameters::default();
        params.n_trees = self.n_estimators as _;
        params.max_depth = Some(u16::try_from(self.max_depth).unwrap_or(u16::MAX));
        params.min_samples_split = self.min_samples_split;
        params.seed = self.seed;

        let y_vec = y.to_vec();
        self.model = Some(SmartForest::fit(&to_dense(X)?, &y_vec, params).map_err(backend_error)?);
        self.n_features = X.ncols();

        tracing::debug!(n_trees = self.n_estimators, "Random forest trained");
        Ok(())
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let model = self.model.as_ref().ok_or(ModelError::NotFitted("RandomForest"))?;
        check_predict_inputs(X, self.n_features)?;
        let predictions = model.predict(&to_dense(X)?).map_err(backend_error)?;
        Ok(Array1::from(predictions))
    }
}

/// Градиентный бустинг с квадратичной функцией потерь; слабые модели - деревья smartcore
#[derive(Debug, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    n_estimators: usize,
    learning_rate: f64,
    max_depth: usize,
    n_features: usize,
    init: Option<f64>,
    trees: Vec<DecisionTreeRegressor>,
}

impl GradientBoostingRegressor {
    pub fn new(n_estimators: usize, learning_rate: f64, max_depth: usize) -> Self {
        Self {
            n_estimators,
            learning_rate,
            max_depth,
            n_features: 0,
            init: None,
            trees: Vec::new(),
        }
    }
}

impl Regressor for GradientBoostingRegressor {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        check_fit_inputs(X, y)?;
        let init = y.mean().ok_or(ModelError::EmptyData)?;
        let mut current = Array1::from_elem(y.len(), init);
        let x = to_dense(X)?;

        self.trees.clear();
        for _ in 0..self.n_estimators {
            let residuals = y - &current;
            let mut tree = DecisionTreeRegressor::new(self.max_depth, 2);
            tree.fit_dense(&x, &residuals, X.ncols())?;
            let update = tree.predict_dense(&x)?;
            current.scaled_add(self.learning_rate, &update);
            self.trees.push(tree);
        }
        self.init = Some(init);
        self.n_features = X.ncols();
        Ok(())
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let init = self.init.ok_or(ModelError::NotFitted("GradientBoosting"))?;
        check_predict_inputs(X, self.n_features)?;

        let x = to_dense(X)?;
        let mut predictions = Array1::from_elem(X.nrows(), init);
        for tree in &self.trees {
            predictions.scaled_add(self.learning_rate, &tree.predict_dense(&x)?);
        }
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::r2_score;

    fn nonlinear_data() -> (Array2<f64>, Array1<f64>) {
        let X = Array2::from_shape_fn((60, 2), |(i, j)| if j == 0 { i as f64 / 6.0 } else { (i % 4) as f64 });
        let y = X
            .rows()
            .into_iter()
            .map(|r| (r[0]).sin() * 10.0 + r[1] * 2.0)
            .collect();
        (X, y)
    }

    #[test]
    fn forest_is_reproducible_for_a_seed() {
        let (X, y) = nonlinear_data();
        let mut a = RandomForestRegressor::new(8, 6, 2, 32);
        let mut b = RandomForestRegressor::new(8, 6, 2, 32);
        a.fit(&X, &y).unwrap();
        b.fit(&X, &y).unwrap();
        assert_eq!(a.predict(&X).unwrap(), b.predict(&X).unwrap());
    }

    #[test]
    fn forest_fits_training_signal() {
        let (X, y) = nonlinear_data();
        let mut model = RandomForestRegressor::new(16, 8, 2, 7);
        model.fit(&X, &y).unwrap();
        let score = r2_score(&y, &model.predict(&X).unwrap()).unwrap();
        assert!(score > 0.8, "r2 = {}", score);
    }

    #[test]
    fn forest_seed_changes_the_bootstrap() {
        let (X, y) = nonlinear_data();
        let mut a = RandomForestRegressor::new(4, 6, 2, 1);
        let mut b = RandomForestRegressor::new(4, 6, 2, 2);
        a.fit(&X, &y).unwrap();
        b.fit(&X, &y).unwrap();
        assert_ne!(a.predict(&X).unwrap(), b.predict(&X).unwrap());
    }

    #[test]
    fn forest_predict_before_fit_fails() {
        let (X, _) = nonlinear_data();
        let err = RandomForestRegressor::new(4, 6, 2, 1).predict(&X).unwrap_err();
        assert!(matches!(err, ModelError::NotFitted("RandomForest")));
    }

    #[test]
    fn boosting_reduces_training_error() {
        let (X, y) = nonlinear_data();
        let mut few = GradientBoostingRegressor::new(5, 0.1, 3);
        let mut many = GradientBoostingRegressor::new(100, 0.1, 3);
        few.fit(&X, &y).unwrap();
        many.fit(&X, &y).unwrap();

        let few_score = r2_score(&y, &few.predict(&X).unwrap()).unwrap();
        let many_score = r2_score(&y, &many.predict(&X).unwrap()).unwrap();
        assert!(many_score > few_score);
        assert!(many_score > 0.95, "r2 = {}", many_score);
    }
}
