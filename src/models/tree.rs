//! Дерево решений для регрессии поверх smartcore

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor as SmartTree, DecisionTreeRegressorParameters,
};

use super::{backend_error, check_fit_inputs, check_predict_inputs, to_dense, ModelError, Regressor};

type Tree = SmartTree<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    max_depth: usize,
    min_samples_split: usize,
    n_features: usize,
    model: Option<Tree>,
}

impl DecisionTreeRegressor {
    pub fn new(max_depth: usize, min_samples_split: usize) -> Self {
        Self {
            max_depth,
            min_samples_split: min_samples_split.max(2),
            n_features: 0,
            model: None,
        }
    }

    /// Предсказание для уже сконвертированной матрицы; бустинг переиспользует ее между деревьями
    pub(crate) fn predict_dense(&self, x: &DenseMatrix<f64>) -> Result<Array1<f64>, ModelError> {
        let model = self.model.as_ref().ok_or(ModelError::NotFitted("DecisionTree"))?;
        let predictions = model.predict(x).map_err(backend_error)?;
        Ok(Array1::from(predictions))
    }

    pub(crate) fn fit_dense(
        &mut self,
        x: &DenseMatrix<f64>,
        y: &Array1<f64>,
        n_features: usize,
    ) -> Result<(), ModelError> {
        let mut params = DecisionTreeRegressorParameters::default();
        params.max_depth = Some(u16::try_from(self.max_depth).unwrap_or(u16::MAX));
        params.min_samples_split = self.min_samples_split;

        let y_vec = y.to_vec();
        self.model = Some(SmartTree::fit(x, &y_vec, params).map_err(backend_error)?);
        self.n_features = n_features;
        Ok(())
    }
}

impl Regressor for DecisionTreeRegressor {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        check_fit_inputs(X, y)?;
        self.fit_dense(&to_dense(X)?, y, X.ncols())
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        if self.model.is_none() {
            return Err(ModelError::NotFitted("DecisionTree"));
        }
        check_predict_inputs(X, self.n_features)?;
        self.predict_dense(&to_dense(X)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn distinct(values: &Array1<f64>) -> usize {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        sorted.dedup();
        sorted.len()
    }

    #[test]
    fn step_function_is_learned_exactly() {
        let X = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![5.0, 5.0, 5.0, 20.0, 20.0, 20.0];
        let mut tree = DecisionTreeRegressor::new(4, 2);
        tree.fit(&X, &y).unwrap();

        assert_eq!(tree.predict(&array![[0.0], [6.4], [6.6], [50.0]]).unwrap(), array![5.0, 5.0, 20.0, 20.0]);
    }

    #[test]
    fn max_depth_limits_growth() {
        let X = Array2::from_shape_fn((32, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(32, |i| (i * i) as f64);

        let mut stump = DecisionTreeRegressor::new(1, 2);
        let mut deeper = DecisionTreeRegressor::new(3, 2);
        stump.fit(&X, &y).unwrap();
        deeper.fit(&X, &y).unwrap();

        // не больше 2^depth листьев
        assert_eq!(distinct(&stump.predict(&X).unwrap()), 2);
        let leaves = distinct(&deeper.predict(&X).unwrap());
        assert!(leaves > 2 && leaves <= 8, "{} leaves", leaves);
    }

    #[test]
    fn splits_on_informative_feature() {
        let X = array![[0.0, 1.0], [1.0, 1.0], [0.0, 2.0], [1.0, 2.0]];
        let y = array![1.0, 1.0, 7.0, 7.0];
        let mut tree = DecisionTreeRegressor::new(2, 2);
        tree.fit(&X, &y).unwrap();

        // первый признак не влияет на ответ
        assert_eq!(tree.predict(&array![[5.0, 1.2], [-5.0, 1.2], [5.0, 1.8]]).unwrap(), array![1.0, 1.0, 7.0]);
    }

    #[test]
    fn fit_is_deterministic() {
        let X = Array2::from_shape_fn((20, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let y = Array1::from_shape_fn(20, |i| (i % 5) as f64);
        let mut a = DecisionTreeRegressor::new(5, 2);
        let mut b = DecisionTreeRegressor::new(5, 2);
        a.fit(&X, &y).unwrap();
        b.fit(&X, &y).unwrap();
        assert_eq!(a.predict(&X).unwrap(), b.predict(&X).unwrap());
    }

    #[test]
    fn predict_before_fit_fails() {
        let err = DecisionTreeRegressor::new(3, 2).predict(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, ModelError::NotFitted("DecisionTree")));
    }
}
