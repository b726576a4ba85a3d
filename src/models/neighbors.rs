//! k ближайших соседей (евклидово расстояние, равные веса) поверх smartcore

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::metrics::distance::euclidian::Euclidian;
use smartcore::neighbors::knn_regressor::{KNNRegressor, KNNRegressorParameters};

use super::{backend_error, check_fit_inputs, check_predict_inputs, to_dense, ModelError, Regressor};

type Knn = KNNRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>, Euclidian<f64>>;

#[derive(Debug, Serialize, Deserialize)]
pub struct KNeighborsRegressor {
    n_neighbors: usize,
    n_features: usize,
    model: Option<Knn>,
}

impl KNeighborsRegressor {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            n_features: 0,
            model: None,
        }
    }
}

impl Regressor for KNeighborsRegressor {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        check_fit_inputs(X, y)?;
        if self.n_neighbors > X.nrows() {
            return Err(ModelError::TooFewSamples {
                needed: self.n_neighbors,
                got: X.nrows(),
            });
        }

        let mut params = KNNRegressorParameters::default();
        params.k = self.n_neighbors;

        let y_vec = y.to_vec();
        self.model = Some(KNNRegressor::fit(&to_dense(X)?, &y_vec, params).map_err(backend_error)?);
        self.n_features = X.ncols();
        Ok(())
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let model = self.model.as_ref().ok_or(ModelError::NotFitted("KNeighbors"))?;
        check_predict_inputs(X, self.n_features)?;
        let predictions = model.predict(&to_dense(X)?).map_err(backend_error)?;
        Ok(Array1::from(predictions))
    }
}
