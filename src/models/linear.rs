//! Линейные модели: Ridge (нормальные уравнения) и ElasticNet/Lasso через linfa

#![allow(non_snake_case)]

use linfa::traits::Fit;
use linfa::Dataset;
use linfa_elasticnet::ElasticNet;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{check_fit_inputs, check_predict_inputs, ModelError, Regressor};

/// Ridge Regression: (Xc^T Xc + αI)^(-1) Xc^T yc на центрированных данных
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    alpha: f64,
    weights: Option<Array1<f64>>,
    bias: Option<f64>,
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            weights: None,
            bias: None,
        }
    }

    pub fn weights(&self) -> Option<&Array1<f64>> {
        self.weights.as_ref()
    }
}

impl Regressor for RidgeRegression {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        check_fit_inputs(X, y)?;
        let n_features = X.ncols();

        let x_mean = X.mean_axis(Axis(0)).ok_or(ModelError::EmptyData)?;
        let y_mean = y.mean().ok_or(ModelError::EmptyData)?;
        let Xc = X - &x_mean;
        let yc = y - y_mean;

        // X^T X + αI
        let mut xtx = Xc.t().dot(&Xc);
        for i in 0..n_features {
            xtx[[i, i]] += self.alpha;
        }
        let xty = Xc.t().dot(&yc);

        let weights = solve_linear_system(&xtx, &xty)?;
        self.bias = Some(y_mean - x_mean.dot(&weights));
        self.weights = Some(weights);
        Ok(())
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let weights = self.weights.as_ref().ok_or(ModelError::NotFitted("Ridge"))?;
        check_predict_inputs(X, weights.len())?;
        Ok(X.dot(weights) + self.bias.unwrap_or(0.0))
    }
}

/// Метод Гаусса с выбором главного элемента по столбцу
fn solve_linear_system(A: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, ModelError> {
    let n = A.nrows();
    let mut augmented = Array2::zeros((n, n + 1));
    augmented.slice_mut(ndarray::s![.., ..n]).assign(A);
    augmented.column_mut(n).assign(b);

    // Прямой ход
    for i in 0..n {
        let mut max_row = i;
        let mut max_val = augmented[[i, i]].abs();
        for k in (i + 1)..n {
            if augmented[[k, i]].abs() > max_val {
                max_val = augmented[[k, i]].abs();
                max_row = k;
            }
        }

        if max_row != i {
            for j in 0..=n {
                augmented.swap([i, j], [max_row, j]);
            }
        }

        let pivot = augmented[[i, i]];
        if pivot.abs() < 1e-10 {
            return Err(ModelError::SingularMatrix);
        }

        for k in (i + 1)..n {
            let factor = augmented[[k, i]] / pivot;
            for j in i..=n {
                augmented[[k, j]] -= factor * augmented[[i, j]];
            }
        }
    }

    // Обратный ход
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = augmented[[i, n]];
        for j in (i + 1)..n {
            sum -= augmented[[i, j]] * x[j];
        }
        x[i] = sum / augmented[[i, i]];
    }

    Ok(x)
}

/// ElasticNet на координатном спуске linfa; Lasso при `l1_ratio = 1`.
///
/// После обучения хранятся только коэффициенты, чтобы модель сериализовалась как обычная структура.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticNetRegression {
    alpha: f64,
    l1_ratio: f64,
    max_iterations: u32,
    tolerance: f64,
    weights: Option<Array1<f64>>,
    intercept: f64,
}

impl ElasticNetRegression {
    pub fn new(alpha: f64, l1_ratio: f64) -> Self {
        Self {
            alpha,
            l1_ratio,
            max_iterations: 1000,
            tolerance: 1e-4,
            weights: None,
            intercept: 0.0,
        }
    }

    pub fn weights(&self) -> Option<&Array1<f64>> {
        self.weights.as_ref()
    }
}

impl Regressor for ElasticNetRegression {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        check_fit_inputs(X, y)?;

        // linfa не центрирует X, поэтому свободный член считаем сами
        let x_mean = X.mean_axis(Axis(0)).ok_or(ModelError::EmptyData)?;
        let y_mean = y.mean().ok_or(ModelError::EmptyData)?;
        let dataset = Dataset::new(X - &x_mean, y - y_mean);
        let model = ElasticNet::<f64>::params()
            .penalty(self.alpha)
            .l1_ratio(self.l1_ratio)
            .with_intercept(false)
            .max_iterations(self.max_iterations)
            .tolerance(self.tolerance)
            .fit(&dataset)
            .map_err(|e| ModelError::Backend(e.to_string()))?;

        let weights = model.hyperplane().to_owned();
        self.intercept = y_mean - x_mean.dot(&weights);
        self.weights = Some(weights);
        Ok(())
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        let weights = self
            .weights
            .as_ref()
            .ok_or(ModelError::NotFitted("ElasticNet"))?;
        check_predict_inputs(X, weights.len())?;
        Ok(X.dot(weights) + self.intercept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        // y = 3 x0 - 2 x1 + 5
        let X = array![
            [0.0, 1.0],
            [1.0, 0.0],
            [2.0, 3.0],
            [3.0, 1.0],
            [4.0, 5.0],
            [5.0, 2.0],
            [6.0, 4.0],
            [7.0, 0.0]
        ];
        let y = X.column(0).mapv(|v| 3.0 * v) - X.column(1).mapv(|v| 2.0 * v) + 5.0;
        (X, y)
    }

    #[test]
    fn ridge_with_small_alpha_recovers_coefficients() {
        let (X, y) = linear_data();
        let mut model = RidgeRegression::new(1e-8);
        model.fit(&X, &y).unwrap();

        let weights = model.weights().unwrap();
        assert!((weights[0] - 3.0).abs() < 1e-6);
        assert!((weights[1] + 2.0).abs() < 1e-6);

        let predictions = model.predict(&X).unwrap();
        for (p, t) in predictions.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-6);
        }
    }

    #[test]
    fn ridge_penalty_shrinks_weights() {
        let (X, y) = linear_data();
        let mut weak = RidgeRegression::new(0.01);
        let mut strong = RidgeRegression::new(100.0);
        weak.fit(&X, &y).unwrap();
        strong.fit(&X, &y).unwrap();

        let norm = |w: &Array1<f64>| w.dot(w);
        assert!(norm(strong.weights().unwrap()) < norm(weak.weights().unwrap()));
    }

    #[test]
    fn ridge_without_penalty_on_collinear_data_is_singular() {
        let X = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let y = array![1.0, 2.0, 3.0];
        let err = RidgeRegression::new(0.0).fit(&X, &y).unwrap_err();
        assert!(matches!(err, ModelError::SingularMatrix));
    }

    #[test]
    fn lasso_fits_linear_signal() {
        let (X, y) = linear_data();
        let mut model = ElasticNetRegression::new(0.001, 1.0);
        model.fit(&X, &y).unwrap();

        let predictions = model.predict(&X).unwrap();
        let max_err = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, t)| (p - t).abs())
            .fold(0.0, f64::max);
        assert!(max_err < 0.1, "max error {}", max_err);
    }

    #[test]
    fn elastic_net_intercept_follows_shifted_features() {
        // сдвиг признаков не должен менять качество подгонки
        let (X, y) = linear_data();
        let shifted = &X + 100.0;
        let mut model = ElasticNetRegression::new(0.001, 0.5);
        model.fit(&shifted, &y).unwrap();

        let predictions = model.predict(&shifted).unwrap();
        for (p, t) in predictions.iter().zip(y.iter()) {
            assert!((p - t).abs() < 0.1, "{} vs {}", p, t);
        }
    }

    #[test]
    fn predict_before_fit_fails() {
        let err = ElasticNetRegression::new(0.1, 0.5).predict(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, ModelError::NotFitted(_)));
    }

    #[test]
    fn feature_count_is_checked_at_predict() {
        let (X, y) = linear_data();
        let mut model = RidgeRegression::new(1.0);
        model.fit(&X, &y).unwrap();
        assert!(matches!(
            model.predict(&array![[1.0, 2.0, 3.0]]),
            Err(ModelError::FeatureMismatch { expected: 2, got: 3 })
        ));
    }
}
