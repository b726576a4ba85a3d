//! Стандартизация признаков

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::PreprocessingError;

/// (x - mean) / std по каждому признаку; std считается по генеральной совокупности.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    with_mean: bool,
    mean: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            with_mean: true,
            mean: None,
            scale: None,
        }
    }

    /// Без центрирования: для разреженных one-hot признаков
    pub fn without_mean() -> Self {
        Self {
            with_mean: false,
            ..Self::new()
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.scale.is_some()
    }

    pub fn fit(&mut self, X: &Array2<f64>) -> Result<(), PreprocessingError> {
        if X.nrows() == 0 {
            return Err(PreprocessingError::EmptyData("StandardScaler"));
        }

        let mean = X
            .mean_axis(Axis(0))
            .ok_or(PreprocessingError::EmptyData("StandardScaler"))?;
        let mut std = X.std_axis(Axis(0), 0.0);

        // Избегаем деления на ноль
        for val in std.iter_mut() {
            if *val < 1e-10 {
                *val = 1.0;
            }
        }

        self.mean = Some(mean);
        self.scale = Some(std);
        Ok(())
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>, PreprocessingError> {
        let (mean, scale) = match (&self.mean, &self.scale) {
            (Some(mean), Some(scale)) => (mean, scale),
            _ => return Err(PreprocessingError::NotFitted("StandardScaler")),
        };
        if X.ncols() != scale.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected: scale.len(),
                got: X.ncols(),
            });
        }

        let mut scaled = X.clone();
        for mut row in scaled.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                let centered = if self.with_mean { *val - mean[i] } else { *val };
                *val = centered / scale[i];
            }
        }

        Ok(scaled)
    }

    pub fn fit_transform(&mut self, X: &Array2<f64>) -> Result<Array2<f64>, PreprocessingError> {
        self.fit(X)?;
        self.transform(X)
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}
