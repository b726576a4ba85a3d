//! Регрессионные модели и каталог для перебора гиперпараметров

#![allow(non_snake_case)]

pub mod ensemble;
pub mod linear;
pub mod neighbors;
pub mod tree;

pub use ensemble::{GradientBoostingRegressor, RandomForestRegressor};
pub use linear::{ElasticNetRegression, RidgeRegression};
pub use neighbors::KNeighborsRegressor;
pub use tree::DecisionTreeRegressor;

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;

/// Значения гиперпараметров одной комбинации, упорядочены по имени
pub type Hyperparameters = BTreeMap<String, f64>;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("empty dataset")]
    EmptyData,
    #[error("dataset has no feature columns")]
    NoFeatures,
    #[error("{rows} rows but {targets} targets")]
    ShapeMismatch { rows: usize, targets: usize },
    #[error("input contains non-finite values")]
    NonFinite,
    #[error("{0} not trained")]
    NotFitted(&'static str),
    #[error("expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
    #[error("need at least {needed} samples, got {got}")]
    TooFewSamples { needed: usize, got: usize },
    #[error("{model} has no hyperparameter '{name}'")]
    UnknownParameter { model: &'static str, name: String },
    #[error("invalid value {value} for hyperparameter '{name}'")]
    InvalidParameter { name: String, value: f64 },
    #[error("no values given for hyperparameter '{0}'")]
    EmptyGrid(String),
    #[error("singular matrix")]
    SingularMatrix,
    #[error("backend error: {0}")]
    Backend(String),
}

pub trait Regressor {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError>;

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>, ModelError>;
}

/// Проверка обучающих данных, общая для всех моделей
pub(crate) fn check_fit_inputs(X: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
    if X.nrows() == 0 {
        return Err(ModelError::EmptyData);
    }
    if X.ncols() == 0 {
        return Err(ModelError::NoFeatures);
    }
    if X.nrows() != y.len() {
        return Err(ModelError::ShapeMismatch {
            rows: X.nrows(),
            targets: y.len(),
        });
    }
    if !X.iter().chain(y.iter()).all(|v| v.is_finite()) {
        return Err(ModelError::NonFinite);
    }
    Ok(())
}

pub(crate) fn check_predict_inputs(X: &Array2<f64>, n_features: usize) -> Result<(), ModelError> {
    if X.ncols() != n_features {
        return Err(ModelError::FeatureMismatch {
            expected: n_features,
            got: X.ncols(),
        });
    }
    Ok(())
}

/// Матрица признаков в формате smartcore
pub(crate) fn to_dense(X: &Array2<f64>) -> Result<DenseMatrix<f64>, ModelError> {
    let rows: Vec<Vec<f64>> = X.rows().into_iter().map(|row| row.to_vec()).collect();
    DenseMatrix::from_2d_vec(&rows).map_err(backend_error)
}

pub(crate) fn backend_error(err: Failed) -> ModelError {
    ModelError::Backend(err.to_string())
}

/// Семейство модели в каталоге
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Ridge,
    Lasso,
    ElasticNet,
    DecisionTree,
    RandomForest,
    GradientBoosting,
    KNeighbors,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Ridge => "Ridge",
            ModelKind::Lasso => "Lasso",
            ModelKind::ElasticNet => "ElasticNet",
            ModelKind::DecisionTree => "DecisionTree",
            ModelKind::RandomForest => "RandomForest",
            ModelKind::GradientBoosting => "GradientBoosting",
            ModelKind::KNeighbors => "KNeighbors",
        }
    }

    pub fn supported_params(&self) -> &'static [&'static str] {
        match self {
            ModelKind::Ridge | ModelKind::Lasso => &["alpha"],
            ModelKind::ElasticNet => &["alpha", "l1_ratio"],
            ModelKind::DecisionTree => &["max_depth", "min_samples_split"],
            ModelKind::RandomForest => &["n_estimators", "max_depth", "min_samples_split"],
            ModelKind::GradientBoosting => &["n_estimators", "learning_rate", "max_depth"],
            ModelKind::KNeighbors => &["n_neighbors"],
        }
    }

    /// Необученная модель с заданными гиперпараметрами; отсутствующие берутся по умолчанию
    pub fn instantiate(&self, params: &Hyperparameters, seed: u64) -> Result<Estimator, ModelError> {
        if let Some(name) = params
            .keys()
            .find(|name| !self.supported_params().contains(&name.as_str()))
        {
            return Err(ModelError::UnknownParameter {
                model: self.name(),
                name: name.clone(),
            });
        }

        let estimator = match self {
            ModelKind::Ridge => Estimator::Ridge(RidgeRegression::new(non_negative(params, "alpha", 1.0)?)),
            ModelKind::Lasso => Estimator::ElasticNet(ElasticNetRegression::new(
                non_negative(params, "alpha", 1.0)?,
                1.0,
            )),
            ModelKind::ElasticNet => Estimator::ElasticNet(ElasticNetRegression::new(
                non_negative(params, "alpha", 1.0)?,
                fraction(params, "l1_ratio", 0.5)?,
            )),
            ModelKind::DecisionTree => Estimator::DecisionTree(DecisionTreeRegressor::new(
                count(params, "max_depth", 8, 1)?,
                count(params, "min_samples_split", 2, 2)?,
            )),
            ModelKind::RandomForest => Estimator::RandomForest(RandomForestRegressor::new(
                count(params, "n_estimators", 32, 1)?,
                count(params, "max_depth", 8, 1)?,
                count(params, "min_samples_split", 2, 2)?,
                seed,
            )),
            ModelKind::GradientBoosting => {
                let learning_rate = non_negative(params, "learning_rate", 0.1)?;
                if learning_rate == 0.0 {
                    return Err(ModelError::InvalidParameter {
                        name: "learning_rate".to_string(),
                        value: learning_rate,
                    });
                }
                Estimator::GradientBoosting(GradientBoostingRegressor::new(
                    count(params, "n_estimators", 100, 1)?,
                    learning_rate,
                    count(params, "max_depth", 3, 1)?,
                ))
            }
            ModelKind::KNeighbors => {
                Estimator::KNeighbors(KNeighborsRegressor::new(count(params, "n_neighbors", 5, 2)?))
            }
        };
        Ok(estimator)
    }
}

fn real(params: &Hyperparameters, name: &str, default: f64) -> Result<f64, ModelError> {
    let value = params.get(name).copied().unwrap_or(default);
    if !value.is_finite() {
        return Err(ModelError::InvalidParameter {
            name: name.to_string(),
            value,
        });
    }
    Ok(value)
}

fn non_negative(params: &Hyperparameters, name: &str, default: f64) -> Result<f64, ModelError> {
    let value = real(params, name, default)?;
    if value < 0.0 {
        return Err(ModelError::InvalidParameter {
            name: name.to_string(),
            value,
        });
    }
    Ok(value)
}

fn fraction(params: &Hyperparameters, name: &str, default: f64) -> Result<f64, ModelError> {
    let value = real(params, name, default)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ModelError::InvalidParameter {
            name: name.to_string(),
            value,
        });
    }
    Ok(value)
}

/// Целочисленный параметр не меньше `min`
fn count(params: &Hyperparameters, name: &str, default: usize, min: usize) -> Result<usize, ModelError> {
    let value = real(params, name, default as f64)?;
    if value.fract() != 0.0 || value < min as f64 {
        return Err(ModelError::InvalidParameter {
            name: name.to_string(),
            value,
        });
    }
    Ok(value as usize)
}

/// Модель любого семейства; в таком виде лучшая модель сохраняется на диск
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum Estimator {
    Ridge(RidgeRegression),
    ElasticNet(ElasticNetRegression),
    DecisionTree(DecisionTreeRegressor),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
    KNeighbors(KNeighborsRegressor),
}

impl Regressor for Estimator {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>) -> Result<(), ModelError> {
        match self {
            Estimator::Ridge(m) => m.fit(X, y),
            Estimator::ElasticNet(m) => m.fit(X, y),
            Estimator::DecisionTree(m) => m.fit(X, y),
            Estimator::RandomForest(m) => m.fit(X, y),
            Estimator::GradientBoosting(m) => m.fit(X, y),
            Estimator::KNeighbors(m) => m.fit(X, y),
        }
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        match self {
            Estimator::Ridge(m) => m.predict(X),
            Estimator::ElasticNet(m) => m.predict(X),
            Estimator::DecisionTree(m) => m.predict(X),
            Estimator::RandomForest(m) => m.predict(X),
            Estimator::GradientBoosting(m) => m.predict(X),
            Estimator::KNeighbors(m) => m.predict(X),
        }
    }
}

/// Запись каталога: отображаемое имя, семейство и сетка гиперпараметров
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub kind: ModelKind,
    #[serde(default)]
    pub grid: BTreeMap<String, Vec<f64>>,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>, kind: ModelKind) -> Self {
        Self {
            name: name.into(),
            kind,
            grid: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, values: &[f64]) -> Self {
        self.grid.insert(name.to_string(), values.to_vec());
        self
    }
}

pub fn default_catalog() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new("Ridge", ModelKind::Ridge).with_param("alpha", &[0.1, 1.0, 10.0]),
        ModelSpec::new("Lasso", ModelKind::Lasso).with_param("alpha", &[0.001, 0.01, 0.1, 1.0]),
        ModelSpec::new("ElasticNet", ModelKind::ElasticNet)
            .with_param("alpha", &[0.01, 0.1])
            .with_param("l1_ratio", &[0.2, 0.5, 0.8]),
        ModelSpec::new("Decision Tree", ModelKind::DecisionTree)
            .with_param("max_depth", &[4.0, 8.0, 12.0])
            .with_param("min_samples_split", &[2.0, 10.0]),
        ModelSpec::new("Random Forest", ModelKind::RandomForest)
            .with_param("n_estimators", &[16.0, 32.0])
            .with_param("max_depth", &[6.0, 10.0]),
        ModelSpec::new("Gradient Boosting", ModelKind::GradientBoosting)
            .with_param("n_estimators", &[50.0, 100.0])
            .with_param("learning_rate", &[0.05, 0.1])
            .with_param("max_depth", &[3.0]),
        ModelSpec::new("K-Neighbors Regressor", ModelKind::KNeighbors)
            .with_param("n_neighbors", &[5.0, 7.0, 9.0]),
    ]
}
