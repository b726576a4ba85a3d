//! Предсказание на новых данных с сохраненными препроцессором и моделью

use std::path::Path;

use ndarray::Array1;

use crate::error::{ErrorKind, Result, ResultExt};
use crate::models::{Estimator, Regressor};
use crate::persistence::load_object;
use crate::preprocessing::FittedPreprocessor;
use crate::types::Table;

pub struct PredictionPipeline {
    preprocessor: FittedPreprocessor,
    model: Estimator,
}

impl PredictionPipeline {
    pub fn new(preprocessor: FittedPreprocessor, model: Estimator) -> Self {
        Self { preprocessor, model }
    }

    pub fn load(preprocessor_path: impl AsRef<Path>, model_path: impl AsRef<Path>) -> Result<Self> {
        let preprocessor = load_object(preprocessor_path)?;
        let model = load_object(model_path)?;
        Ok(Self::new(preprocessor, model))
    }

    /// Столбец цели во входной таблице не обязателен и игнорируется
    pub fn predict(&self, features: &Table) -> Result<Array1<f64>> {
        let x = self
            .preprocessor
            .transform(features)
            .stage(ErrorKind::Transformation, "cannot transform input features")?;
        let predictions = self
            .model
            .predict(&x)
            .stage(ErrorKind::Training, "prediction failed")?;
        tracing::info!(rows = predictions.len(), "Predictions computed");
        Ok(predictions)
    }
}
