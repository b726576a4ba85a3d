//! Составной препроцессор: числовая и категориальная ветки по статической схеме
//!
//! * числовые столбцы: медиана -> стандартизация
//! * категориальные: самое частое значение -> one-hot -> масштабирование без центрирования
//!
//! Выход: `[числовые..., one-hot...]`; прочие столбцы таблицы отбрасываются.

use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{
    HandleUnknown, ImputeStrategy, MostFrequentImputer, OneHotEncoder, PreprocessingError,
    SimpleImputer, StandardScaler,
};
use crate::types::Table;

/// Необученный препроцессор
#[derive(Debug, Clone)]
pub struct Preprocessor {
    numeric: Vec<String>,
    categorical: Vec<String>,
    handle_unknown: HandleUnknown,
}

impl Preprocessor {
    pub fn new(numeric: Vec<String>, categorical: Vec<String>) -> Self {
        Self {
            numeric,
            categorical,
            handle_unknown: HandleUnknown::default(),
        }
    }

    pub fn with_handle_unknown(mut self, handle_unknown: HandleUnknown) -> Self {
        self.handle_unknown = handle_unknown;
        self
    }

    pub fn fit(&self, table: &Table) -> Result<FittedPreprocessor, PreprocessingError> {
        if table.n_rows() == 0 {
            return Err(PreprocessingError::EmptyData("Preprocessor"));
        }
        table.require_columns(&self.numeric)?;
        table.require_columns(&self.categorical)?;

        let numeric = if self.numeric.is_empty() {
            None
        } else {
            Some(NumericPipeline::fit(&self.numeric, table)?)
        };
        let categorical = if self.categorical.is_empty() {
            None
        } else {
            Some(CategoricalPipeline::fit(&self.categorical, self.handle_unknown, table)?)
        };

        let fitted = FittedPreprocessor {
            numeric,
            categorical,
        };
        tracing::debug!(
            n_features = fitted.n_features_out(),
            "Preprocessor fitted on {} rows",
            table.n_rows()
        );
        Ok(fitted)
    }

    pub fn fit_transform(
        &self,
        table: &Table,
    ) -> Result<(FittedPreprocessor, Array2<f64>), PreprocessingError> {
        let fitted = self.fit(table)?;
        let transformed = fitted.transform(table)?;
        Ok((fitted, transformed))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NumericPipeline {
    columns: Vec<String>,
    imputer: SimpleImputer,
    scaler: StandardScaler,
}

impl NumericPipeline {
    fn fit(columns: &[String], table: &Table) -> Result<Self, PreprocessingError> {
        let raw = numeric_matrix(columns, table)?;

        let mut imputer = SimpleImputer::new(ImputeStrategy::Median);
        imputer.fit(&raw).map_err(|e| name_column(e, columns))?;
        let imputed = imputer.transform(&raw)?;

        let mut scaler = StandardScaler::new();
        scaler.fit(&imputed)?;

        Ok(Self {
            columns: columns.to_vec(),
            imputer,
            scaler,
        })
    }

    fn transform(&self, table: &Table) -> Result<Array2<f64>, PreprocessingError> {
        let raw = numeric_matrix(&self.columns, table)?;
        let imputed = self.imputer.transform(&raw)?;
        self.scaler.transform(&imputed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CategoricalPipeline {
    columns: Vec<String>,
    imputer: MostFrequentImputer,
    encoder: OneHotEncoder,
    scaler: StandardScaler,
}

impl CategoricalPipeline {
    fn fit(
        columns: &[String],
        handle_unknown: HandleUnknown,
        table: &Table,
    ) -> Result<Self, PreprocessingError> {
        let raw = categorical_columns(columns, table)?;

        let mut imputer = MostFrequentImputer::new();
        imputer.fit(&raw).map_err(|e| name_column(e, columns))?;
        let imputed = imputer.transform(&raw)?;

        let mut encoder = OneHotEncoder::new(handle_unknown);
        encoder.fit(&imputed)?;
        let encoded = encoder.transform(&imputed, columns)?;

        let mut scaler = StandardScaler::without_mean();
        scaler.fit(&encoded)?;

        Ok(Self {
            columns: columns.to_vec(),
            imputer,
            encoder,
            scaler,
        })
    }

    fn transform(&self, table: &Table) -> Result<Array2<f64>, PreprocessingError> {
        let raw = categorical_columns(&self.columns, table)?;
        let imputed = self.imputer.transform(&raw)?;
        let encoded = self.encoder.transform(&imputed, &self.columns)?;
        self.scaler.transform(&encoded)
    }

    fn feature_names(&self) -> Vec<String> {
        let categories = self.encoder.categories().unwrap_or_default();
        self.columns
            .iter()
            .zip(categories)
            .flat_map(|(column, cats)| cats.iter().map(move |cat| format!("{}_{}", column, cat)))
            .collect()
    }
}

/// Обученный препроцессор; сохраняется на диск для инференса
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    numeric: Option<NumericPipeline>,
    categorical: Option<CategoricalPipeline>,
}

impl FittedPreprocessor {
    pub fn transform(&self, table: &Table) -> Result<Array2<f64>, PreprocessingError> {
        let mut blocks = Vec::with_capacity(2);
        if let Some(numeric) = &self.numeric {
            blocks.push(numeric.transform(table)?);
        }
        if let Some(categorical) = &self.categorical {
            blocks.push(categorical.transform(table)?);
        }

        match blocks.len() {
            0 => Ok(Array2::zeros((table.n_rows(), 0))),
            1 => Ok(blocks.remove(0)),
            _ => {
                let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
                concatenate(Axis(1), &views).map_err(|_| PreprocessingError::FeatureMismatch {
                    expected: table.n_rows(),
                    got: blocks.iter().map(|b| b.nrows()).min().unwrap_or(0),
                })
            }
        }
    }

    pub fn n_features_out(&self) -> usize {
        let numeric = self.numeric.as_ref().map_or(0, |p| p.columns.len());
        let categorical = self
            .categorical
            .as_ref()
            .map_or(0, |p| p.encoder.n_features_out());
        numeric + categorical
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self
            .numeric
            .as_ref()
            .map(|p| p.columns.clone())
            .unwrap_or_default();
        if let Some(categorical) = &self.categorical {
            names.extend(categorical.feature_names());
        }
        names
    }

    /// Столбцы входной таблицы, которые нужны для преобразования
    pub fn input_columns(&self) -> Vec<&str> {
        let numeric = self.numeric.iter().flat_map(|p| p.columns.iter());
        let categorical = self.categorical.iter().flat_map(|p| p.columns.iter());
        numeric.chain(categorical).map(String::as_str).collect()
    }
}

fn numeric_matrix(columns: &[String], table: &Table) -> Result<Array2<f64>, PreprocessingError> {
    let mut matrix = Array2::zeros((table.n_rows(), columns.len()));
    for (j, name) in columns.iter().enumerate() {
        for (i, value) in table.numeric_column(name)?.into_iter().enumerate() {
            matrix[[i, j]] = value.unwrap_or(f64::NAN);
        }
    }
    Ok(matrix)
}

fn categorical_columns(
    columns: &[String],
    table: &Table,
) -> Result<Vec<Vec<Option<String>>>, PreprocessingError> {
    columns
        .iter()
        .map(|name| table.categorical_column(name).map_err(PreprocessingError::from))
        .collect()
}

fn name_column(err: PreprocessingError, columns: &[String]) -> PreprocessingError {
    match err {
        PreprocessingError::AllMissing(j) => match columns.get(j) {
            Some(name) => PreprocessingError::AllMissingColumn(name.clone()),
            None => PreprocessingError::AllMissing(j),
        },
        other => other,
    }
}
