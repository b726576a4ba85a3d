//! Модуль предобработки данных

pub mod column_transformer;
pub mod encoding;
pub mod imputation;
pub mod normalization;

pub use column_transformer::{FittedPreprocessor, Preprocessor};
pub use encoding::{HandleUnknown, OneHotEncoder};
pub use imputation::{ImputeStrategy, MostFrequentImputer, SimpleImputer};
pub use normalization::StandardScaler;

use crate::types::TableError;

#[derive(Debug, thiserror::Error)]
pub enum PreprocessingError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("{0}: empty dataset")]
    EmptyData(&'static str),
    #[error("{0} not fitted")]
    NotFitted(&'static str),
    #[error("column {0} has no observed values")]
    AllMissing(usize),
    #[error("column '{0}' has no observed values")]
    AllMissingColumn(String),
    #[error("unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },
    #[error("expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
}
