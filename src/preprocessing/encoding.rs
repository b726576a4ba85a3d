//! One-hot кодирование категориальных признаков

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::PreprocessingError;

/// Поведение при категории, не встречавшейся при обучении
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Error,
    /// Строка индикаторов столбца остается нулевой
    Ignore,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    handle_unknown: HandleUnknown,
    categories: Option<Vec<Vec<String>>>,
}

impl OneHotEncoder {
    pub fn new(handle_unknown: HandleUnknown) -> Self {
        Self {
            handle_unknown,
            categories: None,
        }
    }

    /// Отсортированные категории каждого столбца
    pub fn categories(&self) -> Option<&[Vec<String>]> {
        self.categories.as_deref()
    }

    pub fn n_features_out(&self) -> usize {
        self.categories
            .as_ref()
            .map_or(0, |cats| cats.iter().map(Vec::len).sum())
    }

    pub fn fit(&mut self, columns: &[Vec<String>]) -> Result<(), PreprocessingError> {
        let mut categories = Vec::with_capacity(columns.len());
        for column in columns {
            if column.is_empty() {
                return Err(PreprocessingError::EmptyData("OneHotEncoder"));
            }
            let mut values: Vec<String> = column.to_vec();
            values.sort();
            values.dedup();
            categories.push(values);
        }
        self.categories = Some(categories);
        Ok(())
    }

    pub fn transform(
        &self,
        columns: &[Vec<String>],
        names: &[String],
    ) -> Result<Array2<f64>, PreprocessingError> {
        let categories = self
            .categories
            .as_ref()
            .ok_or(PreprocessingError::NotFitted("OneHotEncoder"))?;
        if columns.len() != categories.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected: categories.len(),
                got: columns.len(),
            });
        }

        let n_rows = columns.first().map_or(0, Vec::len);
        let mut encoded = Array2::zeros((n_rows, self.n_features_out()));

        let mut offset = 0;
        for (j, (column, cats)) in columns.iter().zip(categories).enumerate() {
            for (i, value) in column.iter().enumerate() {
                match cats.binary_search(value) {
                    Ok(k) => encoded[[i, offset + k]] = 1.0,
                    Err(_) if self.handle_unknown == HandleUnknown::Ignore => {}
                    Err(_) => {
                        return Err(PreprocessingError::UnknownCategory {
                            column: names.get(j).cloned().unwrap_or_else(|| j.to_string()),
                            value: value.clone(),
                        })
                    }
                }
            }
            offset += cats.len();
        }

        Ok(encoded)
    }
}
