//! Заполнение пропусков

#![allow(non_snake_case)]

use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::PreprocessingError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    Mean,
    #[default]
    Median,
}

/// Импьютер числовых признаков; пропуск кодируется как NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleImputer {
    strategy: ImputeStrategy,
    statistics: Option<Vec<f64>>,
}

impl SimpleImputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            statistics: None,
        }
    }

    pub fn statistics(&self) -> Option<&[f64]> {
        self.statistics.as_deref()
    }

    pub fn fit(&mut self, X: &Array2<f64>) -> Result<(), PreprocessingError> {
        if X.nrows() == 0 {
            return Err(PreprocessingError::EmptyData("SimpleImputer"));
        }

        let mut statistics = Vec::with_capacity(X.ncols());
        for (j, column) in X.columns().into_iter().enumerate() {
            let mut observed: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            if observed.is_empty() {
                return Err(PreprocessingError::AllMissing(j));
            }

            let stat = match self.strategy {
                ImputeStrategy::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
                ImputeStrategy::Median => {
                    observed.sort_by(f64::total_cmp);
                    let n = observed.len();
                    if n % 2 == 0 {
                        (observed[n / 2 - 1] + observed[n / 2]) / 2.0
                    } else {
                        observed[n / 2]
                    }
                }
            };
            statistics.push(stat);
        }

        self.statistics = Some(statistics);
        Ok(())
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>, PreprocessingError> {
        let statistics = self
            .statistics
            .as_ref()
            .ok_or(PreprocessingError::NotFitted("SimpleImputer"))?;
        if X.ncols() != statistics.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected: statistics.len(),
                got: X.ncols(),
            });
        }

        let mut filled = X.clone();
        for mut row in filled.rows_mut() {
            for (j, val) in row.iter_mut().enumerate() {
                if val.is_nan() {
                    *val = statistics[j];
                }
            }
        }
        Ok(filled)
    }
}

/// Импьютер категориальных признаков: самое частое значение столбца.
///
/// При равенстве частот выбирается лексикографически меньшее значение.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MostFrequentImputer {
    fill_values: Option<Vec<String>>,
}

impl MostFrequentImputer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fill_values(&self) -> Option<&[String]> {
        self.fill_values.as_deref()
    }

    /// `columns` - по столбцам, `None` означает пропуск
    pub fn fit(&mut self, columns: &[Vec<Option<String>>]) -> Result<(), PreprocessingError> {
        let mut fill_values = Vec::with_capacity(columns.len());
        for (j, column) in columns.iter().enumerate() {
            if column.is_empty() {
                return Err(PreprocessingError::EmptyData("MostFrequentImputer"));
            }

            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for value in column.iter().flatten() {
                *counts.entry(value.as_str()).or_default() += 1;
            }

            // BTreeMap упорядочен, поэтому первый максимум - наименьший по значению
            let mut best: Option<(&str, usize)> = None;
            for (value, count) in counts {
                if best.map_or(true, |(_, c)| count > c) {
                    best = Some((value, count));
                }
            }
            let (value, _) = best.ok_or(PreprocessingError::AllMissing(j))?;
            fill_values.push(value.to_string());
        }

        self.fill_values = Some(fill_values);
        Ok(())
    }

    pub fn transform(
        &self,
        columns: &[Vec<Option<String>>],
    ) -> Result<Vec<Vec<String>>, PreprocessingError> {
        let fill_values = self
            .fill_values
            .as_ref()
            .ok_or(PreprocessingError::NotFitted("MostFrequentImputer"))?;
        if columns.len() != fill_values.len() {
            return Err(PreprocessingError::FeatureMismatch {
                expected: fill_values.len(),
                got: columns.len(),
            });
        }

        Ok(columns
            .iter()
            .zip(fill_values)
            .map(|(column, fill)| {
                column
                    .iter()
                    .map(|v| v.clone().unwrap_or_else(|| fill.clone()))
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn median_ignores_missing_values() {
        let X = array![[1.0, f64::NAN], [f64::NAN, 4.0], [3.0, 8.0], [10.0, 6.0]];
        let mut imputer = SimpleImputer::new(ImputeStrategy::Median);
        imputer.fit(&X).unwrap();

        assert_eq!(imputer.statistics(), Some(&[3.0, 6.0][..]));
        let filled = imputer.transform(&X).unwrap();
        assert_eq!(filled[[1, 0]], 3.0);
        assert_eq!(filled[[0, 1]], 6.0);
    }

    #[test]
    fn fully_missing_column_is_rejected() {
        let X = array![[1.0, f64::NAN], [2.0, f64::NAN]];
        let err = SimpleImputer::new(ImputeStrategy::Mean).fit(&X).unwrap_err();
        assert!(matches!(err, PreprocessingError::AllMissing(1)));
    }

    #[test]
    fn most_frequent_breaks_ties_lexicographically() {
        let column = vec![
            Some("standard".to_string()),
            Some("free/reduced".to_string()),
            None,
        ];
        let mut imputer = MostFrequentImputer::new();
        imputer.fit(&[column.clone()]).unwrap();

        assert_eq!(imputer.fill_values(), Some(&["free/reduced".to_string()][..]));
        let filled = imputer.transform(&[column]).unwrap();
        assert_eq!(filled[0][2], "free/reduced");
    }
}
