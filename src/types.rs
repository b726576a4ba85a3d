//! Типы данных пайплайна

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const MISSING_MARKERS: [&str; 5] = ["", "NA", "NaN", "nan", "null"];

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row} has {got} fields, expected {expected}")]
    RaggedRow { row: usize, got: usize, expected: usize },
    #[error("column '{0}' not found")]
    MissingColumn(String),
    #[error("value '{value}' in column '{column}' (row {row}) is not a number")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },
    #[error("table has no header")]
    NoHeader,
}

/// Таблица строковых ячеек с заголовком, как она лежит в CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, TableError> {
        if headers.is_empty() {
            return Err(TableError::NoHeader);
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(TableError::RaggedRow {
                    row: i + 1,
                    got: row.len(),
                    expected: headers.len(),
                });
            }
        }
        Ok(Self { headers, rows })
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(file);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }

        Self::new(headers, rows)
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), TableError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| TableError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<(), TableError> {
        for name in names {
            let name = name.as_ref();
            if self.column_index(name).is_none() {
                return Err(TableError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }

    /// Числовой столбец; пропуски возвращаются как `None`
    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>, TableError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))?;

        self.rows
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                let cell = cells[idx].trim();
                if is_missing(cell) {
                    return Ok(None);
                }
                cell.parse::<f64>()
                    .map(Some)
                    .map_err(|_| TableError::NotNumeric {
                        column: name.to_string(),
                        row: row + 1,
                        value: cell.to_string(),
                    })
            })
            .collect()
    }

    pub fn categorical_column(&self, name: &str) -> Result<Vec<Option<String>>, TableError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| TableError::MissingColumn(name.to_string()))?;

        Ok(self
            .rows
            .iter()
            .map(|cells| {
                let cell = cells[idx].trim();
                (!is_missing(cell)).then(|| cell.to_string())
            })
            .collect())
    }

    /// Новая таблица из строк с указанными индексами (в указанном порядке)
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell)
}

/// Оценки одной модели
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub train_r2: f64,
    pub test_r2: f64,
    pub best_params: BTreeMap<String, f64>,
}

/// Отчет об оценке: имя модели -> R² на тесте, в порядке каталога
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub scores: Vec<(String, ModelScore)>,
    pub best_model: String,
    pub best_score: f64,
}

impl EvaluationReport {
    pub fn test_scores(&self) -> BTreeMap<String, f64> {
        self.scores
            .iter()
            .map(|(name, score)| (name.clone(), score.test_r2))
            .collect()
    }

    pub fn score(&self, name: &str) -> Option<&ModelScore> {
        self.scores
            .iter()
            .find(|(model, _)| model == name)
            .map(|(_, score)| score)
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, score) in &self.scores {
            writeln!(
                f,
                "{:<24} train R2 = {:>8.4}  test R2 = {:>8.4}",
                name, score.train_r2, score.test_r2
            )?;
        }
        write!(f, "best model: {} (test R2 = {:.4})", self.best_model, self.best_score)
    }
}
