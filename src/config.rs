//! Конфигурация этапов пайплайна

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::models::{default_catalog, ModelSpec};
use crate::preprocessing::HandleUnknown;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_source_path")]
    pub source_path: PathBuf,
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    #[serde(default = "default_raw_file")]
    pub raw_file: String,
    #[serde(default = "default_train_file")]
    pub train_file: String,
    #[serde(default = "default_test_file")]
    pub test_file: String,
    #[serde(default = "default_train_ratio")]
    pub train_ratio: f64,
    #[serde(default = "default_seed")]
    pub random_seed: u64,
}

impl IngestionConfig {
    pub fn raw_data_path(&self) -> PathBuf {
        self.artifacts_dir.join(&self.raw_file)
    }

    pub fn train_data_path(&self) -> PathBuf {
        self.artifacts_dir.join(&self.train_file)
    }

    pub fn test_data_path(&self) -> PathBuf {
        self.artifacts_dir.join(&self.test_file)
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            source_path: default_source_path(),
            artifacts_dir: default_artifacts_dir(),
            raw_file: default_raw_file(),
            train_file: default_train_file(),
            test_file: default_test_file(),
            train_ratio: default_train_ratio(),
            random_seed: default_seed(),
        }
    }
}

/// Статическая схема входной таблицы; типы столбцов не выводятся из данных
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default = "default_numeric")]
    pub numeric: Vec<String>,
    #[serde(default = "default_categorical")]
    pub categorical: Vec<String>,
}

impl Schema {
    pub fn feature_columns(&self) -> impl Iterator<Item = &String> {
        self.numeric.iter().chain(self.categorical.iter())
    }

    pub fn all_columns(&self) -> Vec<&str> {
        self.feature_columns()
            .map(String::as_str)
            .chain(std::iter::once(self.target.as_str()))
            .collect()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            target: default_target(),
            numeric: default_numeric(),
            categorical: default_categorical(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationConfig {
    #[serde(default)]
    pub schema: Schema,
    #[serde(default = "default_preprocessor_file")]
    pub preprocessor_file: PathBuf,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
}

impl Default for TransformationConfig {
    fn default() -> Self {
        Self {
            schema: Schema::default(),
            preprocessor_file: default_preprocessor_file(),
            handle_unknown: HandleUnknown::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
    #[serde(default = "default_seed")]
    pub random_seed: u64,
    #[serde(default = "default_catalog")]
    pub catalog: Vec<ModelSpec>,
    /// Минимально допустимый R² лучшей модели на тесте
    #[serde(default)]
    pub min_test_score: Option<f64>,
    #[serde(default = "default_model_file")]
    pub model_file: PathBuf,
    #[serde(default = "default_report_file")]
    pub report_file: PathBuf,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            cv_folds: default_cv_folds(),
            random_seed: default_seed(),
            catalog: default_catalog(),
            min_test_score: None,
            model_file: default_model_file(),
            report_file: default_report_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub transformation: TransformationConfig,
    #[serde(default)]
    pub trainer: TrainerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            ingestion: IngestionConfig::default(),
            transformation: TransformationConfig::default(),
            trainer: TrainerConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Загрузка из JSON; отсутствующие поля принимают значения по умолчанию
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .stage(ErrorKind::Config, format!("cannot read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .stage(ErrorKind::Config, format!("invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Все относительные пути отсчитываются от `root`
    pub fn rooted_at(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        self.log_dir = root.join(&self.log_dir);
        self.ingestion.source_path = root.join(&self.ingestion.source_path);
        self.ingestion.artifacts_dir = root.join(&self.ingestion.artifacts_dir);
        self.transformation.preprocessor_file = root.join(&self.transformation.preprocessor_file);
        self.trainer.model_file = root.join(&self.trainer.model_file);
        self.trainer.report_file = root.join(&self.trainer.report_file);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let ratio = self.ingestion.train_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(PipelineError::config(format!(
                "train_ratio must be in (0, 1), got {}",
                ratio
            )));
        }

        let schema = &self.transformation.schema;
        if schema.numeric.is_empty() && schema.categorical.is_empty() {
            return Err(PipelineError::config("schema declares no feature columns"));
        }
        if schema.feature_columns().any(|c| *c == schema.target) {
            return Err(PipelineError::config(format!(
                "target column '{}' is also listed as a feature",
                schema.target
            )));
        }

        if self.trainer.cv_folds < 2 {
            return Err(PipelineError::config(format!(
                "cv_folds must be at least 2, got {}",
                self.trainer.cv_folds
            )));
        }
        if self.trainer.catalog.is_empty() {
            return Err(PipelineError::config("model catalog is empty"));
        }

        Ok(())
    }
}

fn default_source_path() -> PathBuf {
    Path::new("notebook").join("data").join("stud.csv")
}
fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}
fn default_raw_file() -> String {
    "raw.csv".to_string()
}
fn default_train_file() -> String {
    "train.csv".to_string()
}
fn default_test_file() -> String {
    "test.csv".to_string()
}
fn default_train_ratio() -> f64 {
    0.8
}
fn default_seed() -> u64 {
    32
}
fn default_target() -> String {
    "math_score".to_string()
}
fn default_numeric() -> Vec<String> {
    vec!["writing_score".to_string(), "reading_score".to_string()]
}
fn default_categorical() -> Vec<String> {
    vec![
        "gender".to_string(),
        "race_ethnicity".to_string(),
        "parental_level_of_education".to_string(),
        "test_preparation_course".to_string(),
    ]
}
fn default_preprocessor_file() -> PathBuf {
    default_artifacts_dir().join("preprocessor.json")
}
fn default_cv_folds() -> usize {
    3
}
fn default_model_file() -> PathBuf {
    default_artifacts_dir().join("model.json")
}
fn default_report_file() -> PathBuf {
    default_artifacts_dir().join("report.json")
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}
