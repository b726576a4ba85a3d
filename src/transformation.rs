//! Этап преобразования: обучение препроцессора на train и построение матриц признаков

use std::path::{Path, PathBuf};

use ndarray::{concatenate, Array1, Array2, Axis};

use crate::config::{Schema, TransformationConfig};
use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::persistence::save_object;
use crate::preprocessing::Preprocessor;
use crate::types::Table;

/// Матрицы `[признаки..., цель]` и путь к сохраненному препроцессору
#[derive(Debug, Clone)]
pub struct TransformationArtifacts {
    pub train: Array2<f64>,
    pub test: Array2<f64>,
    pub preprocessor_path: PathBuf,
}

pub struct DataTransformation {
    config: TransformationConfig,
}

impl DataTransformation {
    pub fn new(config: TransformationConfig) -> Self {
        Self { config }
    }

    /// Необученный препроцессор по схеме
    pub fn preprocessor(&self) -> Preprocessor {
        let schema = &self.config.schema;
        Preprocessor::new(schema.numeric.clone(), schema.categorical.clone())
            .with_handle_unknown(self.config.handle_unknown)
    }

    pub fn initiate(
        &self,
        train_path: impl AsRef<Path>,
        test_path: impl AsRef<Path>,
    ) -> Result<TransformationArtifacts> {
        tracing::info!("Enter the data transformation stage");
        let train_df = read_split(train_path.as_ref(), &self.config.schema)?;
        let test_df = read_split(test_path.as_ref(), &self.config.schema)?;
        tracing::info!("Read train and test data completed");

        let target = &self.config.schema.target;
        let y_train = target_column(&train_df, target)?;
        let y_test = target_column(&test_df, target)?;

        tracing::info!("Applying preprocessing object on training and testing dataframes");
        let (preprocessor, x_train) = self
            .preprocessor()
            .fit_transform(&train_df)
            .stage(ErrorKind::Transformation, "cannot fit the preprocessor on train data")?;
        let x_test = preprocessor
            .transform(&test_df)
            .stage(ErrorKind::Transformation, "cannot transform test data")?;
        tracing::info!(
            n_features = preprocessor.n_features_out(),
            columns = ?preprocessor.feature_names(),
            "Preprocessing applied"
        );

        let train = with_target(x_train, y_train)?;
        let test = with_target(x_test, y_test)?;

        let preprocessor_path = self.config.preprocessor_file.clone();
        save_object(&preprocessor_path, &preprocessor)?;
        tracing::info!(path = %preprocessor_path.display(), "Saved preprocessing object");

        Ok(TransformationArtifacts {
            train,
            test,
            preprocessor_path,
        })
    }
}

fn read_split(path: &Path, schema: &Schema) -> Result<Table> {
    let table = Table::read_csv(path).stage(
        ErrorKind::Transformation,
        format!("cannot read {}", path.display()),
    )?;
    table.require_columns(&schema.all_columns()).stage(
        ErrorKind::Transformation,
        format!("{} does not match the schema", path.display()),
    )?;
    Ok(table)
}

fn target_column(table: &Table, target: &str) -> Result<Array1<f64>> {
    let values = table
        .numeric_column(target)
        .stage(ErrorKind::Transformation, format!("invalid target column '{}'", target))?;

    values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.ok_or_else(|| {
                PipelineError::transformation(format!(
                    "target '{}' is missing in row {}",
                    target,
                    row + 1
                ))
            })
        })
        .collect()
}

/// Цель добавляется последним столбцом
fn with_target(features: Array2<f64>, target: Array1<f64>) -> Result<Array2<f64>> {
    let target = target.insert_axis(Axis(1));
    concatenate(Axis(1), &[features.view(), target.view()])
        .stage(ErrorKind::Transformation, "feature and target row counts differ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::load_object;
    use crate::preprocessing::FittedPreprocessor;
    use std::fs;

    const TRAIN: &str = "\
gender,race_ethnicity,parental_level_of_education,lunch,test_preparation_course,math_score,reading_score,writing_score
female,group B,bachelor's degree,standard,none,72,72,74
female,group C,some college,standard,completed,69,90,88
male,group A,associate's degree,free/reduced,none,47,57,44
male,group C,some college,standard,none,76,78,75
female,group B,master's degree,standard,none,90,95,93
";

    const TEST: &str = "\
gender,race_ethnicity,parental_level_of_education,lunch,test_preparation_course,math_score,reading_score,writing_score
male,group B,some college,standard,completed,64,64,67
female,group C,bachelor's degree,free/reduced,none,58,60,62
";

    fn setup(dir: &Path, test: &str) -> (TransformationConfig, PathBuf, PathBuf) {
        let train_path = dir.join("train.csv");
        let test_path = dir.join("test.csv");
        fs::write(&train_path, TRAIN).unwrap();
        fs::write(&test_path, test).unwrap();
        let config = TransformationConfig {
            preprocessor_file: dir.join("artifacts").join("preprocessor.json"),
            ..TransformationConfig::default()
        };
        (config, train_path, test_path)
    }

    #[test]
    fn target_is_appended_as_last_column() {
        let dir = tempfile::tempdir().unwrap();
        let (config, train_path, test_path) = setup(dir.path(), TEST);
        let artifacts = DataTransformation::new(config).initiate(&train_path, &test_path).unwrap();

        // 2 числовых + gender(2) + race(3) + education(4) + prep(2) + цель
        assert_eq!(artifacts.train.ncols(), 14);
        assert_eq!(artifacts.test.ncols(), 14);
        assert_eq!(artifacts.train.nrows(), 5);
        assert_eq!(artifacts.test.nrows(), 2);
        assert_eq!(artifacts.train.column(13).to_vec(), vec![72.0, 69.0, 47.0, 76.0, 90.0]);
        assert_eq!(artifacts.test.column(13).to_vec(), vec![64.0, 58.0]);
    }

    #[test]
    fn saved_preprocessor_reproduces_the_test_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let (config, train_path, test_path) = setup(dir.path(), TEST);
        let artifacts = DataTransformation::new(config).initiate(&train_path, &test_path).unwrap();

        let preprocessor: FittedPreprocessor = load_object(&artifacts.preprocessor_path).unwrap();
        let features = preprocessor.transform(&Table::read_csv(&test_path).unwrap()).unwrap();
        let n = features.ncols();
        assert_eq!(features, artifacts.test.slice(ndarray::s![.., ..n]));
    }

    #[test]
    fn missing_target_value_is_a_transformation_error() {
        let dir = tempfile::tempdir().unwrap();
        let broken = TEST.replace(",64,64,67", ",,64,67");
        let (config, train_path, test_path) = setup(dir.path(), &broken);
        let err = DataTransformation::new(config).initiate(&train_path, &test_path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transformation);
    }

    #[test]
    fn missing_schema_column_is_a_transformation_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut config, train_path, test_path) = setup(dir.path(), TEST);
        config.schema.categorical.push("school".to_string());
        let err = DataTransformation::new(config).initiate(&train_path, &test_path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transformation);
    }
}
