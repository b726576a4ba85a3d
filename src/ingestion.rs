//! Этап загрузки данных: чтение исходного CSV и разбиение на train/test

use std::path::PathBuf;

use crate::config::IngestionConfig;
use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::model_selection::train_test_split;
use crate::types::Table;

/// Пути к файлам, записанным этапом загрузки
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionArtifacts {
    pub raw_path: PathBuf,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub n_train: usize,
    pub n_test: usize,
}

pub struct DataIngestion {
    config: IngestionConfig,
}

impl DataIngestion {
    pub fn new(config: IngestionConfig) -> Self {
        Self { config }
    }

    pub fn initiate(&self) -> Result<IngestionArtifacts> {
        tracing::info!("Enter the data ingestion stage");
        match self.run() {
            Ok(artifacts) => {
                tracing::info!(
                    train = artifacts.n_train,
                    test = artifacts.n_test,
                    "Ingestion of the data is completed"
                );
                Ok(artifacts)
            }
            Err(err) => {
                tracing::error!(error = %err, "Data ingestion failed");
                Err(err)
            }
        }
    }

    fn run(&self) -> Result<IngestionArtifacts> {
        let source = &self.config.source_path;
        let table = Table::read_csv(source).stage(
            ErrorKind::Ingestion,
            format!("cannot read source dataset {}", source.display()),
        )?;
        if table.n_rows() == 0 {
            return Err(PipelineError::ingestion(format!(
                "source dataset {} has no rows",
                source.display()
            )));
        }
        tracing::info!(rows = table.n_rows(), columns = table.headers.len(), "Read the dataset");

        let raw_path = self.config.raw_data_path();
        table
            .write_csv(&raw_path)
            .stage(ErrorKind::Ingestion, format!("cannot write {}", raw_path.display()))?;

        tracing::info!("Train test split initiated");
        let (train_idx, test_idx) = train_test_split(
            table.n_rows(),
            self.config.train_ratio,
            self.config.random_seed,
        )
        .stage(ErrorKind::Ingestion, "cannot split the dataset")?;

        let train_path = self.config.train_data_path();
        let test_path = self.config.test_data_path();
        table
            .take_rows(&train_idx)
            .write_csv(&train_path)
            .stage(ErrorKind::Ingestion, format!("cannot write {}", train_path.display()))?;
        table
            .take_rows(&test_idx)
            .write_csv(&test_path)
            .stage(ErrorKind::Ingestion, format!("cannot write {}", test_path.display()))?;

        Ok(IngestionArtifacts {
            raw_path,
            train_path,
            test_path,
            n_train: train_idx.len(),
            n_test: test_idx.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write_source(dir: &Path, n_rows: usize) -> PathBuf {
        let path = dir.join("stud.csv");
        let mut text = String::from("id,score\n");
        for i in 0..n_rows {
            text.push_str(&format!("{},{}\n", i, i * 3));
        }
        fs::write(&path, text).unwrap();
        path
    }

    fn config(dir: &Path, source_path: PathBuf) -> IngestionConfig {
        IngestionConfig {
            source_path,
            artifacts_dir: dir.join("artifacts"),
            ..IngestionConfig::default()
        }
    }

    #[test]
    fn writes_raw_train_and_test_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), 20);
        let artifacts = DataIngestion::new(config(dir.path(), source)).initiate().unwrap();

        assert_eq!((artifacts.n_train, artifacts.n_test), (16, 4));
        let raw = Table::read_csv(&artifacts.raw_path).unwrap();
        let train = Table::read_csv(&artifacts.train_path).unwrap();
        let test = Table::read_csv(&artifacts.test_path).unwrap();
        assert_eq!(raw.n_rows(), 20);
        assert_eq!(train.n_rows(), 16);
        assert_eq!(test.n_rows(), 4);

        let mut ids: Vec<String> = train.rows.iter().chain(test.rows.iter()).map(|r| r[0].clone()).collect();
        ids.sort_by_key(|id| id.parse::<usize>().unwrap());
        let expected: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn raw_copy_matches_the_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("stud.csv");
        let text = "gender,race_ethnicity,math_score\nfemale,group B,72\nmale,group  C,47\nfemale,group A ,90\n";
        fs::write(&source, text).unwrap();

        let artifacts = DataIngestion::new(config(dir.path(), source)).initiate().unwrap();
        assert_eq!(fs::read_to_string(&artifacts.raw_path).unwrap(), text);
    }

    #[test]
    fn missing_source_is_an_ingestion_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DataIngestion::new(config(dir.path(), dir.path().join("absent.csv")))
            .initiate()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ingestion);
    }

    #[test]
    fn too_small_dataset_is_an_ingestion_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), 1);
        let err = DataIngestion::new(config(dir.path(), source)).initiate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ingestion);
    }
}
