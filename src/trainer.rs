//! Этап обучения: перебор каталога моделей, оценка и выбор лучшей

#![allow(non_snake_case)]

use ndarray::{s, Array1, Array2};

use crate::config::TrainerConfig;
use crate::error::{ErrorKind, PipelineError, Result, ResultExt};
use crate::metrics::r2_score;
use crate::model_selection::{GridSearch, ParamGrid};
use crate::models::{Estimator, ModelSpec, Regressor};
use crate::persistence::save_object;
use crate::types::{EvaluationReport, ModelScore};

#[derive(Debug)]
pub struct TrainingOutcome {
    pub report: EvaluationReport,
    pub best_model: Estimator,
}

pub struct ModelTrainer {
    config: TrainerConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Последний столбец обеих матриц - цель
    pub fn initiate(&self, train_arr: &Array2<f64>, test_arr: &Array2<f64>) -> Result<TrainingOutcome> {
        tracing::info!("Split training and test input data");
        let (X_train, y_train) = split_target(train_arr, "train")?;
        let (X_test, y_test) = split_target(test_arr, "test")?;
        if X_train.ncols() != X_test.ncols() {
            return Err(PipelineError::training(format!(
                "train has {} features, test has {}",
                X_train.ncols(),
                X_test.ncols()
            )));
        }
        if self.config.catalog.is_empty() {
            return Err(PipelineError::training("model catalog is empty"));
        }

        let mut scores = Vec::with_capacity(self.config.catalog.len());
        let mut best: Option<(String, f64, Estimator)> = None;

        for spec in &self.config.catalog {
            let (score, model) = self.evaluate(spec, &X_train, &y_train, &X_test, &y_test)?;
            tracing::info!(
                model = %spec.name,
                params = ?score.best_params,
                train_r2 = score.train_r2,
                test_r2 = score.test_r2,
                "Model evaluated"
            );

            if !score.test_r2.is_finite() {
                tracing::warn!(model = %spec.name, "Test score is not finite, model skipped");
            } else if best.as_ref().map_or(true, |(_, b, _)| score.test_r2 > *b) {
                best = Some((spec.name.clone(), score.test_r2, model));
            }
            scores.push((spec.name.clone(), score));
        }

        let (best_model_name, best_score, best_model) =
            best.ok_or_else(|| PipelineError::training("No best model found"))?;

        if let Some(min) = self.config.min_test_score {
            if best_score < min {
                return Err(PipelineError::training(format!(
                    "No best model found: {} scored {:.4}, required {:.4}",
                    best_model_name, best_score, min
                )));
            }
        }
        tracing::info!(model = %best_model_name, test_r2 = best_score, "Best found model on both training and testing dataset");

        let report = EvaluationReport {
            scores,
            best_model: best_model_name,
            best_score,
        };

        save_object(&self.config.model_file, &best_model)?;
        save_object(&self.config.report_file, &report)?;

        Ok(TrainingOutcome { report, best_model })
    }

    /// Подбор гиперпараметров на K-Fold, дообучение на всем train и оценка
    fn evaluate(
        &self,
        spec: &ModelSpec,
        X_train: &Array2<f64>,
        y_train: &Array1<f64>,
        X_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<(ModelScore, Estimator)> {
        let failed = |what: &str| format!("{} failed for '{}'", what, spec.name);

        let search = GridSearch::new(self.config.cv_folds, self.config.random_seed)
            .fit(spec.kind, &ParamGrid::from(spec.grid.clone()), X_train, y_train)
            .stage(ErrorKind::Training, failed("grid search"))?;

        let mut model = spec
            .kind
            .instantiate(&search.best_params, self.config.random_seed)
            .stage(ErrorKind::Training, failed("model construction"))?;
        model
            .fit(X_train, y_train)
            .stage(ErrorKind::Training, failed("training"))?;

        let train_pred = model.predict(X_train).stage(ErrorKind::Training, failed("prediction"))?;
        let test_pred = model.predict(X_test).stage(ErrorKind::Training, failed("prediction"))?;

        let score = ModelScore {
            train_r2: r2_score(y_train, &train_pred).stage(ErrorKind::Training, failed("scoring"))?,
            test_r2: r2_score(y_test, &test_pred).stage(ErrorKind::Training, failed("scoring"))?,
            best_params: search.best_params,
        };
        Ok((score, model))
    }
}

fn split_target(arr: &Array2<f64>, name: &str) -> Result<(Array2<f64>, Array1<f64>)> {
    let n = arr.ncols();
    if n < 2 {
        return Err(PipelineError::training(format!(
            "{} array needs at least one feature and the target, got {} columns",
            name, n
        )));
    }
    Ok((arr.slice(s![.., ..n - 1]).to_owned(), arr.column(n - 1).to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelKind;
    use crate::persistence::load_object;
    use std::path::Path;

    /// y = 2 x0 - x1 + 3 с шумом из детерминированной последовательности
    fn arrays(n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, 3), |(i, j)| {
            let x0 = (i % 13) as f64;
            let x1 = ((i * 5) % 7) as f64;
            match j {
                0 => x0,
                1 => x1,
                _ => 2.0 * x0 - x1 + 3.0 + ((i * 31) % 5) as f64 * 0.01,
            }
        })
    }

    fn config(dir: &Path, catalog: Vec<ModelSpec>) -> TrainerConfig {
        TrainerConfig {
            catalog,
            model_file: dir.join("model.json"),
            report_file: dir.join("report.json"),
            ..TrainerConfig::default()
        }
    }

    #[test]
    fn linear_model_wins_on_linear_data_and_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = vec![
            ModelSpec::new("Decision Tree", ModelKind::DecisionTree).with_param("max_depth", &[1.0]),
            ModelSpec::new("Ridge", ModelKind::Ridge).with_param("alpha", &[0.01, 100.0]),
        ];
        let outcome = ModelTrainer::new(config(dir.path(), catalog))
            .initiate(&arrays(60), &arrays(20))
            .unwrap();

        let report = &outcome.report;
        assert_eq!(report.best_model, "Ridge");
        assert_eq!(report.scores[0].0, "Decision Tree");
        assert_eq!(report.score("Ridge").unwrap().best_params["alpha"], 0.01);
        assert!(report.best_score > 0.99);

        let saved: Estimator = load_object(dir.path().join("model.json")).unwrap();
        let X_test = arrays(20).slice(s![.., ..2]).to_owned();
        assert_eq!(saved.predict(&X_test).unwrap(), outcome.best_model.predict(&X_test).unwrap());
        let saved_report: EvaluationReport = load_object(dir.path().join("report.json")).unwrap();
        assert_eq!(&saved_report, report);
    }

    #[test]
    fn equal_scores_keep_the_first_catalog_entry() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = vec![
            ModelSpec::new("first", ModelKind::Ridge).with_param("alpha", &[1.0]),
            ModelSpec::new("second", ModelKind::Ridge).with_param("alpha", &[1.0]),
        ];
        let outcome = ModelTrainer::new(config(dir.path(), catalog))
            .initiate(&arrays(30), &arrays(10))
            .unwrap();
        assert_eq!(outcome.report.best_model, "first");
    }

    #[test]
    fn failing_catalog_entry_is_a_training_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = vec![
            ModelSpec::new("Ridge", ModelKind::Ridge),
            ModelSpec::new("K-Neighbors Regressor", ModelKind::KNeighbors).with_param("n_neighbors", &[500.0]),
        ];
        let err = ModelTrainer::new(config(dir.path(), catalog))
            .initiate(&arrays(30), &arrays(10))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Training);
        assert!(err.message().contains("K-Neighbors Regressor"));
    }

    #[test]
    fn score_below_threshold_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), vec![ModelSpec::new("Ridge", ModelKind::Ridge)]);
        config.min_test_score = Some(1.5);
        let err = ModelTrainer::new(config).initiate(&arrays(30), &arrays(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Training);
    }

    #[test]
    fn target_only_array_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let arr = Array2::zeros((10, 1));
        let err = ModelTrainer::new(config(dir.path(), vec![ModelSpec::new("Ridge", ModelKind::Ridge)]))
            .initiate(&arr, &arr)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Training);
    }
}
