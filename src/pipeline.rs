//! Пайплайн обучения: загрузка -> преобразование -> обучение

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::ingestion::DataIngestion;
use crate::trainer::ModelTrainer;
use crate::transformation::DataTransformation;
use crate::types::EvaluationReport;

pub struct TrainingPipeline {
    config: PipelineConfig,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self) -> Result<EvaluationReport> {
        self.config.validate()?;
        tracing::info!("Training pipeline started");

        let ingestion = DataIngestion::new(self.config.ingestion.clone()).initiate()?;

        let transformation = DataTransformation::new(self.config.transformation.clone())
            .initiate(&ingestion.train_path, &ingestion.test_path)?;
        tracing::info!("Data transformation completed");

        let outcome = ModelTrainer::new(self.config.trainer.clone())
            .initiate(&transformation.train, &transformation.test)?;
        tracing::info!(
            best_model = %outcome.report.best_model,
            test_r2 = outcome.report.best_score,
            "Training pipeline finished"
        );

        Ok(outcome.report)
    }
}
