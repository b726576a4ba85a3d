//! Student Performance - пайплайн обучения регрессионных моделей

pub mod config;
pub mod error;
pub mod inference;
pub mod ingestion;
pub mod logging;
pub mod metrics;
pub mod model_selection;
pub mod models;
pub mod persistence;
pub mod pipeline;
pub mod preprocessing;
pub mod trainer;
pub mod transformation;
pub mod types;

pub use config::{IngestionConfig, PipelineConfig, Schema, TrainerConfig, TransformationConfig};
pub use error::{ErrorKind, PipelineError, Result};
pub use types::*;

// Re-export для удобства
pub use inference::PredictionPipeline;
pub use logging::RunLog;
pub use pipeline::TrainingPipeline;
