//! Ошибки пайплайна

use std::fmt;
use std::panic::Location;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Этап, на котором произошла ошибка
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Ingestion,
    Transformation,
    Training,
    Persistence,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Config => "config",
            ErrorKind::Ingestion => "ingestion",
            ErrorKind::Transformation => "transformation",
            ErrorKind::Training => "training",
            ErrorKind::Persistence => "persistence",
        };
        f.write_str(name)
    }
}

/// Единый тип ошибки: этап, сообщение, место вызова и исходная причина.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error at [{}:{}]: {message}", .location.file(), .location.line())]
pub struct PipelineError {
    kind: ErrorKind,
    message: String,
    location: &'static Location<'static>,
    #[source]
    source: Option<BoxError>,
}

impl PipelineError {
    #[track_caller]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: Location::caller(),
            source: None,
        }
    }

    #[track_caller]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    #[track_caller]
    pub fn ingestion(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Ingestion, message)
    }

    #[track_caller]
    pub fn transformation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transformation, message)
    }

    #[track_caller]
    pub fn training(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Training, message)
    }

    #[track_caller]
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Persistence, message)
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }
}

/// Оборачивание ошибок нижних слоев в [`PipelineError`]
pub trait ResultExt<T> {
    fn stage(self, kind: ErrorKind, message: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<BoxError>,
{
    #[track_caller]
    fn stage(self, kind: ErrorKind, message: impl Into<String>) -> Result<T> {
        match self {
            Ok(value) => Ok(value),
            Err(err) => Err(PipelineError::new(kind, message).with_source(err)),
        }
    }
}
