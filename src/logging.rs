//! Логирование запуска: отдельный файл на каждый запуск в каталоге логов

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

use crate::error::{ErrorKind, Result, ResultExt};

const LOG_FILE_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

/// Логгер одного запуска.
///
/// Подписчик устанавливается как scoped default и снимается при drop,
/// после чего файл сбрасывается на диск.
pub struct RunLog {
    path: PathBuf,
    file: Arc<File>,
    _guard: DefaultGuard,
}

impl RunLog {
    pub fn init(log_dir: impl AsRef<Path>) -> Result<Self> {
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir).stage(
            ErrorKind::Config,
            format!("cannot create log directory {}", log_dir.display()),
        )?;

        let file_name = format!("{}.log", chrono::Local::now().format(LOG_FILE_FORMAT));
        let path = log_dir.join(file_name);
        let file = File::options()
            .create(true)
            .append(true)
            .open(&path)
            .stage(ErrorKind::Config, format!("cannot open log file {}", path.display()))?;
        let file = Arc::new(file);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(Arc::clone(&file))
            .with_ansi(false)
            .with_line_number(true)
            .with_target(true)
            .with_filter(LevelFilter::INFO);

        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::WARN.into())
                    .from_env_lossy(),
            );

        let subscriber = tracing_subscriber::registry()
            .with(file_layer)
            .with(stderr_layer);
        let guard = tracing::subscriber::set_default(subscriber);

        tracing::info!(path = %path.display(), "Run log initialized");

        Ok(Self {
            path,
            file,
            _guard: guard,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        let _ = (&*self.file).flush();
    }
}
