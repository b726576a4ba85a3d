//! Сохранение и загрузка обученных объектов (JSON)

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ErrorKind, Result, ResultExt};

/// Сериализует объект в `path`, создавая родительские каталоги; существующий файл перезаписывается.
pub fn save_object<T: Serialize + ?Sized>(path: impl AsRef<Path>, obj: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).stage(
            ErrorKind::Persistence,
            format!("cannot create directory {}", dir.display()),
        )?;
    }

    let file = fs::File::create(path)
        .stage(ErrorKind::Persistence, format!("cannot create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, obj)
        .stage(ErrorKind::Persistence, format!("cannot serialize into {}", path.display()))?;
    writer
        .flush()
        .stage(ErrorKind::Persistence, format!("cannot write {}", path.display()))?;

    tracing::debug!(path = %path.display(), "Object saved");
    Ok(())
}

pub fn load_object<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let file = fs::File::open(path)
        .stage(ErrorKind::Persistence, format!("cannot open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .stage(ErrorKind::Persistence, format!("cannot deserialize {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn save_creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifacts").join("scores.json");

        let mut first = BTreeMap::new();
        first.insert("Ridge".to_string(), 0.88);
        save_object(&path, &first).unwrap();

        let mut second = BTreeMap::new();
        second.insert("Lasso".to_string(), 0.85);
        save_object(&path, &second).unwrap();

        let loaded: BTreeMap<String, f64> = load_object(&path).unwrap();
        assert_eq!(loaded, second);
    }

    #[test]
    fn missing_file_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_object::<Vec<f64>>(dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn corrupt_file_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preprocessor.json");
        fs::write(&path, b"{ not json").unwrap();

        let err = load_object::<Vec<f64>>(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }
}
