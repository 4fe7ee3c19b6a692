//! JSON persistence
//!
//! Files live in `<config dir>/audiotap/` unless a caller passes an explicit
//! path. A missing or blank file reads as `None`.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::config::app::NAME;
use crate::error::{AppError, Result};

/// Directory holding the app's data files
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| {
        AppError::Config("No config directory available (is HOME set?)".to_string())
    })?;
    Ok(base.join(NAME))
}

pub fn data_path(filename: &str) -> Result<PathBuf> {
    Ok(config_dir()?.join(filename))
}

/// Config error naming `what` was attempted on `path`
fn fs_error(what: &str, path: &Path, err: io::Error) -> AppError {
    let reason = match err.kind() {
        ErrorKind::PermissionDenied => "permission denied".to_string(),
        ErrorKind::ReadOnlyFilesystem => "read-only filesystem".to_string(),
        _ => err.to_string(),
    };
    AppError::Config(format!("Cannot {} {}: {}", what, path.display(), reason))
}

pub fn load_from<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(fs_error("read", path, e)),
    };
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| AppError::Config(format!("Invalid JSON in {}: {}", path.display(), e)))
}

/// Write `data` as pretty JSON, creating parent directories as needed
pub fn save_to<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| fs_error("create", dir, e))?;
    }
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| AppError::Config(format!("Cannot serialize {}: {}", path.display(), e)))?;
    fs::write(path, json).map_err(|e| fs_error("write", path, e))
}

pub fn load<T: DeserializeOwned>(filename: &str) -> Result<Option<T>> {
    load_from(&data_path(filename)?)
}

pub fn save<T: Serialize>(filename: &str, data: &T) -> Result<()> {
    save_to(&data_path(filename)?, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        value: i32,
    }

    fn sample() -> Sample {
        Sample {
            name: "clip".to_string(),
            value: 42,
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        save_to(&path, &sample()).unwrap();
        assert_eq!(load_from::<Sample>(&path).unwrap(), Some(sample()));
    }

    #[test]
    fn test_missing_and_blank_files_are_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_from::<Sample>(&dir.path().join("missing.json")).unwrap(), None);

        let blank = dir.path().join("blank.json");
        fs::write(&blank, "  \n").unwrap();
        assert_eq!(load_from::<Sample>(&blank).unwrap(), None);
    }

    #[test]
    fn test_invalid_json_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken_settings.json");
        fs::write(&path, "not valid json").unwrap();

        let err = load_from::<Sample>(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("broken_settings"));
    }

    #[test]
    fn test_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("data.json");

        save_to(&path, &sample()).unwrap();
        assert_eq!(load_from::<Sample>(&path).unwrap(), Some(sample()));
    }

    #[test]
    fn test_write_into_file_as_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, "x").unwrap();

        let err = save_to(&file.join("data.json"), &sample()).unwrap_err();
        assert!(err.to_string().starts_with("Configuration error: Cannot create"));
    }
}
