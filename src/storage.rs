//! Filesystem persistence behind an explicit capability trait.
//!
//! Stages receive a [`Storage`] rather than calling `std::fs` directly, so
//! tests can substitute an in-memory fake and the write conventions live in
//! one place.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// State record filename inside a state directory.
pub const STATE_RECORD: &str = "state.json";
/// LGA record filename inside an LGA directory.
pub const LGA_RECORD: &str = "lga.json";
/// Ward record filename inside a ward directory.
pub const WARD_RECORD: &str = "ward.json";
/// Raw polling-unit collection inside a ward directory.
pub const POLLING_UNITS_JSON: &str = "polling-units.json";
/// Flattened tabular form of the same collection; also the name of the
/// state-level aggregate inside a state directory.
pub const POLLING_UNITS_CSV: &str = "polling-units.csv";
/// Global output of the upload-statistics stage, under the results root.
pub const UPLOAD_STATS_CSV: &str = "ward-feb-25th-valid-uploads-stats.csv";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode record for {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Write-side capabilities of the archive.
pub trait Storage: Send + Sync {
    /// Create `path` and any missing ancestors; no-op if it already exists.
    fn ensure_directory(&self, path: &Path) -> Result<()>;

    /// Persist `value` at `path` in canonical pretty-printed form,
    /// overwriting unconditionally.
    fn write_json(&self, path: &Path, value: &Value) -> Result<()>;

    /// Persist a tabular file verbatim, overwriting unconditionally.
    fn write_text(&self, path: &Path, contents: &str) -> Result<()>;

    /// A ward counts as archived iff both its raw and tabular polling-unit
    /// files exist. This is the single source of truth for resumability.
    fn is_archived(&self, ward_dir: &Path) -> bool;
}

/// Serialize `record` and persist it through `storage`.
pub fn write_record<S, T>(storage: &S, path: &Path, record: &T) -> Result<()>
where
    S: Storage + ?Sized,
    T: Serialize,
{
    let value = serde_json::to_value(record).map_err(|source| StorageError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    storage.write_json(path, &value)
}

/// Archive writer backed by the real filesystem.
pub struct FsStorage;

impl Storage for FsStorage {
    fn ensure_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|source| StorageError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_json(&self, path: &Path, value: &Value) -> Result<()> {
        let pretty = serde_json::to_string_pretty(value).map_err(|source| StorageError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_text(path, &pretty)
    }

    fn write_text(&self, path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents).map_err(|source| StorageError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn is_archived(&self, ward_dir: &Path) -> bool {
        ward_dir.join(POLLING_UNITS_JSON).is_file() && ward_dir.join(POLLING_UNITS_CSV).is_file()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ensure_directory_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("24-lagos").join("7-ikeja");
        FsStorage.ensure_directory(&dir).unwrap();
        FsStorage.ensure_directory(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn write_json_is_pretty_printed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        FsStorage
            .write_json(&path, &json!({ "state_id": 24, "name": "Lagos" }))
            .unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\n  \"name\": \"Lagos\""));
    }

    #[test]
    fn is_archived_requires_both_ward_files() {
        let tmp = tempfile::tempdir().unwrap();
        let ward_dir = tmp.path().to_path_buf();
        assert!(!FsStorage.is_archived(&ward_dir));

        FsStorage
            .write_text(&ward_dir.join(POLLING_UNITS_JSON), "[]")
            .unwrap();
        assert!(!FsStorage.is_archived(&ward_dir));

        FsStorage
            .write_text(&ward_dir.join(POLLING_UNITS_CSV), "state_name\n")
            .unwrap();
        assert!(FsStorage.is_archived(&ward_dir));
    }

    #[test]
    fn mem_storage_tracks_archived_wards() {
        let storage = mem::MemStorage::default();
        let ward_dir = Path::new("results/24-lagos/7-ikeja/3-ojodu");
        assert!(!storage.is_archived(ward_dir));
        storage
            .write_text(&ward_dir.join(POLLING_UNITS_JSON), "[]")
            .unwrap();
        storage
            .write_text(&ward_dir.join(POLLING_UNITS_CSV), "state_name\n")
            .unwrap();
        assert!(storage.is_archived(ward_dir));
    }
}
