//! File-backed key-value storage
//!
//! Each key is stored as `<key>.json` inside the data directory. Writes are
//! atomic (write to temp file, then rename) to prevent corruption.
//!
//! Storage location: `~/.local/share/folio/` (configurable via `Config`)

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::backend::KeyValueStorage;
use super::error::{IoAction, StorageError, StorageResult};

/// Key-value storage over plain files
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(IoAction::Prepare, &dir, e))?;
        Ok(Self { dir })
    }

    /// Path of the file holding `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(IoAction::Read, path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        atomic_write(&self.path_for(key), value.as_bytes())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(IoAction::Remove, path, e)),
        }
    }

    fn describe(&self) -> String {
        format!("files in {}", self.dir.display())
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(IoAction::Prepare, parent, e))?;
    }

    let temp_path = path.with_extension("tmp");

    let write_err = |e| StorageError::io(IoAction::Write, &temp_path, e);
    let mut file = File::create(&temp_path).map_err(write_err)?;
    file.write_all(data).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;

    fs::rename(&temp_path, path).map_err(|e| StorageError::io(IoAction::Replace, path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        assert!(storage.get("blog_posts").unwrap().is_none());
    }

    #[test]
    fn test_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        storage.set("blog_version", "2.1").unwrap();
        assert_eq!(storage.get("blog_version").unwrap().as_deref(), Some("2.1"));
        assert!(storage.path_for("blog_version").exists());

        storage.set("blog_version", "2.2").unwrap();
        assert_eq!(storage.get("blog_version").unwrap().as_deref(), Some("2.2"));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();

        storage.set("blog_posts", "[]").unwrap();
        storage.remove("blog_posts").unwrap();
        storage.remove("blog_posts").unwrap();
        assert!(storage.get("blog_posts").unwrap().is_none());
    }

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");

        let storage = FileStorage::open(&nested).unwrap();
        storage.set("k", "v").unwrap();

        assert!(nested.join("k.json").exists());
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file.json");

        atomic_write(&path, b"test data").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "test data");
        assert!(!path.with_extension("tmp").exists());
    }
}
