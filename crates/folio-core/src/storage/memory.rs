use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::backend::KeyValueStorage;
use super::error::{IoAction, StorageError, StorageResult};

/// In-memory storage backend for testing.
///
/// Supports fault simulation so callers can exercise the local store's
/// degrade-to-default behavior.
#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
    simulate_read_error: AtomicBool,
    simulate_write_error: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail.
    pub fn set_simulate_read_error(&self, simulate: bool) {
        self.simulate_read_error.store(simulate, Ordering::SeqCst);
    }

    /// Make every subsequent write or remove fail.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn fault(action: IoAction, key: &str) -> StorageError {
        StorageError::io(
            action,
            PathBuf::from(format!("memory://{}", key)),
            io::Error::new(io::ErrorKind::Other, format!("Simulated {} error", action)),
        )
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        if self.simulate_read_error.load(Ordering::SeqCst) {
            return Err(Self::fault(IoAction::Read, key));
        }
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(Self::fault(IoAction::Write, key));
        }
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(Self::fault(IoAction::Remove, key));
        }
        self.values().remove(key);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let storage = MemoryStorage::new();
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
        storage.remove("k").unwrap();
        assert!(storage.get("k").unwrap().is_none());
    }

    #[test]
    fn test_simulated_errors() {
        let storage = MemoryStorage::new();
        storage.set("k", "v").unwrap();

        storage.set_simulate_write_error(true);
        assert!(storage.set("k", "w").is_err());
        assert!(storage.remove("k").is_err());

        storage.set_simulate_read_error(true);
        assert!(matches!(
            storage.get("k"),
            Err(StorageError::Io {
                action: IoAction::Read,
                ..
            })
        ));

        storage.set_simulate_read_error(false);
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
    }
}
