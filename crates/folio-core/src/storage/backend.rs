use super::error::StorageResult;

/// Abstract interface for the local store's persisted values.
///
/// Values are opaque strings addressed by fixed keys. Implementations take
/// `&self` and handle their own interior mutability so a store can be shared
/// by reference.
pub trait KeyValueStorage: Send + Sync {
    /// Read a value. Returns Ok(None) when the key has never been written.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one.
    /// MUST be atomic: readers see either the old or the new value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Short human-readable location, for status output and logs.
    fn describe(&self) -> String;
}
