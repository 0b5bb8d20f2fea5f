//! Storage layer
//!
//! Key-value backends for the local store.
//!
//! ## Architecture
//!
//! The local store keeps its whole collection under a handful of fixed keys
//! and round-trips it on every read and write. Where those keys live is
//! decided by the injected [`KeyValueStorage`]:
//!
//! - **FileStorage**: one JSON file per key, atomic writes
//! - **SqliteStorage**: a single `kv` table
//! - **MemoryStorage**: in-process map, for tests

pub mod backend;
pub mod error;
pub mod file;
pub mod memory;
pub mod sqlite;

pub use backend::KeyValueStorage;
pub use error::{IoAction, IoCause, StorageError, StorageResult};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;
