//! Folio Core Library
//!
//! This crate provides the storage layer for Folio, a small publishing
//! system whose posts live either in a device-local store or in a remote,
//! multi-client post table.
//!
//! # Architecture
//!
//! - **Local store**: synchronous, single-writer collection persisted through
//!   an injected [`KeyValueStorage`] backend (files, SQLite, or memory)
//! - **Remote store**: asynchronous collection over a [`RemoteTable`]
//!   (PostgREST over HTTP, or an in-process table)
//! - **Adapter**: picks a backend from configuration, gates mutations behind
//!   the identity provider and falls back to the local store on remote read
//!   failures
//! - **Migration**: one-way, backup-guarded copy from local to remote
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let adapter = BlogAdapter::from_config(&config)?;
//!
//! let post = adapter.add(&PostDraft::new("Saúde Bucal", "<p>...</p>")).await?;
//! assert_eq!(post.slug, "saude-bucal");
//!
//! let published = adapter.load_published().await;
//! ```
//!
//! # Modules
//!
//! - `adapter`: Backend selection, auth gate, read fallback (main entry point)
//! - `models`: Canonical post types shared by every layer
//! - `mapping`: Conversions between the canonical and per-backend records
//! - `slug`: Deterministic slug allocation
//! - `local`: Local store
//! - `remote`: Remote store and table contract
//! - `migration`: Backup-guarded local-to-remote migration
//! - `storage`: Key-value storage backends for the local store
//! - `identity`: Identity providers consulted before mutations
//! - `reading_time`: Read-time estimation
//! - `config`: Application configuration

pub mod adapter;
pub mod config;
pub mod identity;
pub mod local;
pub mod mapping;
pub mod migration;
pub mod models;
pub mod reading_time;
pub mod remote;
pub mod slug;
pub mod storage;

pub use adapter::{AdapterError, Backend, BackendInfo, BlogAdapter};
pub use config::{Config, LocalBackendKind};
pub use identity::{Caller, IdentityProvider, SessionIdentity, StaticIdentity};
pub use local::{LocalRecord, LocalStore, VersionPolicy, SCHEMA_VERSION};
pub use migration::{
    restore_from_backup, ArtifactSink, Backup, DirectorySink, MemorySink, MigrationError,
    MigrationPhase, MigrationReport, Migrator,
};
pub use models::{Post, PostDraft, PostPatch, PostStats, ALL_CATEGORIES};
pub use remote::{MemoryTable, RemoteError, RemoteRow, RemoteStore, RemoteTable, RestTable};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, SqliteStorage, StorageError};
