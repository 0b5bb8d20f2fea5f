//! Local-to-remote migration
//!
//! A one-way copy of the local collection into the remote store, guarded by
//! a backup taken first:
//!
//! ```text
//! Idle -> BackingUp -> Copying -> Done
//!             |           |
//!             +-----------+-----> Failed
//! ```
//!
//! Nothing is copied unless the backup was persisted. Posts whose title
//! already exists remotely (case-insensitively) are skipped, so running the
//! migration again over the same local data copies nothing new. Clearing
//! the local store afterwards is a separate call that requires a successful
//! report.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::local::{LocalRecord, LocalStore, SCHEMA_VERSION};
use crate::mapping;
use crate::remote::{RemoteError, RemoteStore};
use crate::storage::{file::atomic_write, IoAction, StorageError, StorageResult};

/// Errors from migration housekeeping
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Local data may only be cleared after a successful migration
    #[error("Refusing to clear local posts: the migration did not succeed")]
    ClearRefused,

    /// Backup document is unreadable or has no `posts` array
    #[error("Invalid backup: {0}")]
    InvalidBackup(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Where a migration run is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationPhase {
    Idle,
    BackingUp,
    Copying,
    Done,
    Failed,
}

/// Snapshot of the local collection taken before copying
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Backup {
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub posts: Vec<LocalRecord>,
}

impl Backup {
    pub fn new(posts: Vec<LocalRecord>) -> Self {
        Self {
            timestamp: Utc::now(),
            version: SCHEMA_VERSION.to_string(),
            posts,
        }
    }

    /// Download name, e.g. `folio-backup-2024-05-01.json`
    pub fn file_name(&self) -> String {
        format!("folio-backup-{}.json", self.timestamp.format("%Y-%m-%d"))
    }
}

/// Receives backup artifacts for the user to keep
pub trait ArtifactSink: Send + Sync {
    /// Store the artifact and return where it went
    fn offer(&self, file_name: &str, contents: &[u8]) -> StorageResult<String>;
}

/// Writes artifacts into a directory
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactSink for DirectorySink {
    fn offer(&self, file_name: &str, contents: &[u8]) -> StorageResult<String> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StorageError::io(IoAction::Prepare, &self.dir, e))?;
        let path = self.dir.join(file_name);
        atomic_write(&path, contents)?;
        Ok(path.display().to_string())
    }
}

/// Keeps artifacts in memory
#[derive(Default)]
pub struct MemorySink {
    artifacts: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every artifact offered so far, oldest first
    pub fn artifacts(&self) -> Vec<(String, Vec<u8>)> {
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ArtifactSink for MemorySink {
    fn offer(&self, file_name: &str, contents: &[u8]) -> StorageResult<String> {
        self.artifacts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((file_name.to_string(), contents.to_vec()));
        Ok(format!("memory://{}", file_name))
    }
}

/// Outcome of a migration run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub success: bool,
    pub message: String,
    pub local_posts: usize,
    pub migrated_posts: usize,
    pub skipped_posts: usize,
    pub errors: Vec<String>,
    /// Where the backup artifact was offered, if the sink accepted it
    pub backup_file: Option<String>,
}

/// Drives one migration from the local store to the remote store
pub struct Migrator<'a> {
    local: &'a LocalStore,
    remote: &'a RemoteStore,
    sink: Option<&'a dyn ArtifactSink>,
    phase: MigrationPhase,
}

impl<'a> Migrator<'a> {
    pub fn new(local: &'a LocalStore, remote: &'a RemoteStore) -> Self {
        Self {
            local,
            remote,
            sink: None,
            phase: MigrationPhase::Idle,
        }
    }

    /// Offer the backup to `sink` once it is taken
    pub fn with_sink(mut self, sink: &'a dyn ArtifactSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn phase(&self) -> MigrationPhase {
        self.phase
    }

    fn enter(&mut self, phase: MigrationPhase) {
        info!(from = ?self.phase, to = ?phase, "Migration phase");
        self.phase = phase;
    }

    fn fail(&mut self, mut report: MigrationReport, message: String) -> MigrationReport {
        error!(%message, "Migration failed");
        self.enter(MigrationPhase::Failed);
        report.success = false;
        report.errors.push(message.clone());
        report.message = message;
        report
    }

    /// Back up the local collection, then copy it to the remote store
    pub async fn run(&mut self) -> MigrationReport {
        let mut report = MigrationReport::default();

        self.enter(MigrationPhase::BackingUp);
        let posts = match self.back_up(&mut report) {
            Ok(posts) => posts,
            Err(e) => {
                let message = format!("Backup failed, migration cancelled: {}", e);
                return self.fail(report, message);
            }
        };
        report.local_posts = posts.len();

        if posts.is_empty() {
            self.enter(MigrationPhase::Done);
            report.success = true;
            report.message = "No local posts to migrate.".to_string();
            return report;
        }

        self.enter(MigrationPhase::Copying);
        let existing = match self.remote.try_load().await {
            Ok(rows) => rows,
            Err(e) => {
                let message = format!("Could not read remote posts: {}", e);
                return self.fail(report, message);
            }
        };
        let existing_titles: HashSet<String> =
            existing.iter().map(|row| row.title.to_lowercase()).collect();
        if !existing_titles.is_empty() {
            info!(existing = existing.len(), "Remote store already has posts, skipping matches");
        }

        for (index, post) in posts.iter().enumerate() {
            if existing_titles.contains(&post.title.to_lowercase()) {
                info!(title = %post.title, "Post already present remotely, skipping");
                report.skipped_posts += 1;
                continue;
            }

            info!(
                current = index + 1,
                total = posts.len(),
                title = %post.title,
                "Migrating post"
            );
            match self.remote.try_add(&mapping::draft_from_local(post)).await {
                Ok(row) => {
                    report.migrated_posts += 1;
                    info!(slug = %row.slug, "Post migrated");
                }
                Err(e) => {
                    warn!(title = %post.title, error = %e, "Failed to migrate post");
                    report
                        .errors
                        .push(format!("Failed to migrate \"{}\": {}", post.title, e));
                }
            }
        }

        let candidates = posts.len() - report.skipped_posts;
        if report.migrated_posts == candidates {
            self.enter(MigrationPhase::Done);
            report.success = true;
            report.message = if report.skipped_posts > 0 {
                format!(
                    "Migration complete: {} posts migrated, {} already present.",
                    report.migrated_posts, report.skipped_posts
                )
            } else {
                format!(
                    "Migration complete: {} posts migrated.",
                    report.migrated_posts
                )
            };
        } else {
            self.enter(MigrationPhase::Failed);
            report.success = false;
            report.message = format!(
                "Partial migration: {}/{} posts migrated. Check the errors.",
                report.migrated_posts, candidates
            );
        }

        info!(
            local = report.local_posts,
            migrated = report.migrated_posts,
            skipped = report.skipped_posts,
            errors = report.errors.len(),
            "Migration finished"
        );
        report
    }

    /// Snapshot, persist and offer the backup
    ///
    /// Only the snapshot and the persist can fail the run. A sink that
    /// refuses the artifact is logged and otherwise ignored.
    fn back_up(&self, report: &mut MigrationReport) -> StorageResult<Vec<LocalRecord>> {
        let posts = self.local.try_load()?;
        let backup = Backup::new(posts);
        let json = serde_json::to_string_pretty(&backup)?;
        self.local.try_store_backup(&json)?;
        info!(posts = backup.posts.len(), "Backup stored");

        if let Some(sink) = self.sink {
            match sink.offer(&backup.file_name(), json.as_bytes()) {
                Ok(location) => {
                    info!(%location, "Backup offered");
                    report.backup_file = Some(location);
                }
                Err(e) => warn!(error = %e, "Could not offer backup artifact"),
            }
        }

        Ok(backup.posts)
    }

    /// Whether the local store holds more posts than the remote store
    pub async fn needs_migration(&self) -> Result<bool, MigrationError> {
        let local = self.local.try_load()?.len();
        let remote = self.remote.try_load().await?.len();
        Ok(local > remote)
    }

    /// Remove the local posts and schema marker after a successful migration
    ///
    /// The stored backup is kept.
    pub fn clear_local(&self, report: &MigrationReport) -> Result<(), MigrationError> {
        if !report.success {
            warn!("Refusing to clear local posts after an unsuccessful migration");
            return Err(MigrationError::ClearRefused);
        }
        self.local.try_reset()?;
        Ok(())
    }
}

/// Replace the local collection with the posts of a backup document
///
/// No merge: whatever the local store held is gone. Returns the number of
/// posts restored.
pub fn restore_from_backup(local: &LocalStore, json: &str) -> Result<usize, MigrationError> {
    let mut document: Value =
        serde_json::from_str(json).map_err(|e| MigrationError::InvalidBackup(e.to_string()))?;

    let posts = match document.get_mut("posts").map(Value::take) {
        Some(posts @ Value::Array(_)) => posts,
        _ => {
            return Err(MigrationError::InvalidBackup(
                "backup has no posts array".to_string(),
            ))
        }
    };
    let posts: Vec<LocalRecord> =
        serde_json::from_value(posts).map_err(|e| MigrationError::InvalidBackup(e.to_string()))?;

    let count = posts.len();
    local.try_save(posts)?;
    warn!(count, "Local posts replaced from backup");
    Ok(count)
}
