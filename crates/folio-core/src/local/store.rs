use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::record::LocalRecord;
use super::{VersionPolicy, BACKUP_KEY, LAST_ID_KEY, POSTS_KEY, SCHEMA_VERSION, VERSION_KEY};
use crate::config::{Config, LocalBackendKind};
use crate::mapping;
use crate::models::{sort_newest_first, PostDraft, PostPatch, PostStats, ALL_CATEGORIES};
use crate::slug;
use crate::storage::{FileStorage, KeyValueStorage, SqliteStorage, StorageError, StorageResult};

/// Device-local post collection
///
/// Every operation comes in two forms: a `try_*` method returning the
/// underlying [`StorageError`], and a plain method that logs the error and
/// degrades to an empty result (`[]`, `None`, `false`). The plain methods
/// never fail.
pub struct LocalStore {
    storage: Box<dyn KeyValueStorage>,
    policy: VersionPolicy,
    /// Set once the schema marker has been checked by this instance
    checked: AtomicBool,
}

impl LocalStore {
    /// Create a store over an injected storage backend
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            policy: VersionPolicy::default(),
            checked: AtomicBool::new(false),
        }
    }

    /// Set the schema version mismatch policy
    pub fn with_policy(mut self, policy: VersionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Open the store described by the configuration
    pub fn open(config: &Config) -> StorageResult<Self> {
        let storage: Box<dyn KeyValueStorage> = match config.local_backend {
            LocalBackendKind::File => Box::new(FileStorage::open(&config.data_dir)?),
            LocalBackendKind::Sqlite => Box::new(SqliteStorage::open(&config.sqlite_path())?),
        };
        Ok(Self::new(storage).with_policy(config.on_version_mismatch))
    }

    /// Where the collection is stored, for display
    pub fn describe(&self) -> String {
        self.storage.describe()
    }

    // ==================== Persistence ====================

    /// Compare the stored schema marker with the current version
    ///
    /// Runs once per store instance, before the first read or write.
    fn ensure_schema(&self) -> StorageResult<()> {
        if self.checked.load(Ordering::SeqCst) {
            return Ok(());
        }

        let stored = self.storage.get(VERSION_KEY)?;
        if stored.as_deref() != Some(SCHEMA_VERSION) {
            match self.policy {
                VersionPolicy::Discard => {
                    warn!(
                        found = ?stored,
                        current = SCHEMA_VERSION,
                        "Local schema version changed, discarding stored posts"
                    );
                    self.storage.remove(POSTS_KEY)?;
                }
                VersionPolicy::Preserve => {
                    warn!(
                        found = ?stored,
                        current = SCHEMA_VERSION,
                        "Local schema version changed, keeping stored posts"
                    );
                }
            }
            self.storage.set(VERSION_KEY, SCHEMA_VERSION)?;
        }

        self.checked.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn read_all(&self) -> StorageResult<Vec<LocalRecord>> {
        self.ensure_schema()?;
        let Some(raw) = self.storage.get(POSTS_KEY)? else {
            return Ok(Vec::new());
        };
        let mut posts: Vec<LocalRecord> =
            serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                key: POSTS_KEY.to_string(),
                details: e.to_string(),
            })?;
        sort_newest_first(&mut posts, |p| p.date);
        Ok(posts)
    }

    fn write_all(&self, posts: &mut [LocalRecord]) -> StorageResult<()> {
        self.ensure_schema()?;
        sort_newest_first(posts, |p| p.date);
        let raw = serde_json::to_string(posts)?;
        self.storage.set(POSTS_KEY, &raw)?;
        self.raise_last_id(posts.iter().map(|p| p.id).max().unwrap_or(0))
    }

    /// Highest id ever assigned by this store
    fn last_id(&self) -> StorageResult<i64> {
        match self.storage.get(LAST_ID_KEY)? {
            Some(raw) => Ok(raw.trim().parse().unwrap_or_else(|_| {
                warn!(value = %raw, "Ignoring unreadable id high-water mark");
                0
            })),
            None => Ok(0),
        }
    }

    fn raise_last_id(&self, id: i64) -> StorageResult<()> {
        if id > self.last_id()? {
            self.storage.set(LAST_ID_KEY, &id.to_string())?;
        }
        Ok(())
    }

    /// Load every post, newest first
    pub fn try_load(&self) -> StorageResult<Vec<LocalRecord>> {
        self.read_all()
    }

    /// Replace the whole collection
    pub fn try_save(&self, mut posts: Vec<LocalRecord>) -> StorageResult<()> {
        self.write_all(&mut posts)
    }

    pub fn load(&self) -> Vec<LocalRecord> {
        or_default("load", self.try_load())
    }

    pub fn save(&self, posts: Vec<LocalRecord>) -> bool {
        or_default("save", self.try_save(posts).map(|_| true))
    }

    // ==================== Mutations ====================

    /// Add a post, assigning id, slug and date
    pub fn try_add(&self, draft: &PostDraft) -> StorageResult<LocalRecord> {
        let mut posts = self.read_all()?;

        let max_id = posts.iter().map(|p| p.id).max().unwrap_or(0);
        let id = max_id.max(self.last_id()?) + 1;
        let slug = slug::allocate(
            &draft.title,
            posts.iter().map(|p| (p.id, p.slug.as_str())),
            None,
        );
        let date = draft.date.unwrap_or_else(|| Utc::now().date_naive());

        let record = mapping::local_from_draft(draft, id, slug, date);
        posts.insert(0, record.clone());
        self.write_all(&mut posts)?;

        info!(id, slug = %record.slug, "Added local post");
        Ok(record)
    }

    /// Merge a patch into a post, reallocating its slug if the title changed
    ///
    /// Returns Ok(None) if no post has this id.
    pub fn try_update(&self, id: i64, patch: &PostPatch) -> StorageResult<Option<LocalRecord>> {
        let mut posts = self.read_all()?;
        let Some(index) = posts.iter().position(|p| p.id == id) else {
            return Ok(None);
        };

        let mut updated = posts[index].clone();
        if let Some(title) = patch.title.as_deref() {
            if title != updated.title {
                updated.slug = slug::allocate(
                    title,
                    posts.iter().map(|p| (p.id, p.slug.as_str())),
                    Some(id),
                );
            }
        }
        mapping::apply_patch_to_local(&mut updated, patch);

        posts[index] = updated.clone();
        self.write_all(&mut posts)?;

        debug!(id, slug = %updated.slug, "Updated local post");
        Ok(Some(updated))
    }

    /// Delete a post. Returns Ok(false) if no post has this id.
    pub fn try_delete(&self, id: i64) -> StorageResult<bool> {
        let mut posts = self.read_all()?;
        let before = posts.len();
        posts.retain(|p| p.id != id);

        if posts.len() == before {
            return Ok(false);
        }

        self.write_all(&mut posts)?;
        info!(id, "Deleted local post");
        Ok(true)
    }

    /// Remove the whole collection
    ///
    /// The id high-water mark and any stored backup are kept.
    pub fn try_clear(&self) -> StorageResult<()> {
        self.ensure_schema()?;
        self.storage.remove(POSTS_KEY)?;
        warn!("Removed all local posts");
        Ok(())
    }

    /// Remove the collection and its schema marker
    ///
    /// The id high-water mark and any stored backup are kept. The marker is
    /// written again on the next access.
    pub fn try_reset(&self) -> StorageResult<()> {
        self.storage.remove(POSTS_KEY)?;
        self.storage.remove(VERSION_KEY)?;
        self.checked.store(false, Ordering::SeqCst);
        warn!("Removed all local posts and the schema marker");
        Ok(())
    }

    pub fn add(&self, draft: &PostDraft) -> Option<LocalRecord> {
        or_default("add", self.try_add(draft).map(Some))
    }

    pub fn update(&self, id: i64, patch: &PostPatch) -> Option<LocalRecord> {
        or_default("update", self.try_update(id, patch))
    }

    pub fn delete(&self, id: i64) -> bool {
        or_default("delete", self.try_delete(id))
    }

    pub fn clear(&self) -> bool {
        or_default("clear", self.try_clear().map(|_| true))
    }

    // ==================== Queries ====================

    pub fn get_by_id(&self, id: i64) -> Option<LocalRecord> {
        self.load().into_iter().find(|p| p.id == id)
    }

    pub fn get_by_slug(&self, slug: &str) -> Option<LocalRecord> {
        self.load().into_iter().find(|p| p.slug == slug)
    }

    /// Published posts only, newest first
    pub fn load_published(&self) -> Vec<LocalRecord> {
        self.load().into_iter().filter(|p| p.published).collect()
    }

    /// Published posts in a category; [`ALL_CATEGORIES`] matches every one
    pub fn load_by_category(&self, category: &str) -> Vec<LocalRecord> {
        let posts = self.load_published();
        if category == ALL_CATEGORIES {
            return posts;
        }
        posts.into_iter().filter(|p| p.category == category).collect()
    }

    /// Case-insensitive search over title, excerpt, author and content of
    /// published posts. A blank term returns every published post.
    pub fn search(&self, term: &str) -> Vec<LocalRecord> {
        let posts = self.load_published();
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return posts;
        }

        posts
            .into_iter()
            .filter(|p| {
                [&p.title, &p.excerpt, &p.author, &p.content]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
            })
            .collect()
    }

    /// Counts over the collection; categories count published posts only
    pub fn stats(&self) -> PostStats {
        let posts = self.load();
        let mut stats = PostStats {
            total: posts.len(),
            ..PostStats::default()
        };

        for post in posts.iter().filter(|p| p.published) {
            stats.published += 1;
            *stats.categories.entry(post.category.clone()).or_insert(0) += 1;
        }
        stats.drafts = stats.total - stats.published;
        stats
    }

    // ==================== Export / Import ====================

    /// Pretty-printed JSON array of every post
    pub fn export(&self) -> String {
        serde_json::to_string_pretty(&self.load()).unwrap_or_else(|e| {
            error!(error = %e, "Failed to serialize local posts");
            "[]".to_string()
        })
    }

    /// Replace the collection with the records in a JSON array
    ///
    /// The payload must be an array, otherwise nothing changes and
    /// [`StorageError::InvalidFormat`] is returned. Records lacking `id`,
    /// `title`, `content` or `date` (or that cannot be read) are dropped, as
    /// are records repeating the id of an earlier one. Missing slugs are generated; slugs colliding with an earlier record
    /// are reallocated. Returns the number of records kept.
    pub fn try_import(&self, json: &str) -> StorageResult<usize> {
        let payload: Value =
            serde_json::from_str(json).map_err(|e| StorageError::InvalidFormat {
                details: e.to_string(),
            })?;
        let Value::Array(items) = payload else {
            return Err(StorageError::InvalidFormat {
                details: "expected a JSON array of posts".to_string(),
            });
        };

        let total = items.len();
        let mut accepted: Vec<LocalRecord> = Vec::with_capacity(total);
        let mut duplicate_ids = 0usize;
        for item in items {
            let Some(mut record) = importable_record(item) else {
                continue;
            };
            if accepted.iter().any(|p| p.id == record.id) {
                duplicate_ids += 1;
                continue;
            }
            let collides = accepted.iter().any(|p| p.slug == record.slug);
            if record.slug.is_empty() || collides {
                record.slug = slug::allocate(
                    &record.title,
                    accepted.iter().map(|p| (p.id, p.slug.as_str())),
                    None,
                );
            }
            accepted.push(record);
        }

        let kept = accepted.len();
        if kept < total {
            warn!(
                dropped = total - kept,
                duplicate_ids,
                "Dropped invalid records during import"
            );
        }
        self.try_save(accepted)?;
        info!(kept, "Imported local posts");
        Ok(kept)
    }

    pub fn import(&self, json: &str) -> bool {
        or_default("import", self.try_import(json).map(|_| true))
    }

    // ==================== Backup slot ====================

    /// Persist a backup document alongside the collection
    pub fn try_store_backup(&self, backup: &str) -> StorageResult<()> {
        self.storage.set(BACKUP_KEY, backup)
    }

    /// The most recently stored backup document, if any
    pub fn try_load_backup(&self) -> StorageResult<Option<String>> {
        self.storage.get(BACKUP_KEY)
    }
}

/// Validate and decode one imported record
fn importable_record(item: Value) -> Option<LocalRecord> {
    let present = |key: &str| match item.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    };
    if !(present("id") && present("title") && present("content") && present("date")) {
        debug!("Skipping import record with missing required fields");
        return None;
    }

    match serde_json::from_value(item) {
        Ok(record) => Some(record),
        Err(e) => {
            debug!(error = %e, "Skipping unreadable import record");
            None
        }
    }
}

/// Log a storage fault and fall back to the type's empty value
fn or_default<T: Default>(operation: &str, result: StorageResult<T>) -> T {
    result.unwrap_or_else(|e| {
        let recoverable = e.is_recoverable();
        match e.recovery_suggestion() {
            Some(hint) => {
                error!(operation, error = %e, recoverable, hint, "Local store operation failed")
            }
            None => error!(operation, error = %e, recoverable, "Local store operation failed"),
        }
        T::default()
    })
}
