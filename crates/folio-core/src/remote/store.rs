use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::error::{RemoteError, RemoteResult};
use super::rest::RestTable;
use super::row::{columns, RemoteRow};
use super::table::{Filter, Query, RemoteTable};
use crate::config::Config;
use crate::mapping;
use crate::models::{PostDraft, PostPatch, PostStats, ALL_CATEGORIES};
use crate::slug;

/// Upper bound on insert or update attempts that lose a slug race
pub const MAX_SLUG_ATTEMPTS: usize = 32;

/// Field defaults for imported records
const IMPORT_CATEGORY: &str = "Geral";
const IMPORT_AUTHOR: &str = "VitallCheck-Up";
const IMPORT_READ_TIME: &str = "5 min";

/// A write that needs a unique slug
enum SlugWrite<'a> {
    Insert { draft: &'a PostDraft, date: NaiveDate },
    Update { id: i64, patch: &'a PostPatch },
}

impl SlugWrite<'_> {
    fn own_id(&self) -> Option<i64> {
        match self {
            SlugWrite::Insert { .. } => None,
            SlugWrite::Update { id, .. } => Some(*id),
        }
    }
}

/// Network-backed post collection
///
/// Mirrors [`LocalStore`](crate::local::LocalStore): `try_*` methods return
/// the [`RemoteError`], plain methods log it and return an empty result.
#[derive(Clone)]
pub struct RemoteStore {
    table: Arc<dyn RemoteTable>,
}

impl RemoteStore {
    pub fn new(table: Arc<dyn RemoteTable>) -> Self {
        Self { table }
    }

    /// Connect to the configured PostgREST table
    pub fn from_config(config: &Config) -> RemoteResult<Self> {
        Ok(Self::new(Arc::new(RestTable::from_config(config)?)))
    }

    pub fn describe(&self) -> String {
        self.table.describe()
    }

    fn newest_first() -> Query {
        Query::new().order_desc(columns::DATE)
    }

    fn published() -> Query {
        Self::newest_first().filter(Filter::eq(columns::PUBLISHED, true))
    }

    async fn first(&self, filter: Filter) -> RemoteResult<Option<RemoteRow>> {
        let rows = self.table.select(&Query::new().filter(filter).limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    // ==================== Fallible operations ====================

    pub async fn try_load(&self) -> RemoteResult<Vec<RemoteRow>> {
        self.table.select(&Self::newest_first()).await
    }

    pub async fn try_load_published(&self) -> RemoteResult<Vec<RemoteRow>> {
        self.table.select(&Self::published()).await
    }

    pub async fn try_get_by_id(&self, id: i64) -> RemoteResult<Option<RemoteRow>> {
        self.first(Filter::eq(columns::ID, id)).await
    }

    pub async fn try_get_by_slug(&self, slug: &str) -> RemoteResult<Option<RemoteRow>> {
        self.first(Filter::eq(columns::SLUG, slug)).await
    }

    /// Published rows in a category; [`ALL_CATEGORIES`] matches every one
    pub async fn try_load_by_category(&self, category: &str) -> RemoteResult<Vec<RemoteRow>> {
        let mut query = Self::published();
        if category != ALL_CATEGORIES {
            query = query.filter(Filter::eq(columns::CATEGORY, category));
        }
        self.table.select(&query).await
    }

    /// Server-side search over title, excerpt and content of published rows
    pub async fn try_search(&self, term: &str) -> RemoteResult<Vec<RemoteRow>> {
        let term = term.trim();
        if term.is_empty() {
            return self.try_load_published().await;
        }

        let query = Self::published().filter(Filter::Contains {
            columns: vec![columns::TITLE, columns::EXCERPT, columns::CONTENT],
            term: term.to_string(),
        });
        self.table.select(&query).await
    }

    /// Counts over every row; categories include drafts
    pub async fn try_stats(&self) -> RemoteResult<PostStats> {
        let rows = self.table.select(&Query::new()).await?;
        let mut stats = PostStats {
            total: rows.len(),
            ..PostStats::default()
        };
        for row in rows {
            if row.published {
                stats.published += 1;
            }
            *stats.categories.entry(row.category).or_insert(0) += 1;
        }
        stats.drafts = stats.total - stats.published;
        Ok(stats)
    }

    /// Insert a post with a unique slug; the date defaults to today
    pub async fn try_add(&self, draft: &PostDraft) -> RemoteResult<RemoteRow> {
        let date = draft.date.unwrap_or_else(|| Utc::now().date_naive());
        let rows = self
            .write_with_unique_slug(&draft.title, SlugWrite::Insert { draft, date })
            .await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| RemoteError::Decode("insert returned no rows".to_string()))?;

        info!(id = row.id, slug = %row.slug, "Added remote post");
        Ok(row)
    }

    /// Apply a patch, reallocating the slug if the title changed
    ///
    /// Returns Ok(None) if no row has this id.
    pub async fn try_update(&self, id: i64, patch: &PostPatch) -> RemoteResult<Option<RemoteRow>> {
        let Some(current) = self.try_get_by_id(id).await? else {
            return Ok(None);
        };

        let rows = match patch.title.as_deref() {
            Some(title) if title != current.title => {
                self.write_with_unique_slug(title, SlugWrite::Update { id, patch })
                    .await?
            }
            _ => {
                let mut remote = mapping::remote_patch_from_patch(patch, None);
                remote.updated_at = Some(Utc::now());
                self.table
                    .update(&[Filter::eq(columns::ID, id)], &remote)
                    .await?
            }
        };

        let updated = rows.into_iter().next();
        if let Some(row) = &updated {
            debug!(id, slug = %row.slug, "Updated remote post");
        }
        Ok(updated)
    }

    /// Delete a row. Returns Ok(false) if no row has this id.
    pub async fn try_delete(&self, id: i64) -> RemoteResult<bool> {
        let removed = self.table.delete(&[Filter::eq(columns::ID, id)]).await?;
        if removed > 0 {
            info!(id, "Deleted remote post");
        }
        Ok(removed > 0)
    }

    /// Delete every row
    ///
    /// The table only deletes through a filter, so this matches every real
    /// id with `id != 0`.
    pub async fn try_clear_all(&self) -> RemoteResult<u64> {
        let removed = self.table.delete(&[Filter::neq(columns::ID, 0)]).await?;
        warn!(removed, "Removed all remote posts");
        Ok(removed)
    }

    pub async fn try_export(&self) -> RemoteResult<String> {
        let rows = self.try_load().await?;
        Ok(serde_json::to_string_pretty(&rows)?)
    }

    /// Add every valid record in a JSON array through [`Self::try_add`]
    ///
    /// Records need a non-empty `title`, `content` and `date`. Missing
    /// fields take the import defaults, and either `read_time` or `readTime`
    /// is accepted. Individual failures are logged and skipped. Returns the
    /// number of posts added.
    pub async fn try_import(&self, json: &str) -> RemoteResult<usize> {
        let payload: Value = serde_json::from_str(json)
            .map_err(|e| RemoteError::InvalidPayload(e.to_string()))?;
        let Value::Array(items) = payload else {
            return Err(RemoteError::InvalidPayload(
                "expected a JSON array of posts".to_string(),
            ));
        };

        let mut added = 0;
        for item in &items {
            let Some(draft) = import_draft(item) else {
                debug!("Skipping import record with missing required fields");
                continue;
            };
            match self.try_add(&draft).await {
                Ok(_) => added += 1,
                Err(e) => warn!(title = %draft.title, error = %e, "Failed to import post"),
            }
        }

        info!(added, total = items.len(), "Imported remote posts");
        Ok(added)
    }

    // ==================== Slug allocation ====================

    /// Whether `slug` is used by a row other than `own_id`
    async fn slug_taken(&self, slug: &str, own_id: Option<i64>) -> RemoteResult<bool> {
        let mut query = Query::new().filter(Filter::eq(columns::SLUG, slug)).limit(1);
        if let Some(id) = own_id {
            query = query.filter(Filter::neq(columns::ID, id));
        }
        Ok(!self.table.select(&query).await?.is_empty())
    }

    /// Find a free slug, then write with it
    ///
    /// Candidates are tried in order: `base`, `base-1`, `base-2`, ... A
    /// candidate is spent when the existence check finds it taken, or when
    /// the write is rejected with a conflict because a concurrent writer
    /// claimed it after the check. At most [`MAX_SLUG_ATTEMPTS`] candidates
    /// are tried.
    async fn write_with_unique_slug(
        &self,
        title: &str,
        write: SlugWrite<'_>,
    ) -> RemoteResult<Vec<RemoteRow>> {
        let base = slug::slugify(title);
        let own_id = write.own_id();

        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let candidate = slug::candidate(&base, attempt - 1);
            if self.slug_taken(&candidate, own_id).await? {
                continue;
            }

            let result = match &write {
                SlugWrite::Insert { draft, date } => self
                    .table
                    .insert(&mapping::remote_insert_from_draft(draft, candidate.clone(), *date))
                    .await
                    .map(|row| vec![row]),
                SlugWrite::Update { id, patch } => {
                    let mut remote = mapping::remote_patch_from_patch(patch, Some(candidate.clone()));
                    remote.updated_at = Some(Utc::now());
                    self.table
                        .update(&[Filter::eq(columns::ID, *id)], &remote)
                        .await
                }
            };

            match result {
                Err(RemoteError::Conflict { .. }) => {
                    warn!(slug = %candidate, attempt, "Slug claimed concurrently, retrying");
                }
                other => return other,
            }
        }

        warn!(%base, attempts = MAX_SLUG_ATTEMPTS, "No free slug found");
        Err(RemoteError::SlugExhausted {
            base,
            attempts: MAX_SLUG_ATTEMPTS,
        })
    }

    // ==================== Sentinel surface ====================

    pub async fn load(&self) -> Vec<RemoteRow> {
        or_default("load", self.try_load().await)
    }

    pub async fn load_published(&self) -> Vec<RemoteRow> {
        or_default("load_published", self.try_load_published().await)
    }

    pub async fn get_by_id(&self, id: i64) -> Option<RemoteRow> {
        or_default("get_by_id", self.try_get_by_id(id).await)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Option<RemoteRow> {
        or_default("get_by_slug", self.try_get_by_slug(slug).await)
    }

    pub async fn load_by_category(&self, category: &str) -> Vec<RemoteRow> {
        or_default("load_by_category", self.try_load_by_category(category).await)
    }

    pub async fn search(&self, term: &str) -> Vec<RemoteRow> {
        or_default("search", self.try_search(term).await)
    }

    pub async fn stats(&self) -> PostStats {
        or_default("stats", self.try_stats().await)
    }

    pub async fn add(&self, draft: &PostDraft) -> Option<RemoteRow> {
        or_default("add", self.try_add(draft).await.map(Some))
    }

    pub async fn update(&self, id: i64, patch: &PostPatch) -> Option<RemoteRow> {
        or_default("update", self.try_update(id, patch).await)
    }

    pub async fn delete(&self, id: i64) -> bool {
        or_default("delete", self.try_delete(id).await)
    }

    pub async fn clear_all(&self) -> bool {
        or_default("clear_all", self.try_clear_all().await.map(|_| true))
    }

    pub async fn export(&self) -> String {
        self.try_export().await.unwrap_or_else(|e| {
            error!(operation = "export", error = %e, "Remote store operation failed");
            "[]".to_string()
        })
    }

    pub async fn import(&self, json: &str) -> bool {
        or_default("import", self.try_import(json).await.map(|_| true))
    }
}

/// Build a draft from one imported record, or None if it is incomplete
fn import_draft(item: &Value) -> Option<PostDraft> {
    let text = |key: &str| item.get(key).and_then(Value::as_str).filter(|s| !s.is_empty());
    let or = |key: &str, default: &str| text(key).unwrap_or(default).to_string();

    let title = text("title")?;
    let content = text("content")?;
    let date = NaiveDate::parse_from_str(text("date")?, "%Y-%m-%d").ok()?;

    Some(PostDraft {
        title: title.to_string(),
        excerpt: or("excerpt", ""),
        content: content.to_string(),
        image: or("image", ""),
        category: or("category", IMPORT_CATEGORY),
        author: or("author", IMPORT_AUTHOR),
        read_time: text("read_time")
            .or_else(|| text("readTime"))
            .unwrap_or(IMPORT_READ_TIME)
            .to_string(),
        published: item.get("published").and_then(Value::as_bool).unwrap_or(false),
        date: Some(date),
    })
}

fn or_default<T: Default>(operation: &str, result: RemoteResult<T>) -> T {
    result.unwrap_or_else(|e| {
        error!(operation, error = %e, "Remote store operation failed");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryTable;

    fn store() -> (RemoteStore, Arc<MemoryTable>) {
        let table = Arc::new(MemoryTable::new());
        (RemoteStore::new(table.clone()), table)
    }

    #[tokio::test]
    async fn test_add_allocates_suffixed_slugs() {
        let (store, _) = store();

        let first = store.try_add(&PostDraft::new("Dica 1", "a")).await.unwrap();
        let second = store.try_add(&PostDraft::new("Dica 1", "b")).await.unwrap();

        assert_eq!(first.slug, "dica-1");
        assert_eq!(second.slug, "dica-1-1");
        assert_eq!(first.date, Utc::now().date_naive());
    }

    #[tokio::test]
    async fn test_add_survives_slug_race() {
        let (store, table) = store();
        table.race_next_write("saude-bucal");

        let row = store.try_add(&PostDraft::new("Saúde Bucal", "c")).await.unwrap();

        assert_eq!(row.slug, "saude-bucal-1");
        assert_eq!(table.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_add_gives_up_when_every_write_conflicts() {
        let (store, table) = store();
        table.set_contended(true);

        let err = store
            .try_add(&PostDraft::new("Saúde Bucal", "c"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RemoteError::SlugExhausted { ref base, attempts }
                if base == "saude-bucal" && attempts == MAX_SLUG_ATTEMPTS
        ));
        assert!(table.rows().is_empty());
    }

    #[tokio::test]
    async fn test_add_gives_up_when_every_candidate_is_taken() {
        let (store, table) = store();
        for n in 0..MAX_SLUG_ATTEMPTS {
            store.try_add(&PostDraft::new("Dica", "c")).await.unwrap();
            assert_eq!(table.rows().len(), n + 1);
        }

        let err = store.try_add(&PostDraft::new("Dica", "c")).await.unwrap_err();
        assert!(matches!(err, RemoteError::SlugExhausted { .. }));
        assert_eq!(table.rows().len(), MAX_SLUG_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_update_survives_slug_race() {
        let (store, table) = store();
        let row = store.try_add(&PostDraft::new("Alpha", "a")).await.unwrap();
        table.race_next_write("beta");

        let renamed = store
            .try_update(row.id, &PostPatch::default().title("Beta"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(renamed.slug, "beta-1");
        assert_eq!(renamed.title, "Beta");
    }

    #[tokio::test]
    async fn test_update_gives_up_and_leaves_row_untouched() {
        let (store, table) = store();
        let row = store.try_add(&PostDraft::new("Alpha", "a")).await.unwrap();
        table.set_contended(true);

        let err = store
            .try_update(row.id, &PostPatch::default().title("Beta"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RemoteError::SlugExhausted { attempts, .. } if attempts == MAX_SLUG_ATTEMPTS
        ));
        let stored = &table.rows()[0];
        assert_eq!(stored.title, "Alpha");
        assert_eq!(stored.slug, "alpha");
    }

    #[tokio::test]
    async fn test_update_reallocates_slug_on_title_change() {
        let (store, _) = store();
        let a = store.try_add(&PostDraft::new("Alpha", "a")).await.unwrap();
        store.try_add(&PostDraft::new("Beta", "b")).await.unwrap();

        let same = store
            .try_update(a.id, &PostPatch::default().title("Alpha"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(same.slug, "alpha");

        let renamed = store
            .try_update(a.id, &PostPatch::default().title("Beta"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.slug, "beta-1");

        assert!(store
            .try_update(99, &PostPatch::default().title("X"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_queries() {
        let (store, _) = store();
        store
            .try_add(&PostDraft::new("Implantes", "guia completo").with_category("Cirurgia").published())
            .await
            .unwrap();
        store
            .try_add(&PostDraft::new("Clareamento", "dentes brancos").with_category("Estética").published())
            .await
            .unwrap();
        store
            .try_add(&PostDraft::new("Rascunho", "guia").with_category("Cirurgia"))
            .await
            .unwrap();

        assert_eq!(store.load().await.len(), 3);
        assert_eq!(store.load_published().await.len(), 2);
        assert_eq!(store.load_by_category("Cirurgia").await.len(), 1);
        assert_eq!(store.load_by_category(ALL_CATEGORIES).await.len(), 2);
        assert_eq!(store.search("GUIA").await.len(), 1);
        assert_eq!(store.search("").await.len(), 2);
        assert_eq!(store.get_by_slug("clareamento").await.unwrap().title, "Clareamento");

        let stats = store.stats().await;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.published, 2);
        assert_eq!(stats.drafts, 1);
        assert_eq!(stats.categories.get("Cirurgia"), Some(&2));
    }

    #[tokio::test]
    async fn test_delete_and_clear_all() {
        let (store, table) = store();
        let a = store.try_add(&PostDraft::new("A", "a")).await.unwrap();
        store.try_add(&PostDraft::new("B", "b")).await.unwrap();

        assert!(store.delete(a.id).await);
        assert!(!store.delete(a.id).await);
        assert!(store.clear_all().await);
        assert!(table.rows().is_empty());
    }

    #[tokio::test]
    async fn test_import_applies_defaults() {
        let (store, _) = store();
        let json = r#"[
            {"title": "Um", "content": "c", "date": "2023-05-01", "readTime": "2 min de leitura"},
            {"title": "Dois", "content": "c", "date": "2023-06-01", "read_time": "3 min", "published": true},
            {"title": "", "content": "c", "date": "2023-06-01"},
            {"title": "Sem data", "content": "c"}
        ]"#;

        assert_eq!(store.try_import(json).await.unwrap(), 2);

        let um = store.get_by_slug("um").await.unwrap();
        assert_eq!(um.category, "Geral");
        assert_eq!(um.author, "VitallCheck-Up");
        assert_eq!(um.read_time, "2 min de leitura");
        assert!(!um.published);
        assert_eq!(um.date, NaiveDate::from_ymd_opt(2023, 5, 1).unwrap());

        assert!(matches!(
            store.try_import("{}").await,
            Err(RemoteError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_faults_degrade_to_defaults() {
        let (store, table) = store();
        store.try_add(&PostDraft::new("A", "a")).await.unwrap();

        table.set_fail_reads(true);
        assert!(store.load().await.is_empty());
        assert!(store.get_by_id(1).await.is_none());
        assert_eq!(store.stats().await, PostStats::default());
        assert_eq!(store.export().await, "[]");
        assert!(matches!(
            store.try_load().await,
            Err(RemoteError::Transport(_))
        ));

        table.set_fail_reads(false);
        table.set_fail_writes(true);
        assert!(store.add(&PostDraft::new("B", "b")).await.is_none());
        assert!(!store.delete(1).await);
    }
}
