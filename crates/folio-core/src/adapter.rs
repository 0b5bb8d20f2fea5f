//! Blog adapter
//!
//! The single entry point callers use. It picks the local or the remote
//! store from configuration, converts both record shapes to [`Post`], and
//! applies two policies:
//!
//! - **Reads** never fail. When the remote store is active and a read fails,
//!   the same read is served from the local store if fallback is enabled,
//!   otherwise an empty result is returned.
//! - **Writes** first require an authenticated caller, then go to the active
//!   store only. A failed remote write is reported and never retried locally.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::identity::{self, Caller, IdentityProvider};
use crate::local::{LocalRecord, LocalStore};
use crate::mapping::{post_from_local, post_from_remote};
use crate::models::{Post, PostDraft, PostPatch, PostStats};
use crate::remote::{RemoteError, RemoteResult, RemoteRow, RemoteStore};
use crate::storage::StorageError;

/// Errors surfaced by adapter mutations
#[derive(Error, Debug)]
pub enum AdapterError {
    /// No authenticated caller; no store was touched
    #[error("Not authenticated: sign in before changing posts")]
    NotAuthenticated,

    /// The active store could not complete the write
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The payload was rejected as a whole
    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<StorageError> for AdapterError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidFormat { details } => AdapterError::Validation(details),
            other => match other.recovery_suggestion().filter(|_| other.is_recoverable()) {
                Some(hint) => AdapterError::BackendUnavailable(format!("{} {}", other, hint)),
                None => AdapterError::BackendUnavailable(other.to_string()),
            },
        }
    }
}

impl From<RemoteError> for AdapterError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::InvalidPayload(details) => AdapterError::Validation(details),
            other => AdapterError::BackendUnavailable(other.to_string()),
        }
    }
}

/// Result type for adapter mutations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Which store serves requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Local,
    Remote,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => write!(f, "local"),
            Backend::Remote => write!(f, "remote"),
        }
    }
}

/// Summary of the adapter's configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendInfo {
    pub backend: Backend,
    pub remote_configured: bool,
    pub fallback_enabled: bool,
}

/// Backend-agnostic access to posts
pub struct BlogAdapter {
    local: LocalStore,
    remote: Option<RemoteStore>,
    identity: Box<dyn IdentityProvider>,
    use_remote: bool,
    fallback: bool,
}

impl BlogAdapter {
    /// Adapter over the local store only
    pub fn new(local: LocalStore, identity: Box<dyn IdentityProvider>) -> Self {
        Self {
            local,
            remote: None,
            identity,
            use_remote: false,
            fallback: true,
        }
    }

    /// Attach a remote store; `active` makes it serve requests
    pub fn with_remote(mut self, remote: RemoteStore, active: bool) -> Self {
        self.remote = Some(remote);
        self.use_remote = active;
        self
    }

    /// Enable or disable the read fallback to the local store
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Build the adapter described by the configuration
    ///
    /// The remote store is attached whenever a URL and key are configured,
    /// so migration can reach it, but only serves requests when
    /// `use_remote` is set. Asking for the remote store without configuring
    /// it leaves the local store active.
    pub fn from_config(config: &Config) -> AdapterResult<Self> {
        let local = LocalStore::open(config)?;
        let mut adapter = Self::new(local, identity::provider_from_config(config))
            .with_fallback(config.fallback_to_local);

        if config.use_remote && !config.remote_enabled() {
            warn!("Remote backend requested but not configured, using local store");
        }
        match RemoteStore::from_config(config) {
            Ok(remote) => adapter = adapter.with_remote(remote, config.remote_enabled()),
            Err(RemoteError::NotConfigured) => {}
            Err(e) => return Err(e.into()),
        }

        info!(backend = %adapter.backend(), fallback = adapter.fallback, "Adapter ready");
        Ok(adapter)
    }

    pub fn backend(&self) -> Backend {
        if self.active_remote().is_some() {
            Backend::Remote
        } else {
            Backend::Local
        }
    }

    pub fn backend_info(&self) -> BackendInfo {
        BackendInfo {
            backend: self.backend(),
            remote_configured: self.remote.is_some(),
            fallback_enabled: self.fallback,
        }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /// The remote store, whether or not it is active
    pub fn remote(&self) -> Option<&RemoteStore> {
        self.remote.as_ref()
    }

    fn active_remote(&self) -> Option<&RemoteStore> {
        self.remote.as_ref().filter(|_| self.use_remote)
    }

    /// The signed-in caller, if any
    pub async fn caller(&self) -> Option<Caller> {
        self.identity.current_caller().await
    }

    /// Resolve the caller, refusing when nobody is signed in
    pub async fn authorize(&self, operation: &str) -> AdapterResult<Caller> {
        match self.caller().await {
            Some(caller) => {
                debug!(operation, caller = %caller.id, "Caller authorized");
                Ok(caller)
            }
            None => {
                warn!(operation, "Rejected unauthenticated mutation");
                Err(AdapterError::NotAuthenticated)
            }
        }
    }

    /// Settle a remote read, falling back to the local store if allowed
    fn recover<T: Default>(
        &self,
        operation: &str,
        result: RemoteResult<T>,
        local_read: impl FnOnce() -> T,
    ) -> T {
        match result {
            Ok(value) => value,
            Err(e) if self.fallback => {
                warn!(
                    operation,
                    error = %e,
                    transient = e.is_transient(),
                    "Remote read failed, serving local data"
                );
                local_read()
            }
            Err(e) => {
                error!(
                    operation,
                    error = %e,
                    transient = e.is_transient(),
                    "Remote read failed"
                );
                T::default()
            }
        }
    }

    // ==================== Reads ====================

    /// Every post, newest first
    pub async fn load(&self) -> Vec<Post> {
        match self.active_remote() {
            Some(remote) => {
                let result = remote.try_load().await.map(remote_posts);
                self.recover("load", result, || local_posts(self.local.load()))
            }
            None => local_posts(self.local.load()),
        }
    }

    pub async fn load_published(&self) -> Vec<Post> {
        match self.active_remote() {
            Some(remote) => {
                let result = remote.try_load_published().await.map(remote_posts);
                self.recover("load_published", result, || {
                    local_posts(self.local.load_published())
                })
            }
            None => local_posts(self.local.load_published()),
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Option<Post> {
        match self.active_remote() {
            Some(remote) => {
                let result = remote.try_get_by_id(id).await.map(|r| r.map(post_from_remote));
                self.recover("get_by_id", result, || {
                    self.local.get_by_id(id).map(post_from_local)
                })
            }
            None => self.local.get_by_id(id).map(post_from_local),
        }
    }

    pub async fn get_by_slug(&self, slug: &str) -> Option<Post> {
        match self.active_remote() {
            Some(remote) => {
                let result = remote
                    .try_get_by_slug(slug)
                    .await
                    .map(|r| r.map(post_from_remote));
                self.recover("get_by_slug", result, || {
                    self.local.get_by_slug(slug).map(post_from_local)
                })
            }
            None => self.local.get_by_slug(slug).map(post_from_local),
        }
    }

    pub async fn load_by_category(&self, category: &str) -> Vec<Post> {
        match self.active_remote() {
            Some(remote) => {
                let result = remote.try_load_by_category(category).await.map(remote_posts);
                self.recover("load_by_category", result, || {
                    local_posts(self.local.load_by_category(category))
                })
            }
            None => local_posts(self.local.load_by_category(category)),
        }
    }

    pub async fn search(&self, term: &str) -> Vec<Post> {
        match self.active_remote() {
            Some(remote) => {
                let result = remote.try_search(term).await.map(remote_posts);
                self.recover("search", result, || local_posts(self.local.search(term)))
            }
            None => local_posts(self.local.search(term)),
        }
    }

    pub async fn stats(&self) -> PostStats {
        match self.active_remote() {
            Some(remote) => {
                let result = remote.try_stats().await;
                self.recover("stats", result, || self.local.stats())
            }
            None => self.local.stats(),
        }
    }

    /// JSON array of every post in the active store's own field layout
    pub async fn export(&self) -> String {
        match self.active_remote() {
            Some(remote) => match remote.try_export().await {
                Ok(json) => json,
                Err(e) if self.fallback => {
                    warn!(operation = "export", error = %e, "Remote read failed, serving local data");
                    self.local.export()
                }
                Err(e) => {
                    error!(operation = "export", error = %e, "Remote read failed");
                    "[]".to_string()
                }
            },
            None => self.local.export(),
        }
    }

    // ==================== Writes ====================

    pub async fn add(&self, draft: &PostDraft) -> AdapterResult<Post> {
        self.authorize("add").await?;
        match self.active_remote() {
            Some(remote) => Ok(post_from_remote(remote.try_add(draft).await?)),
            None => Ok(post_from_local(self.local.try_add(draft)?)),
        }
    }

    /// Returns Ok(None) if no post has this id
    pub async fn update(&self, id: i64, patch: &PostPatch) -> AdapterResult<Option<Post>> {
        self.authorize("update").await?;
        match self.active_remote() {
            Some(remote) => Ok(remote.try_update(id, patch).await?.map(post_from_remote)),
            None => Ok(self.local.try_update(id, patch)?.map(post_from_local)),
        }
    }

    /// Returns Ok(false) if no post has this id
    pub async fn delete(&self, id: i64) -> AdapterResult<bool> {
        self.authorize("delete").await?;
        match self.active_remote() {
            Some(remote) => Ok(remote.try_delete(id).await?),
            None => Ok(self.local.try_delete(id)?),
        }
    }

    /// Remove every post from the active store
    pub async fn clear_all(&self) -> AdapterResult<()> {
        self.authorize("clear_all").await?;
        match self.active_remote() {
            Some(remote) => {
                remote.try_clear_all().await?;
            }
            None => self.local.try_clear()?,
        }
        Ok(())
    }

    /// Import a JSON array of posts into the active store
    ///
    /// Returns the number of posts kept. A payload that is not an array is
    /// rejected with [`AdapterError::Validation`].
    pub async fn import(&self, json: &str) -> AdapterResult<usize> {
        self.authorize("import").await?;
        match self.active_remote() {
            Some(remote) => Ok(remote.try_import(json).await?),
            None => Ok(self.local.try_import(json)?),
        }
    }
}

fn local_posts(records: Vec<LocalRecord>) -> Vec<Post> {
    records.into_iter().map(post_from_local).collect()
}

fn remote_posts(rows: Vec<RemoteRow>) -> Vec<Post> {
    rows.into_iter().map(post_from_remote).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use crate::remote::MemoryTable;
    use crate::storage::{IoAction, MemoryStorage};
    use std::sync::Arc;

    fn editor() -> Box<dyn IdentityProvider> {
        Box::new(StaticIdentity::signed_in(Caller::new("editor")))
    }

    fn remote_adapter(fallback: bool) -> (BlogAdapter, Arc<MemoryTable>) {
        let table = Arc::new(MemoryTable::new());
        let local = LocalStore::new(Box::new(MemoryStorage::new()));
        local
            .try_add(&PostDraft::new("Local", "só no aparelho").published())
            .unwrap();

        let adapter = BlogAdapter::new(local, editor())
            .with_remote(RemoteStore::new(table.clone()), true)
            .with_fallback(fallback);
        (adapter, table)
    }

    #[tokio::test]
    async fn test_backend_selection() {
        let local_only = BlogAdapter::new(LocalStore::new(Box::new(MemoryStorage::new())), editor());
        assert_eq!(local_only.backend(), Backend::Local);
        assert!(!local_only.backend_info().remote_configured);

        let inactive = BlogAdapter::new(LocalStore::new(Box::new(MemoryStorage::new())), editor())
            .with_remote(RemoteStore::new(Arc::new(MemoryTable::new())), false);
        assert_eq!(inactive.backend(), Backend::Local);
        assert!(inactive.backend_info().remote_configured);

        let (remote, _) = remote_adapter(true);
        assert_eq!(
            remote.backend_info(),
            BackendInfo {
                backend: Backend::Remote,
                remote_configured: true,
                fallback_enabled: true,
            }
        );
    }

    #[test]
    fn test_recoverable_storage_fault_carries_hint() {
        let denied = StorageError::io(
            IoAction::Write,
            "/srv/folio/blog_posts.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let AdapterError::BackendUnavailable(message) = AdapterError::from(denied) else {
            panic!("expected BackendUnavailable");
        };
        assert!(message.contains("writable"));

        let broken = StorageError::io(
            IoAction::Write,
            "/srv/folio/blog_posts.json",
            std::io::Error::new(std::io::ErrorKind::Other, "broken pipe"),
        );
        let AdapterError::BackendUnavailable(message) = AdapterError::from(broken) else {
            panic!("expected BackendUnavailable");
        };
        assert!(message.ends_with("broken pipe"));
    }

    #[test]
    fn test_from_config_needs_url_and_key_for_remote() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            use_remote: true,
            remote_url: Some("https://example.supabase.co".to_string()),
            ..Config::default()
        };

        let adapter = BlogAdapter::from_config(&config).unwrap();
        assert_eq!(adapter.backend(), Backend::Local);
        assert!(adapter.remote().is_none());

        config.remote_key = Some("anon-key".to_string());
        let adapter = BlogAdapter::from_config(&config).unwrap();
        assert_eq!(adapter.backend(), Backend::Remote);

        config.use_remote = false;
        let adapter = BlogAdapter::from_config(&config).unwrap();
        assert_eq!(adapter.backend(), Backend::Local);
        assert!(adapter.backend_info().remote_configured);
    }

    #[tokio::test]
    async fn test_read_falls_back_to_local() {
        let (adapter, table) = remote_adapter(true);
        adapter.add(&PostDraft::new("Remota", "na nuvem").published()).await.unwrap();
        assert_eq!(adapter.load().await[0].title, "Remota");

        table.set_fail_reads(true);
        let posts = adapter.load_published().await;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "Local");
        assert_eq!(adapter.get_by_slug("local").await.unwrap().title, "Local");
        assert_eq!(adapter.stats().await.total, 1);
    }

    #[tokio::test]
    async fn test_read_without_fallback_is_empty() {
        let (adapter, table) = remote_adapter(false);
        table.set_fail_reads(true);

        assert!(adapter.load().await.is_empty());
        assert!(adapter.search("").await.is_empty());
        assert!(adapter.get_by_id(1).await.is_none());
        assert_eq!(adapter.export().await, "[]");
    }

    #[tokio::test]
    async fn test_writes_never_fall_back() {
        let (adapter, table) = remote_adapter(true);
        table.set_fail_writes(true);

        let err = adapter.add(&PostDraft::new("Nova", "x")).await.unwrap_err();
        assert!(matches!(err, AdapterError::BackendUnavailable(_)));
        assert_eq!(adapter.local().load().len(), 1);
    }

    #[tokio::test]
    async fn test_mutations_require_caller() {
        let table = Arc::new(MemoryTable::new());
        let adapter = BlogAdapter::new(
            LocalStore::new(Box::new(MemoryStorage::new())),
            Box::new(StaticIdentity::anonymous()),
        )
        .with_remote(RemoteStore::new(table.clone()), true);

        assert!(matches!(
            adapter.add(&PostDraft::new("X", "x")).await,
            Err(AdapterError::NotAuthenticated)
        ));
        assert!(matches!(
            adapter.update(1, &PostPatch::default().title("Y")).await,
            Err(AdapterError::NotAuthenticated)
        ));
        assert!(matches!(adapter.delete(1).await, Err(AdapterError::NotAuthenticated)));
        assert!(matches!(adapter.clear_all().await, Err(AdapterError::NotAuthenticated)));
        assert!(matches!(adapter.import("[]").await, Err(AdapterError::NotAuthenticated)));

        assert!(table.rows().is_empty());
        assert!(adapter.local().load().is_empty());
    }

    #[tokio::test]
    async fn test_not_authenticated_is_distinct_from_unavailable() {
        let (adapter, table) = remote_adapter(true);
        table.set_fail_writes(true);
        assert!(matches!(
            adapter.delete(1).await,
            Err(AdapterError::BackendUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_read_time_is_normalized() {
        let (adapter, _) = remote_adapter(true);
        let remote = adapter
            .add(&PostDraft::new("Remota", "x").with_read_time("3 min de leitura"))
            .await
            .unwrap();
        let local = post_from_local(adapter.local().load().remove(0));

        assert_eq!(remote.read_time, "3 min de leitura");
        assert_eq!(local.read_time, "");
        assert_eq!(
            adapter.get_by_id(remote.id).await.unwrap().read_time,
            "3 min de leitura"
        );
    }

    #[tokio::test]
    async fn test_local_crud_and_import_validation() {
        let adapter = BlogAdapter::new(LocalStore::new(Box::new(MemoryStorage::new())), editor());

        let post = adapter.add(&PostDraft::new("Dica 1", "a")).await.unwrap();
        assert_eq!(post.slug, "dica-1");

        let updated = adapter
            .update(post.id, &PostPatch::default().published(true))
            .await
            .unwrap()
            .unwrap();
        assert!(updated.published);
        assert!(adapter.update(999, &PostPatch::default()).await.unwrap().is_none());

        assert!(matches!(
            adapter.import(r#"{"not": "an array"}"#).await,
            Err(AdapterError::Validation(_))
        ));
        assert_eq!(adapter.load().await.len(), 1);

        assert!(adapter.delete(post.id).await.unwrap());
        assert!(!adapter.delete(post.id).await.unwrap());
    }
}
