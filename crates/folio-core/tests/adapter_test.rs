use std::sync::Arc;

use folio_core::{
    AdapterError, BlogAdapter, Caller, LocalStore, MemoryStorage, MemoryTable, PostDraft,
    PostPatch, RemoteStore, SqliteStorage, StaticIdentity,
};

fn signed_in() -> Box<StaticIdentity> {
    Box::new(StaticIdentity::signed_in(Caller::new("editor")))
}

fn local_adapter() -> BlogAdapter {
    BlogAdapter::new(LocalStore::new(Box::new(MemoryStorage::new())), signed_in())
}

fn remote_adapter(fallback: bool) -> (BlogAdapter, Arc<MemoryTable>) {
    let table = Arc::new(MemoryTable::new());
    let local = LocalStore::new(Box::new(MemoryStorage::new()));
    local
        .try_add(&PostDraft::new("Guardado localmente", "c").published())
        .unwrap();
    let adapter = BlogAdapter::new(local, signed_in())
        .with_remote(RemoteStore::new(table.clone()), true)
        .with_fallback(fallback);
    (adapter, table)
}

#[tokio::test]
async fn test_same_title_twice_gets_suffix() {
    for adapter in [local_adapter(), remote_adapter(true).0] {
        let first = adapter.add(&PostDraft::new("Dica 1", "a")).await.unwrap();
        let second = adapter.add(&PostDraft::new("Dica 1", "b")).await.unwrap();

        assert_eq!(first.slug, "dica-1");
        assert_eq!(second.slug, "dica-1-1");
    }
}

#[tokio::test]
async fn test_rename_collides_only_with_other_posts() {
    for adapter in [local_adapter(), remote_adapter(true).0] {
        let a = adapter.add(&PostDraft::new("Clareamento", "a")).await.unwrap();
        adapter.add(&PostDraft::new("Implantes", "b")).await.unwrap();

        let renamed = adapter
            .update(a.id, &PostPatch::default().title("Implantes"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.slug, "implantes-1");

        let unchanged = adapter
            .update(a.id, &PostPatch::default().title("Implantes"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.slug, "implantes-1");
    }
}

#[tokio::test]
async fn test_fallback_serves_local_data() {
    let (adapter, table) = remote_adapter(true);
    table.set_fail_reads(true);

    let posts = adapter.load_published().await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Guardado localmente");
    assert_eq!(adapter.search("guardado").await.len(), 1);
}

#[tokio::test]
async fn test_without_fallback_reads_are_empty() {
    let (adapter, table) = remote_adapter(false);
    table.set_fail_reads(true);

    assert!(adapter.load_published().await.is_empty());
    assert!(adapter.load_by_category("Todos").await.is_empty());
    assert_eq!(adapter.stats().await.total, 0);
}

#[tokio::test]
async fn test_anonymous_caller_cannot_write() {
    let table = Arc::new(MemoryTable::new());
    let adapter = BlogAdapter::new(
        LocalStore::new(Box::new(MemoryStorage::new())),
        Box::new(StaticIdentity::anonymous()),
    )
    .with_remote(RemoteStore::new(table.clone()), true);

    let err = adapter.add(&PostDraft::new("X", "x")).await.unwrap_err();
    assert!(matches!(err, AdapterError::NotAuthenticated));
    assert!(table.rows().is_empty());
}

#[tokio::test]
async fn test_export_import_roundtrip() {
    let source = local_adapter();
    source.add(&PostDraft::new("Um", "primeiro").published()).await.unwrap();
    source.add(&PostDraft::new("Dois", "segundo")).await.unwrap();
    let exported = source.export().await;

    let target = BlogAdapter::new(
        LocalStore::new(Box::new(SqliteStorage::open_in_memory().unwrap())),
        signed_in(),
    );
    assert_eq!(target.import(&exported).await.unwrap(), 2);

    let mut before = source.load().await;
    let mut after = target.load().await;
    before.sort_by_key(|p| p.id);
    after.sort_by_key(|p| p.id);
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_import_rejects_non_array() {
    let adapter = local_adapter();
    let err = adapter.import(r#"{"posts": []}"#).await.unwrap_err();
    assert!(matches!(err, AdapterError::Validation(_)));
}
