use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::error::{RemoteError, RemoteResult};
use super::row::{RemoteInsert, RemotePatch, RemoteRow};
use super::table::{Filter, Query, RemoteTable};

#[derive(Default)]
struct TableState {
    rows: Vec<RemoteRow>,
    next_id: i64,
    /// Slug a concurrent writer will claim right before the next write
    racing_slug: Option<String>,
}

/// In-process post table
///
/// Behaves like the hosted table: ids increase and are never reused, and a
/// duplicate slug is rejected with [`RemoteError::Conflict`]. Faults and
/// concurrent writers can be simulated for tests.
#[derive(Default)]
pub struct MemoryTable {
    state: Mutex<TableState>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    contended: AtomicBool,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent select fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent insert, update and delete fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Have another writer insert a row with `slug` just before the next
    /// insert or update lands, after any existence check has already passed
    pub fn race_next_write(&self, slug: impl Into<String>) {
        self.state().racing_slug = Some(slug.into());
    }

    /// Reject every slug-carrying write with a conflict while set, as if
    /// another writer always claimed the slug first. Nothing is written.
    pub fn set_contended(&self, contended: bool) {
        self.contended.store(contended, Ordering::SeqCst);
    }

    /// Snapshot of every row, in insertion order
    pub fn rows(&self) -> Vec<RemoteRow> {
        self.state().rows.clone()
    }

    fn state(&self) -> MutexGuard<'_, TableState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(flag: &AtomicBool, operation: &str) -> RemoteResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport(format!(
                "simulated {} failure",
                operation
            )));
        }
        Ok(())
    }
}

impl TableState {
    fn insert(&mut self, row: RemoteInsert) -> RemoteResult<RemoteRow> {
        if self.rows.iter().any(|r| r.slug == row.slug) {
            return Err(RemoteError::Conflict { slug: row.slug });
        }
        self.next_id += 1;
        let row = row.into_row(self.next_id, Utc::now());
        self.rows.push(row.clone());
        Ok(row)
    }
}

fn to_json(row: &RemoteRow) -> RemoteResult<Value> {
    Ok(serde_json::to_value(row)?)
}

fn matches_all(row: &RemoteRow, filters: &[Filter]) -> RemoteResult<bool> {
    let json = to_json(row)?;
    Ok(filters.iter().all(|f| f.matches(&json)))
}

fn compare(a: &Value, b: &Value) -> CmpOrdering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => CmpOrdering::Equal,
    }
}

#[async_trait]
impl RemoteTable for MemoryTable {
    async fn select(&self, query: &Query) -> RemoteResult<Vec<RemoteRow>> {
        Self::check(&self.fail_reads, "read")?;
        let state = self.state();

        let mut selected = Vec::new();
        for row in &state.rows {
            if matches_all(row, &query.filters)? {
                selected.push((to_json(row)?, row.clone()));
            }
        }

        if let Some(order) = &query.order {
            selected.sort_by(|(a, _), (b, _)| {
                let ord = compare(&a[order.column], &b[order.column]);
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        let rows = selected.into_iter().map(|(_, row)| row);
        Ok(match query.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        })
    }

    async fn insert(&self, row: &RemoteInsert) -> RemoteResult<RemoteRow> {
        Self::check(&self.fail_writes, "write")?;
        if self.contended.load(Ordering::SeqCst) {
            return Err(RemoteError::Conflict {
                slug: row.slug.clone(),
            });
        }
        let mut state = self.state();

        if let Some(slug) = state.racing_slug.take() {
            let mut rival = row.clone();
            rival.slug = slug;
            state.insert(rival)?;
        }
        state.insert(row.clone())
    }

    async fn update(&self, filters: &[Filter], patch: &RemotePatch) -> RemoteResult<Vec<RemoteRow>> {
        Self::check(&self.fail_writes, "write")?;
        let mut state = self.state();

        let mut targets = Vec::new();
        for (index, row) in state.rows.iter().enumerate() {
            if matches_all(row, filters)? {
                targets.push(index);
            }
        }

        if let Some(slug) = &patch.slug {
            if self.contended.load(Ordering::SeqCst) {
                return Err(RemoteError::Conflict { slug: slug.clone() });
            }
            if let Some(rival_slug) = state.racing_slug.take() {
                if let Some(&index) = targets.first() {
                    let mut rival = state.rows[index].clone();
                    rival.slug = rival_slug;
                    state.next_id += 1;
                    rival.id = state.next_id;
                    state.rows.push(rival);
                }
            }
            let taken = state
                .rows
                .iter()
                .enumerate()
                .any(|(index, row)| &row.slug == slug && !targets.contains(&index));
            if taken || targets.len() > 1 {
                return Err(RemoteError::Conflict { slug: slug.clone() });
            }
        }

        let now = Utc::now();
        let mut updated = Vec::with_capacity(targets.len());
        for index in targets {
            let row = &mut state.rows[index];
            patch.apply(row);
            row.updated_at = Some(patch.updated_at.unwrap_or(now));
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, filters: &[Filter]) -> RemoteResult<u64> {
        Self::check(&self.fail_writes, "write")?;
        let mut state = self.state();

        let mut kept = Vec::with_capacity(state.rows.len());
        let mut removed = 0;
        for row in state.rows.drain(..) {
            if matches_all(&row, filters)? {
                removed += 1;
            } else {
                kept.push(row);
            }
        }
        state.rows = kept;
        Ok(removed)
    }

    fn describe(&self) -> String {
        "in-memory table".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::row::columns;
    use chrono::NaiveDate;

    fn insert(title: &str, slug: &str, date: &str) -> RemoteInsert {
        RemoteInsert {
            title: title.to_string(),
            slug: slug.to_string(),
            excerpt: String::new(),
            content: "c".to_string(),
            image: None,
            category: "Geral".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            author: String::new(),
            read_time: String::new(),
            published: true,
        }
    }

    #[tokio::test]
    async fn test_ids_increase_and_are_not_reused() {
        let table = MemoryTable::new();
        let a = table.insert(&insert("A", "a", "2024-01-01")).await.unwrap();
        let b = table.insert(&insert("B", "b", "2024-01-01")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        table.delete(&[Filter::eq(columns::ID, b.id)]).await.unwrap();
        let c = table.insert(&insert("C", "c", "2024-01-01")).await.unwrap();
        assert_eq!(c.id, 3);
    }

    #[tokio::test]
    async fn test_duplicate_slug_conflicts() {
        let table = MemoryTable::new();
        table.insert(&insert("A", "a", "2024-01-01")).await.unwrap();

        let err = table.insert(&insert("A", "a", "2024-01-01")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Conflict { .. }));
        assert_eq!(table.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_select_orders_and_limits() {
        let table = MemoryTable::new();
        table.insert(&insert("Old", "old", "2023-01-01")).await.unwrap();
        table.insert(&insert("New", "new", "2024-01-01")).await.unwrap();

        let rows = table
            .select(&Query::new().order_desc(columns::DATE))
            .await
            .unwrap();
        assert_eq!(rows[0].title, "New");

        let rows = table
            .select(&Query::new().filter(Filter::eq(columns::SLUG, "old")).limit(1))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Old");
    }

    #[tokio::test]
    async fn test_update_rejects_taken_slug() {
        let table = MemoryTable::new();
        let a = table.insert(&insert("A", "a", "2024-01-01")).await.unwrap();
        table.insert(&insert("B", "b", "2024-01-01")).await.unwrap();

        let patch = RemotePatch {
            slug: Some("b".to_string()),
            ..RemotePatch::default()
        };
        let err = table
            .update(&[Filter::eq(columns::ID, a.id)], &patch)
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Conflict { .. }));

        // Writing a row's own slug back is fine
        let patch = RemotePatch {
            slug: Some("a".to_string()),
            title: Some("A2".to_string()),
            ..RemotePatch::default()
        };
        let rows = table
            .update(&[Filter::eq(columns::ID, a.id)], &patch)
            .await
            .unwrap();
        assert_eq!(rows[0].title, "A2");
    }

    #[tokio::test]
    async fn test_race_claims_slug_first() {
        let table = MemoryTable::new();
        table.race_next_write("a");

        let err = table.insert(&insert("A", "a", "2024-01-01")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Conflict { .. }));
        assert_eq!(table.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_simulated_faults() {
        let table = MemoryTable::new();
        table.set_fail_reads(true);
        assert!(table.select(&Query::new()).await.is_err());

        table.set_fail_writes(true);
        assert!(table.insert(&insert("A", "a", "2024-01-01")).await.is_err());
        assert!(table.delete(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_contended_table_rejects_slug_writes() {
        let table = MemoryTable::new();
        let a = table.insert(&insert("A", "a", "2024-01-01")).await.unwrap();
        table.set_contended(true);

        let err = table.insert(&insert("B", "b", "2024-01-01")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Conflict { .. }));

        let rename = RemotePatch {
            slug: Some("a-2".to_string()),
            ..RemotePatch::default()
        };
        assert!(table
            .update(&[Filter::eq(columns::ID, a.id)], &rename)
            .await
            .is_err());

        // Writes that leave the slug alone still land
        let unpublish = RemotePatch {
            published: Some(false),
            ..RemotePatch::default()
        };
        let rows = table
            .update(&[Filter::eq(columns::ID, a.id)], &unpublish)
            .await
            .unwrap();
        assert!(!rows[0].published);
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.rows()[0].slug, "a");
    }
}
