//! Conversions between the backend record shapes and the canonical [`Post`]
//!
//! The local store persists `readTime` and an empty-string image, the remote
//! table uses `read_time` and a nullable image. Every conversion between the
//! two goes through the functions here.

use chrono::NaiveDate;

use crate::local::LocalRecord;
use crate::models::{Post, PostDraft, PostPatch};
use crate::reading_time;
use crate::remote::{RemoteInsert, RemotePatch, RemoteRow};

pub fn post_from_local(record: LocalRecord) -> Post {
    Post {
        id: record.id,
        title: record.title,
        slug: record.slug,
        excerpt: record.excerpt,
        content: record.content,
        image: record.image,
        category: record.category,
        date: record.date,
        author: record.author,
        read_time: record.read_time,
        published: record.published,
    }
}

pub fn post_from_remote(row: RemoteRow) -> Post {
    Post {
        id: row.id,
        title: row.title,
        slug: row.slug,
        excerpt: row.excerpt,
        content: row.content,
        image: row.image.unwrap_or_default(),
        category: row.category,
        date: row.date,
        author: row.author,
        read_time: row.read_time,
        published: row.published,
    }
}

/// Build the local record for a new post
pub fn local_from_draft(draft: &PostDraft, id: i64, slug: String, date: NaiveDate) -> LocalRecord {
    LocalRecord {
        id,
        title: draft.title.clone(),
        slug,
        excerpt: draft.excerpt.clone(),
        content: draft.content.clone(),
        image: draft.image.clone(),
        category: draft.category.clone(),
        date,
        author: draft.author.clone(),
        read_time: draft.read_time.clone(),
        published: draft.published,
    }
}

/// Merge the set fields of a patch into a local record
///
/// The slug is left alone; the store reallocates it when the title changes.
pub fn apply_patch_to_local(record: &mut LocalRecord, patch: &PostPatch) {
    if let Some(v) = &patch.title {
        record.title = v.clone();
    }
    if let Some(v) = &patch.excerpt {
        record.excerpt = v.clone();
    }
    if let Some(v) = &patch.content {
        record.content = v.clone();
    }
    if let Some(v) = &patch.image {
        record.image = v.clone();
    }
    if let Some(v) = &patch.category {
        record.category = v.clone();
    }
    if let Some(v) = patch.date {
        record.date = v;
    }
    if let Some(v) = &patch.author {
        record.author = v.clone();
    }
    if let Some(v) = &patch.read_time {
        record.read_time = v.clone();
    }
    if let Some(v) = patch.published {
        record.published = v;
    }
}

/// Build the insert for a new remote row
pub fn remote_insert_from_draft(draft: &PostDraft, slug: String, date: NaiveDate) -> RemoteInsert {
    RemoteInsert {
        title: draft.title.clone(),
        slug,
        excerpt: draft.excerpt.clone(),
        content: draft.content.clone(),
        image: non_empty(&draft.image),
        category: draft.category.clone(),
        date,
        author: draft.author.clone(),
        read_time: draft.read_time.clone(),
        published: draft.published,
    }
}

/// Build the remote patch for a post edit, with a newly allocated slug if any
pub fn remote_patch_from_patch(patch: &PostPatch, slug: Option<String>) -> RemotePatch {
    RemotePatch {
        title: patch.title.clone(),
        slug,
        excerpt: patch.excerpt.clone(),
        content: patch.content.clone(),
        image: patch.image.as_deref().map(non_empty),
        category: patch.category.clone(),
        date: patch.date,
        author: patch.author.clone(),
        read_time: patch.read_time.clone(),
        published: patch.published,
        updated_at: None,
    }
}

/// Turn a local record into a draft for the remote store
///
/// Keeps the original date. An empty read time is estimated from the content.
pub fn draft_from_local(record: &LocalRecord) -> PostDraft {
    let read_time = if record.read_time.is_empty() {
        reading_time::estimate(&record.content)
    } else {
        record.read_time.clone()
    };

    PostDraft {
        title: record.title.clone(),
        excerpt: record.excerpt.clone(),
        content: record.content.clone(),
        image: record.image.clone(),
        category: record.category.clone(),
        author: record.author.clone(),
        read_time,
        published: record.published,
        date: Some(record.date),
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
