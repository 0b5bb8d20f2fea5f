//! Data models for Folio
//!
//! Defines the canonical post shape used by callers, plus the input types
//! for creating and editing posts. Each backend keeps its own record type
//! (see `local::LocalRecord` and `remote::RemoteRow`); the `mapping` module
//! converts between those and the types here.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Category label meaning "every category" when filtering
pub const ALL_CATEGORIES: &str = "Todos";

/// A post as seen by callers of the adapter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Store-assigned identifier, never reused within a store
    pub id: i64,
    pub title: String,
    /// URL-safe identifier, unique within a store
    pub slug: String,
    pub excerpt: String,
    /// Rich text (HTML) body
    pub content: String,
    /// Image URI, empty when the post has none
    pub image: String,
    pub category: String,
    /// Calendar date set at creation
    pub date: NaiveDate,
    pub author: String,
    /// Display string such as "3 min de leitura", stored verbatim
    pub read_time: String,
    pub published: bool,
}

/// Fields supplied when creating a post
///
/// The store assigns `id` and `slug`. `date` defaults to today when unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub image: String,
    pub category: String,
    pub author: String,
    pub read_time: String,
    pub published: bool,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl PostDraft {
    /// Create a draft with a title and body
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_read_time(mut self, read_time: impl Into<String>) -> Self {
        self.read_time = read_time.into();
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Mark the draft as published
    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }
}

/// Partial update for an existing post
///
/// Unset fields are left untouched. The slug is never set directly; it is
/// reallocated when `title` changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PostPatch {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub author: Option<String>,
    pub read_time: Option<String>,
    pub published: Option<bool>,
}

impl PostPatch {
    /// True when the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }
}

/// Post counts for a store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostStats {
    pub total: usize,
    pub published: usize,
    pub drafts: usize,
    pub categories: BTreeMap<String, usize>,
}

/// Sort posts by date, newest first
///
/// The sort is stable, so posts sharing a date keep their relative order.
pub fn sort_newest_first<T>(items: &mut [T], date_of: impl Fn(&T) -> NaiveDate) {
    items.sort_by(|a, b| date_of(b).cmp(&date_of(a)));
}
