use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Column names of the remote post table
pub mod columns {
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const SLUG: &str = "slug";
    pub const EXCERPT: &str = "excerpt";
    pub const CONTENT: &str = "content";
    pub const CATEGORY: &str = "category";
    pub const DATE: &str = "date";
    pub const PUBLISHED: &str = "published";
}

/// A row of the remote post table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteRow {
    pub id: i64,
    pub title: String,
    pub slug: String,
    #[serde(default, deserialize_with = "nullable")]
    pub excerpt: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub category: String,
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "nullable")]
    pub author: String,
    #[serde(default, deserialize_with = "nullable")]
    pub read_time: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Column values for a new row; the table assigns `id` and timestamps
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteInsert {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub image: Option<String>,
    pub category: String,
    pub date: NaiveDate,
    pub author: String,
    pub read_time: String,
    pub published: bool,
}

/// Columns to change on existing rows. Unset fields are not sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RemoteInsert {
    /// Materialize the row the table would store for this insert
    pub fn into_row(self, id: i64, now: DateTime<Utc>) -> RemoteRow {
        RemoteRow {
            id,
            title: self.title,
            slug: self.slug,
            excerpt: self.excerpt,
            content: self.content,
            image: self.image,
            category: self.category,
            date: self.date,
            author: self.author,
            read_time: self.read_time,
            published: self.published,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

impl RemotePatch {
    /// Apply the set fields to a row
    pub fn apply(&self, row: &mut RemoteRow) {
        if let Some(v) = &self.title {
            row.title = v.clone();
        }
        if let Some(v) = &self.slug {
            row.slug = v.clone();
        }
        if let Some(v) = &self.excerpt {
            row.excerpt = v.clone();
        }
        if let Some(v) = &self.content {
            row.content = v.clone();
        }
        if let Some(v) = &self.image {
            row.image = v.clone();
        }
        if let Some(v) = &self.category {
            row.category = v.clone();
        }
        if let Some(v) = self.date {
            row.date = v;
        }
        if let Some(v) = &self.author {
            row.author = v.clone();
        }
        if let Some(v) = &self.read_time {
            row.read_time = v.clone();
        }
        if let Some(v) = self.published {
            row.published = v;
        }
        if let Some(v) = self.updated_at {
            row.updated_at = Some(v);
        }
    }
}

fn nullable<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
