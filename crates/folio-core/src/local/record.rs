use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// A post as persisted by the local store
///
/// Field names follow the local JSON layout (`readTime` in camel case),
/// which differs from the remote table's `read_time`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalRecord {
    pub id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub slug: String,
    #[serde(default, deserialize_with = "nullable")]
    pub excerpt: String,
    pub content: String,
    #[serde(default, deserialize_with = "nullable")]
    pub image: String,
    #[serde(default, deserialize_with = "nullable")]
    pub category: String,
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "nullable")]
    pub author: String,
    #[serde(default, deserialize_with = "nullable")]
    pub read_time: String,
    #[serde(default)]
    pub published: bool,
}

/// Treat an explicit `null` like a missing field
fn nullable<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
