//! Local store
//!
//! A synchronous, single-writer post collection persisted through an
//! injected [`KeyValueStorage`](crate::storage::KeyValueStorage).
//!
//! ## Layout
//!
//! The whole collection is one JSON array under [`POSTS_KEY`], read and
//! rewritten in full on every operation. A schema marker under
//! [`VERSION_KEY`] is compared with [`SCHEMA_VERSION`] the first time a
//! store instance touches its storage; see [`VersionPolicy`] for what
//! happens on a mismatch.

mod record;
mod store;

use serde::{Deserialize, Serialize};

pub use record::LocalRecord;
pub use store::LocalStore;

/// Current local schema version
pub const SCHEMA_VERSION: &str = "2.1";

/// Key holding the post collection
pub const POSTS_KEY: &str = "blog_posts";

/// Key holding the schema version marker
pub const VERSION_KEY: &str = "blog_version";

/// Key holding the most recent migration backup
pub const BACKUP_KEY: &str = "blog_backup";

/// Key holding the highest id ever assigned, so ids are never reused
pub const LAST_ID_KEY: &str = "blog_last_id";

/// What the local store does when the stored schema marker differs from
/// [`SCHEMA_VERSION`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// Delete the stored collection, then write the new marker
    #[default]
    Discard,
    /// Keep the stored collection and only write the new marker
    Preserve,
}
