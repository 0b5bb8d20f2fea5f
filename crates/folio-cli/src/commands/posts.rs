//! Post command handlers

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;

use folio_core::reading_time;
use folio_core::{BlogAdapter, Post, PostDraft, PostPatch};

use crate::output::Output;
use crate::prompt::ask;

/// Fields collected by `folio add`
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub image: String,
    pub category: String,
    pub author: String,
    pub read_time: Option<String>,
    pub date: Option<NaiveDate>,
    pub publish: bool,
}

impl NewPost {
    fn into_draft(self) -> PostDraft {
        let read_time = self
            .read_time
            .unwrap_or_else(|| reading_time::estimate(&self.content));

        let mut draft = PostDraft::new(self.title, self.content)
            .with_excerpt(self.excerpt)
            .with_image(self.image)
            .with_category(self.category)
            .with_author(self.author)
            .with_read_time(read_time);
        if let Some(date) = self.date {
            draft = draft.with_date(date);
        }
        if self.publish {
            draft = draft.published();
        }
        draft
    }
}

/// Fields collected by `folio update`
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub read_time: Option<String>,
    pub date: Option<NaiveDate>,
    pub published: Option<bool>,
}

impl PostChanges {
    /// New content without an explicit read time gets a fresh estimate
    fn into_patch(self) -> PostPatch {
        let read_time = self
            .read_time
            .or_else(|| self.content.as_deref().map(reading_time::estimate));

        PostPatch {
            title: self.title,
            excerpt: self.excerpt,
            content: self.content,
            image: self.image,
            category: self.category,
            date: self.date,
            author: self.author,
            read_time,
            published: self.published,
        }
    }
}

/// List posts
pub async fn list(
    adapter: &BlogAdapter,
    published: bool,
    category: Option<String>,
    output: &Output,
) -> Result<()> {
    let posts = match category {
        Some(category) => adapter.load_by_category(&category).await,
        None if published => adapter.load_published().await,
        None => adapter.load().await,
    };
    output.print_posts(&posts);
    Ok(())
}

/// Show a post by id or slug
pub async fn show(adapter: &BlogAdapter, id_or_slug: &str, output: &Output) -> Result<()> {
    let post = find(adapter, id_or_slug).await?;
    output.print_post(&post);
    Ok(())
}

/// Create a post
pub async fn add(adapter: &BlogAdapter, post: NewPost, output: &Output) -> Result<()> {
    if post.title.trim().is_empty() {
        bail!("Title cannot be empty");
    }

    let post = adapter
        .add(&post.into_draft())
        .await
        .context("Failed to create post")?;

    if output.is_json() {
        output.print_post(&post);
    } else if output.is_quiet() {
        println!("{}", post.id);
    } else {
        output.success(&format!("Created post {} ({})", post.id, post.slug));
    }

    Ok(())
}

/// Update fields of a post
pub async fn update(
    adapter: &BlogAdapter,
    id: i64,
    changes: PostChanges,
    output: &Output,
) -> Result<()> {
    let patch = changes.into_patch();
    if patch.is_empty() {
        bail!("Nothing to update. Pass at least one field, e.g. --title");
    }

    let post = adapter
        .update(id, &patch)
        .await
        .context("Failed to update post")?
        .ok_or_else(|| anyhow!("Post not found: {}", id))?;

    if output.is_json() {
        output.print_post(&post);
    } else {
        output.success(&format!("Updated post {} ({})", post.id, post.slug));
    }

    Ok(())
}

/// Delete a post
pub async fn delete(adapter: &BlogAdapter, id: i64, yes: bool, output: &Output) -> Result<()> {
    let post = adapter
        .get_by_id(id)
        .await
        .ok_or_else(|| anyhow!("Post not found: {}", id))?;

    if !yes && output.should_prompt() {
        output.message(&format!("Delete post: {} - {}", post.id, post.title));
        if !ask("Delete this post?")? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    if !adapter.delete(id).await.context("Failed to delete post")? {
        bail!("Post not found: {}", id);
    }

    output.success(&format!("Deleted post: {}", id));

    Ok(())
}

/// Search published posts
pub async fn search(adapter: &BlogAdapter, term: &str, output: &Output) -> Result<()> {
    let posts = adapter.search(term).await;
    output.print_posts(&posts);
    Ok(())
}

/// Show post counts
pub async fn stats(adapter: &BlogAdapter, output: &Output) -> Result<()> {
    output.print_stats(&adapter.stats().await);
    Ok(())
}

/// Look a post up by numeric id, then by slug
async fn find(adapter: &BlogAdapter, id_or_slug: &str) -> Result<Post> {
    let found = match id_or_slug.parse::<i64>() {
        Ok(id) => adapter.get_by_id(id).await,
        Err(_) => None,
    };
    let found = match found {
        Some(post) => Some(post),
        None => adapter.get_by_slug(id_or_slug).await,
    };
    found.ok_or_else(|| anyhow!("Post not found: {}", id_or_slug))
}
