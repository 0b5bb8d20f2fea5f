//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use folio_core::{MigrationReport, Post, PostStats};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Check if output is in JSON mode
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to serialize output: {}", e),
        }
    }

    /// Print a single post
    pub fn print_post(&self, post: &Post) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:        {}", post.id);
                println!("Title:     {}", post.title);
                println!("Slug:      {}", post.slug);
                println!("Date:      {}", post.date.format("%Y-%m-%d"));
                if !post.category.is_empty() {
                    println!("Category:  {}", post.category);
                }
                if !post.author.is_empty() {
                    println!("Author:    {}", post.author);
                }
                if !post.read_time.is_empty() {
                    println!("Read time: {}", post.read_time);
                }
                if !post.image.is_empty() {
                    println!("Image:     {}", post.image);
                }
                println!(
                    "Status:    {}",
                    if post.published { "published" } else { "draft" }
                );
                if !post.excerpt.is_empty() {
                    println!();
                    println!("{}", post.excerpt);
                }
                println!();
                println!("{}", post.content);
            }
            OutputFormat::Json => self.json(post),
            OutputFormat::Quiet => println!("{}", post.id),
        }
    }

    /// Print a list of posts
    pub fn print_posts(&self, posts: &[Post]) {
        match self.format {
            OutputFormat::Human => {
                if posts.is_empty() {
                    println!("No posts found.");
                    return;
                }
                for post in posts {
                    let marker = if post.published { " " } else { "*" };
                    println!(
                        "{:>5} {}| {} | {} | {}",
                        post.id,
                        marker,
                        post.date.format("%Y-%m-%d"),
                        truncate(&post.title, 40),
                        truncate(&post.slug, 40)
                    );
                }
                println!("\n{} post(s)", posts.len());
            }
            OutputFormat::Json => self.json(posts),
            OutputFormat::Quiet => {
                for post in posts {
                    println!("{}", post.id);
                }
            }
        }
    }

    /// Print post counts
    pub fn print_stats(&self, stats: &PostStats) {
        match self.format {
            OutputFormat::Human => {
                println!("Total:     {}", stats.total);
                println!("Published: {}", stats.published);
                println!("Drafts:    {}", stats.drafts);
                if !stats.categories.is_empty() {
                    println!();
                    println!("Categories:");
                    for (name, count) in &stats.categories {
                        println!("  {} ({})", name, count);
                    }
                }
            }
            OutputFormat::Json => self.json(stats),
            OutputFormat::Quiet => println!("{}", stats.total),
        }
    }

    /// Print the outcome of a migration
    pub fn print_report(&self, report: &MigrationReport) {
        match self.format {
            OutputFormat::Human => {
                let mark = if report.success { "✓" } else { "!" };
                println!("{} {}", mark, report.message);
                println!();
                println!("  Local posts:    {}", report.local_posts);
                println!("  Migrated:       {}", report.migrated_posts);
                println!("  Already remote: {}", report.skipped_posts);
                if let Some(ref file) = report.backup_file {
                    println!("  Backup:         {}", file);
                }
                if !report.errors.is_empty() {
                    println!();
                    println!("Errors:");
                    for error in &report.errors {
                        println!("  - {}", error);
                    }
                }
            }
            OutputFormat::Json => self.json(report),
            OutputFormat::Quiet => println!("{}", report.migrated_posts),
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        if let Some(line) = self.message_line(msg) {
            println!("{}", line);
        }
    }

    fn message_line(&self, msg: &str) -> Option<String> {
        match self.format {
            OutputFormat::Human => Some(msg.to_string()),
            OutputFormat::Json => Some(serde_json::json!({"message": msg}).to_string()),
            OutputFormat::Quiet => None,
        }
    }
}

/// Truncate a string to max chars, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
