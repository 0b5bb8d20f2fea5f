//! Read-time estimation
//!
//! Produces the display string stored in a post's read-time field.

use scraper::Html;

/// Average reading speed for article text
pub const WORDS_PER_MINUTE: usize = 250;

/// Count words in a post body, ignoring HTML tags and punctuation
pub fn word_count(content: &str) -> usize {
    strip_tags(content)
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .count()
}

/// Estimated minutes to read `content`, never less than one
pub fn minutes(content: &str) -> usize {
    word_count(content).div_ceil(WORDS_PER_MINUTE).max(1)
}

/// Display string for the read time of `content`
pub fn estimate(content: &str) -> String {
    format!("{} min de leitura", minutes(content))
}

/// Visible text of an HTML fragment, one space between text nodes
fn strip_tags(content: &str) -> String {
    Html::parse_fragment(content)
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
}
