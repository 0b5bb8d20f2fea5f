//! Slug allocation
//!
//! Both stores derive slugs with the same pure functions so that a title
//! maps to the same slug regardless of backend.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Maximum length of a base slug (before any `-N` suffix)
pub const MAX_SLUG_LEN: usize = 60;

/// Used when a title has no alphanumeric characters at all
const EMPTY_SLUG: &str = "post";

/// Turn a title into a URL-safe base slug
///
/// Lower-cases, strips diacritics, drops anything that is not `a-z`, `0-9`,
/// whitespace or `-`, turns whitespace runs into single hyphens, collapses
/// repeated hyphens and trims them from both ends, then truncates to
/// [`MAX_SLUG_LEN`].
pub fn slugify(title: &str) -> String {
    let folded: String = title
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();

    let mut slug = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c == '-' && (slug.is_empty() || slug.ends_with('-')) {
            continue;
        }
        slug.push(c);
    }

    // Every remaining char is ASCII, so byte truncation is char truncation.
    slug.truncate(MAX_SLUG_LEN);
    let slug = slug.trim_end_matches('-');

    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// The `n`-th candidate for a base slug: `base`, `base-1`, `base-2`, ...
pub fn candidate(base: &str, n: usize) -> String {
    if n == 0 {
        base.to_string()
    } else {
        format!("{}-{}", base, n)
    }
}

/// Allocate a unique slug for `title`
///
/// `existing` yields `(id, slug)` pairs for every post in the store. The
/// post identified by `exclude_id` is ignored, so renaming a post never
/// collides with its own current slug.
pub fn allocate<'a, I>(title: &str, existing: I, exclude_id: Option<i64>) -> String
where
    I: IntoIterator<Item = (i64, &'a str)>,
{
    let taken: Vec<&str> = existing
        .into_iter()
        .filter(|(id, _)| Some(*id) != exclude_id)
        .map(|(_, slug)| slug)
        .collect();

    let base = slugify(title);
    let mut n = 0;
    loop {
        let slug = candidate(&base, n);
        if !taken.contains(&slug.as_str()) {
            return slug;
        }
        n += 1;
    }
}
