//! Text utilities.

use unicode_normalization::UnicodeNormalization;

/// Generate a clean, URL-safe slug from the given text.
///
/// Decomposes the text (NFKD) so accented letters reduce to their ASCII
/// base, drops everything non-ASCII that remains, lowercases, and collapses
/// every run of other characters into a single hyphen. Leading and trailing
/// hyphens are trimmed.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.nfkd() {
        if !c.is_ascii() {
            // Combining marks and symbols with no ASCII form vanish
            // without breaking the word they sat in.
            continue;
        }
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}
