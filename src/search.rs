//! Helpers for free-text search parameters.
//!
//! Search terms are always bound as query parameters; the only processing
//! needed is trimming, a length cap, and escaping of `LIKE` wildcards so a
//! user typing `%` or `_` searches for those characters literally.
//!
//! SQLite's `LIKE` folds ASCII case only, so searchable text is also stored
//! in a `*_search` column folded with [`search_key`], and terms are folded
//! the same way before matching.

/// Longest search term honoured; longer input is cut.
pub const MAX_SEARCH_LEN: usize = 100;

/// Trims the term and caps its length. Empty terms mean "no search".
pub fn normalize(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_SEARCH_LEN).collect())
}

/// Unicode lower-case form of `text`, as stored in the `*_search` columns.
pub fn search_key(text: &str) -> String {
    text.to_lowercase()
}

/// Case-insensitive `%term%` pattern, to be matched against a `*_search` column.
pub fn folded_pattern(input: &str) -> Option<String> {
    like_pattern(&search_key(input))
}

/// Builds a `%term%` pattern for use with `LIKE ? ESCAPE '\'`.
pub fn like_pattern(input: &str) -> Option<String> {
    let term = normalize(input)?;
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    Some(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  bike  "), Some("bike".to_string()));
        assert_eq!(normalize("   "), None);
        assert_eq!(normalize(&"x".repeat(500)).map(|s| s.len()), Some(MAX_SEARCH_LEN));
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), Some("%50\\%\\_off%".to_string()));
        assert_eq!(like_pattern("test'; DROP TABLE users; --"), Some("%test'; DROP TABLE users; --%".to_string()));
        assert_eq!(like_pattern(""), None);
    }

    #[test]
    fn test_folded_pattern_lowercases_non_ascii() {
        assert_eq!(search_key("Собор Парижської"), "собор парижської");
        assert_eq!(folded_pattern("  СОБОР "), Some("%собор%".to_string()));
        assert_eq!(folded_pattern("Straße_1"), Some("%straße\\_1%".to_string()));
    }
}
