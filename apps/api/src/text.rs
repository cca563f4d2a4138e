//! Small text helpers shared by prompt building and document extraction.

/// Collapses every run of whitespace (including newlines) into one space and trims.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncates to at most `max_chars` characters, never splitting a character.
/// Returns the text and whether anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a\n\n b\t c  "), "a b c");
        assert_eq!(collapse_whitespace("\n\t "), "");
    }

    #[test]
    fn test_truncate_short_text_is_untouched() {
        assert_eq!(truncate_chars("abc", 10), ("abc", false));
        assert_eq!(truncate_chars("abc", 3), ("abc", false));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let (cut, truncated) = truncate_chars("héllo wörld", 4);
        assert_eq!(cut, "héll");
        assert!(truncated);
    }
}
