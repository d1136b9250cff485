//! String utilities
//!
//! Helpers for bounding model replies before they reach the logs.

/// Safely truncate a string at a character boundary
///
/// Returns at most `max_chars` characters without splitting a UTF-8 sequence.
///
/// # Example
/// ```
/// use coin_analyzer::utils::truncate_str;
///
/// let text = "Pièce de 2 €";
/// assert_eq!(truncate_str(text, 5), "Pièce");
/// assert_eq!(truncate_str(text, 100), "Pièce de 2 €");
/// ```
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Bounded preview of a reply for log events
///
/// Appends `...` when the text was cut.
pub fn preview(s: &str, max_chars: usize) -> String {
    let truncated = truncate_str(s, max_chars);
    if truncated.len() < s.len() {
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str_ascii() {
        assert_eq!(truncate_str("Half dollar", 4), "Half");
        assert_eq!(truncate_str("Half dollar", 100), "Half dollar");
    }

    #[test]
    fn test_truncate_str_multibyte() {
        let text = "République française";
        assert_eq!(truncate_str(text, 2), "Ré");
        assert_eq!(truncate_str(text, 10), "République");
    }

    #[test]
    fn test_preview_marks_truncation() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("abc", 3), "abc");
        assert_eq!(preview("", 10), "");
    }
}
