/// Normalize a raw submission into an emoji token.
///
/// Surrounding whitespace is trimmed. Empty tokens, tokens longer than
/// `max_chars` characters, and tokens containing control characters are
/// rejected.
pub fn sanitize_token(raw: &str, max_chars: usize) -> Option<&str> {
    let token = raw.trim();
    if token.is_empty() {
        return None;
    }
    if token.chars().any(char::is_control) {
        return None;
    }
    if token.chars().count() > max_chars {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_whitespace() {
        assert_eq!(sanitize_token("  🎉 ", 5), Some("🎉"));
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert_eq!(sanitize_token("", 5), None);
        assert_eq!(sanitize_token("   \t", 5), None);
    }

    #[test]
    fn rejects_control_characters() {
        assert_eq!(sanitize_token("a\u{7}b", 5), None);
        assert_eq!(sanitize_token("🐱\n🐶", 5), None);
    }

    #[test]
    fn enforces_character_limit() {
        // Two scalar values: the heart and its variation selector.
        assert_eq!(sanitize_token("❤️", 2), Some("❤️"));
        assert_eq!(sanitize_token("❤️", 1), None);
        assert_eq!(sanitize_token("abcdef", 5), None);
    }
}
