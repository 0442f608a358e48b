//! Small text helpers shared by the bots.

/// Removes every ASCII case-insensitive occurrence of `token` from `content`
/// and trims the result.
pub(crate) fn strip_token(content: &str, token: &str) -> String {
    if token.is_empty() {
        return content.trim().to_string();
    }

    let lowered = content.to_ascii_lowercase();
    let needle = token.to_ascii_lowercase();
    let mut out = String::with_capacity(content.len());
    let mut rest = 0;
    for (start, _) in lowered.match_indices(&needle) {
        if start < rest {
            continue;
        }
        out.push_str(&content[rest..start]);
        rest = start + needle.len();
    }
    out.push_str(&content[rest..]);
    out.trim().to_string()
}

/// Returns `text` unchanged when it already starts with `header`, otherwise
/// prefixes it with `header` and `separator`.
pub(crate) fn ensure_header(text: &str, header: &str, separator: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with(header) {
        text.to_string()
    } else {
        format!("{header}{separator}{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_token_any_case() {
        assert_eq!(strip_token("@Recipe  lasagna", "@recipe"), "lasagna");
        assert_eq!(strip_token("make @recipe pie @RECIPE", "@recipe"), "make  pie");
        assert_eq!(strip_token("@recipe", "@recipe"), "");
    }

    #[test]
    fn test_strip_token_keeps_unicode() {
        assert_eq!(strip_token("@recipe crème brûlée", "@recipe"), "crème brûlée");
    }

    #[test]
    fn test_ensure_header() {
        assert_eq!(
            ensure_header("  Paris is the capital.", "**GeographyBot Answer:**", "\n- "),
            "**GeographyBot Answer:**\n- Paris is the capital."
        );
        let done = "**GeographyBot Answer:**\n- ok";
        assert_eq!(ensure_header(done, "**GeographyBot Answer:**", "\n- "), done);
    }
}
