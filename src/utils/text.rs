//! Small text helpers shared by lookup and validation.

/// Lowercase, trim and collapse internal whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Case-insensitive search for `term` that does not match inside a longer word.
///
/// `"null"` matches `"a null value"` but not `"annulled"`.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();
    let starts_alnum = term.chars().next().is_some_and(char::is_alphanumeric);
    let ends_alnum = term.chars().last().is_some_and(char::is_alphanumeric);

    haystack.match_indices(term.as_str()).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + term.len()..].chars().next();
        let left_ok = !starts_alnum || !before.is_some_and(char::is_alphanumeric);
        let right_ok = !ends_alnum || !after.is_some_and(char::is_alphanumeric);
        left_ok && right_ok
    })
}

/// Filesystem-safe key: alphanumerics, `_` and `-` kept, everything else `_`.
///
/// Empty input maps to `"default"`.
pub fn path_key(raw: &str) -> String {
    let key: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if key.is_empty() {
        "default".to_string()
    } else {
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Mobile   Medical Base "), "mobile medical base");
    }

    #[test]
    fn test_contains_term_word_bounded() {
        assert!(contains_term("a NULL value", "null"));
        assert!(!contains_term("annulled contract", "null"));
        assert!(contains_term("hero [placeholder] pose", "[placeholder]"));
        assert!(contains_term("TODO: fix", "todo"));
        assert!(!contains_term("anything", ""));
    }

    #[test]
    fn test_path_key() {
        assert_eq!(path_key("cat-daniel"), "cat-daniel");
        assert_eq!(path_key("../etc/passwd"), "___etc_passwd");
        assert_eq!(path_key("  "), "default");
    }
}
