use std::sync::LazyLock;

use regex::Regex;

const MAX_CHARS: usize = 200;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("url regex is valid"));

// URLs go first: a redacted URL can no longer leak its own query parameters.
static SECRETS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)password[=:]\s*\S+", "password=[REDACTED]"),
        (r"(?i)username[=:]\s*\S+", "username=[REDACTED]"),
        (r"(?i)email[=:]\s*\S+", "email=[REDACTED]"),
    ]
    .into_iter()
    .map(|(pattern, marker)| (Regex::new(pattern).expect("secret regex is valid"), marker))
    .collect()
});

/// Redacts URLs and credentials and caps the length of an error message.
pub fn sanitize_error(message: &str) -> String {
    if message.is_empty() {
        return "Unknown error".to_string();
    }

    let mut sanitized = URL.replace_all(message, "[URL]").into_owned();
    for (pattern, marker) in SECRETS.iter() {
        sanitized = pattern.replace_all(&sanitized, *marker).into_owned();
    }

    match sanitized.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => format!("{}...", &sanitized[..cut]),
        None => sanitized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_message_gets_placeholder() {
        assert_eq!(sanitize_error(""), "Unknown error");
    }

    #[test]
    fn exactly_max_chars_is_untouched() {
        let msg = "b".repeat(MAX_CHARS);
        assert_eq!(sanitize_error(&msg), msg);
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let msg = "é".repeat(250);
        let out = sanitize_error(&msg);
        assert_eq!(out.chars().count(), MAX_CHARS + 3);
        assert!(out.ends_with("..."));
    }
}
