use std::sync::Once;

use pretty_assertions::assert_eq;
use sync_core::{analyze_errors, categorize, sanitize_error, ErrorCategory};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(sync_logging::initialize_for_tests);
}

#[test]
fn categorizes_by_priority_order() {
    init_logging();
    let cases = [
        ("401 Unauthorized", ErrorCategory::AuthError),
        ("Session expired. Re-authentication required.", ErrorCategory::AuthError),
        ("ECONNREFUSED 10.0.0.1:443", ErrorCategory::NetworkError),
        ("HTTP 429", ErrorCategory::RateLimit),
        ("request throttled", ErrorCategory::RateLimit),
        ("ETIMEDOUT", ErrorCategory::Timeout),
        ("operation was aborted", ErrorCategory::Timeout),
        ("Unexpected token < in JSON", ErrorCategory::ParseError),
        ("duplicate key value violates unique constraint", ErrorCategory::SaveError),
        ("random gibberish", ErrorCategory::Unknown),
    ];
    for (message, expected) in cases {
        assert_eq!(categorize(message), expected, "message: {message}");
    }
}

#[test]
fn only_transient_categories_are_recoverable() {
    let recoverable: Vec<_> = [
        ErrorCategory::AuthError,
        ErrorCategory::NetworkError,
        ErrorCategory::ParseError,
        ErrorCategory::SaveError,
        ErrorCategory::RateLimit,
        ErrorCategory::Timeout,
        ErrorCategory::Unknown,
    ]
    .into_iter()
    .filter(|c| c.is_recoverable())
    .collect();

    assert_eq!(
        recoverable,
        vec![
            ErrorCategory::NetworkError,
            ErrorCategory::RateLimit,
            ErrorCategory::Timeout
        ]
    );
}

#[test]
fn batch_summary_picks_most_frequent_category() {
    let summary = analyze_errors(["timeout", "timeout", "network error"]);

    assert_eq!(summary.dominant_category, ErrorCategory::Timeout);
    assert_eq!(summary.total_errors, 3);
    assert_eq!(summary.count(ErrorCategory::Timeout), 2);
    assert_eq!(summary.count(ErrorCategory::NetworkError), 1);
    assert!(summary.is_recoverable);
    assert_eq!(
        summary.recommended_action,
        "Request timed out. Check connection and try again."
    );
}

#[test]
fn batch_tie_goes_to_first_seen() {
    let summary = analyze_errors(vec![
        "database unavailable".to_string(),
        "login rejected".to_string(),
        "login rejected".to_string(),
        "insert failed".to_string(),
    ]);
    assert_eq!(summary.dominant_category, ErrorCategory::SaveError);
    assert!(!summary.is_recoverable);
}

#[test]
fn empty_batch_is_unknown() {
    let summary = analyze_errors(Vec::<&str>::new());
    assert_eq!(summary.dominant_category, ErrorCategory::Unknown);
    assert_eq!(summary.total_errors, 0);
    assert!(summary.stats.is_empty());
    assert!(!summary.is_recoverable);
}

#[test]
fn sanitizer_redacts_urls_and_secrets() {
    let out = sanitize_error("Login at https://x.com/y failed, password=secret");
    assert!(!out.contains("https://x.com/y"));
    assert!(!out.contains("secret"));
    assert!(out.contains("[URL]"));
    assert!(out.contains("[REDACTED]"));
}

#[test]
fn sanitizer_redacts_query_credentials_inside_urls() {
    let out = sanitize_error("GET http://site/login?username=kim&password=pw failed");
    assert_eq!(out, "GET [URL] failed");
}

#[test]
fn sanitizer_handles_colon_forms_case_insensitively() {
    let out = sanitize_error("Username: kim Password: hunter2 Email=k@x.io");
    assert!(!out.contains("kim"));
    assert!(!out.contains("hunter2"));
    assert!(!out.contains("k@x.io"));
}

#[test]
fn sanitizer_truncates_long_messages() {
    let out = sanitize_error(&"A".repeat(300));
    assert!(out.len() <= 203);
    assert!(out.ends_with("..."));
}

#[test]
fn every_category_has_description_and_action() {
    let table = [
        (
            ErrorCategory::AuthError,
            "Authentication failed - check credentials",
            "Check your external site credentials in settings",
        ),
        (
            ErrorCategory::NetworkError,
            "Network error - check internet connection",
            "Check your internet connection and try again",
        ),
        (
            ErrorCategory::ParseError,
            "Failed to parse data - site may have changed",
            "The external site may have changed. Contact support.",
        ),
        (
            ErrorCategory::SaveError,
            "Failed to save to database",
            "Database error. Try again or contact support.",
        ),
        (
            ErrorCategory::RateLimit,
            "Rate limited - too many requests",
            "Too many requests. Wait a few minutes and try again.",
        ),
        (
            ErrorCategory::Timeout,
            "Request timed out",
            "Request timed out. Check connection and try again.",
        ),
        (
            ErrorCategory::Unknown,
            "Unknown error occurred",
            "An unexpected error occurred. Try again or contact support.",
        ),
    ];
    for (category, description, action) in table {
        assert_eq!(category.describe(), description, "category: {category}");
        assert_eq!(category.recommended_action(), action, "category: {category}");
    }
}

#[test]
fn batch_summary_serializes_stats_as_a_map() {
    let summary = analyze_errors(["timeout", "timeout", "network error"]);
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(
        json["stats"],
        serde_json::json!({ "timeout": 2, "network_error": 1 })
    );
    assert_eq!(json["dominant_category"], serde_json::json!("timeout"));
    assert_eq!(json["total_errors"], serde_json::json!(3));
}
