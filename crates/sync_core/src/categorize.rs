use std::fmt;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    AuthError,
    NetworkError,
    ParseError,
    SaveError,
    RateLimit,
    Timeout,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthError => "auth_error",
            Self::NetworkError => "network_error",
            Self::ParseError => "parse_error",
            Self::SaveError => "save_error",
            Self::RateLimit => "rate_limit",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }

    /// Short text suitable for showing to an operator.
    pub fn describe(self) -> &'static str {
        match self {
            Self::AuthError => "Authentication failed - check credentials",
            Self::NetworkError => "Network error - check internet connection",
            Self::ParseError => "Failed to parse data - site may have changed",
            Self::SaveError => "Failed to save to database",
            Self::RateLimit => "Rate limited - too many requests",
            Self::Timeout => "Request timed out",
            Self::Unknown => "Unknown error occurred",
        }
    }

    pub fn recommended_action(self) -> &'static str {
        match self {
            Self::AuthError => "Check your external site credentials in settings",
            Self::NetworkError => "Check your internet connection and try again",
            Self::ParseError => "The external site may have changed. Contact support.",
            Self::SaveError => "Database error. Try again or contact support.",
            Self::RateLimit => "Too many requests. Wait a few minutes and try again.",
            Self::Timeout => "Request timed out. Check connection and try again.",
            Self::Unknown => "An unexpected error occurred. Try again or contact support.",
        }
    }

    /// Whether an automatic retry is worthwhile. Retry policy itself lives
    /// with the caller.
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::NetworkError | Self::RateLimit | Self::Timeout)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Rule {
    pattern: Regex,
    category: ErrorCategory,
}

// Priority order: auth, network, rate limit, timeout, parse, save.
const RULES: &[(ErrorCategory, &[&str])] = &[
    (
        ErrorCategory::AuthError,
        &[
            "auth",
            "login",
            "credential",
            "unauthorized",
            "401",
            "403",
            r"session\s*expired",
            r"invalid\s*token",
        ],
    ),
    (
        ErrorCategory::NetworkError,
        &[
            "fetch",
            "network",
            "ECONNREFUSED",
            "ENOTFOUND",
            r"failed\s*to\s*fetch",
            r"connection\s*refused",
            "DNS",
            "socket",
        ],
    ),
    (
        ErrorCategory::RateLimit,
        &[r"rate\s*limit", "429", r"too\s*many\s*requests", "throttl"],
    ),
    (
        ErrorCategory::Timeout,
        &["timeout", "ETIMEDOUT", r"timed\s*out", "aborted"],
    ),
    (
        ErrorCategory::ParseError,
        &[
            "parse",
            "JSON",
            r"unexpected\s*token",
            r"invalid\s*HTML",
            "selector",
            r"element\s*not\s*found",
        ],
    ),
    (
        ErrorCategory::SaveError,
        &[
            "supabase",
            "database",
            r"duplicate\s*key",
            "constraint",
            "insert",
            "update",
            "PGRST",
            "PostgreSQL",
        ],
    ),
];

static COMPILED: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    RULES
        .iter()
        .flat_map(|(category, patterns)| {
            patterns.iter().map(move |pattern| Rule {
                pattern: RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .expect("category pattern is valid"),
                category: *category,
            })
        })
        .collect()
});

/// Classifies an error message by the first matching rule.
pub fn categorize(message: &str) -> ErrorCategory {
    COMPILED
        .iter()
        .find(|rule| rule.pattern.is_match(message))
        .map_or(ErrorCategory::Unknown, |rule| rule.category)
}

/// Aggregate view of the failures of one batch sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncBatchSummary {
    /// Count per category, in order of first appearance. Serialized as a
    /// `{category: count}` map.
    #[serde(serialize_with = "stats_as_map")]
    pub stats: Vec<(ErrorCategory, usize)>,
    pub dominant_category: ErrorCategory,
    pub total_errors: usize,
    pub is_recoverable: bool,
    pub recommended_action: &'static str,
}

impl SyncBatchSummary {
    pub fn count(&self, category: ErrorCategory) -> usize {
        self.stats
            .iter()
            .find(|(c, _)| *c == category)
            .map_or(0, |(_, n)| *n)
    }
}

fn stats_as_map<S: Serializer>(
    stats: &[(ErrorCategory, usize)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(stats.iter().map(|(category, count)| (category, count)))
}

/// Tallies categories over a batch and picks the dominant one.
///
/// Ties go to the category seen first. An empty batch is dominated by
/// [`ErrorCategory::Unknown`].
pub fn analyze_errors<I, S>(errors: I) -> SyncBatchSummary
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut stats: Vec<(ErrorCategory, usize)> = Vec::new();
    let mut total_errors = 0;
    for error in errors {
        total_errors += 1;
        let category = categorize(error.as_ref());
        match stats.iter_mut().find(|(c, _)| *c == category) {
            Some(entry) => entry.1 += 1,
            None => stats.push((category, 1)),
        }
    }

    let mut dominant_category = ErrorCategory::Unknown;
    let mut max_count = 0;
    for (category, count) in &stats {
        if *count > max_count {
            max_count = *count;
            dominant_category = *category;
        }
    }

    SyncBatchSummary {
        stats,
        dominant_category,
        total_errors,
        is_recoverable: dominant_category.is_recoverable(),
        recommended_action: dominant_category.recommended_action(),
    }
}
