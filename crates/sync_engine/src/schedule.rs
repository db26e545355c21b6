//! Schedule pages: appointment links, pagination and the page walker.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};
use sync_core::ErrorCategory;
use sync_logging::{sync_debug, sync_info, sync_warn};
use url::Url;

use crate::{ContentFetcher, FetchError, FetchRequest};

static APPOINTMENT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/schedule/a/([^/?#]+)/(\d+)").expect("appointment path regex is valid")
});

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));

const BOARDING_KEYWORDS: [&str; 4] = ["boarding", "overnight", "nights", "stay"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentLink {
    pub id: String,
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchedulePage {
    pub appointments: Vec<AppointmentLink>,
    pub next_page_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("Failed to fetch schedule: {0}")]
    Status(u16),
    #[error("Session expired. Re-authentication required.")]
    SessionExpired,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ScheduleError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Status(429) => ErrorCategory::RateLimit,
            Self::Status(401 | 403) | Self::SessionExpired => ErrorCategory::AuthError,
            Self::Status(_) => ErrorCategory::NetworkError,
            Self::Fetch(err) => err.category(),
        }
    }
}

/// Extracts appointment links and the next-page link from one page.
pub fn parse_schedule_page(html: &str, base: &Url) -> SchedulePage {
    let document = Html::parse_document(html);
    let mut appointments: Vec<AppointmentLink> = Vec::new();

    for anchor in document.select(&ANCHOR) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        let Some(caps) = APPOINTMENT_PATH.captures(href) else {
            continue;
        };
        let id = caps[1].to_string();
        if appointments.iter().any(|a| a.id == id) {
            continue;
        }
        let Ok(url) = base.join(href) else {
            continue;
        };
        let title = anchor
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ");
        appointments.push(AppointmentLink {
            id,
            url: url.into(),
            title,
        });
    }

    sync_debug!(
        "parsed {} appointment links from {} chars",
        appointments.len(),
        html.len()
    );
    SchedulePage {
        appointments,
        next_page_url: next_link(&document, base),
    }
}

/// Absolute URL of the first `rel="next"` (or `.next`) anchor, if any.
pub fn parse_next_page(html: &str, base: &Url) -> Option<String> {
    next_link(&Html::parse_document(html), base)
}

fn next_link(document: &Html, base: &Url) -> Option<String> {
    document
        .select(&ANCHOR)
        .find(|anchor| is_next_link(anchor.value()))
        .and_then(|anchor| anchor.value().attr("href"))
        .and_then(|href| base.join(href.trim()).ok())
        .map(String::from)
}

fn is_next_link(element: &scraper::node::Element) -> bool {
    let rel_next = element
        .attr("rel")
        .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("next")));
    let class_next = element.attr("class").is_some_and(|c| c.contains("next"));
    rel_next || class_next
}

/// Keeps appointments whose title looks like an overnight stay.
pub fn filter_boarding(links: Vec<AppointmentLink>) -> Vec<AppointmentLink> {
    links
        .into_iter()
        .filter(|link| {
            let title = link.title.to_lowercase();
            BOARDING_KEYWORDS.iter().any(|k| title.contains(k))
        })
        .collect()
}

/// The site answers an expired session with its login form instead of a 401.
pub fn looks_like_login_page(html: &str) -> bool {
    html.contains("login") && html.contains("password")
}

pub fn schedule_path(start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Some(start) = start {
        query.append_pair("start", &start.format("%Y-%m-%d").to_string());
    }
    if let Some(end) = end {
        query.append_pair("end", &end.format("%Y-%m-%d").to_string());
    }
    let query = query.finish();
    if query.is_empty() {
        "/schedule".to_string()
    } else {
        format!("/schedule?{query}")
    }
}

#[derive(Debug, Clone)]
pub struct WalkSettings {
    pub max_pages: usize,
    pub page_delay: Duration,
    pub boarding_only: bool,
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self {
            max_pages: 10,
            page_delay: Duration::from_millis(1500),
            boarding_only: true,
        }
    }
}

/// Follows schedule pagination one page at a time.
pub struct ScheduleWalker<'a> {
    fetcher: &'a dyn ContentFetcher,
    base: Url,
    settings: WalkSettings,
}

impl<'a> ScheduleWalker<'a> {
    pub fn new(fetcher: &'a dyn ContentFetcher, base: Url, settings: WalkSettings) -> Self {
        Self {
            fetcher,
            base,
            settings,
        }
    }

    /// Collects appointments from `start` and every following page.
    ///
    /// Appointments are unique by id; a repeated id keeps its first position
    /// and takes the latest link. Stops at `max_pages`, when there is no next
    /// link, or when the next link points at a page already visited.
    pub async fn fetch_all(
        &self,
        start: &str,
        cookies: &str,
    ) -> Result<Vec<AppointmentLink>, ScheduleError> {
        let mut current = self
            .base
            .join(start)
            .map(String::from)
            .unwrap_or_else(|_| start.to_string());
        let mut visited = HashSet::new();
        let mut collected: Vec<AppointmentLink> = Vec::new();

        for page_no in 1..=self.settings.max_pages {
            let request = FetchRequest::get(current.as_str()).with_cookies(cookies);
            let result = self.fetcher.fetch(&request).await?;
            if !result.success {
                return Err(ScheduleError::Status(result.status));
            }
            if looks_like_login_page(&result.html) {
                return Err(ScheduleError::SessionExpired);
            }

            let page = parse_schedule_page(&result.html, &self.base);
            let found = if self.settings.boarding_only {
                filter_boarding(page.appointments)
            } else {
                page.appointments
            };
            sync_info!("schedule page {}: {} appointments", page_no, found.len());
            for link in found {
                match collected.iter_mut().find(|a| a.id == link.id) {
                    Some(existing) => *existing = link,
                    None => collected.push(link),
                }
            }

            visited.insert(current.clone());
            match page.next_page_url {
                Some(next) if !visited.contains(&next) => current = next,
                Some(_) => {
                    sync_warn!("next page already visited, stopping");
                    break;
                }
                None => break,
            }
            if page_no < self.settings.max_pages {
                tokio::time::sleep(self.settings.page_delay).await;
            }
        }

        sync_info!(
            "schedule walk finished: {} unique appointments",
            collected.len()
        );
        Ok(collected)
    }
}
