use std::time::Duration;

use pretty_assertions::assert_eq;
use sync_core::{analyze_errors, ErrorCategory};
use sync_engine::{
    filter_boarding, looks_like_login_page, parse_next_page, parse_schedule_page, AppointmentLink,
    ScheduleError, ScheduleWalker, SiteClient, SiteSettings, WalkSettings,
};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn base() -> Url {
    Url::parse("https://site.example").unwrap()
}

fn link(id: &str, title: &str) -> AppointmentLink {
    AppointmentLink {
        id: id.to_string(),
        url: format!("https://site.example/schedule/a/{id}/1700000000"),
        title: title.to_string(),
    }
}

fn quick_walk(boarding_only: bool) -> WalkSettings {
    WalkSettings {
        max_pages: 10,
        page_delay: Duration::ZERO,
        boarding_only,
    }
}

#[test]
fn appointment_links_are_parsed_with_titles() {
    let html = r#"<ul>
        <li><a href="/schedule/a/C63QgS0U/1700000000">  Boarding   (3 nights) </a></li>
        <li><a href="https://site.example/schedule/a/Z9/1700000001?tab=info">Daycare</a></li>
        <li><a href="/schedule/a/C63QgS0U/1700000000">Duplicate</a></li>
        <li><a href="/schedule/day/2024-03-01">Not an appointment</a></li>
    </ul>"#;
    let page = parse_schedule_page(html, &base());

    assert_eq!(
        page.appointments,
        vec![
            AppointmentLink {
                id: "C63QgS0U".to_string(),
                url: "https://site.example/schedule/a/C63QgS0U/1700000000".to_string(),
                title: "Boarding (3 nights)".to_string(),
            },
            AppointmentLink {
                id: "Z9".to_string(),
                url: "https://site.example/schedule/a/Z9/1700000001?tab=info".to_string(),
                title: "Daycare".to_string(),
            },
        ]
    );
    assert_eq!(page.next_page_url, None);
}

#[test]
fn next_link_is_found_by_rel_or_class() {
    let by_rel = r#"<a href="/schedule?page=2" rel="next">More</a>"#;
    let by_class = r#"<nav class="pagination"><a class="page-link next" href="/schedule?page=3">›</a></nav>"#;

    assert_eq!(
        parse_schedule_page(by_rel, &base()).next_page_url.as_deref(),
        Some("https://site.example/schedule?page=2")
    );
    assert_eq!(
        parse_next_page(by_class, &base()).as_deref(),
        Some("https://site.example/schedule?page=3")
    );
    assert_eq!(parse_next_page("<a href=\"/x\">x</a>", &base()), None);
}

#[test]
fn boarding_filter_matches_keywords_case_insensitively() {
    let kept = filter_boarding(vec![
        link("a", "BOARDING - Rex"),
        link("b", "Daycare"),
        link("c", "Overnight stay"),
        link("d", "2 Nights"),
        link("e", "Grooming"),
    ]);
    let ids: Vec<_> = kept.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c", "d"]);
}

#[test]
fn login_form_means_session_expired() {
    assert!(looks_like_login_page(
        r#"<form action="/login"><input type="password" name="password"></form>"#
    ));
    assert!(!looks_like_login_page("<h1>Schedule</h1>"));
}

async fn walker_server(pages: &[(&str, &str)]) -> MockServer {
    let server = MockServer::start().await;
    for (page, body) in pages {
        Mock::given(method("GET"))
            .and(path("/schedule"))
            .and(query_param("page", *page))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
            .expect(1)
            .mount(&server)
            .await;
    }
    server
}

fn client_for(server: &MockServer) -> (SiteClient, Url) {
    let base = Url::parse(&server.uri()).unwrap();
    let client = SiteClient::new(SiteSettings::for_base_url(base.clone())).unwrap();
    (client, base)
}

#[tokio::test]
async fn walker_follows_pages_and_dedupes() {
    let server = walker_server(&[
        (
            "1",
            r#"<a href="/schedule/a/A1/1">Boarding Rex</a>
               <a href="/schedule/a/D1/1">Daycare Bo</a>
               <a rel="next" href="/schedule?page=2">next</a>"#,
        ),
        (
            "2",
            r#"<a href="/schedule/a/A2/2">Overnight Luna</a>
               <a href="/schedule/a/A1/9">Boarding Rex (moved)</a>"#,
        ),
    ])
    .await;
    let (client, base) = client_for(&server);
    let walker = ScheduleWalker::new(&client, base, quick_walk(true));

    let links = walker.fetch_all("/schedule?page=1", "sid=abc").await.unwrap();
    let summary: Vec<_> = links
        .iter()
        .map(|l| (l.id.as_str(), l.title.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![("A1", "Boarding Rex (moved)"), ("A2", "Overnight Luna")]
    );
}

#[tokio::test]
async fn walker_stops_on_repeated_next_link() {
    let server = walker_server(&[
        (
            "1",
            r#"<a href="/schedule/a/X/1">Daycare</a><a rel="next" href="/schedule?page=2">n</a>"#,
        ),
        (
            "2",
            r#"<a href="/schedule/a/Y/2">Daycare</a><a rel="next" href="/schedule?page=1">n</a>"#,
        ),
    ])
    .await;
    let (client, base) = client_for(&server);
    let walker = ScheduleWalker::new(&client, base, quick_walk(false));

    let links = walker.fetch_all("/schedule?page=1", "").await.unwrap();
    assert_eq!(links.len(), 2);
}

#[tokio::test]
async fn walker_respects_max_pages() {
    let server = walker_server(&[(
        "1",
        r#"<a href="/schedule/a/X/1">Stay</a><a rel="next" href="/schedule?page=2">n</a>"#,
    )])
    .await;
    let (client, base) = client_for(&server);
    let settings = WalkSettings {
        max_pages: 1,
        ..quick_walk(true)
    };
    let walker = ScheduleWalker::new(&client, base, settings);

    let links = walker.fetch_all("/schedule?page=1", "").await.unwrap();
    assert_eq!(links.len(), 1);
}

#[tokio::test]
async fn walker_reports_status_and_expired_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schedule"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/schedule"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<form action="/login"><input type="password" name="password"></form>"#,
        ))
        .mount(&server)
        .await;
    let (client, base) = client_for(&server);
    let walker = ScheduleWalker::new(&client, base, quick_walk(true));

    let status = walker.fetch_all("/schedule?page=1", "").await.unwrap_err();
    assert_eq!(status, ScheduleError::Status(500));
    assert_eq!(status.to_string(), "Failed to fetch schedule: 500");

    let expired = walker.fetch_all("/schedule?page=2", "").await.unwrap_err();
    assert_eq!(expired, ScheduleError::SessionExpired);
    assert_eq!(expired.category(), ErrorCategory::AuthError);

    let summary = analyze_errors([status.to_string(), expired.to_string()]);
    assert_eq!(summary.count(ErrorCategory::NetworkError), 1);
    assert_eq!(summary.count(ErrorCategory::AuthError), 1);
    assert_eq!(summary.dominant_category, ErrorCategory::NetworkError);
}
