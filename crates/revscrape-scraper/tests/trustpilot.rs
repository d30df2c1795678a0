//! Integration tests for `TrustpilotFetcher` driven through `collect`.
//!
//! A local `wiremock` server stands in for trustpilot.com and serves
//! hand-written review pages.

use revscrape_core::{CollectionOutcome, FilterCriteria, Termination};
use revscrape_scraper::{collect, CollectOptions, HttpConfig, TrustpilotFetcher};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_config() -> HttpConfig {
    HttpConfig {
        timeout_secs: 5,
        user_agent: "revscrape-test/0.1".to_owned(),
        max_retries: 0,
        backoff_base_secs: 0,
    }
}

fn card(rating: u8, text: &str, href: &str) -> String {
    format!(
        r#"<div class="styles_cardWrapper__LcCPA"><article>
             <span data-consumer-name-typography="true">Reviewer {rating}</span>
             <div class="star-rating_starRating__4rrcf"><img alt="Rated {rating} out of 5 stars"></div>
             <time datetime="2025-01-15T10:00:00.000Z">Jan 15</time>
             <a href="{href}">title</a>
             <p class="typography_body-l__KUYFJ">{text}</p>
           </article></div>"#
    )
}

fn page(cards: &[String], next_enabled: bool) -> String {
    let next = if next_enabled {
        r#"<a name="pagination-button-next" href="?page=next">Next</a>"#
    } else {
        r#"<a name="pagination-button-next" aria-disabled="true">Next</a>"#
    };
    format!("<html><body>{}<nav>{next}</nav></body></html>", cards.concat())
}

async fn mount_page(server: &MockServer, number: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path("/review/example.com"))
        .and(query_param("page", number))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

fn fetcher(server: &MockServer) -> TrustpilotFetcher {
    TrustpilotFetcher::with_base_url(
        &format!("{}/review/example.com", server.uri()),
        &http_config(),
    )
    .expect("failed to build test fetcher")
}

#[tokio::test]
async fn filtered_run_walks_pages_until_next_is_disabled() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "1",
        200,
        page(
            &[
                card(5, "Great service", "/reviews/a"),
                card(3, "It was ok", "/reviews/b"),
                card(1, "Bad experience", "/reviews/c"),
            ],
            true,
        ),
    )
    .await;
    mount_page(
        &server,
        "2",
        200,
        page(&[card(5, "Great again", "/reviews/d")], false),
    )
    .await;

    let filter = FilterCriteria::new([5], ["great"]).expect("filter");
    let result = collect(&mut fetcher(&server), &filter, CollectOptions::new(0, 10)).await;

    let texts: Vec<&str> = result.records().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, ["Great service", "Great again"]);
    assert_eq!(result.termination(), &Termination::Exhausted);
    assert_eq!(result.pages_fetched(), 2);

    let first = result.records().next().expect("record");
    assert_eq!(first.rating, Some(5));
    assert_eq!(first.reviewer_name, "Reviewer 5");
    assert_eq!(first.date, "2025-01-15T10:00:00.000Z");
    assert_eq!(
        first.source_link.as_deref(),
        Some(format!("{}/reviews/a", server.uri()).as_str())
    );
}

#[tokio::test]
async fn page_without_cards_ends_the_run() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "1",
        200,
        page(&[card(4, "Fine", "/reviews/a")], true),
    )
    .await;
    mount_page(&server, "2", 200, page(&[], true)).await;

    let result = collect(
        &mut fetcher(&server),
        &FilterCriteria::accept_all(),
        CollectOptions::new(0, 10),
    )
    .await;

    assert_eq!(result.len(), 1);
    assert_eq!(result.termination(), &Termination::EmptyPage);
    assert_eq!(result.outcome(), CollectionOutcome::Complete);
}

#[tokio::test]
async fn not_found_past_last_page_is_treated_as_empty() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "1",
        200,
        page(&[card(4, "Fine", "/reviews/a")], true),
    )
    .await;
    mount_page(&server, "2", 404, String::new()).await;

    let result = collect(
        &mut fetcher(&server),
        &FilterCriteria::accept_all(),
        CollectOptions::new(0, 10),
    )
    .await;

    assert_eq!(result.len(), 1);
    assert_eq!(result.termination(), &Termination::EmptyPage);
    assert!(!result.terminated_early());
}

#[tokio::test]
async fn server_error_mid_run_keeps_partial_results() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "1",
        200,
        page(
            &[card(5, "Great", "/reviews/a"), card(2, "Meh", "/reviews/b")],
            true,
        ),
    )
    .await;
    mount_page(&server, "2", 503, String::new()).await;

    let result = collect(
        &mut fetcher(&server),
        &FilterCriteria::accept_all(),
        CollectOptions::new(0, 10),
    )
    .await;

    assert_eq!(result.len(), 2);
    assert_eq!(result.outcome(), CollectionOutcome::Partial);
    assert!(matches!(
        result.termination(),
        Termination::FetchFailed { page: 2, reason } if reason.contains("503")
    ));
}

#[tokio::test]
async fn unreadable_cards_are_skipped() {
    let server = MockServer::start().await;
    let blank = r#"<div class="styles_cardWrapper__LcCPA"><article></article></div>"#.to_owned();
    mount_page(
        &server,
        "1",
        200,
        page(&[card(4, "Fine", "/reviews/a"), blank], false),
    )
    .await;

    let result = collect(
        &mut fetcher(&server),
        &FilterCriteria::accept_all(),
        CollectOptions::new(0, 10),
    )
    .await;

    assert_eq!(result.len(), 1);
    assert_eq!(result.skipped(), 1);
}
