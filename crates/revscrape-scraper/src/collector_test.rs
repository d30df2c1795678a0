use std::collections::VecDeque;

use revscrape_core::CollectionOutcome;

use super::*;

/// Raw stub payload: `(rating, text)`. A `None` text fails normalization.
type StubItem = (Option<i64>, Option<&'static str>);

/// Scripted fetcher: each call pops the next response.
struct StubFetcher {
    responses: VecDeque<Result<Vec<StubItem>, ScraperError>>,
    calls: Vec<u32>,
}

impl StubFetcher {
    fn new(responses: Vec<Result<Vec<StubItem>, ScraperError>>) -> Self {
        Self {
            responses: responses.into(),
            calls: Vec::new(),
        }
    }
}

impl PageFetcher for StubFetcher {
    type Cursor = u32;
    type Item = StubItem;

    fn platform(&self) -> Platform {
        Platform::Trustpilot
    }

    fn first_cursor(&self) -> u32 {
        1
    }

    async fn fetch_page(&mut self, cursor: &u32) -> Result<Page<u32, StubItem>, ScraperError> {
        self.calls.push(*cursor);
        let items = self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))?;
        let next = (!self.responses.is_empty()).then_some(cursor + 1);
        Ok(Page { items, next })
    }

    fn normalize(&self, (rating, text): StubItem) -> Result<ReviewRecord, ScraperError> {
        let text = text.ok_or_else(|| ScraperError::Normalization {
            source_id: "stub".to_owned(),
            reason: "missing text".to_owned(),
        })?;
        Ok(ReviewRecord {
            reviewer_name: String::new(),
            rating: rating.and_then(ReviewRecord::rating_from_int),
            text: text.to_owned(),
            date: String::new(),
            source_link: None,
            platform: Platform::Trustpilot,
        })
    }
}

fn options() -> CollectOptions {
    CollectOptions::new(0, 50)
}

fn two_page_fixture() -> Vec<Result<Vec<StubItem>, ScraperError>> {
    vec![
        Ok(vec![
            (Some(5), Some("great service")),
            (Some(3), Some("ok")),
            (Some(1), Some("bad")),
        ]),
        Ok(vec![(Some(5), Some("great again"))]),
    ]
}

fn texts_and_ratings(result: &CollectionResult) -> Vec<(String, Option<u8>)> {
    result
        .records()
        .map(|r| (r.text.clone(), r.rating))
        .collect()
}

#[tokio::test]
async fn filtered_two_page_run_keeps_matching_records_in_order() {
    let mut fetcher = StubFetcher::new(two_page_fixture());
    let filter = FilterCriteria::new([5], ["great"]).unwrap();

    let result = collect(&mut fetcher, &filter, options()).await;

    assert_eq!(
        texts_and_ratings(&result),
        [
            ("great service".to_owned(), Some(5)),
            ("great again".to_owned(), Some(5)),
        ]
    );
    assert_eq!(result.len(), 2);
    assert_eq!(result.termination(), &Termination::Exhausted);
    assert_eq!(result.outcome(), CollectionOutcome::Complete);
    assert_eq!(result.matches()[0].matched_keywords, ["great"]);
}

#[tokio::test]
async fn unfiltered_run_returns_everything_in_upstream_order() {
    let mut fetcher = StubFetcher::new(two_page_fixture());

    let result = collect(&mut fetcher, &FilterCriteria::accept_all(), options()).await;

    let texts: Vec<&str> = result.records().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, ["great service", "ok", "bad", "great again"]);
    assert_eq!(result.pages_fetched(), 2);
    assert_eq!(fetcher.calls, [1, 2]);
}

#[tokio::test]
async fn repeated_runs_against_same_fixture_are_identical() {
    let filter = FilterCriteria::new([5, 3], Vec::<String>::new()).unwrap();

    let mut first = StubFetcher::new(two_page_fixture());
    let a = collect(&mut first, &filter, CollectOptions::new(0, 50)).await;
    let mut second = StubFetcher::new(two_page_fixture());
    let b = collect(&mut second, &filter, CollectOptions::new(1, 10)).await;

    assert_eq!(a, b);
}

#[tokio::test]
async fn empty_first_page_stops_without_further_calls() {
    let mut fetcher = StubFetcher::new(vec![Ok(Vec::new()), Ok(vec![(Some(5), Some("never"))])]);

    let result = collect(&mut fetcher, &FilterCriteria::accept_all(), options()).await;

    assert!(result.is_empty());
    assert_eq!(result.termination(), &Termination::EmptyPage);
    assert_eq!(result.outcome(), CollectionOutcome::NoResults);
    assert_eq!(fetcher.calls, [1]);
}

#[tokio::test]
async fn fetch_failure_keeps_earlier_pages_and_marks_early_stop() {
    let mut fetcher = StubFetcher::new(vec![
        Ok(vec![
            (Some(5), Some("great service")),
            (Some(3), Some("ok")),
            (Some(1), Some("bad")),
        ]),
        Err(ScraperError::UnexpectedStatus {
            status: 503,
            url: "https://www.trustpilot.com/review/example.com?page=2".to_owned(),
        }),
        Ok(vec![(Some(5), Some("unreachable"))]),
    ]);

    let result = collect(&mut fetcher, &FilterCriteria::accept_all(), options()).await;

    assert_eq!(result.len(), 3);
    assert!(result.terminated_early());
    assert_eq!(result.outcome(), CollectionOutcome::Partial);
    assert!(matches!(
        result.termination(),
        Termination::FetchFailed { page: 2, reason } if reason.contains("503")
    ));
    assert_eq!(fetcher.calls, [1, 2]);
}

#[tokio::test]
async fn all_records_filtered_out_is_no_results_not_failure() {
    let mut fetcher = StubFetcher::new(two_page_fixture());
    let filter = FilterCriteria::new([2], Vec::<String>::new()).unwrap();

    let result = collect(&mut fetcher, &filter, options()).await;

    assert!(result.is_empty());
    assert!(!result.terminated_early());
    assert_eq!(result.outcome(), CollectionOutcome::NoResults);
}

#[tokio::test]
async fn normalization_failures_are_skipped_not_fatal() {
    let mut fetcher = StubFetcher::new(vec![Ok(vec![
        (Some(4), Some("fine")),
        (Some(4), None),
        (Some(2), Some("meh")),
    ])]);

    let result = collect(&mut fetcher, &FilterCriteria::accept_all(), options()).await;

    assert_eq!(result.len(), 2);
    assert_eq!(result.skipped(), 1);
    assert_eq!(result.termination(), &Termination::Exhausted);
}

#[tokio::test]
async fn page_limit_stops_run_and_keeps_records() {
    let pages = (0..5)
        .map(|i| Ok(vec![(Some(5), Some(if i % 2 == 0 { "even" } else { "odd" }))]))
        .collect();
    let mut fetcher = StubFetcher::new(pages);

    let result = collect(
        &mut fetcher,
        &FilterCriteria::accept_all(),
        CollectOptions::new(0, 3),
    )
    .await;

    assert_eq!(result.len(), 3);
    assert_eq!(result.termination(), &Termination::PageLimit { max_pages: 3 });
    assert_eq!(fetcher.calls, [1, 2, 3]);
}

#[tokio::test]
async fn still_pending_error_maps_to_still_pending_termination() {
    let mut fetcher = StubFetcher::new(vec![Err(ScraperError::StillPending {
        task_id: "task-1".to_owned(),
        attempts: 7,
    })]);

    let result = collect(&mut fetcher, &FilterCriteria::accept_all(), options()).await;

    assert!(result.is_empty());
    assert_eq!(result.termination(), &Termination::StillPending { attempts: 7 });
    assert_eq!(result.outcome(), CollectionOutcome::Partial);
}
