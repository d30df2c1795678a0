//! Canonical review types shared by every upstream adapter.
//!
//! A [`ReviewRecord`] is the normalized shape produced from any provider
//! payload. Records that pass a [`crate::FilterCriteria`] are wrapped in a
//! [`ReviewMatch`] and accumulated into a [`CollectionResult`], which is the
//! only thing the exporter ever sees.

use serde::{Deserialize, Serialize};

/// Provenance tag for a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Trustpilot,
    Google,
}

impl Platform {
    /// Lowercase identifier used in file names and JSON payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Trustpilot => "trustpilot",
            Platform::Google => "google",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Trustpilot => write!(f, "Trustpilot"),
            Platform::Google => write!(f, "Google Reviews"),
        }
    }
}

/// One user review, normalized regardless of upstream source.
///
/// Upstream field availability varies: a missing reviewer, date, or link is
/// an empty string / `None`, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRecord {
    pub reviewer_name: String,
    /// Star rating in `1..=5`, or `None` when the upstream omitted it or sent
    /// something out of range.
    pub rating: Option<u8>,
    pub text: String,
    /// Upstream-provided date. Format varies by provider (ISO timestamp,
    /// "2 weeks ago", epoch seconds) and is passed through untouched.
    pub date: String,
    pub source_link: Option<String>,
    pub platform: Platform,
}

impl ReviewRecord {
    /// Converts an integer rating into the `1..=5` range, or `None`.
    #[must_use]
    pub fn rating_from_int(value: i64) -> Option<u8> {
        u8::try_from(value).ok().filter(|r| (1..=5).contains(r))
    }

    /// Converts a float rating (e.g. `SerpAPI` sends `4.0`) into the `1..=5` range.
    ///
    /// Non-integral values are rounded to the nearest star.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn rating_from_float(value: f64) -> Option<u8> {
        if !value.is_finite() {
            return None;
        }
        Self::rating_from_int(value.round() as i64)
    }
}

/// A record that passed the filter, plus the filter keywords it matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewMatch {
    pub record: ReviewRecord,
    pub matched_keywords: Vec<String>,
}

/// Why a collection run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// The upstream reported no further pages.
    Exhausted,
    /// The upstream returned a page with zero items.
    EmptyPage,
    /// The page budget ran out before the upstream did.
    PageLimit { max_pages: usize },
    /// A page fetch failed; `page` is the 1-based index of the failed fetch.
    FetchFailed { page: usize, reason: String },
    /// An asynchronous upstream task never became ready within the poll budget.
    StillPending { attempts: u32 },
}

impl Termination {
    /// `true` when the run stopped before the upstream ran dry.
    #[must_use]
    pub fn is_early(&self) -> bool {
        matches!(
            self,
            Termination::PageLimit { .. }
                | Termination::FetchFailed { .. }
                | Termination::StillPending { .. }
        )
    }
}

/// Coarse classification of a finished run, for callers that only need to
/// pick a response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionOutcome {
    /// The upstream was read to the end and at least one record passed.
    Complete,
    /// The run stopped early; whatever passed before that is kept.
    Partial,
    /// The upstream was read to the end and nothing passed the filter.
    NoResults,
}

/// Terminal artifact of one collection run.
///
/// Created empty at the start of a run and appended to as pages arrive. Once
/// [`CollectionResult::finish`] is called it is frozen: callers only get
/// shared references to the records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionResult {
    platform: Platform,
    matches: Vec<ReviewMatch>,
    termination: Termination,
    pages_fetched: usize,
    skipped: usize,
}

impl CollectionResult {
    /// Starts an empty result. Termination defaults to `Exhausted` until the
    /// collector records the real reason.
    #[must_use]
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            matches: Vec::new(),
            termination: Termination::Exhausted,
            pages_fetched: 0,
            skipped: 0,
        }
    }

    pub fn push(&mut self, record: ReviewRecord, matched_keywords: Vec<String>) {
        self.matches.push(ReviewMatch {
            record,
            matched_keywords,
        });
    }

    pub fn record_page(&mut self) {
        self.pages_fetched += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Freezes the result with the reason the run stopped.
    #[must_use]
    pub fn finish(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub fn matches(&self) -> &[ReviewMatch] {
        &self.matches
    }

    pub fn records(&self) -> impl Iterator<Item = &ReviewRecord> {
        self.matches.iter().map(|m| &m.record)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    #[must_use]
    pub fn termination(&self) -> &Termination {
        &self.termination
    }

    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Number of upstream items dropped because they could not be normalized.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    #[must_use]
    pub fn terminated_early(&self) -> bool {
        self.termination.is_early()
    }

    #[must_use]
    pub fn outcome(&self) -> CollectionOutcome {
        if self.terminated_early() {
            CollectionOutcome::Partial
        } else if self.is_empty() {
            CollectionOutcome::NoResults
        } else {
            CollectionOutcome::Complete
        }
    }
}
