//! Rating and keyword filter applied to every normalized review.
//!
//! A [`FilterCriteria`] is built once at the API boundary, either from
//! structured values or from the legacy comma-joined strings, and is never
//! re-split deeper in the pipeline.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::reviews::ReviewRecord;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("rating {0} is outside 1-5")]
    RatingOutOfRange(i64),

    #[error("rating \"{0}\" is not an integer")]
    InvalidRating(String),
}

/// Optional per-run filter. An empty set/list disables that half of the
/// predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    allowed_ratings: BTreeSet<u8>,
    keywords: Vec<String>,
}

impl FilterCriteria {
    /// Builds criteria from structured values.
    ///
    /// Keywords are trimmed and lowercased; blank keywords are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::RatingOutOfRange`] for a rating outside `1..=5`.
    pub fn new<R, K, S>(ratings: R, keywords: K) -> Result<Self, FilterError>
    where
        R: IntoIterator<Item = i64>,
        K: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_ratings = ratings
            .into_iter()
            .map(|r| ReviewRecord::rating_from_int(r).ok_or(FilterError::RatingOutOfRange(r)))
            .collect::<Result<BTreeSet<u8>, _>>()?;

        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }

        Ok(Self {
            allowed_ratings,
            keywords: normalized,
        })
    }

    /// Parses the comma-joined `include_ratings` / `keywords` strings accepted
    /// by the legacy form endpoint. Blank input means "no filter".
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvalidRating`] when a rating is not an integer,
    /// or [`FilterError::RatingOutOfRange`] when it is outside `1..=5`.
    pub fn parse(ratings_csv: &str, keywords_csv: &str) -> Result<Self, FilterError> {
        let ratings = ratings_csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>()
                    .map_err(|_| FilterError::InvalidRating(s.to_owned()))
            })
            .collect::<Result<Vec<i64>, _>>()?;

        Self::new(ratings, keywords_csv.split(','))
    }

    /// The pass-everything filter.
    #[must_use]
    pub fn accept_all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn allowed_ratings(&self) -> &BTreeSet<u8> {
        &self.allowed_ratings
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allowed_ratings.is_empty() && self.keywords.is_empty()
    }
}

/// Returns `true` iff `record` passes `filter`.
///
/// Fails closed: an absent rating never satisfies a rating filter, and empty
/// text never satisfies a keyword filter.
#[must_use]
pub fn matches(record: &ReviewRecord, filter: &FilterCriteria) -> bool {
    let rating_ok = filter.allowed_ratings.is_empty()
        || record
            .rating
            .is_some_and(|r| filter.allowed_ratings.contains(&r));

    rating_ok && (filter.keywords.is_empty() || !matched_keywords(record, filter).is_empty())
}

/// Returns the filter keywords found in `record.text`, in filter order.
#[must_use]
pub fn matched_keywords(record: &ReviewRecord, filter: &FilterCriteria) -> Vec<String> {
    if filter.keywords.is_empty() || record.text.is_empty() {
        return Vec::new();
    }
    let haystack = record.text.to_lowercase();
    filter
        .keywords
        .iter()
        .filter(|k| haystack.contains(k.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
