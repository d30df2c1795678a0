//! Trustpilot company review pages (`/review/<domain>?page=N`).

use revscrape_core::{Platform, ReviewRecord};

use super::trustpilot_parse::{parse_page, parse_rating_label, TrustpilotCard};
use crate::client::{absolutize, extract_origin, HttpClient, HttpConfig};
use crate::collector::{Page, PageFetcher};
use crate::error::ScraperError;

const TRUSTPILOT_HOST: &str = "trustpilot.com";

/// Walks a Trustpilot company page one numbered page at a time.
pub struct TrustpilotFetcher {
    http: HttpClient,
    company_url: reqwest::Url,
    /// Origin used to absolutize relative review links.
    link_base: String,
}

impl TrustpilotFetcher {
    /// Creates a fetcher for a Trustpilot company URL such as
    /// `https://www.trustpilot.com/review/example.com`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSource`] if the URL does not parse or is
    /// not on `trustpilot.com`, or [`ScraperError::Http`] if the HTTP client
    /// cannot be built.
    pub fn new(company_url: &str, config: &HttpConfig) -> Result<Self, ScraperError> {
        let url = parse_company_url(company_url)?;
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let is_http = matches!(url.scheme(), "http" | "https");
        if !is_http || (host != TRUSTPILOT_HOST && !host.ends_with(".trustpilot.com")) {
            return Err(ScraperError::InvalidSource {
                source_handle: company_url.to_owned(),
                reason: "not a trustpilot.com URL".to_owned(),
            });
        }
        Self::build(url, config)
    }

    /// Creates a fetcher against an arbitrary host, skipping the
    /// `trustpilot.com` check. Used to point at a mock server.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`], minus the host check.
    pub fn with_base_url(company_url: &str, config: &HttpConfig) -> Result<Self, ScraperError> {
        Self::build(parse_company_url(company_url)?, config)
    }

    fn build(company_url: reqwest::Url, config: &HttpConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            http: HttpClient::new(config)?,
            link_base: extract_origin(company_url.as_str()),
            company_url,
        })
    }

    fn page_url(&self, page: u32) -> String {
        let mut url = self.company_url.clone();
        url.query_pairs_mut().append_pair("page", &page.to_string());
        url.into()
    }
}

fn parse_company_url(raw: &str) -> Result<reqwest::Url, ScraperError> {
    let mut url = reqwest::Url::parse(raw.trim()).map_err(|e| ScraperError::InvalidSource {
        source_handle: raw.to_owned(),
        reason: e.to_string(),
    })?;
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

impl PageFetcher for TrustpilotFetcher {
    type Cursor = u32;
    type Item = TrustpilotCard;

    fn platform(&self) -> Platform {
        Platform::Trustpilot
    }

    fn first_cursor(&self) -> u32 {
        1
    }

    async fn fetch_page(&mut self, page: &u32) -> Result<Page<u32, TrustpilotCard>, ScraperError> {
        let url = self.page_url(*page);
        let html = match self.http.get_text(&url).await {
            Ok(html) => html,
            // Trustpilot answers past-the-end pages with 404.
            Err(ScraperError::NotFound { .. }) if *page > 1 => return Ok(Page::empty()),
            Err(e) => return Err(e),
        };

        let parsed = parse_page(&html);
        tracing::debug!(
            page,
            cards = parsed.cards.len(),
            has_next = ?parsed.has_next,
            "parsed trustpilot page"
        );
        let next = match parsed.has_next {
            Some(false) => None,
            _ => Some(page + 1),
        };
        Ok(Page {
            items: parsed.cards,
            next,
        })
    }

    fn normalize(&self, card: TrustpilotCard) -> Result<ReviewRecord, ScraperError> {
        let rating = card
            .rating_label
            .as_deref()
            .and_then(parse_rating_label)
            .and_then(ReviewRecord::rating_from_int);
        let text = card.text.unwrap_or_default();

        if rating.is_none() && text.is_empty() {
            return Err(ScraperError::Normalization {
                source_id: card.href.unwrap_or_else(|| "<no link>".to_owned()),
                reason: "card has neither review text nor star rating".to_owned(),
            });
        }

        Ok(ReviewRecord {
            reviewer_name: card.reviewer.unwrap_or_default(),
            rating,
            text,
            date: card.datetime.unwrap_or_default(),
            source_link: card
                .href
                .as_deref()
                .and_then(|href| absolutize(&self.link_base, href)),
            platform: Platform::Trustpilot,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HttpConfig {
        HttpConfig {
            timeout_secs: 5,
            user_agent: "revscrape-test/0.1".to_owned(),
            max_retries: 0,
            backoff_base_secs: 0,
        }
    }

    #[test]
    fn rejects_non_trustpilot_host() {
        let err = TrustpilotFetcher::new("https://example.com/review/foo", &config())
            .err()
            .expect("should reject");
        assert!(matches!(err, ScraperError::InvalidSource { .. }));
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(TrustpilotFetcher::new("not a url", &config()).is_err());
    }

    #[test]
    fn accepts_country_subdomain_and_strips_query() {
        let fetcher =
            TrustpilotFetcher::new("https://uk.trustpilot.com/review/example.com?page=7#x", &config())
                .unwrap();
        assert_eq!(
            fetcher.page_url(2),
            "https://uk.trustpilot.com/review/example.com?page=2"
        );
    }

    #[test]
    fn normalize_absolutizes_link_and_parses_rating() {
        let fetcher =
            TrustpilotFetcher::new("https://www.trustpilot.com/review/example.com", &config())
                .unwrap();
        let record = fetcher
            .normalize(TrustpilotCard {
                reviewer: Some("Jane".to_owned()),
                rating_label: Some("Rated 4 out of 5 stars".to_owned()),
                text: Some("Good".to_owned()),
                datetime: Some("2025-01-15T10:00:00.000Z".to_owned()),
                href: Some("/reviews/abc".to_owned()),
            })
            .unwrap();
        assert_eq!(record.rating, Some(4));
        assert_eq!(
            record.source_link.as_deref(),
            Some("https://www.trustpilot.com/reviews/abc")
        );
        assert_eq!(record.platform, Platform::Trustpilot);
    }

    #[test]
    fn normalize_rejects_card_without_text_or_rating() {
        let fetcher =
            TrustpilotFetcher::new("https://www.trustpilot.com/review/example.com", &config())
                .unwrap();
        let err = fetcher.normalize(TrustpilotCard::default()).unwrap_err();
        assert!(matches!(err, ScraperError::Normalization { .. }));
    }

    #[test]
    fn normalize_keeps_rating_only_card() {
        let fetcher =
            TrustpilotFetcher::new("https://www.trustpilot.com/review/example.com", &config())
                .unwrap();
        let record = fetcher
            .normalize(TrustpilotCard {
                rating_label: Some("1".to_owned()),
                ..TrustpilotCard::default()
            })
            .unwrap();
        assert_eq!(record.rating, Some(1));
        assert!(record.text.is_empty());
    }
}
