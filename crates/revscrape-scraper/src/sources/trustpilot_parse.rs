//! HTML extraction for Trustpilot company review pages.
//!
//! Trustpilot's CSS-module class names carry a build hash suffix
//! (`styles_cardWrapper__LcCPA`), so every selector matches on the stable
//! prefix with `[class*=…]`.
//!
//! Parsing is synchronous and returns owned [`TrustpilotCard`]s so the
//! `scraper::Html` document never lives across an `.await`.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static CARD: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[class*="styles_cardWrapper"]"#).expect("valid card selector")
});
static BODY: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"p[class*="typography_body"]"#).expect("valid body selector")
});
static RATING_IMG: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[class*="star-rating_starRating"] img"#)
        .expect("valid rating selector")
});
static RATING_ATTR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-service-review-rating]").expect("valid rating attribute selector")
});
static TIME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time[datetime]").expect("valid time selector"));
static LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid link selector"));
static REVIEWER: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[data-consumer-name-typography]").expect("valid reviewer selector")
});
static NEXT_PAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[name="pagination-button-next"]"#).expect("valid pagination selector")
});

/// Raw fields pulled from one review card. Nothing is validated yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustpilotCard {
    pub reviewer: Option<String>,
    /// Either the star image `alt` ("Rated 4 out of 5 stars") or the bare
    /// `data-service-review-rating` value.
    pub rating_label: Option<String>,
    pub text: Option<String>,
    pub datetime: Option<String>,
    pub href: Option<String>,
}

/// Everything the fetcher needs from one page.
#[derive(Debug, Default)]
pub struct TrustpilotPage {
    pub cards: Vec<TrustpilotCard>,
    /// `Some(false)` when the "next page" button is present but disabled,
    /// `Some(true)` when it links somewhere, `None` when there is no button.
    pub has_next: Option<bool>,
}

#[must_use]
pub fn parse_page(html: &str) -> TrustpilotPage {
    let document = Html::parse_document(html);
    let cards = document.select(&CARD).map(parse_card).collect();
    let has_next = document.select(&NEXT_PAGE).next().map(|a| {
        let disabled = a.value().attr("aria-disabled") == Some("true");
        !disabled && a.value().attr("href").is_some_and(|h| !h.trim().is_empty())
    });
    TrustpilotPage { cards, has_next }
}

fn parse_card(card: ElementRef<'_>) -> TrustpilotCard {
    let rating_label = card
        .select(&RATING_IMG)
        .next()
        .and_then(|img| img.value().attr("alt"))
        .or_else(|| {
            card.select(&RATING_ATTR)
                .next()
                .and_then(|el| el.value().attr("data-service-review-rating"))
        })
        .map(str::to_owned);

    TrustpilotCard {
        reviewer: card.select(&REVIEWER).next().and_then(element_text),
        rating_label,
        text: card.select(&BODY).next().and_then(element_text),
        datetime: card
            .select(&TIME)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .map(str::to_owned),
        href: card
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_owned),
    }
}

/// Collapsed text content, or `None` if the element is blank.
fn element_text(el: ElementRef<'_>) -> Option<String> {
    let text = el.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Returns the first whole-number word of a rating label.
///
/// `"Rated 4 out of 5 stars"` → `Some(4)`; `"5"` → `Some(5)`.
#[must_use]
pub fn parse_rating_label(label: &str) -> Option<i64> {
    label
        .split_whitespace()
        .find(|w| !w.is_empty() && w.chars().all(|c| c.is_ascii_digit()))
        .and_then(|w| w.parse::<i64>().ok())
}
