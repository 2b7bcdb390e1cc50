//! Site knowledge shipped with the binary. Each profile can be replaced
//! wholesale from the config file.

use super::profile::{Discovery, SourceProfile};
use crate::dates::{DEFAULT_NOISE_PREFIXES, DatePattern};
use crate::driver::ControlSelector;
use crate::extract::{ExtractionProfile, FieldStrategy};
use crate::model::SourceId;
use crate::paginate::{PaginationProfile, PaginationStyle};

pub fn builtin_profile(id: SourceId) -> SourceProfile {
    match id {
        SourceId::G2 => g2(),
        SourceId::Capterra => capterra(),
        SourceId::TrustRadius => trustradius(),
    }
}

fn noise() -> Vec<String> {
    DEFAULT_NOISE_PREFIXES.iter().map(|s| s.to_string()).collect()
}

fn g2() -> SourceProfile {
    SourceProfile {
        discovery: Discovery::Direct {
            listing_url: "https://www.g2.com/products/{slug}/reviews".into(),
        },
        extraction: ExtractionProfile {
            fragments: vec![r#"div[itemprop="review"]"#.into(), ".review-id".into()],
            title: vec![
                FieldStrategy::text(r#"[itemprop="name"]"#),
                FieldStrategy::text(".review-list-heading"),
            ],
            body: vec![
                FieldStrategy::text(r#"[itemprop="reviewBody"]"#),
                FieldStrategy::text(".formatted-text"),
            ],
            date: vec![
                FieldStrategy::attr(r#"[itemprop="datePublished"]"#, "content"),
                FieldStrategy::text(r#"[itemprop="datePublished"]"#),
                FieldStrategy::text(".time"),
            ],
            rating: vec![
                FieldStrategy::attr(r#"[itemprop="ratingValue"]"#, "content"),
                FieldStrategy::text(r#"[itemprop="ratingValue"]"#),
            ],
        },
        pagination: PaginationProfile {
            style: PaginationStyle::NextPage,
            controls: vec![
                ControlSelector::css(".pagination__named-link.next"),
                ControlSelector::css("a.next_page"),
            ],
        },
        date_patterns: vec![
            DatePattern::ShortMonth,
            DatePattern::LongMonth,
            DatePattern::Iso,
            DatePattern::DayMonthYear,
        ],
        date_noise_prefixes: noise(),
    }
}

fn capterra() -> SourceProfile {
    SourceProfile {
        discovery: Discovery::Search {
            search_url: "https://www.capterra.com/search-results/?search={query}".into(),
            product_link_contains: "/p/".into(),
            reviews_suffix: "reviews/".into(),
        },
        extraction: ExtractionProfile {
            fragments: vec![".review-card".into(), r#"[data-testid="review-card"]"#.into()],
            title: vec![FieldStrategy::text("h3"), FieldStrategy::text(".review-card-title")],
            body: vec![
                FieldStrategy::join_all(".review-comments-text"),
                FieldStrategy::text(".review-text"),
            ],
            date: vec![
                FieldStrategy::text(".review-date"),
                FieldStrategy::text(r#"[data-testid="review-date"]"#),
            ],
            rating: vec![
                FieldStrategy::attr(r#"[data-testid="rating"]"#, "aria-label"),
                FieldStrategy::text(r#"[data-testid="rating"]"#),
            ],
        },
        pagination: PaginationProfile {
            style: PaginationStyle::ShowMore,
            controls: vec![
                ControlSelector::with_text("button", "show more"),
                ControlSelector::with_text("a", "show more"),
            ],
        },
        date_patterns: vec![DatePattern::LongMonth, DatePattern::Iso, DatePattern::DayMonthYear],
        date_noise_prefixes: noise(),
    }
}

fn trustradius() -> SourceProfile {
    SourceProfile {
        discovery: Discovery::Direct {
            listing_url: "https://www.trustradius.com/products/{slug}/reviews".into(),
        },
        extraction: ExtractionProfile {
            fragments: vec!["article.review-card".into(), ".serp-review".into()],
            title: vec![FieldStrategy::text("h3"), FieldStrategy::text(".review-title section")],
            body: vec![
                FieldStrategy::text(".review-content"),
                FieldStrategy::text(".response-text"),
            ],
            date: vec![FieldStrategy::text(".review-date")],
            rating: vec![
                FieldStrategy::attr(r#"[itemprop="ratingValue"]"#, "content"),
                FieldStrategy::text(".trust-score__score"),
            ],
        },
        pagination: PaginationProfile {
            style: PaginationStyle::NextPage,
            controls: vec![
                ControlSelector::css("a.next-page"),
                ControlSelector::css(r#"button[aria-label="Next"]"#),
            ],
        },
        date_patterns: vec![DatePattern::LongMonth, DatePattern::Iso, DatePattern::DayMonthYear],
        date_noise_prefixes: noise(),
    }
}
