use std::time::Duration;
use time::macros::date;
use time::{Date, Month};
use url::Url;

use review_claw::dates::{DateNormalizer, DatePattern};
use review_claw::driver::fixture::FixtureBrowser;
use review_claw::driver::{Browser, ControlSelector, PageSession};
use review_claw::merge::merge;
use review_claw::model::{DateWindow, HarvestResult, RawReview, ReviewCandidate, SourceId};
use review_claw::paginate::{PaginationDriver, PaginationProfile, PaginationState, PaginationStyle};

fn raw(source: SourceId, title: &str, raw_date: &str, rating: Option<f64>) -> RawReview {
    RawReview::from_candidate(
        source,
        ReviewCandidate {
            title: title.into(),
            description: format!("about {title}"),
            raw_date: raw_date.into(),
            rating,
        },
        &DateNormalizer::default(),
    )
}

fn days(from: Date, to: Date) -> impl Iterator<Item = Date> {
    std::iter::successors(Some(from), move |d| d.next_day().filter(|n| *n <= to))
}

#[test]
fn parsed_reviews_appear_iff_inside_window() {
    let window = DateWindow::new(date!(2023 - 02 - 10), date!(2023 - 03 - 20)).unwrap();
    let reviews: Vec<RawReview> = days(date!(2023 - 01 - 01), date!(2023 - 04 - 30))
        .map(|d| {
            let text = d.format(DatePattern::LongMonth.format()).unwrap();
            raw(SourceId::G2, &d.to_string(), &text, Some(3.0))
        })
        .collect();
    let input = [HarvestResult {
        source: SourceId::G2,
        reviews: reviews.clone(),
    }];

    let out = merge(&input, &window);
    for r in &reviews {
        let d = r.parsed_date().unwrap();
        let present = out.iter().any(|f| f.title == r.title());
        assert_eq!(present, window.contains(d), "{d}");
    }
    assert_eq!(out.len(), 39);
}

#[test]
fn merge_is_idempotent_and_order_stable() {
    let window = DateWindow::parse("2023-01-01", "2023-12-31").unwrap();
    let input = vec![
        HarvestResult {
            source: SourceId::G2,
            reviews: vec![
                raw(SourceId::G2, "b", "Feb 1, 2023", Some(4.0)),
                raw(SourceId::G2, "a", "", None),
                raw(SourceId::G2, "b", "Feb 1, 2023", Some(4.0)),
            ],
        },
        HarvestResult {
            source: SourceId::TrustRadius,
            reviews: vec![raw(SourceId::TrustRadius, "c", "2023-07-07", Some(8.0))],
        },
    ];
    let once = merge(&input, &window);
    let twice = merge(&input, &window);
    assert_eq!(once, twice);
    let titles: Vec<_> = once.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["b", "a", "c"]);
}

#[test]
fn structural_duplicates_collapse_to_one() {
    let window = DateWindow::parse("2023-01-01", "2023-12-31").unwrap();
    let lenient = raw(SourceId::Capterra, "same", "March 3, 2023", Some(5.0));
    // same visible fields, different derived date
    let strict = RawReview::from_candidate(
        SourceId::Capterra,
        ReviewCandidate {
            title: "same".into(),
            description: "about same".into(),
            raw_date: "March 3, 2023".into(),
            rating: Some(5.0),
        },
        &DateNormalizer::new(Vec::new(), vec![DatePattern::Iso]),
    );
    assert_ne!(lenient.parsed_date(), strict.parsed_date());

    let late = [HarvestResult {
        source: SourceId::Capterra,
        reviews: vec![strict.clone(), lenient.clone()],
    }];
    let early = [HarvestResult {
        source: SourceId::Capterra,
        reviews: vec![lenient, strict],
    }];
    assert_eq!(merge(&late, &window).len(), 1);
    assert_eq!(merge(&early, &window).len(), 1);

    let other_rating = raw(SourceId::Capterra, "same", "March 3, 2023", Some(4.0));
    let other_source = raw(SourceId::G2, "same", "March 3, 2023", Some(5.0));
    let distinct = [HarvestResult {
        source: SourceId::Capterra,
        reviews: vec![
            raw(SourceId::Capterra, "same", "March 3, 2023", Some(5.0)),
            other_rating,
            other_source,
        ],
    }];
    assert_eq!(merge(&distinct, &window).len(), 3);
}

#[test]
fn every_pattern_parses_what_it_formats() {
    let n = DateNormalizer::default();
    for pattern in [
        DatePattern::LongMonth,
        DatePattern::ShortMonth,
        DatePattern::Iso,
        DatePattern::DayMonthYear,
    ] {
        for d in days(date!(2023 - 01 - 01), date!(2024 - 12 - 31)) {
            let text = d.format(pattern.format()).unwrap();
            let got = n.normalize(&text).unwrap();
            assert_eq!(got, d, "{pattern:?} {text}");
        }
    }
    assert_eq!(
        n.normalize("October 12, 2023").unwrap(),
        Date::from_calendar_date(2023, Month::October, 12).unwrap()
    );
}

#[test]
fn unparseable_text_is_reported_not_guessed() {
    let n = DateNormalizer::default();
    for input in ["", "   ", "not a date", "Written on", "13/13/2023", "2023-02-30"] {
        assert!(n.normalize(input).is_err(), "{input:?}");
    }
}

#[tokio::test]
async fn hidden_control_ends_pagination_after_one_page() {
    let listing = "https://reviews.test/acme";
    let browser = FixtureBrowser::new()
        .page(
            listing,
            r#"<div aria-hidden="true"><a class="next" href="?page=2">Next</a></div>"#,
        )
        .page("https://reviews.test/acme?page=2", "<p>unreachable</p>");
    let driver = PaginationDriver::new(
        &PaginationProfile {
            style: PaginationStyle::NextPage,
            controls: vec![ControlSelector::css("a.next")],
        },
        Duration::ZERO,
    )
    .unwrap();

    let mut session = browser.open().await.unwrap();
    session
        .navigate(&Url::parse(listing).unwrap(), Duration::from_secs(1))
        .await
        .unwrap();
    for _ in 0..3 {
        assert_eq!(driver.advance(session.as_mut()).await, PaginationState::Exhausted);
    }
    session.close().await.unwrap();
    assert_eq!(browser.visits(), vec![listing.to_string()]);
}
