use review_claw::driver::fixture::{FixtureBrowser, FixturePage};
use review_claw::engine::{HarvestRequest, ReviewHarvester, SourceSelection};
use review_claw::model::{DateWindow, SourceId};
use review_claw::Settings;

const G2_LISTING: &str = "https://www.g2.com/products/acme/reviews";
const TR_LISTING: &str = "https://www.trustradius.com/products/acme/reviews";

fn settings() -> Settings {
    Settings {
        polite_delay_ms: 0,
        ..Settings::default()
    }
}

fn request(selection: SourceSelection) -> HarvestRequest {
    HarvestRequest {
        company: "Acme".into(),
        window: DateWindow::parse("2023-01-01", "2023-12-31").unwrap(),
        selection,
        headless: true,
    }
}

fn g2_card(title: &str, date: &str) -> String {
    format!(
        r#"<div itemprop="review">
             <div itemprop="name">{title}</div>
             <div itemprop="reviewBody">Review of {title}</div>
             <span itemprop="datePublished">{date}</span>
             <meta itemprop="ratingValue" content="4.0">
           </div>"#
    )
}

#[tokio::test]
async fn acme_keeps_only_the_in_window_review() {
    let page = format!("{}{}", g2_card("A", "March 3, 2023"), g2_card("B", "March 3, 2022"));
    let browser = FixtureBrowser::new().page(G2_LISTING, page);
    let settings = settings();

    let report = ReviewHarvester::new(&browser, &settings)
        .run(&request(SourceSelection::Only(vec![SourceId::G2])))
        .await
        .unwrap();

    assert_eq!(report.reviews.len(), 1);
    let r = &report.reviews[0];
    assert_eq!(r.source, SourceId::G2);
    assert_eq!(r.title, "A");
    assert_eq!(r.description, "Review of A");
    assert_eq!(r.date, "March 3, 2023");
    assert_eq!(r.rating, Some(4.0));
}

#[tokio::test]
async fn unparseable_dates_survive_any_window() {
    let page = format!(
        "{}{}{}",
        g2_card("blank", ""),
        g2_card("junk", "not a date"),
        g2_card("ancient", "Jan 1, 1999")
    );
    let browser = FixtureBrowser::new().page(G2_LISTING, page);
    let settings = settings();

    let report = ReviewHarvester::new(&browser, &settings)
        .run(&request(SourceSelection::Only(vec![SourceId::G2])))
        .await
        .unwrap();

    let titles: Vec<_> = report.reviews.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["blank", "junk"]);
}

/// A G2 listing that never runs out of pages. `card` builds the ten cards
/// of page `n`; every page links to the next one.
fn endless_g2(card: impl Fn(usize, usize) -> String + Send + Sync + 'static) -> FixtureBrowser {
    FixtureBrowser::new().generated(move |url| {
        if !url.as_str().starts_with(G2_LISTING) {
            return None;
        }
        let page: usize = url
            .query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(1);
        let cards: String = (0..10).map(|i| card(page, i)).collect();
        Some(FixturePage::ok(format!(
            r#"{cards}<a class="pagination__named-link next" href="?page={}">Next</a>"#,
            page + 1
        )))
    })
}

#[tokio::test]
async fn endless_source_stops_past_the_cap() {
    let browser = endless_g2(|page, i| g2_card(&format!("page {page} item {i}"), ""));
    let settings = settings();

    let report = ReviewHarvester::new(&browser, &settings)
        .run(&request(SourceSelection::Only(vec![SourceId::G2])))
        .await
        .unwrap();

    assert_eq!(report.per_source[0].collected, 210);
    assert_eq!(report.reviews.len(), 210);
    assert_eq!(browser.visits().len(), 21);
    assert_eq!((browser.opened(), browser.closed()), (1, 1));
}

#[tokio::test]
async fn endless_out_of_window_source_still_stops() {
    let browser = endless_g2(|page, i| g2_card(&format!("page {page} item {i}"), "March 3, 2022"));
    let settings = settings();

    let report = ReviewHarvester::new(&browser, &settings)
        .run(&request(SourceSelection::Only(vec![SourceId::G2])))
        .await
        .unwrap();

    assert!(report.reviews.is_empty());
    assert_eq!(report.per_source[0].collected, 0);
    assert_eq!(browser.visits().len(), 21);
    assert_eq!((browser.opened(), browser.closed()), (1, 1));
}

#[tokio::test]
async fn endless_repeating_source_still_stops() {
    let browser = endless_g2(|_, i| g2_card(&format!("item {i}"), "March 3, 2023"));
    let settings = settings();

    let report = ReviewHarvester::new(&browser, &settings)
        .run(&request(SourceSelection::Only(vec![SourceId::G2])))
        .await
        .unwrap();

    assert_eq!(report.reviews.len(), 10);
    assert_eq!(browser.visits().len(), 21);
    assert_eq!((browser.opened(), browser.closed()), (1, 1));
}

#[tokio::test]
async fn failing_source_does_not_stop_the_others() {
    let tr_page = r#"
        <article class="review-card">
          <h3>Reliable</h3>
          <div class="review-content">No outages in a year.</div>
          <span class="review-date">June 5, 2023</span>
        </article>"#;
    let browser = FixtureBrowser::new()
        .failing(G2_LISTING)
        .page(TR_LISTING, tr_page);
    let settings = settings();

    let mut seen = Vec::new();
    let report = ReviewHarvester::new(&browser, &settings)
        .run_with_progress(&request(SourceSelection::All), |t| seen.push((t.source, t.collected)))
        .await
        .unwrap();

    assert_eq!(
        seen,
        vec![(SourceId::G2, 0), (SourceId::Capterra, 0), (SourceId::TrustRadius, 1)]
    );
    assert_eq!(report.reviews.len(), 1);
    assert_eq!(report.reviews[0].title, "Reliable");
    assert_eq!(browser.opened(), 3);
    assert_eq!(browser.closed(), 3);
}

#[tokio::test]
async fn capterra_search_then_show_more() {
    let search = "https://www.capterra.com/search-results/?search=Acme";
    let product = "https://www.capterra.com/p/42/Acme/";
    let reviews = "https://www.capterra.com/p/42/Acme/reviews/";
    let more = "https://www.capterra.com/p/42/Acme/reviews/?page=2";
    let card = |t: &str, d: &str| {
        format!(
            r#"<div class="review-card"><h3>{t}</h3>
                 <p class="review-comments-text">Comments: {t}</p>
                 <span class="review-date">Written on {d}</span></div>"#
        )
    };
    let first = format!(
        r#"{}<button data-href="?page=2">Show more reviews</button>"#,
        card("one", "May 1, 2023")
    );
    let second = format!("{}{}", card("one", "May 1, 2023"), card("two", "May 2, 2023"));

    let browser = FixtureBrowser::new()
        .page(search, r#"<a href="/p/42/Acme/">Acme</a>"#)
        .page(product, "<h1>Acme</h1>")
        .page(reviews, first)
        .page(more, second);
    let settings = settings();

    let report = ReviewHarvester::new(&browser, &settings)
        .run(&request(SourceSelection::Only(vec![SourceId::Capterra])))
        .await
        .unwrap();

    let got: Vec<_> = report
        .reviews
        .iter()
        .map(|r| (r.title.as_str(), r.date.as_str()))
        .collect();
    assert_eq!(
        got,
        vec![("one", "Written on May 1, 2023"), ("two", "Written on May 2, 2023")]
    );
}

#[tokio::test]
async fn empty_company_is_rejected_before_any_session() {
    let browser = FixtureBrowser::new();
    let settings = settings();
    let mut req = request(SourceSelection::All);
    req.company = "   ".into();
    assert!(ReviewHarvester::new(&browser, &settings).run(&req).await.is_err());
    assert_eq!(browser.opened(), 0);
}
