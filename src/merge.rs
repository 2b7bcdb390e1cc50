use std::collections::HashSet;

use crate::model::{DateWindow, FinalReview, HarvestResult, RawReview};

/// Reviews with a parsed date must fall inside the window; reviews whose
/// date could not be parsed are always kept.
pub fn is_included(review: &RawReview, window: &DateWindow) -> bool {
    match review.parsed_date() {
        Some(d) => window.contains(d),
        None => true,
    }
}

/// Concatenates results in the given order, filters by window, drops later
/// exact duplicates and strips the derived fields.
pub fn merge<'a, I>(results: I, window: &DateWindow) -> Vec<FinalReview>
where
    I: IntoIterator<Item = &'a HarvestResult>,
{
    let mut seen = HashSet::new();
    results
        .into_iter()
        .flat_map(|r| r.reviews.iter())
        .filter(|r| is_included(r, window))
        .filter(|r| seen.insert(r.key()))
        .map(|r| r.clone().into_final())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::DateNormalizer;
    use crate::model::{ReviewCandidate, SourceId};

    fn review(source: SourceId, title: &str, date: &str) -> RawReview {
        RawReview::from_candidate(
            source,
            ReviewCandidate {
                title: title.into(),
                description: "d".into(),
                raw_date: date.into(),
                rating: Some(4.0),
            },
            &DateNormalizer::default(),
        )
    }

    fn window() -> DateWindow {
        DateWindow::parse("2023-01-01", "2023-12-31").unwrap()
    }

    #[test]
    fn window_filters_only_parsed_dates() {
        let w = window();
        assert!(is_included(&review(SourceId::G2, "a", "March 3, 2023"), &w));
        assert!(!is_included(&review(SourceId::G2, "b", "March 3, 2022"), &w));
        assert!(is_included(&review(SourceId::G2, "c", ""), &w));
        assert!(is_included(&review(SourceId::G2, "d", "not a date"), &w));
    }

    #[test]
    fn first_occurrence_wins_across_sources() {
        let g2 = HarvestResult {
            source: SourceId::G2,
            reviews: vec![
                review(SourceId::G2, "a", "March 3, 2023"),
                review(SourceId::G2, "a", "March 3, 2023"),
            ],
        };
        let capterra = HarvestResult {
            source: SourceId::Capterra,
            reviews: vec![
                review(SourceId::Capterra, "a", "March 3, 2023"),
                review(SourceId::Capterra, "b", "2023-05-01"),
            ],
        };
        let out = merge([&g2, &capterra], &window());
        let got: Vec<_> = out.iter().map(|r| (r.source, r.title.as_str())).collect();
        assert_eq!(
            got,
            vec![(SourceId::G2, "a"), (SourceId::Capterra, "a"), (SourceId::Capterra, "b")]
        );
    }

    #[test]
    fn merging_twice_is_identical() {
        let input = vec![HarvestResult {
            source: SourceId::TrustRadius,
            reviews: vec![
                review(SourceId::TrustRadius, "x", "July 1, 2023"),
                review(SourceId::TrustRadius, "y", "Written on"),
                review(SourceId::TrustRadius, "x", "July 1, 2023"),
                review(SourceId::TrustRadius, "z", "July 1, 2021"),
            ],
        }];
        let first = merge(&input, &window());
        let second = merge(&input, &window());
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }
}
