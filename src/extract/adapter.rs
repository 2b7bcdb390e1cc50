use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::strategy::{FieldPlan, FieldStrategy, compile_selector};
use crate::error::ProfileError;
use crate::model::ReviewCandidate;

pub const NO_TITLE: &str = "No Title";

/// Site knowledge for pulling reviews out of a listing page.
///
/// `fragments` are alternative selectors for a whole review; the first one
/// matching anything on the page is used. Field lists are tried in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionProfile {
    pub fragments: Vec<String>,
    #[serde(default)]
    pub title: Vec<FieldStrategy>,
    #[serde(default)]
    pub body: Vec<FieldStrategy>,
    #[serde(default)]
    pub date: Vec<FieldStrategy>,
    #[serde(default)]
    pub rating: Vec<FieldStrategy>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FragmentError {
    #[error("fragment carries no review fields")]
    Empty,
}

#[derive(Debug)]
pub struct ExtractionAdapter {
    fragments: Vec<Selector>,
    title: FieldPlan,
    body: FieldPlan,
    date: FieldPlan,
    rating: FieldPlan,
}

impl ExtractionAdapter {
    pub fn compile(profile: &ExtractionProfile) -> Result<Self, ProfileError> {
        if profile.fragments.is_empty() {
            return Err(ProfileError::EmptyPlan("fragments"));
        }
        let fragments = profile
            .fragments
            .iter()
            .map(|s| compile_selector(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            fragments,
            title: FieldPlan::compile(&profile.title)?,
            body: FieldPlan::compile(&profile.body)?,
            date: FieldPlan::compile(&profile.date)?,
            rating: FieldPlan::compile(&profile.rating)?,
        })
    }

    /// All review candidates on one rendered page, in document order.
    ///
    /// Each missing field falls back to its own default (`No Title`, empty
    /// body, empty date, no rating). A fragment where every field would fall
    /// back counts as malformed and is dropped instead of being emitted as an
    /// all-default review. A malformed fragment is skipped on its own; the
    /// rest of the page is still returned.
    pub fn extract(&self, markup: &str) -> Vec<ReviewCandidate> {
        let doc = Html::parse_document(markup);
        let fragments = self
            .fragments
            .iter()
            .map(|sel| doc.select(sel).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        let mut out = Vec::with_capacity(fragments.len());
        for (index, fragment) in fragments.into_iter().enumerate() {
            match self.extract_fragment(fragment) {
                Ok(candidate) => out.push(candidate),
                Err(e) => debug!(index, error = %e, "skipping review fragment"),
            }
        }
        out
    }

    fn extract_fragment(&self, fragment: ElementRef<'_>) -> Result<ReviewCandidate, FragmentError> {
        let title = self.title.first_text(fragment);
        let description = self.body.first_text(fragment);
        let raw_date = self.date.first_text(fragment);
        let rating = self.rating.first_map(fragment, parse_rating);

        if title.is_none() && description.is_none() && raw_date.is_none() && rating.is_none() {
            return Err(FragmentError::Empty);
        }

        Ok(ReviewCandidate {
            title: title.unwrap_or_else(|| NO_TITLE.to_string()),
            description: description.unwrap_or_default(),
            raw_date: raw_date.unwrap_or_default(),
            rating,
        })
    }
}

/// First number in a rating label such as `4.5 out of 5` or `4,5/5`.
pub fn parse_rating(s: &str) -> Option<f64> {
    s.split(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .filter(|t| t.chars().any(|c| c.is_ascii_digit()))
        .find_map(|t| t.trim_matches(|c| c == '.' || c == ',').replace(',', ".").parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
