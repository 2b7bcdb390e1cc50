use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::Date;

use crate::dates::{DateNormalizer, iso_date};
use crate::error::WindowError;

// -------------------------
// Sources
// -------------------------

/// Review site a record was harvested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceId {
    G2,
    Capterra,
    TrustRadius,
}

impl SourceId {
    /// Processing order used when every source is selected.
    pub const ALL: [SourceId; 3] = [SourceId::G2, SourceId::Capterra, SourceId::TrustRadius];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::G2 => "G2",
            SourceId::Capterra => "Capterra",
            SourceId::TrustRadius => "TrustRadius",
        }
    }

    /// Lower-case key used on the command line and in config tables.
    pub fn key(self) -> &'static str {
        match self {
            SourceId::G2 => "g2",
            SourceId::Capterra => "capterra",
            SourceId::TrustRadius => "trustradius",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "g2" => Ok(SourceId::G2),
            "capterra" => Ok(SourceId::Capterra),
            "trustradius" | "trust-radius" => Ok(SourceId::TrustRadius),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

// -------------------------
// Date window
// -------------------------

/// Inclusive calendar range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    #[serde(with = "iso_date")]
    start: Date,
    #[serde(with = "iso_date")]
    end: Date,
}

impl DateWindow {
    pub fn new(start: Date, end: Date) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds a window from two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, WindowError> {
        let start = parse_cli_date(start)?;
        let end = parse_cli_date(end)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

fn parse_cli_date(s: &str) -> Result<Date, WindowError> {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(s.trim(), format).map_err(|_| WindowError::Malformed(s.to_string()))
}

// -------------------------
// Reviews
// -------------------------

/// Field values pulled out of one listing fragment, before any date work.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewCandidate {
    pub title: String,
    pub description: String,
    pub raw_date: String,
    pub rating: Option<f64>,
}

/// A harvested review plus its derived calendar date.
///
/// Immutable once built: `parsed_date` is computed from `raw_date` by
/// [`RawReview::from_candidate`] and never set on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawReview {
    source: SourceId,
    title: String,
    description: String,
    raw_date: String,
    #[serde(with = "iso_date::option")]
    parsed_date: Option<Date>,
    rating: Option<f64>,
}

impl RawReview {
    pub fn from_candidate(
        source: SourceId,
        candidate: ReviewCandidate,
        normalizer: &DateNormalizer,
    ) -> Self {
        let parsed_date = normalizer.normalize(&candidate.raw_date).ok();
        Self {
            source,
            title: candidate.title,
            description: candidate.description,
            raw_date: candidate.raw_date,
            parsed_date,
            rating: candidate.rating,
        }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn raw_date(&self) -> &str {
        &self.raw_date
    }

    pub fn parsed_date(&self) -> Option<Date> {
        self.parsed_date
    }

    pub fn rating(&self) -> Option<f64> {
        self.rating
    }

    /// Identity used for duplicate detection. `parsed_date` is derived and
    /// therefore left out.
    pub fn key(&self) -> ReviewKey {
        ReviewKey {
            source: self.source,
            title: self.title.clone(),
            description: self.description.clone(),
            raw_date: self.raw_date.clone(),
            rating_bits: self.rating.map(f64::to_bits),
        }
    }

    pub fn into_final(self) -> FinalReview {
        FinalReview {
            source: self.source,
            title: self.title,
            description: self.description,
            date: self.raw_date,
            rating: self.rating,
        }
    }
}

/// Hashable equality key over the externally visible review fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReviewKey {
    source: SourceId,
    title: String,
    description: String,
    raw_date: String,
    rating_bits: Option<u64>,
}

/// The record handed to callers: no derived or internal fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReview {
    pub source: SourceId,
    pub title: String,
    pub description: String,
    pub date: String,
    pub rating: Option<f64>,
}

/// Reviews produced by one source run, in discovery order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarvestResult {
    pub source: SourceId,
    pub reviews: Vec<RawReview>,
}

impl HarvestResult {
    pub fn empty(source: SourceId) -> Self {
        Self {
            source,
            reviews: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}
