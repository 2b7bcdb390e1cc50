//! Free-text review dates → calendar dates.
//!
//! Patterns are tried in the order they were configured and the first full
//! match wins. Nothing is inferred past that order: a string matching no
//! pattern is reported as [`UnparseableDate`], never coerced.
//!
//! Default priority (every built-in profile keeps this shape):
//! 1. the site's month-name format(s), `October 12, 2023` / `Oct 12, 2023`
//! 2. ISO `2023-10-12`
//! 3. day/month/year `12/10/2023` (read as 12 October, never as December 10)

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

const LONG_MONTH: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:long case_sensitive:false] [day padding:none], [year]");
const SHORT_MONTH: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short case_sensitive:false] [day padding:none], [year]");
const ISO: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DAY_MONTH_YEAR: &[BorrowedFormatItem<'static>] =
    format_description!("[day padding:none]/[month padding:none]/[year]");

pub const DEFAULT_NOISE_PREFIXES: [&str; 2] = ["Written on", "Written"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unparseable date: {input:?}")]
pub struct UnparseableDate {
    pub input: String,
}

/// One accepted textual date shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePattern {
    /// `October 12, 2023`
    LongMonth,
    /// `Oct 12, 2023`
    ShortMonth,
    /// `2023-10-12`
    Iso,
    /// `12/10/2023` as day/month/year.
    DayMonthYear,
}

impl DatePattern {
    pub fn format(self) -> &'static [BorrowedFormatItem<'static>] {
        match self {
            DatePattern::LongMonth => LONG_MONTH,
            DatePattern::ShortMonth => SHORT_MONTH,
            DatePattern::Iso => ISO,
            DatePattern::DayMonthYear => DAY_MONTH_YEAR,
        }
    }

    pub fn parse(self, s: &str) -> Option<Date> {
        Date::parse(s, self.format()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateNormalizer {
    noise_prefixes: Vec<String>,
    patterns: Vec<DatePattern>,
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(
            DEFAULT_NOISE_PREFIXES.iter().map(|s| s.to_string()).collect(),
            vec![
                DatePattern::LongMonth,
                DatePattern::ShortMonth,
                DatePattern::Iso,
                DatePattern::DayMonthYear,
            ],
        )
    }
}

impl DateNormalizer {
    pub fn new(mut noise_prefixes: Vec<String>, patterns: Vec<DatePattern>) -> Self {
        // "Written on" must be tried before "Written"
        noise_prefixes.sort_by_key(|p| std::cmp::Reverse(p.len()));
        Self {
            noise_prefixes,
            patterns,
        }
    }

    pub fn patterns(&self) -> &[DatePattern] {
        &self.patterns
    }

    pub fn normalize(&self, raw: &str) -> Result<Date, UnparseableDate> {
        let cleaned = self.clean(raw);
        if cleaned.is_empty() {
            return Err(UnparseableDate {
                input: raw.to_string(),
            });
        }
        self.patterns
            .iter()
            .find_map(|p| p.parse(&cleaned))
            .ok_or(UnparseableDate { input: cleaned })
    }

    /// Collapses whitespace and drops one leading noise prefix.
    pub fn clean(&self, raw: &str) -> String {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        for prefix in &self.noise_prefixes {
            let head = collapsed.get(..prefix.len());
            if head.is_some_and(|h| h.eq_ignore_ascii_case(prefix)) {
                return collapsed[prefix.len()..].trim().to_string();
            }
        }
        collapsed
    }
}
