use serde::{Deserialize, Serialize};
use url::Url;

use crate::dates::{DEFAULT_NOISE_PREFIXES, DatePattern};
use crate::error::ProfileError;
use crate::extract::ExtractionProfile;
use crate::paginate::PaginationProfile;

/// Everything site-specific about one source. Replaceable from config
/// without touching the harvesting code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceProfile {
    pub discovery: Discovery,
    pub extraction: ExtractionProfile,
    pub pagination: PaginationProfile,
    #[serde(default = "default_patterns")]
    pub date_patterns: Vec<DatePattern>,
    #[serde(default = "default_noise_prefixes")]
    pub date_noise_prefixes: Vec<String>,
}

fn default_patterns() -> Vec<DatePattern> {
    vec![DatePattern::LongMonth, DatePattern::Iso, DatePattern::DayMonthYear]
}

fn default_noise_prefixes() -> Vec<String> {
    DEFAULT_NOISE_PREFIXES.iter().map(|s| s.to_string()).collect()
}

/// How the listing page of a product is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discovery {
    /// Listing URL derived from the product slug (`{slug}` placeholder).
    Direct { listing_url: String },
    /// Search (`{query}` placeholder), follow the first link whose href
    /// contains `product_link_contains`, then open `reviews_suffix` below it.
    Search {
        search_url: String,
        product_link_contains: String,
        reviews_suffix: String,
    },
}

impl Discovery {
    pub fn validate(&self) -> Result<(), ProfileError> {
        match self {
            Discovery::Direct { listing_url } => check_template(listing_url, "{slug}"),
            Discovery::Search { search_url, .. } => check_template(search_url, "{query}"),
        }
    }
}

fn check_template(template: &str, placeholder: &str) -> Result<(), ProfileError> {
    if !template.contains(placeholder) {
        return Err(ProfileError::Template {
            template: template.to_string(),
            reason: format!("missing {placeholder}"),
        });
    }
    Url::parse(&template.replace(placeholder, "x"))
        .map(|_| ())
        .map_err(|e| ProfileError::Template {
            template: template.to_string(),
            reason: e.to_string(),
        })
}

/// `"Acme Cloud"` → `"acme-cloud"`.
pub fn slug(company: &str) -> String {
    company.trim().to_lowercase().replace(' ', "-")
}

pub fn fill_slug(template: &str, company: &str) -> Result<Url, url::ParseError> {
    Url::parse(&template.replace("{slug}", &slug(company)))
}

pub fn fill_query(template: &str, company: &str) -> Result<Url, url::ParseError> {
    let query: String = url::form_urlencoded::byte_serialize(company.trim().as_bytes()).collect();
    Url::parse(&template.replace("{query}", &query))
}
