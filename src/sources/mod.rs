//! Per-source capability: how to find a product's review listing, how to
//! read it and how to page through it.

mod builtin;
mod profile;

pub use builtin::builtin_profile;
pub use profile::{Discovery, SourceProfile, fill_query, fill_slug, slug};

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::dates::DateNormalizer;
use crate::driver::PageSession;
use crate::error::ProfileError;
use crate::extract::ExtractionAdapter;
use crate::model::SourceId;
use crate::paginate::PaginationDriver;

/// What the controller needs from one review site.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// Navigates `session` to the product's review listing.
    ///
    /// `Ok(None)` means the product could not be located (no search hit,
    /// 404, redirect away from the reviews view). On `Ok(Some(_))` the
    /// session is left on the listing page.
    async fn resolve_listing(
        &self,
        session: &mut dyn PageSession,
        company: &str,
        timeout: Duration,
    ) -> Result<Option<Url>>;

    fn adapter(&self) -> &ExtractionAdapter;
    fn pagination(&self) -> &PaginationDriver;
    fn dates(&self) -> &DateNormalizer;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SourceOptions {
    pub polite_delay: Duration,
    /// Harvest the product page itself when its reviews view is missing.
    pub fallback_to_product_page: bool,
}

/// A [`ReviewSource`] driven entirely by a [`SourceProfile`].
#[derive(Debug)]
pub struct ProfiledSource {
    id: SourceId,
    discovery: Discovery,
    adapter: ExtractionAdapter,
    pagination: PaginationDriver,
    dates: DateNormalizer,
    fallback_to_product_page: bool,
}

impl ProfiledSource {
    pub fn from_profile(
        id: SourceId,
        profile: &SourceProfile,
        opts: SourceOptions,
    ) -> Result<Self, ProfileError> {
        profile.discovery.validate()?;
        Ok(Self {
            id,
            discovery: profile.discovery.clone(),
            adapter: ExtractionAdapter::compile(&profile.extraction)?,
            pagination: PaginationDriver::new(&profile.pagination, opts.polite_delay)?,
            dates: DateNormalizer::new(
                profile.date_noise_prefixes.clone(),
                profile.date_patterns.clone(),
            ),
            fallback_to_product_page: opts.fallback_to_product_page,
        })
    }

    pub fn builtin(id: SourceId, opts: SourceOptions) -> Result<Self, ProfileError> {
        Self::from_profile(id, &builtin_profile(id), opts)
    }

    async fn open_listing(
        &self,
        session: &mut dyn PageSession,
        url: &Url,
        timeout: Duration,
    ) -> Result<Option<Url>> {
        let nav = session
            .navigate(url, timeout)
            .await
            .with_context(|| format!("opening listing {url}"))?;
        if nav.is_not_found() {
            info!(source = %self.id, url = %url, "no review listing for product");
            return Ok(None);
        }
        session.wait_for_network_idle().await?;
        Ok(Some(nav.final_url))
    }

    async fn search_listing(
        &self,
        session: &mut dyn PageSession,
        company: &str,
        timeout: Duration,
        search_url: &str,
        product_link_contains: &str,
        reviews_suffix: &str,
    ) -> Result<Option<Url>> {
        let search = fill_query(search_url, company).context("building search url")?;
        let nav = session
            .navigate(&search, timeout)
            .await
            .with_context(|| format!("opening search {search}"))?;
        session.wait_for_network_idle().await?;
        let markup = session.current_markup().await?;

        let Some(product) = find_product_link(&markup, &nav.final_url, product_link_contains)
        else {
            info!(source = %self.id, company, "no product link in search results");
            return Ok(None);
        };
        debug!(source = %self.id, product = %product, "product page found");

        let nav = session
            .navigate(&product, timeout)
            .await
            .with_context(|| format!("opening product page {product}"))?;
        if nav.is_not_found() {
            info!(source = %self.id, url = %product, "product page not found");
            return Ok(None);
        }
        session.wait_for_network_idle().await?;

        let reviews = product.join(reviews_suffix).context("building reviews url")?;
        let nav = session
            .navigate(&reviews, timeout)
            .await
            .with_context(|| format!("opening reviews {reviews}"))?;
        if !nav.is_not_found() && nav.final_url == reviews {
            session.wait_for_network_idle().await?;
            return Ok(Some(reviews));
        }

        if self.fallback_to_product_page {
            info!(source = %self.id, url = %product, "reviews view unavailable, using product page");
            return self.open_listing(session, &product, timeout).await;
        }
        info!(
            source = %self.id,
            url = %reviews,
            status = nav.status,
            final_url = %nav.final_url,
            "reviews view unavailable"
        );
        Ok(None)
    }
}

#[async_trait]
impl ReviewSource for ProfiledSource {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn resolve_listing(
        &self,
        session: &mut dyn PageSession,
        company: &str,
        timeout: Duration,
    ) -> Result<Option<Url>> {
        match &self.discovery {
            Discovery::Direct { listing_url } => {
                let url = fill_slug(listing_url, company).context("building listing url")?;
                self.open_listing(session, &url, timeout).await
            }
            Discovery::Search {
                search_url,
                product_link_contains,
                reviews_suffix,
            } => {
                self.search_listing(
                    session,
                    company,
                    timeout,
                    search_url,
                    product_link_contains,
                    reviews_suffix,
                )
                .await
            }
        }
    }

    fn adapter(&self) -> &ExtractionAdapter {
        &self.adapter
    }

    fn pagination(&self) -> &PaginationDriver {
        &self.pagination
    }

    fn dates(&self) -> &DateNormalizer {
        &self.dates
    }
}

// -------------------------
// Search helpers
// -------------------------

/// First `<a href>` whose href contains `needle`, made absolute against
/// `base`, with query and fragment dropped and a trailing slash so relative
/// suffixes join below it.
pub fn find_product_link(markup: &str, base: &Url, needle: &str) -> Option<Url> {
    let doc = Html::parse_document(markup);
    let anchors = Selector::parse("a[href]").ok()?;
    let href = doc
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .find(|h| h.contains(needle))?;
    let mut url = base.join(href.trim()).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Some(url)
}
