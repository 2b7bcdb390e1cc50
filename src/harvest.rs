//! One source, end to end.
//!
//! The controller opens exactly one page session per source, walks the
//! listing until pagination stops or the safety cap trips, and closes the
//! session whatever happened. Failures never leave this module: the caller
//! gets an empty [`HarvestResult`] and a `warn!` record instead.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::driver::{Browser, PageSession};
use crate::merge::is_included;
use crate::model::{DateWindow, HarvestResult, RawReview};
use crate::paginate::PaginationState;
use crate::sources::ReviewSource;

/// Default hard stop: a source is abandoned once more than this many
/// review fragments have been read from its pages, kept or not.
pub const HARD_REVIEW_CAP: usize = 200;

pub struct HarvestController<'a> {
    browser: &'a dyn Browser,
    nav_timeout: Duration,
    max_reviews: usize,
}

impl<'a> HarvestController<'a> {
    pub fn new(browser: &'a dyn Browser, nav_timeout: Duration) -> Self {
        Self {
            browser,
            nav_timeout,
            max_reviews: HARD_REVIEW_CAP,
        }
    }

    pub fn with_max_reviews(mut self, max_reviews: usize) -> Self {
        self.max_reviews = max_reviews;
        self
    }

    pub async fn harvest(
        &self,
        source: &dyn ReviewSource,
        company: &str,
        window: &DateWindow,
    ) -> HarvestResult {
        let id = source.id();
        info!(source = %id, company, "harvest start");

        let mut session = match self.browser.open().await {
            Ok(s) => s,
            Err(e) => {
                warn!(source = %id, error = %e, "could not open browser session");
                return HarvestResult::empty(id);
            }
        };

        let outcome = self.run(session.as_mut(), source, company, window).await;

        if let Err(e) = session.close().await {
            warn!(source = %id, error = %e, "closing browser session failed");
        }

        match outcome {
            Ok(result) => {
                info!(source = %id, count = result.len(), "harvest finished");
                result
            }
            Err(e) => {
                warn!(source = %id, error = format!("{e:#}"), "source failed, returning no reviews");
                HarvestResult::empty(id)
            }
        }
    }

    async fn run(
        &self,
        session: &mut dyn PageSession,
        source: &dyn ReviewSource,
        company: &str,
        window: &DateWindow,
    ) -> Result<HarvestResult> {
        let id = source.id();
        let mut result = HarvestResult::empty(id);

        let Some(listing) = source
            .resolve_listing(session, company, self.nav_timeout)
            .await
            .context("resolving review listing")?
        else {
            return Ok(result);
        };
        debug!(source = %id, url = %listing, "listing resolved");

        let mut seen = HashSet::new();
        let mut page = 1usize;
        // every extracted fragment counts, filtered and repeated ones included
        let mut fetched = 0usize;
        loop {
            let markup = session
                .current_markup()
                .await
                .with_context(|| format!("reading page {page}"))?;
            let candidates = source.adapter().extract(&markup);
            let found = candidates.len();
            fetched += found;

            let mut added = 0usize;
            for candidate in candidates {
                let review = RawReview::from_candidate(id, candidate, source.dates());
                if !is_included(&review, window) {
                    continue;
                }
                if seen.insert(review.key()) {
                    result.reviews.push(review);
                    added += 1;
                }
            }
            debug!(source = %id, page, found, added, fetched, total = result.len(), "page harvested");

            if fetched > self.max_reviews {
                info!(
                    source = %id,
                    fetched,
                    total = result.len(),
                    cap = self.max_reviews,
                    "safety cap reached"
                );
                break;
            }

            match source.pagination().advance(session).await {
                PaginationState::HasMore => page += 1,
                state => {
                    debug!(source = %id, page, state = ?state, "pagination finished");
                    break;
                }
            }
        }

        Ok(result)
    }
}
