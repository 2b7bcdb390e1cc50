//! Multi-source run: sources one after another, then one merge.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

use crate::config::Settings;
use crate::driver::Browser;
use crate::harvest::HarvestController;
use crate::merge::merge;
use crate::model::{DateWindow, FinalReview, HarvestResult, SourceId};
use crate::sources::ReviewSource;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceSelection {
    #[default]
    All,
    Only(Vec<SourceId>),
}

impl SourceSelection {
    /// Selected sources in processing order, each once.
    pub fn ids(&self) -> Vec<SourceId> {
        match self {
            SourceSelection::All => SourceId::ALL.to_vec(),
            SourceSelection::Only(ids) => SourceId::ALL
                .into_iter()
                .filter(|id| ids.contains(id))
                .collect(),
        }
    }
}

impl FromStr for SourceSelection {
    type Err = String;

    /// `all`, or a comma-separated list of source keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(SourceSelection::All);
        }
        let ids = s
            .split(',')
            .filter(|p| !p.trim().is_empty())
            .map(SourceId::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        if ids.is_empty() {
            return Err("no source selected".to_string());
        }
        Ok(SourceSelection::Only(ids))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestRequest {
    pub company: String,
    pub window: DateWindow,
    pub selection: SourceSelection,
    pub headless: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTally {
    pub source: SourceId,
    pub collected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarvestReport {
    pub per_source: Vec<SourceTally>,
    pub reviews: Vec<FinalReview>,
}

pub struct ReviewHarvester<'a> {
    browser: &'a dyn Browser,
    settings: &'a Settings,
}

impl<'a> ReviewHarvester<'a> {
    pub fn new(browser: &'a dyn Browser, settings: &'a Settings) -> Self {
        Self { browser, settings }
    }

    pub async fn run(&self, req: &HarvestRequest) -> Result<HarvestReport> {
        self.run_with_progress(req, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_source` as each source finishes.
    ///
    /// Profiles are compiled before any page is opened, so a broken profile
    /// fails the whole request up front. Once harvesting starts, a failing
    /// source only contributes nothing.
    pub async fn run_with_progress(
        &self,
        req: &HarvestRequest,
        mut on_source: impl FnMut(&SourceTally),
    ) -> Result<HarvestReport> {
        let company = req.company.trim();
        if company.is_empty() {
            bail!("company name is empty");
        }

        let sources = req
            .selection
            .ids()
            .into_iter()
            .map(|id| self.settings.build_source(id))
            .collect::<Result<Vec<_>, _>>()?;

        let controller = HarvestController::new(self.browser, self.settings.nav_timeout())
            .with_max_reviews(self.settings.max_reviews);

        let mut results: Vec<HarvestResult> = Vec::with_capacity(sources.len());
        let mut per_source = Vec::with_capacity(sources.len());
        for source in &sources {
            let result = controller.harvest(source, company, &req.window).await;
            let tally = SourceTally {
                source: source.id(),
                collected: result.len(),
            };
            on_source(&tally);
            per_source.push(tally);
            results.push(result);
        }

        let reviews = merge(&results, &req.window);
        info!(
            company,
            sources = per_source.len(),
            total = reviews.len(),
            headless = req.headless,
            "harvest complete"
        );
        Ok(HarvestReport { per_source, reviews })
    }
}
