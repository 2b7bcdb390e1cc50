use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::driver::{ControlSelector, PageSession};
use crate::error::ProfileError;
use crate::extract::compile_selector;

/// How a source reveals its next batch of reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStyle {
    /// Discrete pages behind a "Next" link or button. Any change of markup
    /// after the click counts as a new page.
    NextPage,
    /// One page that grows when a "Show more" expander is clicked. A click
    /// that does not grow the page ends pagination.
    ShowMore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationProfile {
    pub style: PaginationStyle,
    /// Candidate controls in priority order.
    pub controls: Vec<ControlSelector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    HasMore,
    /// Terminal, nothing left to reveal.
    Exhausted,
    /// Terminal, the control could not be driven. Not propagated.
    Error,
}

#[derive(Debug, Clone)]
pub struct PaginationDriver {
    style: PaginationStyle,
    controls: Vec<ControlSelector>,
    polite_delay: Duration,
}

impl PaginationDriver {
    pub fn new(profile: &PaginationProfile, polite_delay: Duration) -> Result<Self, ProfileError> {
        for c in &profile.controls {
            compile_selector(&c.css)?;
        }
        Ok(Self {
            style: profile.style,
            controls: profile.controls.clone(),
            polite_delay,
        })
    }

    pub fn style(&self) -> PaginationStyle {
        self.style
    }

    /// Whether the markup after a click shows a new batch.
    ///
    /// A next-page click only has to land on different markup. An expander
    /// appends to the page it sits on, so it must leave the page larger.
    fn progressed(&self, before: &str, after: &str) -> bool {
        match self.style {
            PaginationStyle::NextPage => after != before,
            PaginationStyle::ShowMore => after.len() > before.len(),
        }
    }

    /// Tries to reveal the next batch on the session's current page.
    ///
    /// Absent, hidden or disabled controls end pagination as `Exhausted`, as
    /// does a click that reveals nothing new for the driver's style (see
    /// [`PaginationStyle`]). Any driver failure ends it as `Error`.
    pub async fn advance(&self, session: &mut dyn PageSession) -> PaginationState {
        let before = match session.current_markup().await {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "no page to paginate");
                return PaginationState::Error;
            }
        };

        let control = match session.query_interactive(&self.controls).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                debug!(style = ?self.style, "no pagination control on page");
                return PaginationState::Exhausted;
            }
            Err(e) => {
                warn!(error = %e, "pagination control lookup failed");
                return PaginationState::Error;
            }
        };

        if !control.is_visible() || !control.is_enabled() {
            debug!(
                selector = %control.selector,
                visible = control.is_visible(),
                enabled = control.is_enabled(),
                "pagination control not interactable"
            );
            return PaginationState::Exhausted;
        }

        if let Err(e) = session.click(&control).await {
            warn!(selector = %control.selector, error = %e, "pagination click failed");
            return PaginationState::Error;
        }
        if let Err(e) = session.wait_for_network_idle().await {
            warn!(error = %e, "page did not settle after pagination");
            return PaginationState::Error;
        }
        if !self.polite_delay.is_zero() {
            sleep(self.polite_delay).await;
        }

        match session.current_markup().await {
            Ok(after) if self.progressed(&before, &after) => PaginationState::HasMore,
            Ok(_) => {
                debug!(style = ?self.style, "pagination revealed nothing new");
                PaginationState::Exhausted
            }
            Err(e) => {
                warn!(error = %e, "page lost after pagination");
                PaginationState::Error
            }
        }
    }
}
