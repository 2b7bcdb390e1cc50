//! Browser capability boundary.
//!
//! The harvesting engine only ever talks to a [`PageSession`]: navigate,
//! wait for the network to settle, read the rendered markup, look up an
//! interactive control and click it. Which technology sits behind that is
//! the driver's business.

#[cfg(any(test, feature = "testing"))]
pub mod fixture;
pub mod http;

#[cfg(feature = "chromium")]
pub mod chromium;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::DriverError;
use crate::extract::element_text;

/// Outcome of a top-level navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub status: u16,
    /// URL after redirects.
    pub final_url: Url,
}

impl Navigation {
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Lookup for a clickable control: a CSS selector, optionally narrowed to
/// elements whose text contains `text` (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSelector {
    pub css: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ControlSelector {
    pub fn css(css: &str) -> Self {
        Self {
            css: css.to_string(),
            text: None,
        }
    }

    pub fn with_text(css: &str, text: &str) -> Self {
        Self {
            css: css.to_string(),
            text: Some(text.to_string()),
        }
    }
}

/// A control found on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    /// The selector that matched.
    pub selector: String,
    pub visible: bool,
    pub enabled: bool,
    /// Where activating the control leads, when the markup says so.
    pub target: Option<Url>,
}

impl Control {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// One open page. Exactly one exists per source run and it must be closed
/// on every exit path.
#[async_trait]
pub trait PageSession: Send {
    async fn navigate(&mut self, url: &Url, timeout: Duration) -> Result<Navigation, DriverError>;
    async fn wait_for_network_idle(&mut self) -> Result<(), DriverError>;
    async fn current_markup(&mut self) -> Result<String, DriverError>;
    async fn query_interactive(
        &mut self,
        selectors: &[ControlSelector],
    ) -> Result<Option<Control>, DriverError>;
    async fn click(&mut self, control: &Control) -> Result<(), DriverError>;
    async fn close(self: Box<Self>) -> Result<(), DriverError>;
}

#[async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageSession>, DriverError>;
}

// -------------------------
// Markup-level control lookup
// -------------------------

/// Finds the first element matching any selector, in selector order, and
/// reads its visibility, enabled state and navigation target from the
/// markup alone. Used by drivers that do not run scripts.
pub fn find_control(markup: &str, selectors: &[ControlSelector], base: &Url) -> Option<Control> {
    let doc = Html::parse_document(markup);
    for wanted in selectors {
        let Ok(sel) = Selector::parse(&wanted.css) else {
            continue;
        };
        let needle = wanted.text.as_deref().map(str::to_lowercase);
        let hit = doc.select(&sel).find(|el| match &needle {
            Some(n) => element_text(*el).to_lowercase().contains(n.as_str()),
            None => true,
        });
        if let Some(el) = hit {
            return Some(Control {
                selector: wanted.css.clone(),
                visible: is_visible(el),
                enabled: is_enabled(el),
                target: control_target(el, base),
            });
        }
    }
    None
}

fn is_visible(el: ElementRef<'_>) -> bool {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .all(|e| {
            let v = e.value();
            let style = v
                .attr("style")
                .unwrap_or_default()
                .replace(' ', "")
                .to_ascii_lowercase();
            v.attr("hidden").is_none()
                && v.attr("aria-hidden") != Some("true")
                && !style.contains("display:none")
                && !style.contains("visibility:hidden")
        })
}

fn is_enabled(el: ElementRef<'_>) -> bool {
    let v = el.value();
    v.attr("disabled").is_none()
        && v.attr("aria-disabled") != Some("true")
        && !v.classes().any(|c| c == "disabled")
}

fn control_target(el: ElementRef<'_>, base: &Url) -> Option<Url> {
    let v = el.value();
    let raw = v
        .attr("href")
        .or_else(|| v.attr("data-href"))
        .or_else(|| v.attr("formaction"))?
        .trim();
    if raw.is_empty() || raw.starts_with('#') || raw.starts_with("javascript:") {
        return None;
    }
    base.join(raw).ok()
}
