//! In-memory driver serving canned markup per URL.
//!
//! Behaves like the HTTP driver (controls are read from markup, clicks
//! follow their target) but never touches the network. It also counts
//! opened and closed sessions so callers can check cleanup.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use super::{Browser, Control, ControlSelector, Navigation, PageSession, find_control};
use crate::error::DriverError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixturePage {
    pub status: u16,
    pub markup: String,
    /// Serve this page as if the request had been redirected here.
    pub redirect_to: Option<String>,
}

impl FixturePage {
    pub fn ok(markup: impl Into<String>) -> Self {
        Self {
            status: 200,
            markup: markup.into(),
            redirect_to: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            markup: "<html><body>Not found</body></html>".to_string(),
            redirect_to: None,
        }
    }
}

type Generator = dyn Fn(&Url) -> Option<FixturePage> + Send + Sync;

#[derive(Default)]
struct FixtureState {
    pages: Mutex<HashMap<String, FixturePage>>,
    failing: Mutex<HashSet<String>>,
    generator: Mutex<Option<Arc<Generator>>>,
    refuse_open: Mutex<bool>,
    visits: Mutex<Vec<String>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct FixtureBrowser {
    state: Arc<FixtureState>,
}

fn key(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

impl FixtureBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, markup: impl Into<String>) -> Self {
        self.with(url, FixturePage::ok(markup))
    }

    pub fn with(self, url: &str, page: FixturePage) -> Self {
        lock(&self.state.pages).insert(key(url), page);
        self
    }

    pub fn not_found(self, url: &str) -> Self {
        self.with(url, FixturePage::not_found())
    }

    /// Requests for `from` end up at `to` with `to`'s markup.
    pub fn redirect(self, from: &str, to: &str) -> Self {
        let target = lock(&self.state.pages)
            .get(&key(to))
            .map(|p| p.markup.clone())
            .unwrap_or_default();
        self.with(
            from,
            FixturePage {
                status: 200,
                markup: target,
                redirect_to: Some(key(to)),
            },
        )
    }

    /// Navigating to `url` fails with a network error.
    pub fn failing(self, url: &str) -> Self {
        lock(&self.state.failing).insert(key(url));
        self
    }

    /// Fallback for URLs without a registered page.
    pub fn generated(
        self,
        f: impl Fn(&Url) -> Option<FixturePage> + Send + Sync + 'static,
    ) -> Self {
        *lock(&self.state.generator) = Some(Arc::new(f));
        self
    }

    /// Every `open` fails, as if the browser could not start.
    pub fn refuse_open(self) -> Self {
        *lock(&self.state.refuse_open) = true;
        self
    }

    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn visits(&self) -> Vec<String> {
        lock(&self.state.visits).clone()
    }

    fn lookup(&self, url: &Url) -> Option<FixturePage> {
        if let Some(p) = lock(&self.state.pages).get(url.as_str()) {
            return Some(p.clone());
        }
        let generator = lock(&self.state.generator).clone();
        generator.and_then(|g| g(url))
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn open(&self) -> Result<Box<dyn PageSession>, DriverError> {
        if *lock(&self.state.refuse_open) {
            return Err(DriverError::Browser("fixture browser refused to start".into()));
        }
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureSession {
            browser: self.clone(),
            current: None,
        }))
    }
}

struct FixtureSession {
    browser: FixtureBrowser,
    current: Option<(Url, FixturePage)>,
}

#[async_trait]
impl PageSession for FixtureSession {
    async fn navigate(&mut self, url: &Url, _timeout: Duration) -> Result<Navigation, DriverError> {
        lock(&self.browser.state.visits).push(url.to_string());
        if lock(&self.browser.state.failing).contains(url.as_str()) {
            return Err(DriverError::Network(format!("connection refused: {url}")));
        }
        let page = self.browser.lookup(url).unwrap_or_else(FixturePage::not_found);
        let final_url = match &page.redirect_to {
            Some(to) => Url::parse(to).map_err(|e| DriverError::Browser(e.to_string()))?,
            None => url.clone(),
        };
        let nav = Navigation {
            status: page.status,
            final_url: final_url.clone(),
        };
        self.current = Some((final_url, page));
        Ok(nav)
    }

    async fn wait_for_network_idle(&mut self) -> Result<(), DriverError> {
        Ok(())
    }

    async fn current_markup(&mut self) -> Result<String, DriverError> {
        self.current
            .as_ref()
            .map(|(_, p)| p.markup.clone())
            .ok_or(DriverError::NoPage)
    }

    async fn query_interactive(
        &mut self,
        selectors: &[ControlSelector],
    ) -> Result<Option<Control>, DriverError> {
        let (url, page) = self.current.as_ref().ok_or(DriverError::NoPage)?;
        Ok(find_control(&page.markup, selectors, url))
    }

    async fn click(&mut self, control: &Control) -> Result<(), DriverError> {
        let target = control
            .target
            .clone()
            .ok_or_else(|| DriverError::NotNavigable(control.selector.clone()))?;
        self.navigate(&target, Duration::ZERO).await.map(|_| ())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.browser.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_registered_pages_and_counts_sessions() {
        let browser = FixtureBrowser::new()
            .page("https://reviews.test/a", "<p>a</p>")
            .not_found("https://reviews.test/gone");
        let mut s = browser.open().await.unwrap();
        let url = Url::parse("https://reviews.test/a").unwrap();
        let nav = s.navigate(&url, Duration::ZERO).await.unwrap();
        assert_eq!(nav.status, 200);
        assert_eq!(s.current_markup().await.unwrap(), "<p>a</p>");

        let gone = Url::parse("https://reviews.test/gone").unwrap();
        assert!(s.navigate(&gone, Duration::ZERO).await.unwrap().is_not_found());

        s.close().await.unwrap();
        assert_eq!((browser.opened(), browser.closed()), (1, 1));
        assert_eq!(browser.visits().len(), 2);
    }

    #[tokio::test]
    async fn redirects_and_failures() {
        let browser = FixtureBrowser::new()
            .page("https://reviews.test/p/", "<p>product</p>")
            .redirect("https://reviews.test/p/reviews/", "https://reviews.test/p/")
            .failing("https://reviews.test/down");
        let mut s = browser.open().await.unwrap();

        let nav = s
            .navigate(&Url::parse("https://reviews.test/p/reviews/").unwrap(), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(nav.final_url.as_str(), "https://reviews.test/p/");
        assert_eq!(s.current_markup().await.unwrap(), "<p>product</p>");

        let down = Url::parse("https://reviews.test/down").unwrap();
        assert!(s.navigate(&down, Duration::ZERO).await.is_err());
        s.close().await.unwrap();
    }

    #[tokio::test]
    async fn click_follows_control_target() {
        let browser = FixtureBrowser::new()
            .page("https://reviews.test/1", r#"<a class="next" href="/2">Next</a>"#)
            .page("https://reviews.test/2", "<p>two</p>");
        let mut s = browser.open().await.unwrap();
        s.navigate(&Url::parse("https://reviews.test/1").unwrap(), Duration::ZERO)
            .await
            .unwrap();
        let c = s
            .query_interactive(&[ControlSelector::css("a.next")])
            .await
            .unwrap()
            .unwrap();
        s.click(&c).await.unwrap();
        assert_eq!(s.current_markup().await.unwrap(), "<p>two</p>");
        s.close().await.unwrap();
    }
}
