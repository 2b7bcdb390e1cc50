//! Plain-HTTP driver: pages are fetched, not rendered.
//!
//! Controls are resolved from the markup and "clicking" one follows its
//! `href` / `data-href`. Controls that only work through client-side script
//! cannot be activated here and fail with [`DriverError::NotNavigable`].

use async_trait::async_trait;
use rand::{Rng, rng};
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION, DNT, HeaderMap, HeaderName, HeaderValue,
    PRAGMA, REFERER, UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use robotstxt::DefaultMatcher;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{Browser, Control, ControlSelector, Navigation, PageSession, find_control};
use crate::error::DriverError;

const ROBOTS_AGENT: &str = "Mozilla";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentProfile {
    #[default]
    Desktop,
    Mobile,
}

#[derive(Debug, Clone)]
pub struct HttpBrowser {
    timeout: Duration,
    respect_robots: bool,
    agent: AgentProfile,
}

impl HttpBrowser {
    pub fn new(timeout: Duration, respect_robots: bool, agent: AgentProfile) -> Self {
        Self {
            timeout,
            respect_robots,
            agent,
        }
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn open(&self) -> Result<Box<dyn PageSession>, DriverError> {
        // fresh client (and cookie jar) per session
        let client = reqwest::Client::builder()
            .user_agent(random_ua(self.agent))
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(8))
            .timeout(self.timeout)
            .build()?;
        Ok(Box::new(HttpSession {
            client,
            agent: self.agent,
            respect_robots: self.respect_robots,
            timeout: self.timeout,
            robots: HashMap::new(),
            current: None,
        }))
    }
}

struct LoadedPage {
    url: Url,
    markup: String,
}

struct HttpSession {
    client: reqwest::Client,
    agent: AgentProfile,
    respect_robots: bool,
    timeout: Duration,
    /// robots.txt body per origin
    robots: HashMap<String, String>,
    current: Option<LoadedPage>,
}

impl HttpSession {
    async fn allowed_by_robots(&mut self, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();
        if !self.robots.contains_key(&origin) {
            let robots_url = format!("{origin}/robots.txt");
            let body = match self.client.get(&robots_url).send().await {
                Ok(rsp) if rsp.status().is_success() => rsp.text().await.unwrap_or_default(),
                Ok(_) => String::new(),
                Err(e) => {
                    debug!(url = %robots_url, error = %e, "robots.txt unavailable");
                    String::new()
                }
            };
            self.robots.insert(origin.clone(), body);
        }
        let body = self.robots.get(&origin).map(String::as_str).unwrap_or_default();
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(body, ROBOTS_AGENT, url.as_str())
    }
}

#[async_trait]
impl PageSession for HttpSession {
    async fn navigate(&mut self, url: &Url, timeout: Duration) -> Result<Navigation, DriverError> {
        if self.respect_robots && !self.allowed_by_robots(url).await {
            return Err(DriverError::RobotsDisallowed(url.to_string()));
        }

        let referer = self
            .current
            .as_ref()
            .map(|p| p.url.to_string())
            .unwrap_or_else(|| url.origin().ascii_serialization());

        let rsp = self
            .client
            .get(url.as_str())
            .headers(base_headers(self.agent, &referer))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DriverError::Timeout {
                        url: url.to_string(),
                        ms: timeout.as_millis() as u64,
                    }
                } else {
                    DriverError::Network(e.to_string())
                }
            })?;

        // capture before .text() consumes the response
        let status = rsp.status().as_u16();
        let final_url = rsp.url().clone();
        let markup = rsp.text().await?;

        debug!(
            url = %url,
            status,
            final_url = %final_url,
            len = markup.len(),
            referer = %referer,
            "fetched page"
        );

        self.current = Some(LoadedPage {
            url: final_url.clone(),
            markup,
        });
        Ok(Navigation { status, final_url })
    }

    async fn wait_for_network_idle(&mut self) -> Result<(), DriverError> {
        // the whole body was read by navigate; nothing is still in flight
        Ok(())
    }

    async fn current_markup(&mut self) -> Result<String, DriverError> {
        self.current
            .as_ref()
            .map(|p| p.markup.clone())
            .ok_or(DriverError::NoPage)
    }

    async fn query_interactive(
        &mut self,
        selectors: &[ControlSelector],
    ) -> Result<Option<Control>, DriverError> {
        let page = self.current.as_ref().ok_or(DriverError::NoPage)?;
        Ok(find_control(&page.markup, selectors, &page.url))
    }

    async fn click(&mut self, control: &Control) -> Result<(), DriverError> {
        let target = control
            .target
            .clone()
            .ok_or_else(|| DriverError::NotNavigable(control.selector.clone()))?;
        let nav = self.navigate(&target, self.timeout).await?;
        if !(200..400).contains(&nav.status) {
            warn!(url = %target, status = nav.status, "control led to an error page");
            return Err(DriverError::Network(format!("status {}", nav.status)));
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        Ok(())
    }
}

// -------------------------
// Fetch helpers
// -------------------------

fn base_headers(profile: AgentProfile, referer: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(USER_AGENT, HeaderValue::from_static(random_ua(profile)));
    h.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    if let Ok(v) = HeaderValue::from_str(referer) {
        h.insert(REFERER, v);
    }
    h.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    h.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    h.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    h.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    h.insert(DNT, HeaderValue::from_static("1"));

    h.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-origin"),
    );
    h.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    h.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    h
}

pub fn random_ua(profile: AgentProfile) -> &'static str {
    const DESKTOP: &[&str] = &[
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    ];
    const MOBILE: &[&str] = &[
        "Mozilla/5.0 (Linux; Android 14; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Mobile Safari/537.36",
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1",
    ];
    let pool = match profile {
        AgentProfile::Desktop => DESKTOP,
        AgentProfile::Mobile => MOBILE,
    };
    pool[rng().random_range(0..pool.len())]
}
