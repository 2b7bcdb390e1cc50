//! Chromium-backed driver using chromiumoxide.
//!
//! One browser process per session, so closing the session tears the whole
//! browser down.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

use super::http::{AgentProfile, random_ua};
use super::{Browser, Control, ControlSelector, Navigation, PageSession};
use crate::error::DriverError;

const MARKER: &str = "data-claw-control";
const IDLE_POLLS: usize = 40;
const IDLE_POLL_EVERY: Duration = Duration::from_millis(250);

fn cdp(e: CdpError) -> DriverError {
    DriverError::Browser(e.to_string())
}

#[derive(Debug, Clone)]
pub struct ChromiumBrowser {
    headless: bool,
    agent: AgentProfile,
}

impl ChromiumBrowser {
    pub fn new(headless: bool, agent: AgentProfile) -> Self {
        Self { headless, agent }
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn open(&self) -> Result<Box<dyn PageSession>, DriverError> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(DriverError::Browser)?;

        let (browser, mut handler) = CdpBrowser::launch(config).await.map_err(cdp)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser.new_page("about:blank").await.map_err(cdp)?;
        page.set_user_agent(SetUserAgentOverrideParams::new(random_ua(self.agent)))
            .await
            .map_err(cdp)?;

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler,
        }))
    }
}

struct ChromiumSession {
    browser: CdpBrowser,
    page: Page,
    handler: JoinHandle<()>,
}

#[derive(Debug, Deserialize)]
struct ControlState {
    selector: String,
    visible: bool,
    enabled: bool,
    href: Option<String>,
}

impl ChromiumSession {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, DriverError> {
        self.page
            .evaluate(script)
            .await
            .map_err(cdp)?
            .into_value::<T>()
            .map_err(|e| DriverError::Browser(format!("unexpected script result: {e:?}")))
    }

    async fn final_url(&self, fallback: &Url) -> Url {
        match self.page.url().await {
            Ok(Some(u)) => Url::parse(&u).unwrap_or_else(|_| fallback.clone()),
            _ => fallback.clone(),
        }
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&mut self, url: &Url, timeout: Duration) -> Result<Navigation, DriverError> {
        match tokio::time::timeout(timeout, self.page.goto(url.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(cdp(e)),
            Err(_) => {
                return Err(DriverError::Timeout {
                    url: url.to_string(),
                    ms: timeout.as_millis() as u64,
                });
            }
        }
        let status = self
            .eval::<Option<u16>>(
                "(() => { const n = performance.getEntriesByType('navigation')[0]; \
                 return n && n.responseStatus ? n.responseStatus : null; })()"
                    .to_string(),
            )
            .await
            .ok()
            .flatten()
            .unwrap_or(200);
        let final_url = self.final_url(url).await;
        debug!(url = %url, status, final_url = %final_url, "rendered page");
        Ok(Navigation { status, final_url })
    }

    async fn wait_for_network_idle(&mut self) -> Result<(), DriverError> {
        let _ = self.page.wait_for_navigation().await;
        for _ in 0..IDLE_POLLS {
            let ready = self
                .eval::<String>("document.readyState".to_string())
                .await
                .unwrap_or_default();
            if ready == "complete" {
                return Ok(());
            }
            sleep(IDLE_POLL_EVERY).await;
        }
        Ok(())
    }

    async fn current_markup(&mut self) -> Result<String, DriverError> {
        self.page.content().await.map_err(cdp)
    }

    async fn query_interactive(
        &mut self,
        selectors: &[ControlSelector],
    ) -> Result<Option<Control>, DriverError> {
        let wanted = serde_json::to_string(selectors)
            .map_err(|e| DriverError::Browser(e.to_string()))?;
        let script = format!(
            r#"(() => {{
  const wanted = {wanted};
  document.querySelectorAll('[{MARKER}]').forEach(e => e.removeAttribute('{MARKER}'));
  for (const w of wanted) {{
    let nodes;
    try {{ nodes = document.querySelectorAll(w.css); }} catch (_) {{ continue; }}
    for (const el of nodes) {{
      const text = (el.innerText || el.textContent || '').toLowerCase();
      if (w.text && !text.includes(w.text.toLowerCase())) continue;
      el.setAttribute('{MARKER}', '1');
      const style = window.getComputedStyle(el);
      const rect = el.getBoundingClientRect();
      const visible = style.display !== 'none' && style.visibility !== 'hidden'
        && (rect.width > 0 || rect.height > 0);
      const enabled = !el.disabled && el.getAttribute('aria-disabled') !== 'true';
      return {{ selector: w.css, visible, enabled, href: el.href || null }};
    }}
  }}
  return null;
}})()"#
        );
        let found: Option<ControlState> = self.eval(script).await?;
        Ok(found.map(|p| Control {
            selector: p.selector,
            visible: p.visible,
            enabled: p.enabled,
            target: p.href.and_then(|h| Url::parse(&h).ok()),
        }))
    }

    async fn click(&mut self, _control: &Control) -> Result<(), DriverError> {
        let el = self
            .page
            .find_element(format!("[{MARKER}]"))
            .await
            .map_err(cdp)?;
        el.click().await.map_err(cdp)?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        let mut this = *self;
        let closed = this.browser.close().await.map(|_| ()).map_err(cdp);
        let _ = this.browser.wait().await;
        this.handler.abort();
        closed
    }
}
