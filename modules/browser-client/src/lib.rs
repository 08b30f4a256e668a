pub mod error;

pub use error::{BrowserError, Result};

use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::{Handler, Page};
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;

/// How long the page must stay quiet before navigation counts as settled,
/// and how long to wait for that at most.
#[derive(Debug, Clone, Copy)]
pub struct IdleOptions {
    pub quiet: Duration,
    pub timeout: Duration,
}

impl Default for IdleOptions {
    fn default() -> Self {
        Self {
            quiet: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Chrome/Chromium binary. Auto-detected when `None`.
    pub chrome_executable: Option<String>,
    pub headful: bool,
}

/// One running Chromium process. Pages opened from it share the process
/// but not their navigation state.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if let Some(ref path) = options.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        if options.headful {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        tracing::info!("Browser launched");

        Ok(Self {
            browser,
            handler: spawn_handler(handler),
        })
    }

    /// Open a blank page in its own target.
    pub async fn new_page(&self) -> Result<BrowserPage> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(BrowserPage { page })
    }

    /// Close the browser and wait for the process to exit.
    pub async fn close(&mut self) -> Result<()> {
        self.browser.close().await?;
        if let Err(e) = self.browser.wait().await {
            tracing::warn!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler.abort();
        Ok(())
    }
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                tracing::debug!(error = %e, "Browser handler event error");
            }
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdleReport {
    ok: bool,
    ready_state: String,
    resource_count: u64,
    waited_ms: u64,
}

#[derive(Debug, Deserialize)]
struct TextLookup {
    found: bool,
    text: Option<String>,
}

pub struct BrowserPage {
    page: Page,
}

impl BrowserPage {
    /// Navigate and wait for the network-idle heuristic: document complete
    /// and no new resource entries for `idle.quiet`, bounded by `idle.timeout`.
    /// Timing out on the heuristic is logged, not an error.
    pub async fn goto(&self, url: &str, idle: IdleOptions) -> Result<()> {
        self.page.goto(url).await?;
        self.wait_for_network_idle(idle).await
    }

    async fn wait_for_network_idle(&self, idle: IdleOptions) -> Result<()> {
        let js = format!(
            r#"(async () => {{
                const timeoutMs = {timeout_ms};
                const idleMs = {idle_ms};
                const interval = 100;
                const start = Date.now();
                const count = () => {{
                    try {{ return performance.getEntriesByType('resource').length; }} catch (_) {{ return 0; }}
                }};
                let last = count();
                let stable = 0;
                while (Date.now() - start < timeoutMs) {{
                    await new Promise(r => setTimeout(r, interval));
                    const cur = count();
                    if (document.readyState === 'complete' && cur === last) {{
                        stable += interval;
                        if (stable >= idleMs) {{
                            return {{ ok: true, readyState: document.readyState, resourceCount: cur, waitedMs: Date.now() - start }};
                        }}
                    }} else {{
                        stable = 0;
                    }}
                    last = cur;
                }}
                return {{ ok: false, readyState: document.readyState, resourceCount: last, waitedMs: Date.now() - start }};
            }})()"#,
            timeout_ms = idle.timeout.as_millis(),
            idle_ms = idle.quiet.as_millis(),
        );

        let report: IdleReport = self.page.evaluate(js).await?.into_value()?;
        if report.ok {
            tracing::debug!(
                ready_state = %report.ready_state,
                resources = report.resource_count,
                waited_ms = report.waited_ms,
                "Network idle reached"
            );
        } else {
            tracing::warn!(
                ready_state = %report.ready_state,
                resources = report.resource_count,
                waited_ms = report.waited_ms,
                "Network idle heuristic timed out"
            );
        }
        Ok(())
    }

    /// `innerText` of the first element matching `selector`, or `None` if
    /// no element matches.
    pub async fn text_of(&self, selector: &str) -> Result<Option<String>> {
        let selector = serde_json::to_string(selector)?;
        let js = format!(
            r#"(() => {{
                const el = document.querySelector({selector});
                return el ? {{ found: true, text: el.innerText }} : {{ found: false, text: null }};
            }})()"#
        );

        let lookup: TextLookup = self.page.evaluate(js).await?.into_value()?;
        if lookup.found {
            Ok(Some(lookup.text.unwrap_or_default()))
        } else {
            Ok(None)
        }
    }

    pub async fn close(&self) -> Result<()> {
        self.page.clone().close().await?;
        Ok(())
    }
}
