use super::{Browser, BrowserLauncher, ResultFields, SpeedTestPage};
use crate::config::{BrowserSettings, TargetSettings};
use anyhow::Context;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const CONTROL_POLL: Duration = Duration::from_millis(250);

/// Launches a local Chrome/Chromium over the DevTools protocol.
pub struct ChromiumLauncher {
    pub browser: BrowserSettings,
    pub target: TargetSettings,
}

impl ChromiumLauncher {
    pub fn new(browser: BrowserSettings, target: TargetSettings) -> Self {
        Self { browser, target }
    }

    /// Flags the builder has no dedicated setter for. Window size goes through
    /// `window_size`, which emits its own `--window-size`.
    fn extra_args(&self) -> Vec<String> {
        vec![
            "--disable-setuid-sandbox".to_string(),
            format!("--user-agent={}", self.browser.user_agent),
        ]
    }

    fn config(&self) -> anyhow::Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(self.browser.window_width, self.browser.window_height)
            .args(self.extra_args());
        if !self.browser.headless {
            builder = builder.with_head();
        }
        if let Some(exe) = &self.browser.executable {
            builder = builder.chrome_executable(exe);
        }
        builder
            .build()
            .map_err(|e| anyhow::anyhow!("invalid browser config: {}", e))
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> anyhow::Result<Box<dyn Browser>> {
        let (browser, mut handler) = CdpBrowser::launch(self.config()?)
            .await
            .context("failed to launch chromium")?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(event = "cdp_handler_error", error = %e);
                }
            }
        });

        Ok(Box::new(ChromiumBrowser {
            browser: Mutex::new(browser),
            events,
            target: self.target.clone(),
        }))
    }

    fn backend_name(&self) -> &'static str {
        "chromium"
    }
}

pub struct ChromiumBrowser {
    browser: Mutex<CdpBrowser>,
    events: JoinHandle<()>,
    target: TargetSettings,
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn open_page(&self) -> anyhow::Result<Box<dyn SpeedTestPage>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to open page")?;
        Ok(Box::new(ChromiumPage {
            page,
            scripts: PageScripts::new(&self.target),
        }))
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        let ChromiumBrowser {
            browser, events, ..
        } = *self;
        let mut browser = browser.into_inner();
        let closed = browser.close().await.context("failed to close chromium");
        let _ = browser.wait().await;
        events.abort();
        closed.map(|_| ())
    }
}

pub struct ChromiumPage {
    page: Page,
    scripts: PageScripts,
}

impl ChromiumPage {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: &str) -> anyhow::Result<T> {
        let result = self.page.evaluate(script).await?;
        Ok(result.into_value::<T>()?)
    }
}

#[async_trait]
impl SpeedTestPage for ChromiumPage {
    /// Returns once the document is parsed. `goto` alone would also wait for every
    /// subresource to finish loading.
    async fn navigate(&mut self, url: &str) -> anyhow::Result<()> {
        let load = self.page.goto(url);
        tokio::pin!(load);
        loop {
            tokio::select! {
                loaded = &mut load => {
                    loaded.with_context(|| format!("failed to load {}", url))?;
                    return Ok(());
                }
                _ = tokio::time::sleep(CONTROL_POLL) => {}
            }
            // The context is torn down while the navigation commits.
            if self.eval::<bool>(&self.scripts.dom_ready).await.unwrap_or(false) {
                return Ok(());
            }
        }
    }

    async fn start_test(&mut self) -> anyhow::Result<()> {
        // The driver bounds this wait.
        while !self.eval::<bool>(&self.scripts.control_visible).await? {
            tokio::time::sleep(CONTROL_POLL).await;
        }
        // A synthetic click works where a CDP mouse click at the element's centre
        // is swallowed by overlays.
        if !self.eval::<bool>(&self.scripts.click_control).await? {
            anyhow::bail!("start control disappeared before it could be activated");
        }
        Ok(())
    }

    async fn read_results(&mut self) -> anyhow::Result<ResultFields> {
        let json: String = self.eval(&self.scripts.read_results).await?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        self.page.close().await?;
        Ok(())
    }
}

/// Scripts evaluated in the page, with selectors quoted as JS string literals.
struct PageScripts {
    dom_ready: String,
    control_visible: String,
    click_control: String,
    read_results: String,
}

impl PageScripts {
    fn new(target: &TargetSettings) -> Self {
        let q = |s: &str| serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string());
        let start = q(&target.start_selector);

        let dom_ready = "location.href !== 'about:blank' && document.readyState !== 'loading'"
            .to_string();

        let control_visible = format!(
            r#"(() => {{
  const el = document.querySelector({start});
  if (!el) return false;
  const style = window.getComputedStyle(el);
  const rect = el.getBoundingClientRect();
  return style.visibility !== 'hidden' && style.display !== 'none' && rect.width > 0 && rect.height > 0;
}})()"#
        );

        let click_control = format!(
            r#"(() => {{
  const el = document.querySelector({start});
  if (!el) return false;
  el.dispatchEvent(new MouseEvent('click', {{ bubbles: true, cancelable: true, view: window }}));
  return true;
}})()"#
        );

        let read_results = format!(
            r#"(() => {{
  const text = (sel) => {{
    const el = document.querySelector(sel);
    return el ? el.textContent.trim() : null;
  }};
  return JSON.stringify({{
    download: text({down}),
    upload: text({up}),
    ping: text({ping}),
    jitter: text({jitter})
  }});
}})()"#,
            down = q(&target.download_selector),
            up = q(&target.upload_selector),
            ping = q(&target.ping_selector),
            jitter = q(&target.jitter_selector),
        );

        Self {
            dom_ready,
            control_visible,
            click_control,
            read_results,
        }
    }
}
