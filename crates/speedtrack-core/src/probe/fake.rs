//! Scripted browser and signal doubles for exercising the driver and scheduler
//! without a real browser or gateway.

use super::{Browser, BrowserLauncher, ResultFields, SpeedTestPage};
use crate::model::SignalReading;
use crate::signal::SignalReader;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Step {
    Ok,
    /// Never resolves; only a timeout gets past it.
    Hang,
    Fail(String),
}

impl Step {
    async fn run(&self) -> anyhow::Result<()> {
        match self {
            Step::Ok => Ok(()),
            Step::Hang => std::future::pending().await,
            Step::Fail(msg) => Err(anyhow::anyhow!("{}", msg)),
        }
    }
}

/// Behaviour of one page. `results` are returned in order by successive polls; the
/// last snapshot repeats once the list is exhausted.
#[derive(Debug, Clone)]
pub struct PageScript {
    pub navigate: Step,
    pub start: Step,
    pub results: Vec<ResultFields>,
    /// Time `close` takes to return.
    pub close_delay: Duration,
}

impl PageScript {
    pub fn completes(download: f64, upload: f64, ping: f64, jitter: f64) -> Self {
        Self::completes_after(0, download, upload, ping, jitter)
    }

    /// Shows placeholders for `pending_polls` polls before the final values appear.
    pub fn completes_after(
        pending_polls: usize,
        download: f64,
        upload: f64,
        ping: f64,
        jitter: f64,
    ) -> Self {
        let mut results = vec![placeholder(); pending_polls];
        results.push(fields(
            &download.to_string(),
            &upload.to_string(),
            &ping.to_string(),
            &jitter.to_string(),
        ));
        Self {
            navigate: Step::Ok,
            start: Step::Ok,
            results,
            close_delay: Duration::ZERO,
        }
    }

    pub fn never_completes() -> Self {
        Self {
            navigate: Step::Ok,
            start: Step::Ok,
            results: vec![placeholder()],
            close_delay: Duration::ZERO,
        }
    }

    pub fn navigation_hangs() -> Self {
        Self {
            navigate: Step::Hang,
            ..Self::never_completes()
        }
    }

    pub fn missing_start_control() -> Self {
        Self {
            start: Step::Hang,
            ..Self::never_completes()
        }
    }

    pub fn closing_after(self, close_delay: Duration) -> Self {
        Self {
            close_delay,
            ..self
        }
    }

    pub fn with_results(results: Vec<ResultFields>) -> Self {
        Self {
            navigate: Step::Ok,
            start: Step::Ok,
            results,
            close_delay: Duration::ZERO,
        }
    }
}

pub fn fields(download: &str, upload: &str, ping: &str, jitter: &str) -> ResultFields {
    ResultFields {
        download: Some(download.to_string()),
        upload: Some(upload.to_string()),
        ping: Some(ping.to_string()),
        jitter: Some(jitter.to_string()),
    }
}

pub fn placeholder() -> ResultFields {
    fields("---", "---", "---", "---")
}

/// Counters shared between a launcher and everything it hands out.
#[derive(Debug, Default)]
pub struct FakeStats {
    pub launches: AtomicUsize,
    pub browsers_closed: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub polls: AtomicUsize,
    pub navigated_to: Mutex<Vec<String>>,
}

impl FakeStats {
    pub fn pages_opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn browsers_closed(&self) -> usize {
        self.browsers_closed.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct ScriptedLauncher {
    pages: Arc<Mutex<VecDeque<PageScript>>>,
    pub stats: Arc<FakeStats>,
    fail_launch: bool,
}

impl ScriptedLauncher {
    pub fn new(pages: Vec<PageScript>) -> Self {
        Self {
            pages: Arc::new(Mutex::new(pages.into())),
            stats: Arc::new(FakeStats::default()),
            fail_launch: false,
        }
    }

    /// A launcher whose browser can never be started.
    pub fn unavailable() -> Self {
        Self {
            fail_launch: true,
            ..Self::new(Vec::new())
        }
    }

    /// Queues more page scripts, e.g. between scheduler cycles.
    pub fn push(&self, script: PageScript) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.push_back(script);
        }
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self) -> anyhow::Result<Box<dyn Browser>> {
        if self.fail_launch {
            anyhow::bail!("browser executable not found");
        }
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedBrowser {
            pages: self.pages.clone(),
            stats: self.stats.clone(),
        }))
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

struct ScriptedBrowser {
    pages: Arc<Mutex<VecDeque<PageScript>>>,
    stats: Arc<FakeStats>,
}

#[async_trait]
impl Browser for ScriptedBrowser {
    async fn open_page(&self) -> anyhow::Result<Box<dyn SpeedTestPage>> {
        let script = self
            .pages
            .lock()
            .map_err(|_| anyhow::anyhow!("script queue poisoned"))?
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("no scripted page left"))?;
        self.stats.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedPage {
            script,
            next: 0,
            stats: self.stats.clone(),
        }))
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        self.stats.browsers_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ScriptedPage {
    script: PageScript,
    next: usize,
    stats: Arc<FakeStats>,
}

#[async_trait]
impl SpeedTestPage for ScriptedPage {
    async fn navigate(&mut self, url: &str) -> anyhow::Result<()> {
        if let Ok(mut seen) = self.stats.navigated_to.lock() {
            seen.push(url.to_string());
        }
        self.script.navigate.run().await
    }

    async fn start_test(&mut self) -> anyhow::Result<()> {
        self.script.start.run().await
    }

    async fn read_results(&mut self) -> anyhow::Result<ResultFields> {
        self.stats.polls.fetch_add(1, Ordering::SeqCst);
        let results = &self.script.results;
        if results.is_empty() {
            return Ok(ResultFields::default());
        }
        let idx = self.next.min(results.len() - 1);
        self.next += 1;
        Ok(results[idx].clone())
    }

    async fn close(self: Box<Self>) -> anyhow::Result<()> {
        if !self.script.close_delay.is_zero() {
            tokio::time::sleep(self.script.close_delay).await;
        }
        self.stats.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Signal source with a fixed outcome and optional latency.
pub struct FixedSignal {
    pub reading: Option<SignalReading>,
    pub delay: Duration,
}

impl FixedSignal {
    pub fn reading(sinr4g: Option<f64>, sinr5g: Option<f64>) -> Self {
        Self {
            reading: Some(SignalReading { sinr4g, sinr5g }),
            delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        Self {
            reading: None,
            delay: Duration::ZERO,
        }
    }

    pub fn slow(reading: SignalReading, delay: Duration) -> Self {
        Self {
            reading: Some(reading),
            delay,
        }
    }
}

#[async_trait]
impl SignalReader for FixedSignal {
    async fn read(&self) -> anyhow::Result<SignalReading> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reading
            .ok_or_else(|| anyhow::anyhow!("gateway unreachable"))
    }

    fn source_name(&self) -> &'static str {
        "fixed"
    }
}
