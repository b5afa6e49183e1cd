use crate::config::TrackerConfig;
use crate::errors::MeasureError;
use crate::model::{Measurement, SignalReading, SpeedSample};
use crate::probe::{Browser, BrowserLauncher, ResultFields, SpeedTestPage};
use crate::signal::SignalReader;
use anyhow::Context;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

#[derive(Debug, Clone, PartialEq)]
pub struct DriverPolicy {
    pub target_url: String,
    pub navigation_timeout: Duration,
    pub start_timeout: Duration,
    pub result_timeout: Duration,
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub signal_timeout: Duration,
}

impl Default for DriverPolicy {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}

impl DriverPolicy {
    pub fn from_config(cfg: &TrackerConfig) -> Self {
        let t = &cfg.timeouts;
        Self {
            target_url: cfg.target.url.clone(),
            navigation_timeout: Duration::from_secs(t.navigation_secs),
            start_timeout: Duration::from_secs(t.start_control_secs),
            result_timeout: Duration::from_secs(t.result_secs),
            poll_interval: Duration::from_millis(t.poll_interval_ms),
            cooldown: Duration::from_secs(t.cooldown_secs),
            signal_timeout: Duration::from_secs(cfg.signal.timeout_secs),
        }
    }
}

/// Runs speed tests one after another in a single browser.
pub struct MeasurementDriver {
    pub launcher: Arc<dyn BrowserLauncher>,
    pub signal: Arc<dyn SignalReader>,
    pub policy: DriverPolicy,
}

impl MeasurementDriver {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        signal: Arc<dyn SignalReader>,
        policy: DriverPolicy,
    ) -> Self {
        Self {
            launcher,
            signal,
            policy,
        }
    }

    /// Checks that a browser can be started at all.
    pub async fn preflight(&self) -> anyhow::Result<()> {
        let browser = self
            .launcher
            .launch()
            .await
            .with_context(|| format!("{} browser unavailable", self.launcher.backend_name()))?;
        browser.close().await
    }

    /// Runs `count` measurements (at least one) and returns the successful ones.
    ///
    /// A failing iteration is logged and skipped. Only a browser that cannot be
    /// launched fails the call.
    pub async fn run_measurements(&self, count: u32) -> anyhow::Result<Vec<Measurement>> {
        let count = count.max(1);
        let browser = self
            .launcher
            .launch()
            .await
            .with_context(|| format!("failed to launch {} browser", self.launcher.backend_name()))?;

        let mut results = Vec::new();
        for iteration in 1..=count {
            tracing::info!(
                event = "measurement_start",
                iteration,
                count,
                "starting test {} of {}",
                iteration,
                count
            );

            match self.run_iteration(browser.as_ref()).await {
                Ok(m) => {
                    tracing::info!(
                        event = "measurement_done",
                        iteration,
                        download = m.download,
                        upload = m.upload,
                        ping = m.ping,
                        jitter = m.jitter,
                        sinr4g = ?m.sinr4g,
                        sinr5g = ?m.sinr5g,
                        "test {} finished",
                        iteration
                    );
                    results.push(m);
                }
                Err(e) => {
                    tracing::warn!(
                        event = "measurement_failed",
                        iteration,
                        kind = e.kind(),
                        error = %e,
                        "test {} failed: {}",
                        iteration,
                        e
                    );
                }
            }

            if iteration < count {
                sleep(self.policy.cooldown).await;
            }
        }

        if let Err(e) = browser.close().await {
            tracing::warn!(event = "browser_close_failed", error = %e);
        }
        Ok(results)
    }

    async fn run_iteration(&self, browser: &dyn Browser) -> Result<Measurement, MeasureError> {
        let mut page = browser.open_page().await.map_err(MeasureError::browser)?;
        let signal = self.spawn_signal_read();

        let outcome = self
            .drive_page(page.as_mut())
            .await
            .map(|sample| (chrono::Utc::now(), sample));

        if let Err(e) = page.close().await {
            tracing::warn!(event = "page_close_failed", error = %e);
        }

        match outcome {
            Ok((completed_at, sample)) => {
                let reading = join_signal(signal).await;
                Ok(Measurement::new(completed_at, sample, reading))
            }
            Err(e) => {
                signal.abort();
                Err(e)
            }
        }
    }

    async fn drive_page(&self, page: &mut dyn SpeedTestPage) -> Result<SpeedSample, MeasureError> {
        let p = &self.policy;

        timeout(p.navigation_timeout, page.navigate(&p.target_url))
            .await
            .map_err(|_| MeasureError::NavigationTimeout(p.navigation_timeout))?
            .map_err(MeasureError::browser)?;

        timeout(p.start_timeout, page.start_test())
            .await
            .map_err(|_| MeasureError::StartControlTimeout(p.start_timeout))?
            .map_err(MeasureError::browser)?;

        let fields = self.poll_for_result(page).await?;
        fields.to_sample()
    }

    /// Polls the result fields at a fixed interval until download and upload are
    /// both numeric, up to the result timeout. Read errors while the page is still
    /// rendering count as "not yet".
    pub async fn poll_for_result(
        &self,
        page: &mut dyn SpeedTestPage,
    ) -> Result<ResultFields, MeasureError> {
        let interval = self.policy.poll_interval;
        let polling = async {
            loop {
                match page.read_results().await {
                    Ok(fields) if fields.is_complete() => return fields,
                    Ok(_) => {}
                    Err(e) => tracing::debug!(event = "result_read_failed", error = %e),
                }
                sleep(interval).await;
            }
        };

        timeout(self.policy.result_timeout, polling)
            .await
            .map_err(|_| MeasureError::ResultTimeout(self.policy.result_timeout))
    }

    fn spawn_signal_read(&self) -> JoinHandle<SignalReading> {
        let reader = self.signal.clone();
        let limit = self.policy.signal_timeout;
        tokio::spawn(async move {
            match timeout(limit, reader.read()).await {
                Ok(Ok(reading)) => reading,
                Ok(Err(e)) => {
                    tracing::debug!(event = "signal_read_failed", source = reader.source_name(), error = %e);
                    SignalReading::default()
                }
                Err(_) => {
                    tracing::debug!(event = "signal_read_timeout", source = reader.source_name());
                    SignalReading::default()
                }
            }
        })
    }
}

async fn join_signal(handle: JoinHandle<SignalReading>) -> SignalReading {
    handle.await.unwrap_or_default()
}
