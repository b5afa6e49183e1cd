use crate::driver::MeasurementDriver;
use crate::report::{ReportGenerator, ReportOutcome};
use crate::storage::Store;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleOptions {
    pub interval: Duration,
    pub batch_size: u32,
    /// Stop after this many cycles; `None` runs until cancelled.
    pub max_cycles: Option<u64>,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            batch_size: 1,
            max_cycles: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    pub measured: usize,
    pub stored: usize,
    pub report: Option<ReportOutcome>,
}

/// Fixed-interval loop: measure, append, regenerate the report, sleep.
pub struct Scheduler {
    pub driver: MeasurementDriver,
    pub store: Store,
    pub report: ReportGenerator,
    pub options: ScheduleOptions,
}

impl Scheduler {
    pub fn new(
        driver: MeasurementDriver,
        store: Store,
        report: ReportGenerator,
        options: ScheduleOptions,
    ) -> Self {
        Self {
            driver,
            store,
            report,
            options,
        }
    }

    /// One measure/store/report pass. Storage and report failures are logged and do
    /// not fail the cycle; only a measurement batch that could not run at all does.
    pub async fn run_cycle(&self, cycle: u64) -> anyhow::Result<CycleSummary> {
        tracing::info!(event = "cycle_start", cycle, "periodic speed test");

        let rows = self
            .driver
            .run_measurements(self.options.batch_size)
            .await?;

        let stored = match self.store.append(&rows) {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(
                    event = "store_append_failed",
                    cycle,
                    lost = rows.len(),
                    error = %format!("{:#}", e),
                    "failed to save measurements"
                );
                0
            }
        };

        let report = match self.report.generate() {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(
                    event = "report_failed",
                    cycle,
                    error = %format!("{:#}", e),
                    "failed to regenerate report"
                );
                None
            }
        };

        Ok(CycleSummary {
            measured: rows.len(),
            stored,
            report,
        })
    }

    /// Runs cycles until `cancel` fires or `max_cycles` is reached and returns the
    /// number of cycles started. Cancellation is observed between cycles, so an
    /// in-flight measurement always releases its browser.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        tracing::info!(
            event = "scheduler_start",
            interval_secs = self.options.interval.as_secs(),
            "speed tracker started"
        );

        let mut cycles = 0u64;
        while !cancel.is_cancelled() {
            cycles += 1;
            match self.run_cycle(cycles).await {
                Ok(summary) => tracing::info!(
                    event = "cycle_done",
                    cycle = cycles,
                    measured = summary.measured,
                    stored = summary.stored,
                ),
                Err(e) => tracing::error!(
                    event = "cycle_failed",
                    cycle = cycles,
                    error = %format!("{:#}", e),
                    "error in main loop"
                ),
            }

            if self.options.max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }

            tracing::info!(
                event = "cycle_sleep",
                next_in_secs = self.options.interval.as_secs(),
                "next test scheduled"
            );
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.options.interval) => {}
            }
        }

        tracing::info!(event = "scheduler_stop", cycles, "speed tracker stopped");
        cycles
    }
}
