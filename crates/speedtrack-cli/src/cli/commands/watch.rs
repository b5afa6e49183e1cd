use super::{build_driver, build_report, exit_codes, open_store, prepare};
use crate::cli::args::WatchArgs;
use anyhow::Context;
use speedtrack_core::scheduler::{ScheduleOptions, Scheduler};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Conventional status for a process ended by SIGINT.
const INTERRUPTED: i32 = 130;

pub async fn cmd_watch(args: WatchArgs) -> anyhow::Result<i32> {
    let mut cfg = match prepare(&args.common) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    if let Some(secs) = args.interval_secs {
        if secs == 0 {
            eprintln!("config error: --interval-secs must be greater than 0");
            return Ok(exit_codes::CONFIG_ERROR);
        }
        cfg.schedule.interval_secs = secs;
    }

    // Startup: any failure here ends the process.
    let store = open_store(&cfg.db)
        .with_context(|| format!("failed to open database {}", cfg.db.display()))?;
    let driver = build_driver(&cfg)?;
    driver.preflight().await?;

    let options = ScheduleOptions {
        interval: cfg.schedule.interval(),
        batch_size: 1,
        max_cycles: args.cycles,
    };
    let scheduler = Scheduler::new(driver, store.clone(), build_report(&cfg, &store), options);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, on_interrupt).await {
            eprintln!("interrupted again; exiting without waiting for the current cycle");
            std::process::exit(INTERRUPTED);
        }
    });

    eprintln!(
        "Speedtest tracker started. Running every {} seconds...",
        cfg.schedule.interval_secs
    );
    let cycles = scheduler.run(cancel).await;
    eprintln!("stopped after {} cycles", cycles);
    Ok(exit_codes::OK)
}

/// The first interrupt cancels `cancel` so the loop stops after the current cycle.
/// Returns `true` when a second interrupt arrives, `false` if signals can't be received.
async fn watch_interrupts<F, Fut>(mut next: F, cancel: CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next().await.is_err() {
        return false;
    }
    tracing::info!(event = "interrupt", "stopping after the current cycle; interrupt again to exit now");
    cancel.cancel();
    next().await.is_ok()
}
