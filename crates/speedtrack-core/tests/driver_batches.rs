use speedtrack_core::driver::{DriverPolicy, MeasurementDriver};
use speedtrack_core::model::SignalReading;
use speedtrack_core::probe::fake::{fields, placeholder, FixedSignal, PageScript, ScriptedLauncher};
use speedtrack_core::signal::{NoSignal, SignalReader};
use speedtrack_core::storage::Store;
use std::sync::Arc;
use std::time::Duration;

fn driver(launcher: &ScriptedLauncher, signal: Arc<dyn SignalReader>) -> MeasurementDriver {
    MeasurementDriver::new(Arc::new(launcher.clone()), signal, DriverPolicy::default())
}

#[tokio::test(start_paused = true)]
async fn test_result_timeout_then_success_stores_one_row() -> anyhow::Result<()> {
    let launcher = ScriptedLauncher::new(vec![
        PageScript::never_completes(),
        PageScript::completes_after(3, 150.2, 12.4, 18.0, 2.1),
    ]);
    let d = driver(&launcher, Arc::new(NoSignal));

    let started = tokio::time::Instant::now();
    let rows = d.run_measurements(2).await?;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].download, 150.2);
    assert_eq!(rows[0].upload, 12.4);
    // 120s ceiling on the first page, 5s cooldown, 3 pending polls on the second
    assert!(started.elapsed() >= Duration::from_secs(128));

    let store = Store::memory()?;
    store.init_schema()?;
    assert_eq!(store.append(&rows)?, 1);
    assert_eq!(store.read_all()?.len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_every_page_is_closed_and_browser_released() -> anyhow::Result<()> {
    let launcher = ScriptedLauncher::new(vec![
        PageScript::navigation_hangs(),
        PageScript::missing_start_control(),
        PageScript::never_completes(),
        PageScript::completes(50.0, 5.0, 30.0, 4.0),
    ]);
    let d = driver(&launcher, Arc::new(NoSignal));

    let rows = d.run_measurements(4).await?;
    assert_eq!(rows.len(), 1);

    let stats = &launcher.stats;
    assert_eq!(stats.launches(), 1);
    assert_eq!(stats.pages_opened(), 4);
    assert_eq!(stats.pages_closed(), 4);
    assert_eq!(stats.browsers_closed(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stored_count_matches_parseable_results() -> anyhow::Result<()> {
    let launcher = ScriptedLauncher::new(vec![
        PageScript::completes(100.0, 10.0, 15.0, 1.0),
        // upload never leaves the placeholder
        PageScript::with_results(vec![fields("88.8", "---", "16", "1.5")]),
        PageScript::completes(101.0, 11.0, 14.0, 0.9),
        PageScript::with_results(vec![placeholder(), fields("", "", "", "")]),
        PageScript::completes(99.0, 9.0, 16.0, 1.1),
    ]);
    let d = driver(&launcher, Arc::new(NoSignal));

    let rows = d.run_measurements(5).await?;
    let downloads: Vec<f64> = rows.iter().map(|r| r.download).collect();
    assert_eq!(downloads, vec![100.0, 101.0, 99.0]);
    assert!(rows.iter().all(|r| r.is_valid()));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_polls_at_fixed_interval_until_ready() -> anyhow::Result<()> {
    let launcher = ScriptedLauncher::new(vec![PageScript::completes_after(
        10, 70.0, 7.0, 22.0, 2.0,
    )]);
    let d = driver(&launcher, Arc::new(NoSignal));

    let started = tokio::time::Instant::now();
    let rows = d.run_measurements(1).await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(launcher.stats.polls(), 11);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(10) && elapsed < Duration::from_secs(11));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_no_cooldown_after_last_iteration() -> anyhow::Result<()> {
    let launcher = ScriptedLauncher::new(vec![
        PageScript::completes(1.0, 1.0, 1.0, 1.0),
        PageScript::completes(2.0, 2.0, 2.0, 2.0),
    ]);
    let d = driver(&launcher, Arc::new(NoSignal));

    let started = tokio::time::Instant::now();
    d.run_measurements(2).await?;
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(5) && elapsed < Duration::from_secs(6));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_signal_reading_is_merged() -> anyhow::Result<()> {
    let launcher = ScriptedLauncher::new(vec![PageScript::completes(200.0, 20.0, 12.0, 1.0)]);
    let d = driver(&launcher, Arc::new(FixedSignal::reading(Some(8.0), Some(15.5))));

    let rows = d.run_measurements(1).await?;
    assert_eq!(rows[0].sinr4g, Some(8.0));
    assert_eq!(rows[0].sinr5g, Some(15.5));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_signal_failure_keeps_the_measurement() -> anyhow::Result<()> {
    let launcher = ScriptedLauncher::new(vec![PageScript::completes(200.0, 20.0, 12.0, 1.0)]);
    let d = driver(&launcher, Arc::new(FixedSignal::failing()));

    let rows = d.run_measurements(1).await?;
    assert_eq!(rows.len(), 1);
    let m = &rows[0];
    assert_eq!((m.download, m.upload, m.ping, m.jitter), (200.0, 20.0, 12.0, 1.0));
    assert_eq!((m.sinr4g, m.sinr5g), (None, None));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_slow_signal_is_abandoned_after_timeout() -> anyhow::Result<()> {
    let launcher = ScriptedLauncher::new(vec![PageScript::completes(200.0, 20.0, 12.0, 1.0)]);
    let slow = FixedSignal::slow(
        SignalReading {
            sinr4g: Some(1.0),
            sinr5g: Some(2.0),
        },
        Duration::from_secs(30),
    );
    let d = driver(&launcher, Arc::new(slow));

    let started = tokio::time::Instant::now();
    let rows = d.run_measurements(1).await?;
    assert_eq!(rows.len(), 1);
    assert!(rows[0].sinr5g.is_none());
    assert!(started.elapsed() < Duration::from_secs(6));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_signal_latency_overlaps_page_work() -> anyhow::Result<()> {
    // 3s of polling hides a 3s gateway response
    let launcher = ScriptedLauncher::new(vec![PageScript::completes_after(
        3, 60.0, 6.0, 25.0, 3.0,
    )]);
    let slow = FixedSignal::slow(
        SignalReading {
            sinr4g: None,
            sinr5g: Some(9.0),
        },
        Duration::from_secs(3),
    );
    let d = driver(&launcher, Arc::new(slow));

    let started = tokio::time::Instant::now();
    let rows = d.run_measurements(1).await?;
    assert_eq!(rows[0].sinr5g, Some(9.0));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4));
    Ok(())
}

#[tokio::test]
async fn test_unavailable_browser_fails_the_call() {
    let launcher = ScriptedLauncher::unavailable();
    let d = driver(&launcher, Arc::new(NoSignal));
    assert!(d.run_measurements(1).await.is_err());
    assert!(d.preflight().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_count_zero_runs_once() -> anyhow::Result<()> {
    let launcher = ScriptedLauncher::new(vec![PageScript::completes(1.0, 2.0, 3.0, 4.0)]);
    let d = driver(&launcher, Arc::new(NoSignal));
    assert_eq!(d.run_measurements(0).await?.len(), 1);
    assert_eq!(
        *launcher.stats.navigated_to.lock().unwrap(),
        vec!["https://openspeedtest.com/".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_timestamp_is_taken_before_page_close() -> anyhow::Result<()> {
    let launcher = ScriptedLauncher::new(vec![PageScript::completes(80.0, 8.0, 20.0, 2.0)
        .closing_after(Duration::from_millis(1500))]);
    let d = driver(&launcher, Arc::new(NoSignal));

    let before = chrono::Utc::now();
    let rows = d.run_measurements(1).await?;
    let after = chrono::Utc::now();

    let stamped = rows[0].timestamp;
    assert!(stamped - before < chrono::Duration::milliseconds(500));
    assert!(after - stamped >= chrono::Duration::milliseconds(1400));
    Ok(())
}
