use super::args::*;
use crate::logging::init_logging;
use anyhow::Context;
use speedtrack_core::config::{resolve_config, TrackerConfig};
use speedtrack_core::driver::{DriverPolicy, MeasurementDriver};
use speedtrack_core::errors::ConfigError;
use speedtrack_core::probe::chromium::ChromiumLauncher;
use speedtrack_core::report::{ReportGenerator, ReportOptions};
use speedtrack_core::storage::Store;
use std::path::Path;
use std::sync::Arc;

pub mod import;
pub mod init;
pub mod measure;
pub mod report;
pub mod status;
pub mod watch;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const MEASUREMENT_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const NO_DATA: i32 = 3;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Measure(args) => measure::cmd_measure(args).await,
        Command::Report(args) => report::cmd_report(args),
        Command::Watch(args) => watch::cmd_watch(args).await,
        Command::Import(args) => import::cmd_import(args),
        Command::Status(args) => status::cmd_status(args),
        Command::Init(args) => init::cmd_init(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    }
}

/// Resolves the effective config (file, then env, then flags) and starts logging.
pub(crate) fn prepare(common: &CommonArgs) -> Result<TrackerConfig, ConfigError> {
    let mut loaded = resolve_config(common.config.as_deref())?;
    if let Some(db) = &common.db {
        loaded.config.db = db.clone();
    }
    init_logging(&loaded.config.log_level, common.log_format);
    loaded.warn_unknown_fields();
    Ok(loaded.config)
}

/// Opens (creating if needed) the database and brings its schema up to date.
pub(crate) fn open_store(path: &Path) -> anyhow::Result<Store> {
    ensure_parent_dir(path)?;
    let store = Store::open(path)?;
    store.init_schema()?;
    Ok(store)
}

/// Opens an existing database for reading; `None` when the file is absent, so read-only
/// commands never create an empty database as a side effect.
pub(crate) fn open_existing_store(path: &Path) -> anyhow::Result<Option<Store>> {
    if !path.exists() {
        return Ok(None);
    }
    open_store(path).map(Some)
}

pub(crate) fn build_driver(cfg: &TrackerConfig) -> anyhow::Result<MeasurementDriver> {
    let launcher = ChromiumLauncher::new(cfg.browser.clone(), cfg.target.clone());
    let signal = speedtrack_core::signal::from_settings(&cfg.signal)?;
    Ok(MeasurementDriver::new(
        Arc::new(launcher),
        signal,
        DriverPolicy::from_config(cfg),
    ))
}

pub(crate) fn build_report(cfg: &TrackerConfig, store: &Store) -> ReportGenerator {
    ReportGenerator::new(store.clone(), ReportOptions::from_settings(&cfg.report))
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}
