use crate::logging::LogFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "speedtrack",
    version,
    about = "Periodic internet speed tests stored in SQLite, with an HTML dashboard"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one or more speed tests and store the results
    Measure(MeasureArgs),
    /// Regenerate the HTML dashboard from stored results
    Report(ReportArgs),
    /// Measure and report on a fixed interval until interrupted
    Watch(WatchArgs),
    /// Import a legacy results.json history file
    Import(ImportArgs),
    /// Show what the database holds
    Status(StatusArgs),
    /// Write a sample speedtrack.yaml
    Init(InitArgs),
    Version,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Config file; defaults to ./speedtrack.yaml when present
    #[arg(long, env = "SPEEDTRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database path (overrides config and SPEEDTRACK_DB)
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(clap::Args, Debug, Clone)]
pub struct MeasureArgs {
    /// Number of consecutive tests in one browser session
    #[arg(default_value_t = 1)]
    pub count: u32,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ReportArgs {
    /// Output file (overrides report.out)
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct WatchArgs {
    /// Seconds between cycles (overrides schedule.interval_secs)
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Stop after this many cycles
    #[arg(long)]
    pub cycles: Option<u64>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ImportArgs {
    /// JSON array of past measurements
    pub input: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "text")]
    pub format: String, // text|json

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "speedtrack.yaml")]
    pub config: PathBuf,
}
