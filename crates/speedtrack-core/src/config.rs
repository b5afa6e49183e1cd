use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const DEFAULT_CONFIG_PATH: &str = "speedtrack.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub version: u32,
    pub db: PathBuf,
    pub log_level: String,
    pub report: ReportSettings,
    pub schedule: ScheduleSettings,
    pub browser: BrowserSettings,
    pub target: TargetSettings,
    pub timeouts: TimeoutSettings,
    pub signal: SignalSettings,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            db: PathBuf::from("speedtest.db"),
            log_level: "info".to_string(),
            report: ReportSettings::default(),
            schedule: ScheduleSettings::default(),
            browser: BrowserSettings::default(),
            target: TargetSettings::default(),
            timeouts: TimeoutSettings::default(),
            signal: SignalSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub out: PathBuf,
    pub title: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            out: PathBuf::from("index.html"),
            title: "Internet Speed Test".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub interval_secs: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

impl ScheduleSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Chrome/Chromium binary; auto-detected when unset.
    pub executable: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: String,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            window_width: 1920,
            window_height: 1080,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSettings {
    pub url: String,
    pub start_selector: String,
    pub download_selector: String,
    pub upload_selector: String,
    pub ping_selector: String,
    pub jitter_selector: String,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            url: "https://openspeedtest.com/".to_string(),
            start_selector: "#startButtonDesk".to_string(),
            download_selector: "#downResult".to_string(),
            upload_selector: "#upResultC2".to_string(),
            ping_selector: "#pingResult".to_string(),
            jitter_selector: "#jitterResultC3".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub navigation_secs: u64,
    pub start_control_secs: u64,
    pub result_secs: u64,
    pub poll_interval_ms: u64,
    pub cooldown_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            navigation_secs: 60,
            start_control_secs: 30,
            result_secs: 120,
            poll_interval_ms: 1000,
            cooldown_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalSettings {
    pub enabled: bool,
    pub url: String,
    pub timeout_secs: u64,
    pub sinr4g_pointer: String,
    pub sinr5g_pointer: String,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://192.168.12.1/TMI/v1/gateway?get=all".to_string(),
            timeout_secs: 5,
            sinr4g_pointer: "/signal/4g/sinr".to_string(),
            sinr5g_pointer: "/signal/5g/sinr".to_string(),
        }
    }
}

/// A parsed config together with the keys that were ignored while reading it. The
/// keys are returned rather than logged so the caller can report them once logging
/// is set up.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: TrackerConfig,
    pub unknown_fields: Vec<String>,
}

impl LoadedConfig {
    fn defaults() -> Self {
        Self {
            config: TrackerConfig::default(),
            unknown_fields: Vec::new(),
        }
    }

    pub fn warn_unknown_fields(&self) {
        if !self.unknown_fields.is_empty() {
            tracing::warn!(
                event = "config_unknown_fields",
                fields = ?self.unknown_fields,
                "ignored unknown config fields: {}",
                self.unknown_fields.join(", ")
            );
        }
    }
}

/// Loads a config file. Unknown keys are collected, or rejected when `strict`.
pub fn load_config(path: &Path, strict: bool) -> Result<LoadedConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    parse_config(&raw, strict)
        .map_err(|e| ConfigError(format!("{} (file: {})", e.0, path.display())))
}

pub fn parse_config(raw: &str, strict: bool) -> Result<LoadedConfig, ConfigError> {
    // An empty file is a valid "all defaults" config.
    if raw.trim().is_empty() {
        return Ok(LoadedConfig::defaults());
    }

    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);
    let config: TrackerConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    if strict && !ignored_keys.is_empty() {
        return Err(ConfigError(format!(
            "unknown fields detected in strict mode: {:?}",
            ignored_keys
        )));
    }

    config.validate()?;
    Ok(LoadedConfig {
        config,
        unknown_fields: ignored_keys.into_iter().collect(),
    })
}

/// Explicit path must exist; otherwise `speedtrack.yaml` in the working directory is used
/// when present, and built-in defaults when not. Environment overrides are applied last.
pub fn resolve_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let mut loaded = match explicit {
        Some(path) => load_config(path, false)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(default_path, false)?
            } else {
                LoadedConfig::defaults()
            }
        }
    };
    loaded.config.apply_env(|key| std::env::var(key).ok());
    loaded.config.validate()?;
    Ok(loaded)
}

impl TrackerConfig {
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SPEEDTRACK_DB") {
            self.db = PathBuf::from(v);
        }
        if let Some(v) = lookup("SPEEDTRACK_LOG") {
            self.log_level = v;
        }
        if let Some(v) = lookup("SPEEDTRACK_INTERVAL_SECS") {
            if let Ok(n) = v.parse() {
                self.schedule.interval_secs = n;
            }
        }
        if let Some(v) = lookup("SPEEDTRACK_SIGNAL_URL") {
            self.signal.url = v;
        }
        if let Some(v) = lookup("SPEEDTRACK_REPORT_OUT") {
            self.report.out = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 0 && self.version != SUPPORTED_CONFIG_VERSION {
            return Err(ConfigError(format!(
                "unsupported config version {} (supported: {})",
                self.version, SUPPORTED_CONFIG_VERSION
            )));
        }
        if self.schedule.interval_secs == 0 {
            return Err(ConfigError("schedule.interval_secs must be > 0".into()));
        }
        let t = &self.timeouts;
        for (name, v) in [
            ("timeouts.navigation_secs", t.navigation_secs),
            ("timeouts.start_control_secs", t.start_control_secs),
            ("timeouts.result_secs", t.result_secs),
            ("timeouts.poll_interval_ms", t.poll_interval_ms),
        ] {
            if v == 0 {
                return Err(ConfigError(format!("{} must be > 0", name)));
            }
        }
        if self.target.url.trim().is_empty() {
            return Err(ConfigError("target.url must not be empty".into()));
        }
        Ok(())
    }
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, SAMPLE_CONFIG)
        .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))
}

pub const SAMPLE_CONFIG: &str = r##"version: 1
db: speedtest.db
log_level: info
report:
  out: index.html
  title: Internet Speed Test
schedule:
  interval_secs: 300
browser:
  headless: true
  # executable: /usr/bin/chromium
  window_width: 1920
  window_height: 1080
target:
  url: https://openspeedtest.com/
  start_selector: "#startButtonDesk"
  download_selector: "#downResult"
  upload_selector: "#upResultC2"
  ping_selector: "#pingResult"
  jitter_selector: "#jitterResultC3"
timeouts:
  navigation_secs: 60
  start_control_secs: 30
  result_secs: 120
  poll_interval_ms: 1000
  cooldown_secs: 5
signal:
  enabled: true
  url: http://192.168.12.1/TMI/v1/gateway?get=all
  timeout_secs: 5
  sinr4g_pointer: /signal/4g/sinr
  sinr5g_pointer: /signal/5g/sinr
"##;
