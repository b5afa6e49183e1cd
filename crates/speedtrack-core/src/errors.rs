use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Why a single measurement iteration was abandoned. None of these stop a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasureError {
    NavigationTimeout(Duration),
    StartControlTimeout(Duration),
    ResultTimeout(Duration),
    Parse { field: &'static str, text: String },
    Browser(String),
}

impl MeasureError {
    pub fn browser(e: anyhow::Error) -> Self {
        MeasureError::Browser(format!("{:#}", e))
    }

    /// Short machine-friendly tag for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MeasureError::NavigationTimeout(_) => "navigation_timeout",
            MeasureError::StartControlTimeout(_) => "start_control_timeout",
            MeasureError::ResultTimeout(_) => "result_timeout",
            MeasureError::Parse { .. } => "parse",
            MeasureError::Browser(_) => "browser",
        }
    }
}

impl fmt::Display for MeasureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasureError::NavigationTimeout(d) => {
                write!(f, "page did not load within {}s", d.as_secs())
            }
            MeasureError::StartControlTimeout(d) => {
                write!(f, "start control not available within {}s", d.as_secs())
            }
            MeasureError::ResultTimeout(d) => {
                write!(f, "results did not settle within {}s", d.as_secs())
            }
            MeasureError::Parse { field, text } => {
                write!(f, "could not parse {} from '{}'", field, text)
            }
            MeasureError::Browser(msg) => write!(f, "browser error: {}", msg),
        }
    }
}

impl std::error::Error for MeasureError {}
