//! Browser capability used by the measurement driver.
//!
//! The driver only needs to open a page, load the speed-test site, press start and
//! read the result fields. Timeouts and polling live in the driver, so a backend
//! implements each step as a plain async operation.

use crate::errors::MeasureError;
use crate::model::SpeedSample;
use async_trait::async_trait;
use serde::Deserialize;

pub mod chromium;
pub mod fake;

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> anyhow::Result<Box<dyn Browser>>;
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
pub trait Browser: Send + Sync {
    /// Opens a fresh page with its own state.
    async fn open_page(&self) -> anyhow::Result<Box<dyn SpeedTestPage>>;
    async fn close(self: Box<Self>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait SpeedTestPage: Send {
    async fn navigate(&mut self, url: &str) -> anyhow::Result<()>;
    /// Waits for the start control to become usable, then activates it.
    async fn start_test(&mut self) -> anyhow::Result<()>;
    /// One snapshot of the result fields as currently rendered.
    async fn read_results(&mut self) -> anyhow::Result<ResultFields>;
    async fn close(self: Box<Self>) -> anyhow::Result<()>;
}

/// Raw text of the result fields. `None` when the element is not on the page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResultFields {
    pub download: Option<String>,
    pub upload: Option<String>,
    pub ping: Option<String>,
    pub jitter: Option<String>,
}

impl ResultFields {
    /// The test is finished once both throughput fields hold real numbers.
    pub fn is_complete(&self) -> bool {
        parse_reading(self.download.as_deref()).is_some()
            && parse_reading(self.upload.as_deref()).is_some()
    }

    pub fn to_sample(&self) -> Result<SpeedSample, MeasureError> {
        Ok(SpeedSample {
            download: required("download", self.download.as_deref())?,
            upload: required("upload", self.upload.as_deref())?,
            ping: required("ping", self.ping.as_deref())?,
            jitter: required("jitter", self.jitter.as_deref())?,
        })
    }
}

fn required(field: &'static str, text: Option<&str>) -> Result<f64, MeasureError> {
    parse_reading(text).ok_or_else(|| MeasureError::Parse {
        field,
        text: text.unwrap_or_default().to_string(),
    })
}

pub const PLACEHOLDER: &str = "---";

/// Lenient float parse of a rendered value: leading number wins, trailing units are
/// ignored, and empty text or the placeholder means "not yet".
pub fn parse_reading(text: Option<&str>) -> Option<f64> {
    let s = text?.trim();
    if s.is_empty() || s == PLACEHOLDER {
        return None;
    }

    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let digits_start = end;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    let number = &s[..end];
    if !number[digits_start..].bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    let v: f64 = number.parse().ok()?;
    v.is_finite().then_some(v)
}
