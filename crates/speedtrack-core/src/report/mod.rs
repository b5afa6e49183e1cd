pub mod html;

use crate::storage::Store;
use anyhow::Context;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub out: PathBuf,
    pub title: String,
}

impl ReportOptions {
    pub fn from_settings(settings: &crate::config::ReportSettings) -> Self {
        Self {
            out: settings.out.clone(),
            title: settings.title.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Written { path: PathBuf, rows: usize },
    /// Nothing measured yet; the previous artifact (if any) is left alone.
    NoData,
}

/// Renders the stored history into one self-contained HTML page.
#[derive(Clone)]
pub struct ReportGenerator {
    pub store: Store,
    pub options: ReportOptions,
}

impl ReportGenerator {
    pub fn new(store: Store, options: ReportOptions) -> Self {
        Self { store, options }
    }

    pub fn generate(&self) -> anyhow::Result<ReportOutcome> {
        let rows = self.store.read_all().context("failed to read measurements")?;
        if rows.is_empty() {
            tracing::info!(event = "report_skipped", reason = "no_data", "no measurements yet; report not written");
            return Ok(ReportOutcome::NoData);
        }

        let doc = html::render_html(&rows, &self.options.title)?;
        write_artifact(&self.options.out, &doc)?;

        tracing::info!(
            event = "report_written",
            path = %self.options.out.display(),
            rows = rows.len(),
            "dashboard generated"
        );
        Ok(ReportOutcome::Written {
            path: self.options.out.clone(),
            rows: rows.len(),
        })
    }
}

fn write_artifact(out: &Path, doc: &str) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(out, doc).with_context(|| format!("failed to write {}", out.display()))
}
