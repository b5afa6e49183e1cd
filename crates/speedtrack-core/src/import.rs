use crate::model::{parse_timestamp, Measurement};
use crate::storage::Store;
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub read: usize,
    pub imported: usize,
    pub invalid: usize,
    pub duplicates: usize,
}

/// Row shape of the legacy `results.json` history file.
#[derive(Debug, Deserialize)]
struct LegacyRow {
    timestamp: Option<String>,
    download: Option<f64>,
    upload: Option<f64>,
    ping: Option<f64>,
    jitter: Option<f64>,
    #[serde(default)]
    sinr4g: Option<f64>,
    #[serde(default)]
    sinr5g: Option<f64>,
}

impl LegacyRow {
    fn into_measurement(self) -> Option<Measurement> {
        let m = Measurement {
            timestamp: parse_timestamp(self.timestamp.as_deref()?).ok()?,
            download: self.download?,
            upload: self.upload?,
            ping: self.ping?,
            jitter: self.jitter?,
            sinr4g: self.sinr4g,
            sinr5g: self.sinr5g,
        };
        m.is_valid().then_some(m)
    }
}

pub fn import_json_file(store: &Store, path: &Path) -> anyhow::Result<ImportSummary> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(store, &text).with_context(|| format!("failed to import {}", path.display()))
}

/// Imports a JSON array of measurements in a single transaction. Rows with missing
/// values are skipped, as are rows whose timestamp is already stored, so importing the
/// same file twice adds nothing the second time.
pub fn import_json(store: &Store, text: &str) -> anyhow::Result<ImportSummary> {
    let value: serde_json::Value = serde_json::from_str(text).context("invalid JSON")?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        _ => anyhow::bail!("expected a JSON array of measurements"),
    };

    let mut seen: HashSet<_> = store
        .read_all()?
        .into_iter()
        .map(|m| m.timestamp)
        .collect();

    let mut summary = ImportSummary {
        read: items.len(),
        ..ImportSummary::default()
    };
    let mut rows = Vec::new();
    for item in items {
        let parsed = serde_json::from_value::<LegacyRow>(item)
            .ok()
            .and_then(LegacyRow::into_measurement);
        match parsed {
            Some(m) if seen.insert(m.timestamp) => rows.push(m),
            Some(_) => summary.duplicates += 1,
            None => summary.invalid += 1,
        }
    }

    summary.imported = store.append(&rows)?;
    tracing::info!(
        event = "import_done",
        read = summary.read,
        imported = summary.imported,
        invalid = summary.invalid,
        duplicates = summary.duplicates,
    );
    Ok(summary)
}
