use crate::model::{format_timestamp, parse_timestamp, Measurement};
use anyhow::Context;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Append-only measurement log backed by a single SQLite table.
///
/// All access goes through one connection guarded by a mutex; other processes
/// (a `report` run next to a long-running `watch`) read concurrently thanks to WAL.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStats {
    pub rows: u64,
    pub first_at: Option<String>,
    pub last_at: Option<String>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite db {}", path.display()))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        // journal_mode returns the resulting mode as a row
        let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |r| r.get(0))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory sqlite db")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("store connection lock poisoned"))
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(crate::storage::schema::DDL)?;

        // Databases written before signal readings existed lack these columns.
        let cols = get_columns(&conn, "results")?;
        add_column_if_missing(&conn, &cols, "results", "sinr4g", "REAL")?;
        add_column_if_missing(&conn, &cols, "results", "sinr5g", "REAL")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_results_timestamp ON results(timestamp)",
            [],
        )
        .context("failed to create timestamp index")?;
        Ok(())
    }

    /// Writes the whole batch in one transaction and returns the number of rows written.
    pub fn append(&self, rows: &[Measurement]) -> anyhow::Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        if let Some(bad) = rows.iter().find(|r| !r.is_valid()) {
            anyhow::bail!(
                "refusing to store incomplete measurement at {}",
                bad.timestamp_string()
            );
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO results(timestamp, download, upload, ping, jitter, sinr4g, sinr5g)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for r in rows {
                stmt.execute(params![
                    format_timestamp(&r.timestamp),
                    r.download,
                    r.upload,
                    r.ping,
                    r.jitter,
                    r.sinr4g,
                    r.sinr5g,
                ])?;
            }
        }
        tx.commit().context("failed to commit measurements")?;
        Ok(rows.len())
    }

    /// Full history, oldest first. Equal timestamps keep insertion order.
    pub fn read_all(&self) -> anyhow::Result<Vec<Measurement>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT timestamp, download, upload, ping, jitter, sinr4g, sinr5g
             FROM results
             ORDER BY timestamp ASC, rowid ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(RawRow {
                timestamp: row.get(0)?,
                download: row.get(1)?,
                upload: row.get(2)?,
                ping: row.get(3)?,
                jitter: row.get(4)?,
                sinr4g: row.get(5)?,
                sinr5g: row.get(6)?,
            })
        })?;

        let mut out = Vec::new();
        let mut skipped = 0usize;
        for r in rows {
            match r?.into_measurement() {
                Some(m) => out.push(m),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(
                event = "store_rows_skipped",
                skipped,
                "skipped stored rows with missing values or unreadable timestamps"
            );
        }

        // Text order can disagree with time order for rows written with other offsets.
        out.sort_by_key(|m| m.timestamp);
        Ok(out)
    }

    pub fn stats(&self) -> anyhow::Result<StoreStats> {
        let conn = self.lock()?;
        let (rows, first_at, last_at) = conn.query_row(
            "SELECT COUNT(*), MIN(timestamp), MAX(timestamp) FROM results",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )?;
        Ok(StoreStats {
            rows: rows.max(0) as u64,
            first_at,
            last_at,
        })
    }
}

struct RawRow {
    timestamp: Option<String>,
    download: Option<f64>,
    upload: Option<f64>,
    ping: Option<f64>,
    jitter: Option<f64>,
    sinr4g: Option<f64>,
    sinr5g: Option<f64>,
}

impl RawRow {
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

fn get_columns(conn: &Connection, table: &str) -> anyhow::Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut out = HashSet::new();
    for r in rows {
        out.insert(r?);
    }
    Ok(out)
}

fn add_column_if_missing(
    conn: &Connection,
    cols: &HashSet<String>,
    table: &str,
    col: &str,
    ty: &str,
) -> anyhow::Result<()> {
    if !cols.contains(col) {
        let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, col, ty);
        conn.execute(&sql, [])?;
        tracing::info!(event = "store_migrated", table, column = col, "added missing column");
    }
    Ok(())
}
