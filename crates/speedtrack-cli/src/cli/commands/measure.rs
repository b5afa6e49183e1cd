use super::{build_driver, exit_codes, open_store, prepare};
use crate::cli::args::MeasureArgs;
use anyhow::Context;

pub async fn cmd_measure(args: MeasureArgs) -> anyhow::Result<i32> {
    let cfg = match prepare(&args.common) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let store = open_store(&cfg.db)?;
    let driver = build_driver(&cfg)?;
    let rows = driver.run_measurements(args.count).await?;

    for m in &rows {
        let sinr = match (m.sinr4g, m.sinr5g) {
            (None, None) => String::new(),
            (s4, s5) => format!(
                "  sinr4g={} sinr5g={}",
                s4.map_or("-".to_string(), |v| v.to_string()),
                s5.map_or("-".to_string(), |v| v.to_string())
            ),
        };
        println!(
            "{}  download={} Mbps  upload={} Mbps  ping={} ms  jitter={} ms{}",
            m.timestamp_string(),
            m.download,
            m.upload,
            m.ping,
            m.jitter,
            sinr
        );
    }

    if rows.is_empty() {
        eprintln!(
            "no measurement succeeded ({} attempted); nothing stored",
            args.count.max(1)
        );
        return Ok(exit_codes::MEASUREMENT_FAILED);
    }

    let added = store
        .append(&rows)
        .with_context(|| format!("failed to save results to {}", cfg.db.display()))?;
    eprintln!("database updated: added {} records", added);
    Ok(exit_codes::OK)
}
