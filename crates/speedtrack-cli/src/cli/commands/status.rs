use super::{exit_codes, open_existing_store, prepare};
use crate::cli::args::StatusArgs;
use speedtrack_core::storage::StoreStats;

pub fn cmd_status(args: StatusArgs) -> anyhow::Result<i32> {
    let cfg = match prepare(&args.common) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    let stats = match open_existing_store(&cfg.db)? {
        Some(store) => store.stats()?,
        None => StoreStats::default(),
    };

    if args.format == "json" {
        let doc = serde_json::json!({
            "db": cfg.db.display().to_string(),
            "rows": stats.rows,
            "first_at": stats.first_at,
            "last_at": stats.last_at,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("database: {}", cfg.db.display());
        println!("measurements: {}", stats.rows);
        if let (Some(first), Some(last)) = (&stats.first_at, &stats.last_at) {
            println!("first: {}", first);
            println!("last:  {}", last);
        }
    }

    Ok(if stats.rows == 0 {
        exit_codes::NO_DATA
    } else {
        exit_codes::OK
    })
}
