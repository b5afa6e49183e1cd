use super::{exit_codes, open_store, prepare};
use crate::cli::args::ImportArgs;
use speedtrack_core::import::import_json_file;

pub fn cmd_import(args: ImportArgs) -> anyhow::Result<i32> {
    let cfg = match prepare(&args.common) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };

    println!("Importing results from: {}", args.input.display());
    let store = open_store(&cfg.db)?;
    let summary = import_json_file(&store, &args.input)?;

    println!(
        "Imported {} of {} records into {} ({} invalid, {} already present).",
        summary.imported,
        summary.read,
        cfg.db.display(),
        summary.invalid,
        summary.duplicates
    );
    Ok(exit_codes::OK)
}
