use super::{build_report, exit_codes, open_existing_store, prepare};
use crate::cli::args::ReportArgs;
use speedtrack_core::report::ReportOutcome;

pub fn cmd_report(args: ReportArgs) -> anyhow::Result<i32> {
    let mut cfg = match prepare(&args.common) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    if let Some(out) = args.out {
        cfg.report.out = out;
    }

    let Some(store) = open_existing_store(&cfg.db)? else {
        eprintln!(
            "no data: database {} does not exist; run `speedtrack measure` first",
            cfg.db.display()
        );
        return Ok(exit_codes::NO_DATA);
    };

    match build_report(&cfg, &store).generate()? {
        ReportOutcome::Written { path, rows } => {
            println!("dashboard generated: {} ({} measurements)", path.display(), rows);
            Ok(exit_codes::OK)
        }
        ReportOutcome::NoData => {
            eprintln!(
                "no data: database {} holds no measurements; report not written",
                cfg.db.display()
            );
            Ok(exit_codes::NO_DATA)
        }
    }
}
