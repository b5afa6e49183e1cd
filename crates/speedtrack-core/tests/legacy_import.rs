use speedtrack_core::import::{import_json, import_json_file, ImportSummary};
use speedtrack_core::storage::Store;
use tempfile::tempdir;

const HISTORY: &str = r#"[
  {"timestamp": "2024-01-01T00:00:00.000Z", "download": 150.2, "upload": 12.4, "ping": 18, "jitter": 2.1},
  {"timestamp": "2024-01-01T00:05:00.000Z", "download": 148.0, "upload": 11.9, "ping": 19, "jitter": 1.8, "sinr5g": 12.5},
  {"timestamp": "2024-01-01T00:10:00.000Z", "download": null, "upload": 11.0, "ping": 20, "jitter": 2.0},
  {"timestamp": "not a date", "download": 1, "upload": 1, "ping": 1, "jitter": 1},
  "garbage"
]"#;

fn store() -> Store {
    let store = Store::memory().unwrap();
    store.init_schema().unwrap();
    store
}

#[test]
fn test_valid_rows_are_imported_and_rest_counted() -> anyhow::Result<()> {
    let store = store();
    let summary = import_json(&store, HISTORY)?;
    assert_eq!(
        summary,
        ImportSummary {
            read: 5,
            imported: 2,
            invalid: 3,
            duplicates: 0,
        }
    );

    let rows = store.read_all()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].ping, 18.0);
    assert_eq!(rows[1].sinr5g, Some(12.5));
    assert_eq!(rows[1].sinr4g, None);
    Ok(())
}

#[test]
fn test_repeat_import_adds_nothing() -> anyhow::Result<()> {
    let store = store();
    import_json(&store, HISTORY)?;
    let again = import_json(&store, HISTORY)?;
    assert_eq!(again.imported, 0);
    assert_eq!(again.duplicates, 2);
    assert_eq!(store.stats()?.rows, 2);
    Ok(())
}

#[test]
fn test_duplicates_within_one_file_are_collapsed() -> anyhow::Result<()> {
    let store = store();
    let text = r#"[
      {"timestamp": "2024-01-01T00:00:00Z", "download": 1, "upload": 1, "ping": 1, "jitter": 1},
      {"timestamp": "2024-01-01T01:00:00+01:00", "download": 2, "upload": 2, "ping": 2, "jitter": 2}
    ]"#;
    let summary = import_json(&store, text)?;
    assert_eq!((summary.imported, summary.duplicates), (1, 1));
    Ok(())
}

#[test]
fn test_non_array_input_is_rejected() {
    let store = store();
    assert!(import_json(&store, r#"{"timestamp": "2024-01-01T00:00:00Z"}"#).is_err());
    assert!(import_json(&store, "not json").is_err());
    assert_eq!(store.stats().unwrap().rows, 0);
}

#[test]
fn test_import_from_file() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("results.json");
    std::fs::write(&path, HISTORY)?;

    let store = store();
    assert_eq!(import_json_file(&store, &path)?.imported, 2);
    assert!(import_json_file(&store, &dir.path().join("missing.json")).is_err());
    Ok(())
}
