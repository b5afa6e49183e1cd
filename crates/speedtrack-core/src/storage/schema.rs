pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS results (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  timestamp TEXT NOT NULL,
  download REAL NOT NULL,
  upload REAL NOT NULL,
  ping REAL NOT NULL,
  jitter REAL NOT NULL,
  sinr4g REAL,
  sinr5g REAL
);
"#;
