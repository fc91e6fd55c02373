#![allow(dead_code)]

use std::path::PathBuf;

use pgtesthelper::{ConnectionSettings, Options, TestDatabase};
use tempfile::TempDir;

pub const SCHEMA: &str = "
CREATE TABLE widgets (
    id   serial PRIMARY KEY,
    name text NOT NULL
);

CREATE TABLE parts (
    id        serial PRIMARY KEY,
    widget_id integer NOT NULL REFERENCES widgets (id),
    label     text
);
";

/// Connection settings from the environment, or `None` (with a note on
/// stderr) when no server is configured and the test should be skipped.
pub fn settings() -> Option<ConnectionSettings> {
    let settings = ConnectionSettings::from_env();
    if settings.is_none() {
        eprintln!("skipping: PGTESTHELPER_USER is not set");
    }
    settings
}

/// Write `sql` to a schema file inside a fresh temp dir.
/// The caller must hold onto `TempDir` to keep the file alive.
pub fn write_schema(sql: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.sql");
    std::fs::write(&path, sql).unwrap();
    (dir, path)
}

/// Options for the standard schema. Every test passes its own prefix so
/// parallel tests never generate the same database name.
pub fn options(prefix: &str) -> Option<(Options, TempDir)> {
    let settings = settings()?;
    let (dir, path) = write_schema(SCHEMA);
    Some((Options::new(path, prefix, settings), dir))
}

/// A created database with the standard schema.
pub fn setup_db(prefix: &str) -> Option<(TestDatabase, TempDir)> {
    let (options, dir) = options(prefix)?;
    let mut db = TestDatabase::new(options).unwrap();
    db.create().unwrap();
    Some((db, dir))
}

pub fn count(db: &mut TestDatabase, table: &str) -> i64 {
    let rows = db
        .query(&format!("SELECT COUNT(*) FROM {}", table), &[])
        .unwrap();
    rows[0].get(0)
}

pub fn insert_widget(db: &mut TestDatabase, name: &str) -> i32 {
    let rows = db
        .query(
            "INSERT INTO widgets (name) VALUES ($1) RETURNING id",
            &[&name],
        )
        .unwrap();
    rows[0].get(0)
}
