mod common;

use std::time::Duration;

use sqlight::engine_version;
use sqlight::prelude::*;

use common::{init_tracing, memory_uri, temp_db};

#[test]
fn engine_version_is_reported() {
    let version = engine_version();
    assert!(version.starts_with('3'), "{version}");
}

#[test]
fn shared_cache_memory_database_is_visible_to_every_handle() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let uri = memory_uri("options_shared_cache");
    let database = Connection::open(uri.clone())?;
    let db2 = Connection::open_shared(uri)?;

    database.execute::<()>("CREATE TABLE IF NOT EXISTS test(id INTEGER NOT NULL, name TEXT NOT NULL)")?;
    database.execute::<()>("INSERT INTO test VALUES (1, 'abc')")?;

    let mut tx = db2.begin_transaction()?;
    let before: Vec<(i32, String)> = tx.execute("SELECT * FROM test")?;
    assert_eq!(before, vec![(1, "abc".to_string())]);
    tx.execute_with::<(), _>("INSERT INTO test VALUES (?, 'jkl')", (4,))?;
    tx.commit()?;

    let all: Vec<(i32, String)> = database.execute("SELECT * FROM test")?;
    assert_eq!(all, vec![(1, "abc".to_string()), (4, "jkl".to_string())]);
    Ok(())
}

#[test]
fn builder_applies_pragmas_after_open() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let (_dir, path) = temp_db("options_pragmas")?;
    let db = OpenOptions::builder(path.clone())
        .journal_mode(JournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(250))
        .open()?;

    let mode: Vec<(String,)> = db.execute("PRAGMA journal_mode")?;
    assert_eq!(mode[0].0.to_ascii_lowercase(), "wal");
    let fk: Vec<(bool,)> = db.execute("PRAGMA foreign_keys")?;
    assert_eq!(fk, vec![(true,)]);
    assert_eq!(db.path(), path);

    db.execute_batch(
        "CREATE TABLE parent (id INTEGER PRIMARY KEY);
         CREATE TABLE child (parent_id INTEGER REFERENCES parent(id));",
    )?;
    let err = db
        .execute_with::<(), _>("INSERT INTO child VALUES (?1)", (99,))
        .unwrap_err();
    assert!(err.message().contains("FOREIGN KEY"), "{err}");
    Ok(())
}

#[test]
fn read_only_connection_cannot_write() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let (_dir, path) = temp_db("options_read_only")?;
    {
        let writer = Connection::open(path.clone())?;
        writer.execute::<()>("CREATE TABLE t (id INTEGER)")?;
        writer.execute::<()>("INSERT INTO t VALUES (1)")?;
    }

    let reader = OpenOptions::builder(path).read_only(true).open()?;
    let rows: Vec<(i64,)> = reader.execute("SELECT id FROM t")?;
    assert_eq!(rows, vec![(1,)]);

    let err = reader.execute::<()>("INSERT INTO t VALUES (2)").unwrap_err();
    assert!(matches!(err, SqlightError::Step { .. }));
    assert!(err.message().contains("readonly"), "{err}");
    Ok(())
}

#[test]
fn invalid_options_are_rejected_before_opening() {
    let mut opts = OpenOptions::new("whatever.db");
    opts.read_only = true;
    assert!(matches!(
        Connection::open_with(&opts),
        Err(SqlightError::Config(_))
    ));
    assert!(matches!(
        Connection::open_with(&OpenOptions::new("")),
        Err(SqlightError::Config(_))
    ));
}

#[test]
fn options_load_from_json() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let (_dir, path) = temp_db("options_json")?;
    let raw = serde_json::json!({
        "path": path,
        "journal_mode": "truncate",
        "foreign_keys": true,
    });
    let opts: OpenOptions = serde_json::from_value(raw)?;
    assert_eq!(opts.journal_mode, Some(JournalMode::Truncate));

    let db = opts.open()?;
    let mode: Vec<(String,)> = db.execute("PRAGMA journal_mode")?;
    assert_eq!(mode[0].0.to_ascii_lowercase(), "truncate");
    Ok(())
}

#[test]
fn flags_pass_through_verbatim() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_MEMORY;
    let db = Connection::open_with_flags("file:options_flags", flags)?;
    db.execute::<()>("CREATE TABLE t (id INTEGER)")?;
    let tables: Vec<(String,)> =
        db.execute("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    assert_eq!(tables, vec![("t".to_string(),)]);
    db.close()?;
    Ok(())
}
