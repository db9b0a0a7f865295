#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

/// Shared-cache in-memory database private to one test.
pub fn memory_uri(name: &str) -> String {
    format!("file:{name}?mode=memory&cache=shared")
}

/// A file-backed database path; the directory is removed when the guard drops.
pub fn temp_db(prefix: &str) -> Result<(TempDir, String), std::io::Error> {
    let dir = tempfile::tempdir()?;
    let path: PathBuf = dir.path().join(format!("{prefix}.db"));
    Ok((dir, path.to_string_lossy().into_owned()))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}
