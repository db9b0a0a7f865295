use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rusqlite::OpenFlags;
use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::error::{Result, SqlightError};

/// `PRAGMA journal_mode` values accepted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

impl fmt::Display for JournalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JournalMode {
    type Err = SqlightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "delete" => Ok(JournalMode::Delete),
            "truncate" => Ok(JournalMode::Truncate),
            "persist" => Ok(JournalMode::Persist),
            "memory" => Ok(JournalMode::Memory),
            "wal" => Ok(JournalMode::Wal),
            "off" => Ok(JournalMode::Off),
            other => Err(SqlightError::Config(format!(
                "unknown journal mode: {other}"
            ))),
        }
    }
}

/// Options for opening a [`Connection`].
///
/// Flags are handed to the engine verbatim; the remaining settings are applied
/// right after the handle opens. Options can be deserialized from a config file:
/// ```rust
/// use sqlight::prelude::*;
///
/// let opts: OpenOptions = serde_json::from_str(
///     r#"{ "path": "app.db", "journal_mode": "wal", "busy_timeout_ms": 5000 }"#,
/// )?;
/// assert_eq!(opts.journal_mode, Some(JournalMode::Wal));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    pub path: String,
    pub read_only: bool,
    pub create: bool,
    pub uri: bool,
    pub shared_cache: bool,
    pub in_memory: bool,
    pub busy_timeout_ms: Option<u64>,
    pub foreign_keys: Option<bool>,
    pub journal_mode: Option<JournalMode>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            path: String::new(),
            read_only: false,
            create: true,
            uri: true,
            shared_cache: false,
            in_memory: false,
            busy_timeout_ms: None,
            foreign_keys: None,
            journal_mode: None,
        }
    }
}

impl OpenOptions {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn builder(path: impl Into<String>) -> OpenOptionsBuilder {
        OpenOptionsBuilder::new(path)
    }

    /// Engine open flags for these options.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::Config` for combinations the engine rejects as misuse.
    pub fn flags(&self) -> Result<OpenFlags> {
        if self.path.is_empty() {
            return Err(SqlightError::Config("database path is empty".into()));
        }
        if self.read_only && self.create {
            return Err(SqlightError::Config(
                "read_only and create cannot both be set".into(),
            ));
        }

        let mut flags = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        if self.create {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= OpenFlags::SQLITE_OPEN_URI;
        }
        if self.shared_cache {
            flags |= OpenFlags::SQLITE_OPEN_SHARED_CACHE;
        }
        if self.in_memory {
            flags |= OpenFlags::SQLITE_OPEN_MEMORY;
        }
        // Connections are never shared across threads.
        flags |= OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Ok(flags)
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Option<Duration> {
        self.busy_timeout_ms.map(Duration::from_millis)
    }

    /// Open a connection with these options.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::Config` for invalid options and `SqlightError::Open` if the
    /// engine refuses the database or one of the post-open settings.
    pub fn open(&self) -> Result<Connection> {
        Connection::open_with(self)
    }
}

/// Fluent builder for [`OpenOptions`].
#[derive(Debug, Clone)]
pub struct OpenOptionsBuilder {
    opts: OpenOptions,
}

impl OpenOptionsBuilder {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            opts: OpenOptions::new(path),
        }
    }

    /// Open read-only; clears `create`.
    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.opts.read_only = read_only;
        if read_only {
            self.opts.create = false;
        }
        self
    }

    #[must_use]
    pub fn create(mut self, create: bool) -> Self {
        self.opts.create = create;
        self
    }

    #[must_use]
    pub fn uri(mut self, uri: bool) -> Self {
        self.opts.uri = uri;
        self
    }

    #[must_use]
    pub fn shared_cache(mut self, shared_cache: bool) -> Self {
        self.opts.shared_cache = shared_cache;
        self
    }

    #[must_use]
    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.opts.in_memory = in_memory;
        self
    }

    #[must_use]
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.opts.busy_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.opts.foreign_keys = Some(enabled);
        self
    }

    #[must_use]
    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.opts.journal_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn finish(self) -> OpenOptions {
        self.opts
    }

    /// Build the options and open a connection.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError` if the options are invalid or the open fails.
    pub fn open(self) -> Result<Connection> {
        Connection::open_with(&self.opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_allow_create_and_uri() -> Result<()> {
        let flags = OpenOptions::new("db.sqlite").flags()?;
        assert!(flags.contains(OpenFlags::SQLITE_OPEN_READ_WRITE));
        assert!(flags.contains(OpenFlags::SQLITE_OPEN_CREATE));
        assert!(flags.contains(OpenFlags::SQLITE_OPEN_URI));
        assert!(!flags.contains(OpenFlags::SQLITE_OPEN_SHARED_CACHE));
        Ok(())
    }

    #[test]
    fn read_only_with_create_is_rejected() {
        let mut opts = OpenOptions::new("db.sqlite");
        opts.read_only = true;
        assert!(matches!(opts.flags(), Err(SqlightError::Config(_))));

        let opts = OpenOptions::builder("db.sqlite").read_only(true).finish();
        assert!(!opts.create);
        assert!(opts.flags().is_ok());
    }

    #[test]
    fn journal_mode_parses_case_insensitively() {
        assert_eq!("WAL".parse::<JournalMode>().ok(), Some(JournalMode::Wal));
        assert!(matches!(
            "sideways".parse::<JournalMode>(),
            Err(SqlightError::Config(_))
        ));
    }

    #[test]
    fn options_deserialize_with_defaults() -> std::result::Result<(), serde_json::Error> {
        let opts: OpenOptions =
            serde_json::from_str(r#"{ "path": "file:memdb?mode=memory", "shared_cache": true }"#)?;
        assert!(opts.create);
        assert!(opts.shared_cache);
        assert_eq!(opts.busy_timeout(), None);
        Ok(())
    }
}
