use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use rusqlite::OpenFlags;
use tracing::debug;

use crate::config::OpenOptions;
use crate::error::{Result, SqlightError};
use crate::executor;
use crate::query::{AsQuery, BindParams, Query};
use crate::row::FromRow;
use crate::transaction::Transaction;

/// Version string of the linked engine library.
#[must_use]
pub fn engine_version() -> &'static str {
    rusqlite::version()
}

/// An open engine handle.
///
/// Statements run in program order on the calling thread. A connection is not
/// `Send`; each thread opens its own.
///
/// Transactions keep the connection alive through an [`Rc`], so they can only be
/// started from a shared connection (see [`Connection::open_shared`] and
/// [`Connection::into_shared`]).
pub struct Connection {
    conn: rusqlite::Connection,
    path: String,
    in_transaction: Cell<bool>,
    shared: Weak<Connection>,
}

impl Connection {
    /// Open `path` read-write, creating it if missing. URI filenames are accepted.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::Open` with the engine diagnostic if the database cannot be opened.
    pub fn open(path: impl Into<String>) -> Result<Self> {
        Self::open_with(&OpenOptions::new(path))
    }

    /// Open `path` with engine flags passed through unchanged.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::Open` with the engine diagnostic if the database cannot be opened.
    pub fn open_with_flags(path: impl Into<String>, flags: OpenFlags) -> Result<Self> {
        let path = path.into();
        debug!(path = %path, ?flags, "opening connection");
        // On failure the engine handle is closed before the error reaches us.
        let conn = rusqlite::Connection::open_with_flags(&path, flags).map_err(|e| {
            SqlightError::Open {
                path: path.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(Self {
            conn,
            path,
            in_transaction: Cell::new(false),
            shared: Weak::new(),
        })
    }

    /// Open with [`OpenOptions`], applying busy timeout and pragmas after the handle opens.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::Config` for invalid options and `SqlightError::Open` if the
    /// engine rejects the open or a post-open setting. The handle is closed in both cases.
    pub fn open_with(opts: &OpenOptions) -> Result<Self> {
        let conn = Self::open_with_flags(opts.path.clone(), opts.flags()?)?;
        conn.apply_options(opts).map_err(|e| SqlightError::Open {
            path: opts.path.clone(),
            message: e.message(),
        })?;
        Ok(conn)
    }

    /// Open `path` and wrap it for transaction use.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::Open` with the engine diagnostic if the database cannot be opened.
    pub fn open_shared(path: impl Into<String>) -> Result<Rc<Self>> {
        Self::open(path).map(Self::into_shared)
    }

    /// Move this connection behind an [`Rc`] that [`begin_transaction`](Self::begin_transaction)
    /// recognises.
    #[must_use]
    pub fn into_shared(self) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            shared: weak.clone(),
            ..self
        })
    }

    fn apply_options(&self, opts: &OpenOptions) -> Result<()> {
        if let Some(timeout) = opts.busy_timeout() {
            self.conn.busy_timeout(timeout)?;
        }
        if let Some(enabled) = opts.foreign_keys {
            let state = if enabled { "ON" } else { "OFF" };
            self.execute::<()>(format!("PRAGMA foreign_keys = {state}"))?;
        }
        if let Some(mode) = opts.journal_mode {
            let applied = self.execute::<(String,)>(format!("PRAGMA journal_mode = {mode}"))?;
            debug!(requested = %mode, applied = ?applied.first(), "journal mode set");
        }
        Ok(())
    }

    /// Run a statement and decode every result row into `R`.
    ///
    /// ```rust
    /// use sqlight::prelude::*;
    ///
    /// let db = Connection::open("file:doc_execute?mode=memory")?;
    /// db.execute::<()>("CREATE TABLE test (id INTEGER NOT NULL, name TEXT NOT NULL)")?;
    /// db.execute::<()>(Query::new("INSERT INTO test VALUES (?1, ?2)", (1, "abc")))?;
    /// let rows: Vec<(i32, String)> = db.execute("SELECT id, name FROM test")?;
    /// assert_eq!(rows, vec![(1, "abc".to_string())]);
    /// # Ok::<(), SqlightError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `SqlightError` if preparing, binding, stepping or decoding fails.
    pub fn execute<R: FromRow>(&self, query: impl AsQuery) -> Result<Vec<R>> {
        executor::execute(&self.conn, &query)
    }

    /// Run `sql` with positional `params`.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError` if preparing, binding, stepping or decoding fails.
    pub fn execute_with<R: FromRow, P: BindParams>(&self, sql: &str, params: P) -> Result<Vec<R>> {
        executor::execute(&self.conn, &Query::new(sql, params))
    }

    /// Run a script of `;`-separated statements without parameters or results.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::Step` with the engine diagnostic if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        debug!(sql, "executing batch");
        self.conn
            .execute_batch(sql)
            .map_err(|e| SqlightError::Step {
                sql: sql.to_owned(),
                message: e.to_string(),
            })
    }

    /// Start a transaction on this connection.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::TransactionUsage` (without issuing `BEGIN`) if this connection
    /// was not made shared, or if a transaction is already open on it. Engine failures from
    /// `BEGIN` are returned as-is.
    pub fn begin_transaction(&self) -> Result<Transaction> {
        let shared = self.shared.upgrade().ok_or_else(|| {
            SqlightError::TransactionUsage(
                "transaction can only be created from a shared connection".into(),
            )
        })?;
        Transaction::begin(&shared)
    }

    /// Run `func` inside a transaction: commit if it returns `Ok`, roll back otherwise.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or the transaction error converted into `E`.
    pub fn with_transaction<T, E, F>(self: &Rc<Self>, func: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Transaction) -> std::result::Result<T, E>,
        E: From<SqlightError>,
    {
        let mut tx = Transaction::begin(self)?;
        let value = func(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Whether a [`Transaction`] is currently open on this connection.
    #[must_use]
    pub fn is_in_transaction(&self) -> bool {
        self.in_transaction.get()
    }

    pub(crate) fn set_in_transaction(&self, open: bool) {
        self.in_transaction.set(open);
    }

    /// Whether the engine is in autocommit mode (no `BEGIN` outstanding).
    #[must_use]
    pub fn is_autocommit(&self) -> bool {
        self.conn.is_autocommit()
    }

    /// Rows changed by the most recent INSERT, UPDATE or DELETE.
    #[must_use]
    pub fn changes(&self) -> u64 {
        self.conn.changes()
    }

    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Close the handle, surfacing the engine error instead of ignoring it on drop.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::Sqlite` if the engine refuses to close (for example
    /// because a statement was left unfinalized).
    pub fn close(self) -> Result<()> {
        debug!(path = %self.path, "closing connection");
        self.conn.close().map_err(|(_, e)| SqlightError::Sqlite(e))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("path", &self.path)
            .field("in_transaction", &self.in_transaction.get())
            .field("shared", &(self.shared.strong_count() > 0))
            .finish_non_exhaustive()
    }
}
