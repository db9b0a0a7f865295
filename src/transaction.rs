use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::connection::Connection;
use crate::error::{Result, SqlightError};
use crate::query::{AsQuery, BindParams, Query};
use crate::row::FromRow;

/// Where a [`Transaction`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// `BEGIN` succeeded; statements participate in the transaction.
    Open,
    Committed,
    RolledBack,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxState::Open => "open",
            TxState::Committed => "committed",
            TxState::RolledBack => "rolled back",
        };
        f.write_str(name)
    }
}

/// A transaction bound to one shared [`Connection`].
///
/// `BEGIN` is issued on construction. Dropping the transaction while it is still
/// [`TxState::Open`] issues a best-effort `ROLLBACK`; any failure there is logged
/// and otherwise ignored. The transaction holds an [`Rc`] to its connection, so the
/// connection outlives it.
///
/// ```rust
/// use sqlight::prelude::*;
///
/// let db = Connection::open_shared("file:doc_tx?mode=memory")?;
/// db.execute::<()>("CREATE TABLE test (id INTEGER NOT NULL)")?;
///
/// let mut tx = db.begin_transaction()?;
/// tx.execute::<()>(Query::new("INSERT INTO test VALUES (?1)", (4,)))?;
/// let seen: Vec<(i32,)> = tx.execute("SELECT id FROM test")?;
/// assert_eq!(seen, vec![(4,)]);
/// tx.commit()?;
/// # Ok::<(), SqlightError>(())
/// ```
pub struct Transaction {
    conn: Rc<Connection>,
    state: TxState,
}

impl Transaction {
    /// Issue `BEGIN` on `conn`.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::TransactionUsage` if a transaction is already open on this
    /// connection (no `BEGIN` is issued), or the engine error if `BEGIN` fails.
    pub fn begin(conn: &Rc<Connection>) -> Result<Self> {
        if conn.is_in_transaction() {
            return Err(SqlightError::TransactionUsage(
                "a transaction is already open on this connection".into(),
            ));
        }
        conn.execute::<()>("BEGIN")?;
        conn.set_in_transaction(true);
        debug!(path = conn.path(), "transaction started");
        Ok(Self {
            conn: Rc::clone(conn),
            state: TxState::Open,
        })
    }

    #[must_use]
    pub fn state(&self) -> TxState {
        self.state
    }

    #[must_use]
    pub fn connection(&self) -> &Rc<Connection> {
        &self.conn
    }

    fn ensure_open(&self, action: &str) -> Result<()> {
        if self.state == TxState::Open {
            Ok(())
        } else {
            Err(SqlightError::TransactionUsage(format!(
                "cannot {action}: transaction already {}",
                self.state
            )))
        }
    }

    /// Run a statement inside this transaction.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::TransactionUsage` once the transaction has ended, otherwise
    /// whatever the statement itself fails with.
    pub fn execute<R: FromRow>(&self, query: impl AsQuery) -> Result<Vec<R>> {
        self.ensure_open("execute")?;
        self.conn.execute(query)
    }

    /// Run `sql` with positional `params` inside this transaction.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::TransactionUsage` once the transaction has ended, otherwise
    /// whatever the statement itself fails with.
    pub fn execute_with<R: FromRow, P: BindParams>(&self, sql: &str, params: P) -> Result<Vec<R>> {
        self.execute(Query::new(sql, params))
    }

    /// Issue `COMMIT`.
    ///
    /// If the engine refuses, the transaction stays open and the error is returned;
    /// the commit is not retried.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::TransactionUsage` if the transaction already ended, or the
    /// engine error from `COMMIT`.
    pub fn commit(&mut self) -> Result<()> {
        self.finish("COMMIT", TxState::Committed)
    }

    /// Issue `ROLLBACK` explicitly.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::TransactionUsage` if the transaction already ended, or the
    /// engine error from `ROLLBACK`.
    pub fn rollback(&mut self) -> Result<()> {
        self.finish("ROLLBACK", TxState::RolledBack)
    }

    fn finish(&mut self, sql: &'static str, outcome: TxState) -> Result<()> {
        self.ensure_open(&sql.to_ascii_lowercase())?;
        if let Err(err) = self.conn.execute::<()>(sql) {
            // Some failures make the engine roll back on its own.
            if self.conn.is_autocommit() {
                self.end(TxState::RolledBack);
            }
            return Err(err);
        }
        self.end(outcome);
        Ok(())
    }

    fn end(&mut self, outcome: TxState) {
        self.state = outcome;
        self.conn.set_in_transaction(false);
        debug!(path = self.conn.path(), state = %outcome, "transaction finished");
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state != TxState::Open {
            return;
        }
        if let Err(err) = self.conn.execute::<()>("ROLLBACK") {
            warn!(path = self.conn.path(), error = %err, "implicit rollback failed");
        }
        self.end(TxState::RolledBack);
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("path", &self.conn.path())
            .field("state", &self.state)
            .finish()
    }
}
