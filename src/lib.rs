//! Typed queries and scoped transactions over an embedded SQLite connection.
//!
//! Parameters are bound from tuples of native Rust values and result rows are
//! decoded into tuples, with the [`codec`] module as the single place where
//! native types meet the engine's dynamic [`Value`]s.
//!
//! ```rust
//! use sqlight::prelude::*;
//!
//! let db = Connection::open_shared("file:lib_doc?mode=memory")?;
//! db.execute::<()>("CREATE TABLE test (id INTEGER NOT NULL, name TEXT NOT NULL)")?;
//! db.execute_with::<(), _>("INSERT INTO test VALUES (?1, ?2)", (1, "abc"))?;
//!
//! let mut tx = db.begin_transaction()?;
//! tx.execute_with::<(), _>("INSERT INTO test VALUES (?1, ?2)", (2, "def"))?;
//! tx.commit()?;
//!
//! let rows: Vec<(i32, String)> = db.execute("SELECT id, name FROM test ORDER BY id")?;
//! assert_eq!(rows.len(), 2);
//! # Ok::<(), SqlightError>(())
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
mod executor;
pub mod prelude;
pub mod query;
pub mod row;
pub mod transaction;
pub mod types;

pub use codec::{FromValue, ToValue};
pub use config::{JournalMode, OpenOptions, OpenOptionsBuilder};
pub use connection::{Connection, engine_version};
pub use error::{CodecError, Result, SqlightError};
pub use query::{AsQuery, BindParams, Query};
pub use row::{Columns, FromRow};
pub use rusqlite::OpenFlags;
pub use transaction::{Transaction, TxState};
pub use types::{Value, ValueKind};
