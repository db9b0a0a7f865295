//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and traits
//! to make it easier to get started with the library.

pub use crate::codec::{FromValue, ToValue};
pub use crate::config::{JournalMode, OpenOptions, OpenOptionsBuilder};
pub use crate::connection::Connection;
pub use crate::error::SqlightError;
pub use crate::query::{AsQuery, BindParams, Query};
pub use crate::row::FromRow;
pub use crate::transaction::{Transaction, TxState};
pub use crate::types::Value;
pub use rusqlite::OpenFlags;
