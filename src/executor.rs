//! Engine statement protocol driver.
//!
//! One call walks a statement through prepare, bind, step and finalize. The
//! prepared statement is owned by this function; every early return drops it,
//! which finalizes it, so no exit path leaks an engine statement.

use rusqlite::Statement;
use tracing::{debug, trace};

use crate::error::{CodecError, Result, SqlightError};
use crate::query::{AsQuery, BindParams};
use crate::row::{Columns, FromRow};
use crate::types::Value;

/// Run `query` on `conn` and decode every produced row into `R`.
///
/// Rows come back in the engine's step order. Statements without a result set
/// (DDL, DML) yield an empty vector.
///
/// # Errors
///
/// Returns `SqlightError::Prepare` if the SQL cannot be compiled, `Bind` if a parameter
/// cannot be encoded or the parameter count does not match the statement, `Step` if the
/// engine fails while running the statement, and `Decode` if a column does not fit `R`.
pub(crate) fn execute<R, Q>(conn: &rusqlite::Connection, query: &Q) -> Result<Vec<R>>
where
    R: FromRow,
    Q: AsQuery + ?Sized,
{
    let sql = query.sql();
    debug!(sql, "preparing statement");
    let mut stmt = conn.prepare(sql).map_err(|e| SqlightError::Prepare {
        sql: sql.to_owned(),
        message: e.to_string(),
    })?;

    bind_params(&mut stmt, query.params())?;
    let width = row_width::<R>(&stmt)?;
    let rows = step_rows::<R>(&mut stmt, sql, width)?;

    stmt.finalize().map_err(|e| SqlightError::Step {
        sql: sql.to_owned(),
        message: e.to_string(),
    })?;
    debug!(sql, rows = rows.len(), "statement finished");
    Ok(rows)
}

fn bind_params<P: BindParams + ?Sized>(stmt: &mut Statement<'_>, params: &P) -> Result<()> {
    let values = params.encode()?;
    let expected = stmt.parameter_count();
    if values.len() != expected {
        return Err(SqlightError::Bind {
            slot: expected.min(values.len()) + 1,
            message: format!(
                "statement has {expected} parameter slots but {} values were supplied",
                values.len()
            ),
        });
    }

    for (idx, value) in values.iter().enumerate() {
        let slot = idx + 1;
        trace!(slot, kind = %value.kind(), "binding parameter");
        stmt.raw_bind_parameter(slot, value)
            .map_err(|e| SqlightError::Bind {
                slot,
                message: e.to_string(),
            })?;
    }
    Ok(())
}

/// Number of columns to copy out per row, checked against what the statement yields.
fn row_width<R: FromRow>(stmt: &Statement<'_>) -> Result<usize> {
    let available = stmt.column_count();
    match R::WIDTH {
        None => Ok(available),
        Some(requested) if requested <= available => Ok(requested),
        Some(requested) => Err(SqlightError::Decode {
            column: available,
            source: CodecError::MissingColumn {
                requested,
                available,
            },
        }),
    }
}

fn step_rows<R: FromRow>(stmt: &mut Statement<'_>, sql: &str, width: usize) -> Result<Vec<R>> {
    let step_error = |e: rusqlite::Error| SqlightError::Step {
        sql: sql.to_owned(),
        message: e.to_string(),
    };

    let mut results = Vec::new();
    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next().map_err(step_error)? {
        let mut values = Vec::with_capacity(width);
        for column in 0..width {
            let raw = row.get_ref(column).map_err(|e| SqlightError::Decode {
                column,
                source: CodecError::Invalid {
                    target: "column",
                    message: e.to_string(),
                },
            })?;
            // Copy out now: the engine may reuse the buffer on the next step.
            let value = Value::from_engine(raw)
                .map_err(|source| SqlightError::Decode { column, source })?;
            values.push(value);
        }
        results.push(R::from_columns(Columns::new(values))?);
        trace!(row = results.len(), "decoded row");
    }
    Ok(results)
}
