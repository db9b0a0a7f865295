use crate::codec::FromValue;
use crate::error::{CodecError, Result, SqlightError};
use crate::types::Value;

/// Column values copied out of one engine row, waiting to be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Columns {
    values: Vec<Option<Value>>,
}

impl Columns {
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter().map(Some).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Decode the column at `index` (0-based) into `T`.
    ///
    /// Each column can be taken once.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::Decode` if the column is missing or its kind does not fit `T`.
    pub fn take<T: FromValue>(&mut self, index: usize) -> Result<T> {
        let available = self.values.len();
        let value = self
            .values
            .get_mut(index)
            .and_then(Option::take)
            .ok_or_else(|| SqlightError::Decode {
                column: index,
                source: CodecError::MissingColumn {
                    requested: index + 1,
                    available,
                },
            })?;
        T::from_value(value).map_err(|source| SqlightError::Decode {
            column: index,
            source,
        })
    }

    /// Remaining values in column order; taken columns are skipped.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values.into_iter().flatten().collect()
    }
}

/// A fixed-arity, fixed-type row decoded from one step of a statement.
///
/// Implemented for `()`, tuples of up to twelve [`FromValue`] types, and
/// `Vec<Value>` for an untyped row holding every column.
pub trait FromRow: Sized {
    /// Number of leading columns the row consumes; `None` means all of them.
    const WIDTH: Option<usize>;

    /// # Errors
    ///
    /// Returns `SqlightError::Decode` if a column cannot be decoded into its position's type.
    fn from_columns(columns: Columns) -> Result<Self>;
}

impl FromRow for () {
    const WIDTH: Option<usize> = Some(0);

    fn from_columns(_columns: Columns) -> Result<Self> {
        Ok(())
    }
}

impl FromRow for Vec<Value> {
    const WIDTH: Option<usize> = None;

    fn from_columns(columns: Columns) -> Result<Self> {
        Ok(columns.into_values())
    }
}

macro_rules! impl_from_row_for_tuple {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: FromValue),+> FromRow for ($($name,)+) {
            const WIDTH: Option<usize> = Some([$($idx),+].len());

            fn from_columns(mut columns: Columns) -> Result<Self> {
                Ok(($(columns.take::<$name>($idx)?,)+))
            }
        }
    };
}

impl_from_row_for_tuple!(A 0);
impl_from_row_for_tuple!(A 0, B 1);
impl_from_row_for_tuple!(A 0, B 1, C 2);
impl_from_row_for_tuple!(A 0, B 1, C 2, D 3);
impl_from_row_for_tuple!(A 0, B 1, C 2, D 3, E 4);
impl_from_row_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);
impl_from_row_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_from_row_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);
impl_from_row_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8);
impl_from_row_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9);
impl_from_row_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10);
impl_from_row_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_decodes_positionally() -> Result<()> {
        let columns = Columns::new(vec![
            Value::Int64(2),
            Value::Text("def".into()),
            Value::Null,
        ]);
        let row = <(i32, String, Option<Vec<u8>>)>::from_columns(columns)?;
        assert_eq!(row, (2, "def".to_string(), None));
        Ok(())
    }

    #[test]
    fn decode_error_names_the_column() {
        let columns = Columns::new(vec![Value::Int64(1), Value::Null]);
        let err = <(i64, String)>::from_columns(columns).unwrap_err();
        assert!(matches!(
            err,
            SqlightError::Decode {
                column: 1,
                source: CodecError::UnexpectedNull { .. }
            }
        ));
    }

    #[test]
    fn widths_follow_tuple_arity() {
        assert_eq!(<() as FromRow>::WIDTH, Some(0));
        assert_eq!(<(i32, String, f64) as FromRow>::WIDTH, Some(3));
        assert_eq!(<Vec<Value> as FromRow>::WIDTH, None);
    }
}
