use crate::codec::ToValue;
use crate::error::{Result, SqlightError};
use crate::types::Value;

/// A SQL string and its bound parameters bundled together.
///
/// The parameter tuple is fixed when the query is built and never mutated; each
/// execution prepares a fresh engine statement from it, so one `Query` can be run
/// any number of times:
/// ```rust
/// use sqlight::prelude::*;
///
/// let query = Query::new("SELECT * FROM test WHERE id != ?1 AND name = ?2", (2, "abc"));
/// assert_eq!(query.sql(), "SELECT * FROM test WHERE id != ?1 AND name = ?2");
/// # let _ = query;
/// ```
#[derive(Debug, Clone)]
pub struct Query<P = ()> {
    sql: String,
    params: P,
}

impl<P: BindParams> Query<P> {
    /// Create a new `Query` with the given SQL text and parameter tuple
    pub fn new(sql: impl Into<String>, params: P) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn params(&self) -> &P {
        &self.params
    }

    /// Split into the SQL text and the parameters.
    pub fn into_parts(self) -> (String, P) {
        (self.sql, self.params)
    }
}

impl Query<()> {
    /// Create a new `Query` with no parameters
    pub fn without_params(sql: impl Into<String>) -> Self {
        Self::new(sql, ())
    }
}

impl From<&str> for Query<()> {
    fn from(sql: &str) -> Self {
        Query::without_params(sql)
    }
}

impl From<String> for Query<()> {
    fn from(sql: String) -> Self {
        Query::without_params(sql)
    }
}

/// An ordered set of parameters bound positionally to slots `1..=arity`.
///
/// Implemented for `()`, tuples of up to twelve [`ToValue`] types, and slices or
/// vectors of [`Value`] when the parameter list is only known at runtime.
pub trait BindParams {
    fn arity(&self) -> usize;

    /// Encode every parameter, in slot order.
    ///
    /// # Errors
    ///
    /// Returns `SqlightError::Bind` naming the first slot whose value cannot be encoded.
    fn encode(&self) -> Result<Vec<Value>>;
}

pub(crate) fn encode_slot<T: ToValue + ?Sized>(value: &T, slot: usize) -> Result<Value> {
    value.to_value().map_err(|e| SqlightError::Bind {
        slot,
        message: e.to_string(),
    })
}

impl BindParams for () {
    fn arity(&self) -> usize {
        0
    }

    fn encode(&self) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

impl BindParams for [Value] {
    fn arity(&self) -> usize {
        self.len()
    }

    fn encode(&self) -> Result<Vec<Value>> {
        Ok(self.to_vec())
    }
}

impl BindParams for Vec<Value> {
    fn arity(&self) -> usize {
        self.len()
    }

    fn encode(&self) -> Result<Vec<Value>> {
        Ok(self.clone())
    }
}

impl<T: BindParams + ?Sized> BindParams for &T {
    fn arity(&self) -> usize {
        (**self).arity()
    }

    fn encode(&self) -> Result<Vec<Value>> {
        (**self).encode()
    }
}

macro_rules! impl_bind_params_for_tuple {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: ToValue),+> BindParams for ($($name,)+) {
            fn arity(&self) -> usize {
                [$($idx),+].len()
            }

            fn encode(&self) -> Result<Vec<Value>> {
                Ok(vec![$(encode_slot(&self.$idx, $idx + 1)?),+])
            }
        }
    };
}

impl_bind_params_for_tuple!(A 0);
impl_bind_params_for_tuple!(A 0, B 1);
impl_bind_params_for_tuple!(A 0, B 1, C 2);
impl_bind_params_for_tuple!(A 0, B 1, C 2, D 3);
impl_bind_params_for_tuple!(A 0, B 1, C 2, D 3, E 4);
impl_bind_params_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);
impl_bind_params_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_bind_params_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);
impl_bind_params_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8);
impl_bind_params_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9);
impl_bind_params_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10);
impl_bind_params_for_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11);

/// Anything the executor can run: a [`Query`], or bare SQL text with no parameters.
pub trait AsQuery {
    type Params: BindParams;

    fn sql(&self) -> &str;
    fn params(&self) -> &Self::Params;
}

impl<P: BindParams> AsQuery for Query<P> {
    type Params = P;

    fn sql(&self) -> &str {
        &self.sql
    }

    fn params(&self) -> &P {
        &self.params
    }
}

impl AsQuery for str {
    type Params = ();

    fn sql(&self) -> &str {
        self
    }

    fn params(&self) -> &() {
        &()
    }
}

impl AsQuery for String {
    type Params = ();

    fn sql(&self) -> &str {
        self
    }

    fn params(&self) -> &() {
        &()
    }
}

impl<Q: AsQuery + ?Sized> AsQuery for &Q {
    type Params = Q::Params;

    fn sql(&self) -> &str {
        (**self).sql()
    }

    fn params(&self) -> &Self::Params {
        (**self).params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_params_encode_in_slot_order() -> Result<()> {
        let query = Query::new("INSERT INTO t VALUES (?, ?, ?)", (1_i32, "abc", None::<i64>));
        assert_eq!(query.params().arity(), 3);
        assert_eq!(
            query.params().encode()?,
            vec![Value::Int(1), Value::Text("abc".into()), Value::Null]
        );
        Ok(())
    }

    #[test]
    fn encode_failure_names_the_slot() {
        let err = (1_i32, u64::MAX).encode().unwrap_err();
        assert!(matches!(err, SqlightError::Bind { slot: 2, .. }));
    }

    #[test]
    fn raw_sql_has_no_params() {
        let query: Query = "SELECT 1".into();
        assert_eq!(query.params().arity(), 0);
        assert_eq!(AsQuery::sql("SELECT 2"), "SELECT 2");
    }
}
