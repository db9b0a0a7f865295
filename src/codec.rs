//! Value codec.
//!
//! Converts native Rust values into engine [`Value`]s for binding and back again
//! when columns are extracted. This is the only place that knows how a native
//! type is represented by the engine; the executor only moves [`Value`]s around.

use std::any::type_name;

use chrono::NaiveDateTime;
use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value as SqliteValue, ValueRef};
use serde_json::Value as JsonValue;

use crate::error::CodecError;
use crate::types::Value;

const TIMESTAMP_WRITE_FORMAT: &str = "%F %T%.f";
const TIMESTAMP_READ_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Encode a native value into the engine representation.
pub trait ToValue {
    /// # Errors
    ///
    /// Returns `CodecError` if the value has no lossless engine representation.
    fn to_value(&self) -> Result<Value, CodecError>;
}

/// Decode an extracted engine value into a native type.
pub trait FromValue: Sized {
    /// # Errors
    ///
    /// Returns `CodecError` if the dynamic kind does not fit the requested type.
    fn from_value(value: Value) -> Result<Self, CodecError>;
}

fn mismatch<T>(value: &Value) -> CodecError {
    match value {
        Value::Null => CodecError::UnexpectedNull {
            target: type_name::<T>(),
        },
        other => CodecError::TypeMismatch {
            target: type_name::<T>(),
            found: other.kind(),
        },
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Result<Value, CodecError> {
        Ok(self.clone())
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        Ok(value)
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Result<Value, CodecError> {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Result<Value, CodecError> {
        match self {
            Some(inner) => inner.to_value(),
            None => Ok(Value::Null),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

macro_rules! impl_narrow_integer {
    ($($ty:ty),+) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Result<Value, CodecError> {
                    Ok(Value::Int(i32::from(*self)))
                }
            }
        )+
    };
}

macro_rules! impl_wide_integer {
    ($($ty:ty),+) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Result<Value, CodecError> {
                    i64::try_from(*self)
                        .map(Value::Int64)
                        .map_err(|_| CodecError::OutOfRange {
                            target: "INTEGER (64-bit)",
                            value: self.to_string(),
                        })
                }
            }
        )+
    };
}

macro_rules! impl_decode_integer {
    ($($ty:ty),+) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, CodecError> {
                    let wide = value.as_i64().ok_or_else(|| mismatch::<$ty>(&value))?;
                    <$ty>::try_from(wide).map_err(|_| CodecError::OutOfRange {
                        target: type_name::<$ty>(),
                        value: wide.to_string(),
                    })
                }
            }
        )+
    };
}

impl_narrow_integer!(i8, i16, i32, u8, u16);
// u32 does not fit the engine's 32-bit integer slot, so it travels as 64-bit.
impl_wide_integer!(u32, i64, isize, u64, usize);
impl_decode_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl ToValue for bool {
    fn to_value(&self) -> Result<Value, CodecError> {
        Ok(Value::Int(i32::from(*self)))
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            Some(other) => Err(CodecError::OutOfRange {
                target: "bool",
                value: other.to_string(),
            }),
            None => Err(mismatch::<bool>(&value)),
        }
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Result<Value, CodecError> {
        Ok(Value::Real(*self))
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Result<Value, CodecError> {
        Ok(Value::Real(f64::from(*self)))
    }
}

impl FromValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Real(real) => Ok(real),
            Value::Int(int) => Ok(f64::from(int)),
            Value::Int64(int) => Ok(int as f64),
            other => Err(mismatch::<f64>(&other)),
        }
    }
}

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self, CodecError> {
        f64::from_value(value).map(|real| real as f32)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Result<Value, CodecError> {
        Ok(Value::Text(self.to_owned()))
    }
}

impl ToValue for String {
    fn to_value(&self) -> Result<Value, CodecError> {
        Ok(Value::Text(self.clone()))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Text(text) => Ok(text),
            other => Err(mismatch::<String>(&other)),
        }
    }
}

impl ToValue for [u8] {
    fn to_value(&self) -> Result<Value, CodecError> {
        Ok(Value::Blob(self.to_vec()))
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Result<Value, CodecError> {
        Ok(Value::Blob(self.clone()))
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        match value {
            Value::Blob(bytes) => Ok(bytes),
            other => Err(mismatch::<Vec<u8>>(&other)),
        }
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Result<Value, CodecError> {
        Ok(Value::Text(self.format(TIMESTAMP_WRITE_FORMAT).to_string()))
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let text = match value {
            Value::Text(text) => text,
            other => return Err(mismatch::<NaiveDateTime>(&other)),
        };
        TIMESTAMP_READ_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(&text, format).ok())
            .ok_or_else(|| CodecError::Invalid {
                target: "timestamp",
                message: format!("unrecognised timestamp text {text:?}"),
            })
    }
}

impl ToValue for JsonValue {
    fn to_value(&self) -> Result<Value, CodecError> {
        Ok(Value::Text(self.to_string()))
    }
}

impl FromValue for JsonValue {
    fn from_value(value: Value) -> Result<Self, CodecError> {
        let text = match value {
            Value::Text(text) => text,
            other => return Err(mismatch::<JsonValue>(&other)),
        };
        serde_json::from_str(&text).map_err(|e| CodecError::Invalid {
            target: "JSON",
            message: e.to_string(),
        })
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqliteValue::Null),
            Value::Int(int) => ToSqlOutput::Owned(SqliteValue::Integer(i64::from(*int))),
            Value::Int64(int) => ToSqlOutput::Owned(SqliteValue::Integer(*int)),
            Value::Real(real) => ToSqlOutput::Owned(SqliteValue::Real(*real)),
            // Borrowed text and blobs are bound with SQLITE_TRANSIENT: the engine takes
            // its own copy before the bind call returns.
            Value::Text(text) => ToSqlOutput::Borrowed(ValueRef::Text(text.as_bytes())),
            Value::Blob(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes)),
        })
    }
}

impl Value {
    /// Copy a column out of the engine's buffer.
    ///
    /// The borrowed buffer is only valid until the statement is stepped again or
    /// finalized, so text and blobs are always copied into owned storage here.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Invalid` if a TEXT column holds bytes that are not UTF-8.
    pub fn from_engine(value: ValueRef<'_>) -> Result<Self, CodecError> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(int) => Value::Int64(int),
            ValueRef::Real(real) => Value::Real(real),
            ValueRef::Text(bytes) => {
                Value::Text(String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::Invalid {
                    target: "TEXT",
                    message: e.to_string(),
                })?)
            }
            ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::types::ValueKind;

    #[test]
    fn integer_width_picks_engine_kind() {
        assert_eq!(7_i32.to_value(), Ok(Value::Int(7)));
        assert_eq!(7_u8.to_value(), Ok(Value::Int(7)));
        assert_eq!(7_i64.to_value(), Ok(Value::Int64(7)));
        assert_eq!(u32::MAX.to_value(), Ok(Value::Int64(i64::from(u32::MAX))));
    }

    #[test]
    fn u64_above_i64_max_is_rejected() {
        let err = u64::MAX.to_value().unwrap_err();
        assert!(matches!(err, CodecError::OutOfRange { .. }));
        assert_eq!(
            (i64::MAX as u64).to_value(),
            Ok(Value::Int64(i64::MAX))
        );
    }

    #[test]
    fn narrowing_decode_is_range_checked() {
        assert_eq!(i32::from_value(Value::Int64(42)), Ok(42));
        let err = i32::from_value(Value::Int64(i64::from(i32::MAX) + 1)).unwrap_err();
        assert!(matches!(err, CodecError::OutOfRange { .. }));
        let err = u8::from_value(Value::Int64(-1)).unwrap_err();
        assert!(matches!(err, CodecError::OutOfRange { .. }));
    }

    #[test]
    fn null_needs_an_optional_target() {
        assert_eq!(Option::<i32>::from_value(Value::Null), Ok(None));
        assert_eq!(Option::<String>::None.to_value(), Ok(Value::Null));
        assert_eq!(
            Some("x".to_string()).to_value(),
            Ok(Value::Text("x".into()))
        );
        let err = String::from_value(Value::Null).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedNull { .. }));
    }

    #[test]
    fn kind_mismatch_reports_found_kind() {
        let err = i64::from_value(Value::Text("12".into())).unwrap_err();
        assert_eq!(
            err,
            CodecError::TypeMismatch {
                target: "i64",
                found: ValueKind::Text
            }
        );
        assert!(Vec::<u8>::from_value(Value::Text("abc".into())).is_err());
        assert!(String::from_value(Value::Blob(b"abc".to_vec())).is_err());
    }

    #[test]
    fn bool_accepts_only_zero_and_one() {
        assert_eq!(true.to_value(), Ok(Value::Int(1)));
        assert_eq!(bool::from_value(Value::Int64(0)), Ok(false));
        assert!(bool::from_value(Value::Int64(2)).is_err());
    }

    #[test]
    fn real_widens_integers() {
        assert_eq!(f64::from_value(Value::Int64(3)), Ok(3.0));
        assert_eq!(f64::from_value(Value::Real(2.5)), Ok(2.5));
    }

    #[test]
    fn timestamp_and_json_travel_as_text() -> Result<(), Box<dyn std::error::Error>> {
        let ts = NaiveDate::from_ymd_opt(2024, 2, 29)
            .and_then(|d| d.and_hms_milli_opt(13, 45, 1, 250))
            .ok_or("bad date")?;
        let encoded = ts.to_value()?;
        assert_eq!(encoded, Value::Text("2024-02-29 13:45:01.250".into()));
        assert_eq!(NaiveDateTime::from_value(encoded)?, ts);
        assert!(NaiveDateTime::from_value(Value::Text("yesterday".into())).is_err());

        let doc = json!({"a": [1, 2], "b": null});
        let encoded = doc.to_value()?;
        assert_eq!(JsonValue::from_value(encoded)?, doc);
        Ok(())
    }

    #[test]
    fn engine_text_is_copied_out() -> Result<(), Box<dyn std::error::Error>> {
        let buffer = String::from("borrowed");
        let value = Value::from_engine(ValueRef::Text(buffer.as_bytes()))?;
        drop(buffer);
        assert_eq!(value, Value::Text("borrowed".into()));
        assert_eq!(
            Value::from_engine(ValueRef::Integer(5))?,
            Value::Int64(5)
        );
        assert!(Value::from_engine(ValueRef::Text(&[0xff, 0xfe])).is_err());
        Ok(())
    }
}
