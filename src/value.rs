use crate::error::{GdbError, Result};
use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, ValueRef};

/// Owned dynamic value stored in a row.
///
/// `Value::Null` is the provider-side null. The field accessors never hand it
/// out; they translate it to `None` and back.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    /// A GeoPackage geometry blob (header followed by WKB).
    Geometry(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
            Value::Geometry(_) => "geometry",
        }
    }

    pub(crate) fn from_sql_ref(value: ValueRef<'_>, is_geometry: bool) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            // Invalid UTF-8 keeps its bytes so that writing the row back is lossless.
            ValueRef::Text(t) => match std::str::from_utf8(t) {
                Ok(text) => Value::Text(text.to_string()),
                Err(_) => Value::Blob(t.to_vec()),
            },
            ValueRef::Blob(b) if is_geometry => Value::Geometry(b.to_vec()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }

    fn mismatch(&self, expected: &'static str) -> GdbError {
        GdbError::ValueTypeMismatch {
            expected,
            actual: self.type_name(),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Borrowed(ValueRef::Real(*r)),
            Value::Text(t) => ToSqlOutput::Borrowed(ValueRef::Text(t.as_bytes())),
            Value::Blob(b) | Value::Geometry(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl<T> From<Option<T>> for Value
where
    Value: From<T>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Value::from).unwrap_or(Value::Null)
    }
}

impl TryFrom<Value> for i64 {
    type Error = GdbError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(other.mismatch("integer")),
        }
    }
}

impl TryFrom<Value> for i32 {
    type Error = GdbError;

    fn try_from(value: Value) -> Result<Self> {
        let i = i64::try_from(value)?;
        i32::try_from(i).map_err(|_| GdbError::ValueOutOfRange { target: "i32" })
    }
}

impl TryFrom<Value> for f64 {
    type Error = GdbError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Real(r) => Ok(r),
            Value::Integer(i) => Ok(i as f64),
            other => Err(other.mismatch("real")),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = GdbError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            Value::Integer(_) => Err(GdbError::ValueOutOfRange { target: "bool" }),
            other => Err(other.mismatch("boolean")),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = GdbError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Text(t) => Ok(t),
            other => Err(other.mismatch("text")),
        }
    }
}

impl TryFrom<Value> for Vec<u8> {
    type Error = GdbError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Blob(b) | Value::Geometry(b) => Ok(b),
            other => Err(other.mismatch("blob")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use crate::error::GdbError;

    #[test]
    fn option_none_becomes_null() {
        assert_eq!(Value::from(Option::<i64>::None), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".to_string()));
    }

    #[test]
    fn bool_is_stored_as_integer() -> crate::Result<()> {
        assert_eq!(Value::from(true), Value::Integer(1));
        let flag: bool = Value::Integer(0).try_into()?;
        assert!(!flag);
        assert!(matches!(
            bool::try_from(Value::Integer(2)),
            Err(GdbError::ValueOutOfRange { target: "bool" })
        ));
        Ok(())
    }

    #[test]
    fn mismatch_reports_both_types() {
        let err = String::try_from(Value::Real(1.5)).expect_err("real is not text");
        match err {
            GdbError::ValueTypeMismatch { expected, actual } => {
                assert_eq!(expected, "text");
                assert_eq!(actual, "real");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_text_keeps_its_bytes() {
        use rusqlite::types::ValueRef;

        assert_eq!(
            Value::from_sql_ref(ValueRef::Text(b"ok"), false),
            Value::Text("ok".to_string())
        );
        assert_eq!(
            Value::from_sql_ref(ValueRef::Text(&[0xff, 0x41]), false),
            Value::Blob(vec![0xff, 0x41])
        );
    }

    #[test]
    fn i32_rejects_out_of_range() {
        let err = i32::try_from(Value::Integer(i64::MAX)).expect_err("too large");
        assert!(matches!(err, GdbError::ValueOutOfRange { target: "i32" }));
    }

    #[test]
    fn integer_widens_to_real() -> crate::Result<()> {
        let x: f64 = Value::Integer(3).try_into()?;
        assert_eq!(x, 3.0);
        Ok(())
    }
}
