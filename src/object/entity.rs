use crate::core::Value;
use crate::schema::EntityDescriptor;
use chrono::{DateTime, Utc};

/// Why a value could not be stored into a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignError {
    Unknown,
    Invalid(String),
}

/// Typed data of one persistent object.
///
/// Implemented by [`persistent_object!`](crate::persistent_object); the
/// descriptor drives DDL, validation and every generated statement.
pub trait Entity: Default + Clone + Send + Sync + 'static {
    fn descriptor() -> &'static EntityDescriptor;

    /// Current value of a declared field.
    fn field_value(&self, field: &str) -> Option<Value>;

    fn assign_field(&mut self, field: &str, value: Value) -> Result<(), AssignError>;

    /// JSON array of objects, one per demo row, keyed by column name.
    fn demo_data() -> &'static str {
        "[]"
    }

    fn type_name() -> &'static str {
        Self::descriptor().type_name
    }
}

/// Conversion between a struct field and a column value.
pub trait FieldValue: Sized {
    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Result<Self, String>;
}

fn mismatch(expected: &str, got: &Value) -> String {
    if got.is_null() {
        format!("expected {}, got NULL", expected)
    } else {
        format!("expected {}, got {}", expected, got.type_name())
    }
}

impl FieldValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(text) => Ok(text),
            other => Err(mismatch("TEXT", &other)),
        }
    }
}

impl FieldValue for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(mismatch("INTEGER", &other)),
        }
    }
}

impl FieldValue for i32 {
    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| format!("{} is out of range", wide))
    }
}

impl FieldValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        value.as_f64().ok_or_else(|| mismatch("FLOAT", &value))
    }
}

// tinyint(1) columns come back as integers from MySQL.
impl FieldValue for bool {
    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Boolean(b) => Ok(b),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            other => Err(mismatch("BOOLEAN", &other)),
        }
    }
}

impl FieldValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        value.as_timestamp().ok_or_else(|| mismatch("TIMESTAMP", &value))
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map(T::to_value).unwrap_or(Value::Null)
    }

    fn from_value(value: Value) -> Result<Self, String> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_conversions() {
        assert_eq!(String::from_value(Value::from("x")).unwrap(), "x");
        assert!(String::from_value(Value::Null).unwrap_err().contains("NULL"));
        assert_eq!(i32::from_value(Value::Integer(7)).unwrap(), 7);
        assert!(i32::from_value(Value::Integer(i64::MAX)).is_err());
        assert!(bool::from_value(Value::Integer(1)).unwrap());
        assert!(bool::from_value(Value::Integer(2)).is_err());
        assert_eq!(f64::from_value(Value::Integer(2)).unwrap(), 2.0);
    }

    #[test]
    fn test_optional_fields_accept_null() {
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(Value::Integer(4)).unwrap(), Some(4));
        assert_eq!(Some("a".to_string()).to_value(), Value::from("a"));
        assert_eq!(Option::<String>::None.to_value(), Value::Null);
    }

    #[test]
    fn test_timestamp_parses_datetime_text() {
        let ts = DateTime::<Utc>::from_value(Value::from("2012-06-01 10:30:00")).unwrap();
        assert_eq!(ts.to_value().to_json(), serde_json::json!("2012-06-01 10:30:00"));
    }
}
