//! Typed attribute values for span events and attributes.
//!
//! The set of accepted value types is closed: anything that has no `From`
//! conversion into [`AttributeValue`] is rejected at compile time rather than
//! silently dropped when the event is recorded.

use opentelemetry::{Array, Key, KeyValue, StringValue, Value};

/// A single attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    StringArray(Vec<String>),
    I64Array(Vec<i64>),
    F64Array(Vec<f64>),
    BoolArray(Vec<bool>),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::I64(i64::from(value))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::I64(i64::from(value))
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<f32> for AttributeValue {
    fn from(value: f32) -> Self {
        Self::F64(f64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        Self::StringArray(values)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(values: Vec<&str>) -> Self {
        Self::StringArray(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<i32>> for AttributeValue {
    fn from(values: Vec<i32>) -> Self {
        Self::I64Array(values.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<u32>> for AttributeValue {
    fn from(values: Vec<u32>) -> Self {
        Self::I64Array(values.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<i64>> for AttributeValue {
    fn from(values: Vec<i64>) -> Self {
        Self::I64Array(values)
    }
}

impl From<Vec<f32>> for AttributeValue {
    fn from(values: Vec<f32>) -> Self {
        Self::F64Array(values.into_iter().map(f64::from).collect())
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(values: Vec<f64>) -> Self {
        Self::F64Array(values)
    }
}

impl From<Vec<bool>> for AttributeValue {
    fn from(values: Vec<bool>) -> Self {
        Self::BoolArray(values)
    }
}

impl From<AttributeValue> for Value {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::String(s) => Value::String(s.into()),
            AttributeValue::I64(i) => Value::I64(i),
            AttributeValue::F64(f) => Value::F64(f),
            AttributeValue::Bool(b) => Value::Bool(b),
            AttributeValue::StringArray(values) => Value::Array(Array::String(
                values.into_iter().map(StringValue::from).collect(),
            )),
            AttributeValue::I64Array(values) => Value::Array(Array::I64(values)),
            AttributeValue::F64Array(values) => Value::Array(Array::F64(values)),
            AttributeValue::BoolArray(values) => Value::Array(Array::Bool(values)),
        }
    }
}

/// Convert `(key, value)` pairs into OpenTelemetry key-values, preserving order.
pub fn key_values<I, K, V>(attributes: I) -> Vec<KeyValue>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<Key>,
    V: Into<AttributeValue>,
{
    attributes
        .into_iter()
        .map(|(key, value)| KeyValue::new(key, Value::from(value.into())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_widen_to_i64() {
        assert_eq!(AttributeValue::from(42_i32), AttributeValue::I64(42));
        assert_eq!(AttributeValue::from(7_u32), AttributeValue::I64(7));
        assert_eq!(
            AttributeValue::from(vec![1_i32, 2, 3]),
            AttributeValue::I64Array(vec![1, 2, 3])
        );
    }

    #[test]
    fn test_unsigned_and_single_precision_vecs_widen() {
        assert_eq!(
            AttributeValue::from(vec![7_u32, u32::MAX]),
            AttributeValue::I64Array(vec![7, i64::from(u32::MAX)])
        );
        assert_eq!(
            AttributeValue::from(vec![0.5_f32, 2.0]),
            AttributeValue::F64Array(vec![0.5, 2.0])
        );
    }

    #[test]
    fn test_string_slices_become_owned() {
        assert_eq!(
            AttributeValue::from(vec!["a", "b"]),
            AttributeValue::StringArray(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_conversion_into_otel_values() {
        assert_eq!(Value::from(AttributeValue::from(42)), Value::I64(42));
        assert_eq!(Value::from(AttributeValue::from(true)), Value::Bool(true));
        assert_eq!(Value::from(AttributeValue::from(1.5)), Value::F64(1.5));
        assert_eq!(
            Value::from(AttributeValue::from("ok")),
            Value::String("ok".into())
        );
        assert_eq!(
            Value::from(AttributeValue::from(vec![false, true])),
            Value::Array(Array::Bool(vec![false, true]))
        );
    }

    #[test]
    fn test_key_values_keeps_order_and_types() {
        let kvs = key_values([
            ("user_id", AttributeValue::from(42)),
            ("plan", AttributeValue::from("pro")),
            ("ratio", AttributeValue::from(0.25)),
        ]);

        assert_eq!(kvs.len(), 3);
        assert_eq!(kvs[0], KeyValue::new("user_id", 42_i64));
        assert_eq!(kvs[1], KeyValue::new("plan", "pro"));
        assert_eq!(kvs[2], KeyValue::new("ratio", 0.25));
    }
}
