//! Typed column values

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// A single column value as produced by a query executor
///
/// Serialized with an explicit type tag so every variant survives a trip
/// through the cache unchanged. `Null` is distinct from `Text("")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DbValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact numeric kept in its textual form
    Decimal(String),
    Text(String),
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Json(serde_json::Value),
}

impl DbValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DbValue::Null)
    }

    /// Name of the variant, used for column type descriptions
    pub fn type_name(&self) -> &'static str {
        match self {
            DbValue::Null => "null",
            DbValue::Bool(_) => "bool",
            DbValue::Int(_) => "int",
            DbValue::Float(_) => "float",
            DbValue::Decimal(_) => "decimal",
            DbValue::Text(_) => "text",
            DbValue::Bytes(_) => "bytes",
            DbValue::Uuid(_) => "uuid",
            DbValue::Timestamp(_) => "timestamp",
            DbValue::Date(_) => "date",
            DbValue::Json(_) => "json",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DbValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DbValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DbValue::Float(v) => Some(*v),
            DbValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DbValue::Text(v) | DbValue::Decimal(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DbValue::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for DbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbValue::Null => write!(f, "NULL"),
            DbValue::Bool(v) => write!(f, "{}", v),
            DbValue::Int(v) => write!(f, "{}", v),
            DbValue::Float(v) => write!(f, "{}", v),
            DbValue::Decimal(v) | DbValue::Text(v) => write!(f, "{}", v),
            DbValue::Bytes(v) => write!(f, "0x{}", v.iter().map(|b| format!("{:02x}", b)).collect::<String>()),
            DbValue::Uuid(v) => write!(f, "{}", v),
            DbValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            DbValue::Date(v) => write!(f, "{}", v),
            DbValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for DbValue {
    fn from(value: bool) -> Self {
        DbValue::Bool(value)
    }
}

impl From<i64> for DbValue {
    fn from(value: i64) -> Self {
        DbValue::Int(value)
    }
}

impl From<i32> for DbValue {
    fn from(value: i32) -> Self {
        DbValue::Int(value as i64)
    }
}

impl From<f64> for DbValue {
    fn from(value: f64) -> Self {
        DbValue::Float(value)
    }
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        DbValue::Text(value.to_string())
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        DbValue::Text(value)
    }
}

impl From<Vec<u8>> for DbValue {
    fn from(value: Vec<u8>) -> Self {
        DbValue::Bytes(value)
    }
}

impl From<Uuid> for DbValue {
    fn from(value: Uuid) -> Self {
        DbValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for DbValue {
    fn from(value: DateTime<Utc>) -> Self {
        DbValue::Timestamp(value)
    }
}

impl From<NaiveDate> for DbValue {
    fn from(value: NaiveDate) -> Self {
        DbValue::Date(value)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(DbValue::Null)
    }
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn through_json(value: &DbValue) -> DbValue {
        let json = serde_json::to_string(value).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_null_is_distinct_from_empty_text() {
        let null = through_json(&DbValue::Null);
        let empty = through_json(&DbValue::Text(String::new()));

        assert!(null.is_null());
        assert_eq!(empty, DbValue::Text(String::new()));
        assert_ne!(null, empty);
    }

    #[test]
    fn test_int_and_float_keep_their_type() {
        assert_eq!(through_json(&DbValue::Int(3)), DbValue::Int(3));
        assert_eq!(through_json(&DbValue::Float(3.0)), DbValue::Float(3.0));
    }

    #[test]
    fn test_bytes_are_base64_encoded() {
        let value = DbValue::Bytes(vec![0, 159, 146, 150]);
        let json = serde_json::to_string(&value).unwrap();

        assert_eq!(json, r#"{"type":"bytes","value":"AJ+Slg=="}"#);
        assert_eq!(through_json(&value), value);
    }

    #[test]
    fn test_temporal_and_uuid_values() {
        let ts = DateTime::parse_from_rfc3339("2023-11-07T04:09:16.123456789Z")
            .unwrap()
            .with_timezone(&Utc);
        let date = NaiveDate::from_ymd_opt(2023, 11, 5).unwrap();
        let id = Uuid::new_v4();

        assert_eq!(through_json(&DbValue::Timestamp(ts)), DbValue::Timestamp(ts));
        assert_eq!(through_json(&DbValue::Date(date)), DbValue::Date(date));
        assert_eq!(through_json(&DbValue::Uuid(id)), DbValue::Uuid(id));
    }

    #[test]
    fn test_decimal_keeps_precision() {
        let value = DbValue::Decimal("12345678901234567890.000000001".to_string());
        assert_eq!(through_json(&value), value);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(DbValue::from(None::<i64>), DbValue::Null);
        assert_eq!(DbValue::from(Some("Ann")), DbValue::Text("Ann".to_string()));
    }

    #[test]
    fn test_display() {
        assert_eq!(DbValue::Null.to_string(), "NULL");
        assert_eq!(DbValue::Bytes(vec![1, 255]).to_string(), "0x01ff");
        assert_eq!(DbValue::Int(-4).to_string(), "-4");
    }
}
