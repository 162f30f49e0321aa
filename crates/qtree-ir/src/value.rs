//! Constant literal values

use crate::DataType;
use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Literal carried by a constant node. Absent values are typed null nodes, never a `Value`.
///
/// Floats compare by value with every NaN equal to every other NaN, and
/// non-finite floats serialize as `"NaN"`, `"Infinity"` or `"-Infinity"`, so
/// equal literals always share a fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Bool(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(#[serde(with = "float32")] f32),
    Float64(#[serde(with = "float64")] f64),
    String(String),
    Binary(Vec<u8>),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    Guid(Uuid),
}

macro_rules! float_literal {
    ($module:ident, $float:ty) => {
        mod $module {
            use serde::de::Error;
            use serde::{Deserialize, Deserializer, Serialize, Serializer};

            #[derive(Deserialize)]
            #[serde(untagged)]
            enum Literal {
                Number($float),
                Text(String),
            }

            pub fn serialize<S: Serializer>(value: &$float, serializer: S) -> Result<S::Ok, S::Error> {
                if value.is_nan() {
                    serializer.serialize_str("NaN")
                } else if value.is_infinite() {
                    serializer.serialize_str(if *value > 0.0 { "Infinity" } else { "-Infinity" })
                } else {
                    value.serialize(serializer)
                }
            }

            pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<$float, D::Error> {
                match Literal::deserialize(deserializer)? {
                    Literal::Number(value) => Ok(value),
                    Literal::Text(text) => match text.as_str() {
                        "NaN" => Ok(<$float>::NAN),
                        "Infinity" => Ok(<$float>::INFINITY),
                        "-Infinity" => Ok(<$float>::NEG_INFINITY),
                        other => Err(D::Error::custom(format!("invalid float literal {other:?}"))),
                    },
                }
            }
        }
    };
}

float_literal!(float32, f32);
float_literal!(float64, f64);

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int8(a), Value::Int8(b)) => a == b,
            (Value::UInt8(a), Value::UInt8(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::TimestampTz(a), Value::TimestampTz(b)) => a == b,
            (Value::Guid(a), Value::Guid(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Canonical literal type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Bool(_) => DataType::Bool,
            Value::Int8(_) => DataType::Int8,
            Value::UInt8(_) => DataType::UInt8,
            Value::Int16(_) => DataType::Int16,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Float32(_) => DataType::Float32,
            Value::Float64(_) => DataType::Float64,
            Value::String(_) => DataType::String,
            Value::Binary(_) => DataType::Binary,
            Value::Time(_) => DataType::Time,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::TimestampTz(_) => DataType::TimestampTz,
            Value::Guid(_) => DataType::Guid,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(i64::from(*v)),
            Value::UInt8(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_negative_integer(&self) -> bool {
        self.as_i64().is_some_and(|v| v < 0)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "'{v}'"),
            Value::Binary(v) => {
                write!(f, "0x")?;
                for byte in v {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
            Value::Time(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{v}"),
            Value::TimestampTz(v) => write!(f, "{v}"),
            Value::Guid(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    Vec<u8> => Binary,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<FixedOffset> => TimestampTz,
    Uuid => Guid,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_types() {
        assert_eq!(Value::from(10).data_type(), DataType::Int32);
        assert_eq!(Value::from(10i64).data_type(), DataType::Int64);
        assert_eq!(Value::from("x").data_type(), DataType::String);
        assert_eq!(Value::from(Uuid::nil()).data_type(), DataType::Guid);
    }

    #[test]
    fn test_negative_integer() {
        assert!(Value::Int16(-1).is_negative_integer());
        assert!(!Value::Int64(0).is_negative_integer());
        assert!(!Value::Float64(-1.0).is_negative_integer());
    }

    #[test]
    fn test_non_finite_floats() {
        assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
        assert_ne!(Value::Float64(0.0), Value::Float64(-0.0));
        assert_ne!(Value::Float64(1.0), Value::Float32(1.0));

        let nan = serde_json::to_string(&Value::Float64(f64::NAN)).unwrap();
        let infinity = serde_json::to_string(&Value::Float64(f64::INFINITY)).unwrap();
        assert_eq!(nan, r#"{"type":"Float64","value":"NaN"}"#);
        assert_ne!(nan, infinity);

        let parsed: Value = serde_json::from_str(&infinity).unwrap();
        assert_eq!(parsed, Value::Float64(f64::INFINITY));
        let parsed: Value = serde_json::from_str(r#"{"type":"Float32","value":"-Infinity"}"#).unwrap();
        assert_eq!(parsed, Value::Float32(f32::NEG_INFINITY));
        let parsed: Value = serde_json::from_str(r#"{"type":"Float64","value":2.5}"#).unwrap();
        assert_eq!(parsed, Value::Float64(2.5));
    }

    #[test]
    fn test_json_round_trip() {
        let value = Value::String("EU".to_string());
        let json = serde_json::to_string(&value).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, parsed);
    }
}
