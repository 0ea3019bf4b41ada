use bytes::Bytes;
use serde_json::Number;

use super::PayloadValue;

macro_rules! from_integer {
    ($($ty:ty)*) => {
        $(
            impl From<$ty> for PayloadValue {
                fn from(n: $ty) -> Self {
                    PayloadValue::Number(n.into())
                }
            }
        )*
    };
}

from_integer! {
    i8 i16 i32 i64 isize
    u8 u16 u32 u64 usize
}

impl From<()> for PayloadValue {
    fn from((): ()) -> Self {
        PayloadValue::Null
    }
}

impl From<bool> for PayloadValue {
    fn from(b: bool) -> Self {
        PayloadValue::Bool(b)
    }
}

/// Non finite floats become [`PayloadValue::Null`], like in `serde_json`.
impl From<f64> for PayloadValue {
    fn from(f: f64) -> Self {
        PayloadValue::from_f64(f).unwrap_or_default()
    }
}

impl From<Number> for PayloadValue {
    fn from(n: Number) -> Self {
        PayloadValue::Number(n)
    }
}

impl From<String> for PayloadValue {
    fn from(s: String) -> Self {
        PayloadValue::String(s)
    }
}

impl From<&str> for PayloadValue {
    fn from(s: &str) -> Self {
        PayloadValue::String(s.to_string())
    }
}

impl From<Bytes> for PayloadValue {
    fn from(b: Bytes) -> Self {
        PayloadValue::Binary(b)
    }
}

impl From<Vec<PayloadValue>> for PayloadValue {
    fn from(v: Vec<PayloadValue>) -> Self {
        PayloadValue::Array(v)
    }
}

impl From<serde_json::Value> for PayloadValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => PayloadValue::Null,
            Value::Bool(b) => PayloadValue::Bool(b),
            Value::Number(n) => PayloadValue::Number(n),
            Value::String(s) => PayloadValue::String(s),
            Value::Array(a) => PayloadValue::Array(a.into_iter().map(Into::into).collect()),
            Value::Object(o) => {
                PayloadValue::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl FromIterator<PayloadValue> for PayloadValue {
    fn from_iter<I: IntoIterator<Item = PayloadValue>>(iter: I) -> Self {
        PayloadValue::Array(iter.into_iter().collect())
    }
}
