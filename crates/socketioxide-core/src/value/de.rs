use std::{collections::BTreeMap, fmt};

use bytes::Bytes;
use serde::de::{
    self, Deserialize, IntoDeserializer, MapAccess, SeqAccess, Unexpected, Visitor,
    value::{MapAccessDeserializer, MapDeserializer, SeqDeserializer},
};

use super::{PayloadValue, ValueError};

impl<'de> Deserialize<'de> for PayloadValue {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PayloadValueVisitor)
    }
}

struct PayloadValueVisitor;

impl<'de> Visitor<'de> for PayloadValueVisitor {
    type Value = PayloadValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("any valid payload value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<PayloadValue, E> {
        Ok(PayloadValue::Bool(v))
    }
    fn visit_i64<E: de::Error>(self, v: i64) -> Result<PayloadValue, E> {
        Ok(PayloadValue::Number(v.into()))
    }
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<PayloadValue, E> {
        Ok(PayloadValue::Number(v.into()))
    }
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<PayloadValue, E> {
        Ok(PayloadValue::from_f64(v).unwrap_or_default())
    }
    fn visit_str<E: de::Error>(self, v: &str) -> Result<PayloadValue, E> {
        Ok(PayloadValue::String(v.to_string()))
    }
    fn visit_string<E: de::Error>(self, v: String) -> Result<PayloadValue, E> {
        Ok(PayloadValue::String(v))
    }
    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<PayloadValue, E> {
        Ok(PayloadValue::Binary(Bytes::copy_from_slice(v)))
    }
    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<PayloadValue, E> {
        Ok(PayloadValue::Binary(Bytes::from(v)))
    }
    fn visit_none<E: de::Error>(self) -> Result<PayloadValue, E> {
        Ok(PayloadValue::Null)
    }
    fn visit_some<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<PayloadValue, D::Error> {
        Deserialize::deserialize(deserializer)
    }
    fn visit_unit<E: de::Error>(self) -> Result<PayloadValue, E> {
        Ok(PayloadValue::Null)
    }
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<PayloadValue, A::Error> {
        let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1024));
        while let Some(elem) = seq.next_element()? {
            vec.push(elem);
        }
        Ok(PayloadValue::Array(vec))
    }
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PayloadValue, A::Error> {
        let mut obj = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, PayloadValue>()? {
            obj.insert(key, value);
        }
        Ok(PayloadValue::Object(obj))
    }
}

impl PayloadValue {
    fn unexpected(&self) -> Unexpected<'_> {
        match self {
            PayloadValue::Null => Unexpected::Unit,
            PayloadValue::Bool(b) => Unexpected::Bool(*b),
            PayloadValue::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
                (Some(u), _, _) => Unexpected::Unsigned(u),
                (None, Some(i), _) => Unexpected::Signed(i),
                (None, None, Some(f)) => Unexpected::Float(f),
                _ => Unexpected::Other("number"),
            },
            PayloadValue::String(s) => Unexpected::Str(s),
            PayloadValue::Binary(b) => Unexpected::Bytes(b),
            PayloadValue::Array(_) => Unexpected::Seq,
            PayloadValue::Object(_) => Unexpected::Map,
        }
    }
}

/// Deserialize user types directly from a [`PayloadValue`] tree.
/// Binary leaves can be read both as byte buffers and as sequences of `u8`.
impl<'de> de::Deserializer<'de> for PayloadValue {
    type Error = ValueError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValueError> {
        match self {
            PayloadValue::Null => visitor.visit_unit(),
            PayloadValue::Bool(b) => visitor.visit_bool(b),
            PayloadValue::Number(n) => {
                if let Some(u) = n.as_u64() {
                    visitor.visit_u64(u)
                } else if let Some(i) = n.as_i64() {
                    visitor.visit_i64(i)
                } else if let Some(f) = n.as_f64() {
                    visitor.visit_f64(f)
                } else {
                    Err(de::Error::custom("number is not representable"))
                }
            }
            PayloadValue::String(s) => visitor.visit_string(s),
            PayloadValue::Binary(b) => visitor.visit_byte_buf(b.into()),
            PayloadValue::Array(a) => {
                let mut seq = SeqDeserializer::new(a.into_iter());
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            PayloadValue::Object(o) => {
                let mut map = MapDeserializer::new(o.into_iter());
                let value = visitor.visit_map(&mut map)?;
                map.end()?;
                Ok(value)
            }
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValueError> {
        match self {
            PayloadValue::Null => visitor.visit_none(),
            value => visitor.visit_some(value),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValueError> {
        match self {
            PayloadValue::Binary(b) => {
                let mut seq = SeqDeserializer::new(b.into_iter());
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            value => value.deserialize_any(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, ValueError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, ValueError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, ValueError> {
        match self {
            PayloadValue::String(variant) => visitor.visit_enum(variant.into_deserializer()),
            PayloadValue::Object(o) if o.len() == 1 => {
                visitor.visit_enum(MapAccessDeserializer::new(MapDeserializer::new(o.into_iter())))
            }
            value => Err(de::Error::invalid_type(value.unexpected(), &"a string or a single key map")),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, ValueError> {
        visitor.visit_unit()
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct tuple_struct map struct identifier
    }
}

impl<'de> IntoDeserializer<'de, ValueError> for PayloadValue {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    enum Shape {
        Unit,
        Circle(f64),
        Rect { w: u32, h: u32 },
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Wrapper(String);

    #[test]
    fn deserialize_enum_variants() {
        let shape: Shape = PayloadValue::from("Unit").into_data().unwrap();
        assert_eq!(shape, Shape::Unit);
        let shape: Shape = PayloadValue::from(json!({ "Circle": 0.5 })).into_data().unwrap();
        assert_eq!(shape, Shape::Circle(0.5));
        let shape: Shape = PayloadValue::from(json!({ "Rect": { "w": 1, "h": 2 } }))
            .into_data()
            .unwrap();
        assert_eq!(shape, Shape::Rect { w: 1, h: 2 });
        assert!(PayloadValue::from(1).into_data::<Shape>().is_err());
    }

    #[test]
    fn deserialize_newtype_and_tuple() {
        let wrapper: Wrapper = PayloadValue::from("foo").into_data().unwrap();
        assert_eq!(wrapper, Wrapper("foo".into()));
        let tuple: (String, u8) = PayloadValue::from(json!(["a", 1])).into_data().unwrap();
        assert_eq!(tuple, ("a".to_string(), 1));
    }

    #[test]
    fn deserialize_from_json() {
        let value: PayloadValue = serde_json::from_str(r#"[1,"a",{"b":null}]"#).unwrap();
        assert_eq!(value, PayloadValue::from(json!([1, "a", { "b": null }])));
    }

    #[test]
    fn deserialize_array_length_mismatch() {
        let value = PayloadValue::from(json!(["a", 1, 2]));
        assert!(value.into_data::<(String, u8)>().is_err());
    }
}
