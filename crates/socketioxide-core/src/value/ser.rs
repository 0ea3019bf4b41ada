use std::collections::BTreeMap;

use bytes::Bytes;
use serde::ser::{self, Error as _, Impossible, SerializeMap as _};

use super::{PayloadValue, ValueError};

impl ser::Serialize for PayloadValue {
    fn serialize<S: ser::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PayloadValue::Null => serializer.serialize_unit(),
            PayloadValue::Bool(b) => serializer.serialize_bool(*b),
            PayloadValue::Number(n) => {
                if let Some(u) = n.as_u64() {
                    serializer.serialize_u64(u)
                } else if let Some(i) = n.as_i64() {
                    serializer.serialize_i64(i)
                } else if let Some(f) = n.as_f64() {
                    serializer.serialize_f64(f)
                } else {
                    Err(S::Error::custom("number is not representable"))
                }
            }
            PayloadValue::String(s) => serializer.serialize_str(s),
            PayloadValue::Binary(bin) => serializer.serialize_bytes(bin),
            PayloadValue::Array(a) => serializer.collect_seq(a),
            PayloadValue::Object(o) => {
                let mut map = serializer.serialize_map(Some(o.len()))?;
                for (key, value) in o {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Serializes any `T: Serialize` into a [`PayloadValue`] tree.
pub(super) struct Serializer;

impl ser::Serializer for Serializer {
    type Ok = PayloadValue;
    type Error = ValueError;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeVariant<SerializeVec>;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeVariant<SerializeMap>;

    fn serialize_bool(self, v: bool) -> Result<PayloadValue, ValueError> {
        Ok(PayloadValue::Bool(v))
    }
    fn serialize_i8(self, v: i8) -> Result<PayloadValue, ValueError> {
        self.serialize_i64(v.into())
    }
    fn serialize_i16(self, v: i16) -> Result<PayloadValue, ValueError> {
        self.serialize_i64(v.into())
    }
    fn serialize_i32(self, v: i32) -> Result<PayloadValue, ValueError> {
        self.serialize_i64(v.into())
    }
    fn serialize_i64(self, v: i64) -> Result<PayloadValue, ValueError> {
        Ok(PayloadValue::Number(v.into()))
    }
    fn serialize_i128(self, v: i128) -> Result<PayloadValue, ValueError> {
        if let Ok(v) = u64::try_from(v) {
            Ok(PayloadValue::Number(v.into()))
        } else if let Ok(v) = i64::try_from(v) {
            Ok(PayloadValue::Number(v.into()))
        } else {
            Err(ValueError::custom("number out of range"))
        }
    }
    fn serialize_u8(self, v: u8) -> Result<PayloadValue, ValueError> {
        self.serialize_u64(v.into())
    }
    fn serialize_u16(self, v: u16) -> Result<PayloadValue, ValueError> {
        self.serialize_u64(v.into())
    }
    fn serialize_u32(self, v: u32) -> Result<PayloadValue, ValueError> {
        self.serialize_u64(v.into())
    }
    fn serialize_u64(self, v: u64) -> Result<PayloadValue, ValueError> {
        Ok(PayloadValue::Number(v.into()))
    }
    fn serialize_u128(self, v: u128) -> Result<PayloadValue, ValueError> {
        u64::try_from(v)
            .map(|v| PayloadValue::Number(v.into()))
            .map_err(|_| ValueError::custom("number out of range"))
    }
    fn serialize_f32(self, v: f32) -> Result<PayloadValue, ValueError> {
        self.serialize_f64(v.into())
    }
    // NaN and infinities have no JSON representation
    fn serialize_f64(self, v: f64) -> Result<PayloadValue, ValueError> {
        Ok(PayloadValue::from_f64(v).unwrap_or_default())
    }
    fn serialize_char(self, v: char) -> Result<PayloadValue, ValueError> {
        Ok(PayloadValue::String(v.into()))
    }
    fn serialize_str(self, v: &str) -> Result<PayloadValue, ValueError> {
        Ok(PayloadValue::String(v.to_string()))
    }
    fn serialize_bytes(self, v: &[u8]) -> Result<PayloadValue, ValueError> {
        Ok(PayloadValue::Binary(Bytes::copy_from_slice(v)))
    }
    fn serialize_none(self) -> Result<PayloadValue, ValueError> {
        Ok(PayloadValue::Null)
    }
    fn serialize_some<T: ?Sized + ser::Serialize>(
        self,
        value: &T,
    ) -> Result<PayloadValue, ValueError> {
        value.serialize(self)
    }
    fn serialize_unit(self) -> Result<PayloadValue, ValueError> {
        Ok(PayloadValue::Null)
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<PayloadValue, ValueError> {
        Ok(PayloadValue::Null)
    }
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<PayloadValue, ValueError> {
        self.serialize_str(variant)
    }
    fn serialize_newtype_struct<T: ?Sized + ser::Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<PayloadValue, ValueError> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + ser::Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<PayloadValue, ValueError> {
        let value = value.serialize(self)?;
        Ok(PayloadValue::Object(BTreeMap::from([(
            variant.to_string(),
            value,
        )])))
    }
    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec, ValueError> {
        Ok(SerializeVec(Vec::with_capacity(len.unwrap_or(0))))
    }
    fn serialize_tuple(self, len: usize) -> Result<SerializeVec, ValueError> {
        self.serialize_seq(Some(len))
    }
    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SerializeVec, ValueError> {
        self.serialize_seq(Some(len))
    }
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeVariant<SerializeVec>, ValueError> {
        Ok(SerializeVariant {
            name: variant,
            inner: self.serialize_seq(Some(len))?,
        })
    }
    fn serialize_map(self, _len: Option<usize>) -> Result<SerializeMap, ValueError> {
        Ok(SerializeMap {
            map: BTreeMap::new(),
            next_key: None,
        })
    }
    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<SerializeMap, ValueError> {
        self.serialize_map(Some(len))
    }
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeVariant<SerializeMap>, ValueError> {
        Ok(SerializeVariant {
            name: variant,
            inner: self.serialize_map(Some(len))?,
        })
    }
    fn collect_str<T: ?Sized + std::fmt::Display>(
        self,
        value: &T,
    ) -> Result<PayloadValue, ValueError> {
        Ok(PayloadValue::String(value.to_string()))
    }
}

pub(super) struct SerializeVec(Vec<PayloadValue>);

impl ser::SerializeSeq for SerializeVec {
    type Ok = PayloadValue;
    type Error = ValueError;

    fn serialize_element<T: ?Sized + ser::Serialize>(&mut self, value: &T) -> Result<(), ValueError> {
        self.0.push(value.serialize(Serializer)?);
        Ok(())
    }
    fn end(self) -> Result<PayloadValue, ValueError> {
        Ok(PayloadValue::Array(self.0))
    }
}
impl ser::SerializeTuple for SerializeVec {
    type Ok = PayloadValue;
    type Error = ValueError;

    fn serialize_element<T: ?Sized + ser::Serialize>(&mut self, value: &T) -> Result<(), ValueError> {
        ser::SerializeSeq::serialize_element(self, value)
    }
    fn end(self) -> Result<PayloadValue, ValueError> {
        ser::SerializeSeq::end(self)
    }
}
impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = PayloadValue;
    type Error = ValueError;

    fn serialize_field<T: ?Sized + ser::Serialize>(&mut self, value: &T) -> Result<(), ValueError> {
        ser::SerializeSeq::serialize_element(self, value)
    }
    fn end(self) -> Result<PayloadValue, ValueError> {
        ser::SerializeSeq::end(self)
    }
}

pub(super) struct SerializeMap {
    map: BTreeMap<String, PayloadValue>,
    next_key: Option<String>,
}

impl ser::SerializeMap for SerializeMap {
    type Ok = PayloadValue;
    type Error = ValueError;

    fn serialize_key<T: ?Sized + ser::Serialize>(&mut self, key: &T) -> Result<(), ValueError> {
        self.next_key = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }
    fn serialize_value<T: ?Sized + ser::Serialize>(&mut self, value: &T) -> Result<(), ValueError> {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| ValueError::custom("serialize_value called before serialize_key"))?;
        self.map.insert(key, value.serialize(Serializer)?);
        Ok(())
    }
    fn end(self) -> Result<PayloadValue, ValueError> {
        Ok(PayloadValue::Object(self.map))
    }
}
impl ser::SerializeStruct for SerializeMap {
    type Ok = PayloadValue;
    type Error = ValueError;

    fn serialize_field<T: ?Sized + ser::Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), ValueError> {
        self.map.insert(key.to_string(), value.serialize(Serializer)?);
        Ok(())
    }
    fn end(self) -> Result<PayloadValue, ValueError> {
        ser::SerializeMap::end(self)
    }
}

/// Wraps a tuple or struct variant as `{ variant: inner }`
pub(super) struct SerializeVariant<T> {
    name: &'static str,
    inner: T,
}

impl<T: ser::SerializeSeq<Ok = PayloadValue, Error = ValueError>> ser::SerializeTupleVariant
    for SerializeVariant<T>
{
    type Ok = PayloadValue;
    type Error = ValueError;

    fn serialize_field<V: ?Sized + ser::Serialize>(&mut self, value: &V) -> Result<(), ValueError> {
        self.inner.serialize_element(value)
    }
    fn end(self) -> Result<PayloadValue, ValueError> {
        let inner = self.inner.end()?;
        Ok(PayloadValue::Object(BTreeMap::from([(
            self.name.to_string(),
            inner,
        )])))
    }
}
impl<T: ser::SerializeStruct<Ok = PayloadValue, Error = ValueError>> ser::SerializeStructVariant
    for SerializeVariant<T>
{
    type Ok = PayloadValue;
    type Error = ValueError;

    fn serialize_field<V: ?Sized + ser::Serialize>(
        &mut self,
        key: &'static str,
        value: &V,
    ) -> Result<(), ValueError> {
        self.inner.serialize_field(key, value)
    }
    fn end(self) -> Result<PayloadValue, ValueError> {
        let inner = self.inner.end()?;
        Ok(PayloadValue::Object(BTreeMap::from([(
            self.name.to_string(),
            inner,
        )])))
    }
}

/// Object keys must be strings. Integer keys are stringified like `serde_json` does.
struct MapKeySerializer;

fn key_must_be_a_string() -> ValueError {
    ValueError::custom("key must be a string")
}

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = ValueError;

    type SerializeSeq = Impossible<String, ValueError>;
    type SerializeTuple = Impossible<String, ValueError>;
    type SerializeTupleStruct = Impossible<String, ValueError>;
    type SerializeTupleVariant = Impossible<String, ValueError>;
    type SerializeMap = Impossible<String, ValueError>;
    type SerializeStruct = Impossible<String, ValueError>;
    type SerializeStructVariant = Impossible<String, ValueError>;

    fn serialize_str(self, v: &str) -> Result<String, ValueError> {
        Ok(v.to_string())
    }
    fn serialize_char(self, v: char) -> Result<String, ValueError> {
        Ok(v.to_string())
    }
    fn serialize_bool(self, v: bool) -> Result<String, ValueError> {
        Ok(v.to_string())
    }
    fn serialize_i8(self, v: i8) -> Result<String, ValueError> {
        Ok(v.to_string())
    }
    fn serialize_i16(self, v: i16) -> Result<String, ValueError> {
        Ok(v.to_string())
    }
    fn serialize_i32(self, v: i32) -> Result<String, ValueError> {
        Ok(v.to_string())
    }
    fn serialize_i64(self, v: i64) -> Result<String, ValueError> {
        Ok(v.to_string())
    }
    fn serialize_u8(self, v: u8) -> Result<String, ValueError> {
        Ok(v.to_string())
    }
    fn serialize_u16(self, v: u16) -> Result<String, ValueError> {
        Ok(v.to_string())
    }
    fn serialize_u32(self, v: u32) -> Result<String, ValueError> {
        Ok(v.to_string())
    }
    fn serialize_u64(self, v: u64) -> Result<String, ValueError> {
        Ok(v.to_string())
    }
    fn serialize_f32(self, _v: f32) -> Result<String, ValueError> {
        Err(key_must_be_a_string())
    }
    fn serialize_f64(self, _v: f64) -> Result<String, ValueError> {
        Err(key_must_be_a_string())
    }
    fn serialize_bytes(self, _v: &[u8]) -> Result<String, ValueError> {
        Err(key_must_be_a_string())
    }
    fn serialize_none(self) -> Result<String, ValueError> {
        Err(key_must_be_a_string())
    }
    fn serialize_some<T: ?Sized + ser::Serialize>(self, value: &T) -> Result<String, ValueError> {
        value.serialize(self)
    }
    fn serialize_unit(self) -> Result<String, ValueError> {
        Err(key_must_be_a_string())
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, ValueError> {
        Err(key_must_be_a_string())
    }
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<String, ValueError> {
        Ok(variant.to_string())
    }
    fn serialize_newtype_struct<T: ?Sized + ser::Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<String, ValueError> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + ser::Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, ValueError> {
        Err(key_must_be_a_string())
    }
    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, ValueError> {
        Err(key_must_be_a_string())
    }
    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, ValueError> {
        Err(key_must_be_a_string())
    }
    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, ValueError> {
        Err(key_must_be_a_string())
    }
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, ValueError> {
        Err(key_must_be_a_string())
    }
    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, ValueError> {
        Err(key_must_be_a_string())
    }
    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, ValueError> {
        Err(key_must_be_a_string())
    }
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, ValueError> {
        Err(key_must_be_a_string())
    }
}
