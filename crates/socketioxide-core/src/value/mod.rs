//! The [`PayloadValue`] data tree carried by socket.io packets.
//!
//! It is similar to a [`serde_json::Value`] but it can also hold binary leaves.
//! Before a packet is sent, the binary leaves are replaced by placeholders
//! (`{"_placeholder":true,"num":k}`) and sent as separate attachments.
//! When received, the attachments are put back in place of the placeholders.
use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Number;

mod de;
mod from;
mod ser;

const PLACEHOLDER_KEY: &str = "_placeholder";
const NUM_KEY: &str = "num";

/// Payload value representation, similar to [`serde_json::Value`], that can hold binary payloads.
///
/// Objects are stored in a [`BTreeMap`] so that traversal happens in sorted key order.
/// This makes the attachment numbering of a packet reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PayloadValue {
    /// Represents a JSON `null` value.
    #[default]
    Null,
    /// Represents a JSON boolean value.
    Bool(bool),
    /// Represents a JSON number value.
    Number(Number),
    /// Represents a JSON string value.
    String(String),
    /// Represents a binary leaf.
    Binary(Bytes),
    /// Represents a JSON array value.
    Array(Vec<PayloadValue>),
    /// Represents a JSON object value.
    Object(BTreeMap<String, PayloadValue>),
}

/// Error returned when converting a [`PayloadValue`] from or into a user type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ValueError(String);

impl serde::ser::Error for ValueError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        ValueError(msg.to_string())
    }
}
impl serde::de::Error for ValueError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        ValueError(msg.to_string())
    }
}

impl PayloadValue {
    /// Convert any serializable `T` into a [`PayloadValue`].
    /// Byte strings (e.g. [`Bytes`]) become binary leaves.
    pub fn from_data<T: ?Sized + Serialize>(data: &T) -> Result<PayloadValue, ValueError> {
        data.serialize(ser::Serializer)
    }

    /// Interpret a [`PayloadValue`] as a `T`.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ValueError> {
        T::deserialize(self)
    }

    /// Create a [`PayloadValue`] from a float.
    ///
    /// Returns `None` for NaN and infinite values.
    pub fn from_f64(value: f64) -> Option<PayloadValue> {
        Number::from_f64(value).map(PayloadValue::Number)
    }

    /// Returns true if `self` is [`PayloadValue::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, PayloadValue::Null)
    }

    /// Interprets `self` as a `bool`, if it contains boolean data.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PayloadValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Interprets `self` as a `u64`, if it contains unsigned integer data.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            PayloadValue::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Interprets `self` as a `&str`, if it contains string data.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Interprets `self` as a slice, if it is an array.
    pub fn as_array(&self) -> Option<&[PayloadValue]> {
        match self {
            PayloadValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get the value of an object field.
    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        match self {
            PayloadValue::Object(o) => o.get(key),
            _ => None,
        }
    }

    /// Determines if `self` contains any binary leaf.
    pub fn has_binary(&self) -> bool {
        match self {
            PayloadValue::Binary(_) => true,
            PayloadValue::Array(a) => a.iter().any(PayloadValue::has_binary),
            PayloadValue::Object(o) => o.values().any(PayloadValue::has_binary),
            _ => false,
        }
    }

    /// Counts the attachment placeholders contained in `self`.
    pub fn placeholder_count(&self) -> usize {
        match self {
            PayloadValue::Object(o) if placeholder_num(o).is_some() => 1,
            PayloadValue::Array(a) => a.iter().map(PayloadValue::placeholder_count).sum(),
            PayloadValue::Object(o) => o.values().map(PayloadValue::placeholder_count).sum(),
            _ => 0,
        }
    }

    /// Replace every binary leaf with a placeholder and return the removed leaves.
    ///
    /// The tree is walked depth first, arrays in order and objects in sorted key order.
    /// The k-th leaf visited becomes `{"_placeholder":true,"num":k}` and is the k-th attachment.
    pub fn deconstruct(&mut self) -> Vec<Bytes> {
        fn rec(value: &mut PayloadValue, bins: &mut Vec<Bytes>) {
            match value {
                PayloadValue::Binary(_) => {
                    let placeholder = placeholder(bins.len());
                    if let PayloadValue::Binary(bin) = std::mem::replace(value, placeholder) {
                        bins.push(bin);
                    }
                }
                PayloadValue::Array(a) => a.iter_mut().for_each(|v| rec(v, bins)),
                PayloadValue::Object(o) => o.values_mut().for_each(|v| rec(v, bins)),
                _ => (),
            }
        }
        let mut bins = Vec::new();
        rec(self, &mut bins);
        bins
    }

    /// Put the attachments back in place of their placeholders.
    ///
    /// Returns an error if a placeholder references a missing attachment.
    pub fn reconstruct(&mut self, attachments: &[Bytes]) -> Result<(), ValueError> {
        match self {
            PayloadValue::Object(o) => match placeholder_num(o) {
                Some(num) => {
                    let bin = attachments.get(num).ok_or_else(|| {
                        ValueError(format!("placeholder {num} has no matching attachment"))
                    })?;
                    *self = PayloadValue::Binary(bin.clone());
                    Ok(())
                }
                None => o
                    .values_mut()
                    .try_for_each(|v| v.reconstruct(attachments)),
            },
            PayloadValue::Array(a) => a.iter_mut().try_for_each(|v| v.reconstruct(attachments)),
            _ => Ok(()),
        }
    }

    /// Split an event payload into its event name and its positional arguments.
    ///
    /// Returns `None` if `self` is not an array starting with a string.
    pub fn into_event(self) -> Option<(String, Vec<PayloadValue>)> {
        let PayloadValue::Array(mut args) = self else {
            return None;
        };
        match args.first() {
            Some(PayloadValue::String(_)) => match args.remove(0) {
                PayloadValue::String(event) => Some((event, args)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Turn the payload of an ack packet into its positional arguments.
    pub fn into_args(self) -> Vec<PayloadValue> {
        match self {
            PayloadValue::Array(args) => args,
            PayloadValue::Null => Vec::new(),
            value => vec![value],
        }
    }
}

fn placeholder(num: usize) -> PayloadValue {
    PayloadValue::Object(BTreeMap::from([
        (PLACEHOLDER_KEY.to_string(), PayloadValue::Bool(true)),
        (NUM_KEY.to_string(), PayloadValue::Number(num.into())),
    ]))
}

fn placeholder_num(o: &BTreeMap<String, PayloadValue>) -> Option<usize> {
    if o.len() != 2 || o.get(PLACEHOLDER_KEY)?.as_bool() != Some(true) {
        return None;
    }
    o.get(NUM_KEY)?.as_u64()?.try_into().ok()
}
