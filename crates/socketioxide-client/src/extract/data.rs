use std::{convert::Infallible, sync::Arc};

use serde::de::DeserializeOwned;
use socketioxide_core::value::{PayloadValue, ValueError};

use crate::handler::FromMessageParts;
use crate::socket::Socket;

/// Decode positional arguments as a single value.
///
/// No argument is decoded from `null`, a single argument is decoded directly
/// and several arguments are decoded as a sequence.
pub(crate) fn decode_args<T: DeserializeOwned>(mut args: Vec<PayloadValue>) -> Result<T, ValueError> {
    match args.len() {
        0 => PayloadValue::Null.into_data(),
        1 => args.pop().unwrap_or_default().into_data(),
        _ => PayloadValue::Array(args).into_data(),
    }
}

/// An Extractor that returns the decoded event arguments without checking errors.
/// If a decoding error occurs, the handler won't be called
/// and an error log will be printed if the `tracing` feature is enabled.
///
/// Binary attachments are available as [`bytes::Bytes`] fields:
/// ```
/// struct MyData {
///     data: serde_json::Value,
///     file: bytes::Bytes,
/// }
/// ```
#[derive(Debug)]
pub struct Data<T>(pub T);

impl<T: DeserializeOwned> FromMessageParts for Data<T> {
    type Error = ValueError;
    fn from_message_parts(
        _: &Arc<Socket>,
        args: &mut Vec<PayloadValue>,
        _: &Option<i64>,
    ) -> Result<Self, Self::Error> {
        decode_args(args.clone()).map(Data)
    }
}

/// An Extractor that returns the decoded event arguments or a decoding error.
#[derive(Debug)]
pub struct TryData<T>(pub Result<T, ValueError>);

impl<T: DeserializeOwned> FromMessageParts for TryData<T> {
    type Error = Infallible;
    fn from_message_parts(
        _: &Arc<Socket>,
        args: &mut Vec<PayloadValue>,
        _: &Option<i64>,
    ) -> Result<Self, Infallible> {
        Ok(TryData(decode_args(args.clone())))
    }
}

/// An Extractor that returns the raw positional arguments of the event.
#[derive(Debug, Clone)]
pub struct Args(pub Vec<PayloadValue>);

impl FromMessageParts for Args {
    type Error = Infallible;
    fn from_message_parts(
        _: &Arc<Socket>,
        args: &mut Vec<PayloadValue>,
        _: &Option<i64>,
    ) -> Result<Self, Infallible> {
        Ok(Args(args.clone()))
    }
}

/// An Extractor that returns the ack id of the event.
/// It is `None` if the server did not ask for an acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckId(pub Option<i64>);

impl FromMessageParts for AckId {
    type Error = Infallible;
    fn from_message_parts(
        _: &Arc<Socket>,
        _: &mut Vec<PayloadValue>,
        ack_id: &Option<i64>,
    ) -> Result<Self, Infallible> {
        Ok(AckId(*ack_id))
    }
}

super::__impl_deref!(TryData<T>: Result<T, ValueError>);
super::__impl_deref!(Data);
super::__impl_deref!(Args: Vec<PayloadValue>);

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn decode_no_args() {
        let res: Option<String> = decode_args(vec![]).unwrap();
        assert_eq!(res, None);
        decode_args::<()>(vec![]).unwrap();
    }

    #[test]
    fn decode_single_arg() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Msg {
            text: String,
        }
        let arg = PayloadValue::from(serde_json::json!({ "text": "hi" }));
        let res: Msg = decode_args(vec![arg]).unwrap();
        assert_eq!(res.text, "hi");
    }

    #[test]
    fn decode_several_args() {
        let res: (String, i64) = decode_args(vec!["a".into(), 2.into()]).unwrap();
        assert_eq!(res, ("a".to_string(), 2));
    }

    #[test]
    fn decode_binary_arg() {
        let bin = bytes::Bytes::from_static(&[1, 2]);
        let res: (String, bytes::Bytes) =
            decode_args(vec!["file".into(), PayloadValue::Binary(bin.clone())]).unwrap();
        assert_eq!(res.1, bin);
    }

    #[test]
    fn decode_error() {
        assert!(decode_args::<i64>(vec!["not a number".into()]).is_err());
    }
}
