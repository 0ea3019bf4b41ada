//! Socket.io packet implementation.
//! The [`Packet`] is the base unit of data that is sent over the engine.io connection.

use bytes::Bytes;
use engineioxide_core::Str;

use crate::{parser::ParseError, value::PayloadValue};

/// The socket.io packet type.
/// Each packet has a type and a namespace.
///
/// The root namespace is stored as an empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// The packet data
    pub inner: PacketData,
    /// The namespace the packet belongs to
    pub ns: Str,
}

/// Map the `/` root namespace to its internal empty form.
pub fn normalize_ns(ns: impl Into<Str>) -> Str {
    let ns = ns.into();
    if ns == "/" { Str::default() } else { ns }
}

impl Packet {
    /// Create a namespace connect packet with an optional auth payload
    pub fn connect(ns: impl Into<Str>, auth: Option<PayloadValue>) -> Self {
        Self {
            inner: PacketData::Connect(auth),
            ns: normalize_ns(ns),
        }
    }

    /// Create a disconnect packet for the given namespace
    pub fn disconnect(ns: impl Into<Str>) -> Self {
        Self {
            inner: PacketData::Disconnect,
            ns: normalize_ns(ns),
        }
    }

    /// Create an event packet for the given namespace.
    /// The event name is prepended to the arguments.
    /// If any argument contains binary data, it will be a binary packet.
    pub fn event(ns: impl Into<Str>, event: impl Into<String>, args: Vec<PayloadValue>) -> Self {
        let mut data = Vec::with_capacity(args.len() + 1);
        data.push(PayloadValue::String(event.into()));
        data.extend(args);
        let data = PayloadValue::Array(data);
        Self {
            inner: if data.has_binary() {
                PacketData::BinaryEvent(data, None)
            } else {
                PacketData::Event(data, None)
            },
            ns: normalize_ns(ns),
        }
    }

    /// Create an ack packet for the given namespace.
    /// If any argument contains binary data, it will be a binary packet.
    pub fn ack(ns: impl Into<Str>, args: Vec<PayloadValue>, ack: i64) -> Self {
        let data = PayloadValue::Array(args);
        Self {
            inner: if data.has_binary() {
                PacketData::BinaryAck(data, ack)
            } else {
                PacketData::EventAck(data, ack)
            },
            ns: normalize_ns(ns),
        }
    }

    /// Create a connect error packet for the given namespace with a message
    pub fn connect_error(ns: impl Into<Str>, message: impl Into<String>) -> Self {
        let mut data = std::collections::BTreeMap::new();
        data.insert("message".to_string(), PayloadValue::String(message.into()));
        Self {
            inner: PacketData::ConnectError(PayloadValue::Object(data)),
            ns: normalize_ns(ns),
        }
    }

    /// The number of attachments still referenced by placeholders in this packet.
    /// It is always 0 for a non binary packet or a fully reconstructed one.
    pub fn attachments_count(&self) -> usize {
        match &self.inner {
            PacketData::BinaryEvent(data, _) | PacketData::BinaryAck(data, _) => {
                data.placeholder_count()
            }
            _ => 0,
        }
    }

    /// Put the attachments back in place of their placeholders.
    /// A placeholder without a matching attachment is an [`ParseError::InvalidAttachments`].
    pub fn reconstruct(&mut self, attachments: &[Bytes]) -> Result<(), ParseError> {
        match &mut self.inner {
            PacketData::BinaryEvent(data, _) | PacketData::BinaryAck(data, _) => data
                .reconstruct(attachments)
                .map_err(|_| ParseError::InvalidAttachments),
            _ => Ok(()),
        }
    }
}

/// | Type          | ID  | Usage                                                                                 |
/// |---------------|-----|---------------------------------------------------------------------------------------|
/// | CONNECT       | 0   | Used during the connection to a namespace.                                            |
/// | DISCONNECT    | 1   | Used when disconnecting from a namespace.                                             |
/// | EVENT         | 2   | Used to send data to the other side.                                                  |
/// | ACK           | 3   | Used to acknowledge an event.                                                         |
/// | CONNECT_ERROR | 4   | Used during the connection to a namespace.                                            |
/// | BINARY_EVENT  | 5   | Used to send binary data to the other side.                                           |
/// | BINARY_ACK    | 6   | Used to acknowledge an event (the response includes binary data).                     |
#[derive(Debug, Clone, PartialEq)]
pub enum PacketData {
    /// Connect packet with optional payload.
    /// Sent by the client with its auth payload, answered by the server with `{"sid": ...}`.
    Connect(Option<PayloadValue>),
    /// Disconnect packet, used to disconnect from a namespace
    Disconnect,
    /// Event packet with optional ack id, to request an ack from the other side
    Event(PayloadValue, Option<i64>),
    /// Event ack packet, to acknowledge an event
    EventAck(PayloadValue, i64),
    /// Connect error packet, sent when the namespace connection is refused
    ConnectError(PayloadValue),
    /// Binary event packet with optional ack id, to request an ack from the other side
    BinaryEvent(PayloadValue, Option<i64>),
    /// Binary ack packet, to acknowledge an event with binary data
    BinaryAck(PayloadValue, i64),
}

impl PacketData {
    /// Returns the index of the packet type
    pub fn index(&self) -> usize {
        match self {
            PacketData::Connect(_) => 0,
            PacketData::Disconnect => 1,
            PacketData::Event(_, _) => 2,
            PacketData::EventAck(_, _) => 3,
            PacketData::ConnectError(_) => 4,
            PacketData::BinaryEvent(_, _) => 5,
            PacketData::BinaryAck(_, _) => 6,
        }
    }

    /// Set the ack id for the packet
    /// It will only set the ack id for the packets that support it
    pub fn set_ack_id(&mut self, ack_id: i64) {
        match self {
            PacketData::Event(_, ack) | PacketData::BinaryEvent(_, ack) => *ack = Some(ack_id),
            _ => {}
        };
    }

    /// The ack id of the packet, if any
    pub fn ack_id(&self) -> Option<i64> {
        match self {
            PacketData::Event(_, ack) | PacketData::BinaryEvent(_, ack) => *ack,
            PacketData::EventAck(_, ack) | PacketData::BinaryAck(_, ack) => Some(*ack),
            _ => None,
        }
    }

    /// The data carried by the packet, if any
    pub fn data(&self) -> Option<&PayloadValue> {
        match self {
            PacketData::Connect(data) => data.as_ref(),
            PacketData::Disconnect => None,
            PacketData::Event(data, _)
            | PacketData::EventAck(data, _)
            | PacketData::ConnectError(data)
            | PacketData::BinaryEvent(data, _)
            | PacketData::BinaryAck(data, _) => Some(data),
        }
    }

    /// Check if the packet is a binary packet (either binary event or binary ack)
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            PacketData::BinaryEvent(_, _) | PacketData::BinaryAck(_, _)
        )
    }

    /// Promote an event or an ack carrying binary leaves to its binary variant
    pub fn into_binary_if_needed(self) -> Self {
        match self {
            PacketData::Event(data, ack) if data.has_binary() => PacketData::BinaryEvent(data, ack),
            PacketData::EventAck(data, ack) if data.has_binary() => PacketData::BinaryAck(data, ack),
            packet => packet,
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde_json::json;

    use super::{Packet, PacketData};
    use crate::value::PayloadValue;

    fn bin() -> PayloadValue {
        PayloadValue::Binary(Bytes::from_static(&[1, 2, 3]))
    }

    #[test]
    fn should_create_bin_packet_with_binary_args() {
        let packet = Packet::event("/", "event", vec![bin()]);
        let expected = PayloadValue::Array(vec!["event".into(), bin()]);
        assert!(matches!(packet.inner, PacketData::BinaryEvent(ref v, None) if *v == expected));
        assert_eq!(packet.ns, "");

        let packet = Packet::ack("/chat", vec![bin()], 120);
        assert!(matches!(packet.inner, PacketData::BinaryAck(_, 120)));
        assert_eq!(packet.ns, "/chat");
    }

    #[test]
    fn should_create_default_packet_with_base_data() {
        let packet = Packet::event("", "msg", vec!["hi".into()]);
        let expected = PayloadValue::from(json!(["msg", "hi"]));
        assert!(matches!(packet.inner, PacketData::Event(ref v, None) if *v == expected));

        let packet = Packet::ack("", vec![1.into()], 7);
        assert!(matches!(packet.inner, PacketData::EventAck(_, 7)));
        assert_eq!(packet.inner.ack_id(), Some(7));
    }

    #[test]
    fn set_ack_id_only_on_events() {
        let mut packet = Packet::event("", "msg", vec![]);
        packet.inner.set_ack_id(12);
        assert_eq!(packet.inner.ack_id(), Some(12));

        let mut packet = Packet::disconnect("/");
        packet.inner.set_ack_id(12);
        assert_eq!(packet.inner.ack_id(), None);
    }

    #[test]
    fn promote_to_binary() {
        let data = PayloadValue::Array(vec!["a".into(), bin()]);
        let inner = PacketData::Event(data.clone(), Some(1)).into_binary_if_needed();
        assert!(matches!(inner, PacketData::BinaryEvent(_, Some(1))));
        let inner = PacketData::EventAck(data, 1).into_binary_if_needed();
        assert!(inner.is_binary());
        let inner = PacketData::Event(json!(["a"]).into(), None).into_binary_if_needed();
        assert!(!inner.is_binary());
    }

    #[test]
    fn attachments_count() {
        let mut packet = Packet::event("", "file", vec![bin(), bin()]);
        assert_eq!(packet.attachments_count(), 0);
        if let PacketData::BinaryEvent(data, _) = &mut packet.inner {
            assert_eq!(data.deconstruct().len(), 2);
        }
        assert_eq!(packet.attachments_count(), 2);
        assert_eq!(Packet::connect("/", None).attachments_count(), 0);
    }

    #[test]
    fn packet_index() {
        let packets = [
            PacketData::Connect(None),
            PacketData::Disconnect,
            PacketData::Event(PayloadValue::Null, None),
            PacketData::EventAck(PayloadValue::Null, 0),
            PacketData::ConnectError(PayloadValue::Null),
            PacketData::BinaryEvent(PayloadValue::Null, None),
            PacketData::BinaryAck(PayloadValue::Null, 0),
        ];
        for (i, packet) in packets.iter().enumerate() {
            assert_eq!(packet.index(), i);
        }
    }
}
