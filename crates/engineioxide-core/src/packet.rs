use std::{fmt, time::Duration};

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::Str;

/// An engine.io control packet, as exchanged over a websocket connection
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum Packet {
    /// Open packet sent by the server to initiate a session
    Open(OpenPacket),
    /// Close packet used to close a connection
    Close,
    /// Ping packet used to check if the connection is still alive.
    ///
    /// With the V4 protocol the server pings and the client answers.
    /// With the V3 protocol the roles are swapped.
    Ping,
    /// Pong packet used to respond to a Ping packet
    Pong,

    /// Message packet, carrying a socket.io packet in its text form
    Message(Str),
    /// Upgrade packet, ignored on a websocket-only connection
    Upgrade,
    /// Noop packet, ignored on a websocket-only connection
    Noop,

    /// Binary packet, written as a raw websocket binary frame
    Binary(Bytes), // Not part of the protocol, used internally

    /// Binary packet for the V3 protocol.
    /// It is written as a websocket binary frame prefixed with the `4` message type byte.
    BinaryV3(Bytes), // Not part of the protocol, used internally
}

/// An error that occurs when parsing a packet.
#[derive(Debug)]
pub enum PacketParseError {
    /// Invalid open packet
    InvalidOpenPacket(serde_json::Error),
    /// The packet type is invalid.
    InvalidPacketType(Option<char>),
}
impl fmt::Display for PacketParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketParseError::InvalidOpenPacket(e) => write!(f, "invalid open packet: {e}"),
            PacketParseError::InvalidPacketType(c) => write!(f, "invalid packet type: {c:?}"),
        }
    }
}
impl From<serde_json::Error> for PacketParseError {
    fn from(err: serde_json::Error) -> Self {
        PacketParseError::InvalidOpenPacket(err)
    }
}
impl std::error::Error for PacketParseError {}

impl Packet {
    /// Check if the packet is a binary packet
    pub fn is_binary(&self) -> bool {
        matches!(self, Packet::Binary(_) | Packet::BinaryV3(_))
    }

    /// Get the max size the packet could have when serialized as text
    pub fn get_size_hint(&self) -> usize {
        match self {
            Packet::Open(_) => 156, // max possible size for the open packet serialized
            Packet::Message(msg) => 1 + msg.len(),
            Packet::Binary(data) | Packet::BinaryV3(data) => 1 + data.len(),
            Packet::Close | Packet::Ping | Packet::Pong | Packet::Upgrade | Packet::Noop => 1,
        }
    }
}

/// A raw websocket frame, either text or binary
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A text frame, always valid utf8
    Text(Str),
    /// A binary frame
    Binary(Bytes),
}

/// Serialize a [`Packet`] to a websocket [`Frame`] according to the Engine.IO protocol
impl From<Packet> for Frame {
    fn from(packet: Packet) -> Frame {
        let mut buffer = String::with_capacity(packet.get_size_hint());
        match packet {
            Packet::Binary(data) => return Frame::Binary(data),
            Packet::BinaryV3(data) => {
                let mut buf = BytesMut::with_capacity(data.len() + 1);
                buf.put_u8(0x04);
                buf.put_slice(&data);
                return Frame::Binary(buf.freeze());
            }
            Packet::Open(open) => {
                buffer.push('0');
                // An OpenPacket only holds strings and integers.
                buffer.push_str(&serde_json::to_string(&open).unwrap_or_default());
            }
            Packet::Close => buffer.push('1'),
            Packet::Ping => buffer.push('2'),
            Packet::Pong => buffer.push('3'),
            Packet::Message(msg) => {
                buffer.push('4');
                buffer.push_str(&msg);
            }
            Packet::Upgrade => buffer.push('5'),
            Packet::Noop => buffer.push('6'),
        };
        Frame::Text(buffer.into())
    }
}

/// Deserialize a [`Packet`] from a text frame according to the Engine.IO protocol
impl TryFrom<Str> for Packet {
    type Error = PacketParseError;
    fn try_from(value: Str) -> Result<Self, Self::Error> {
        let packet_type = value
            .as_bytes()
            .first()
            .ok_or(PacketParseError::InvalidPacketType(None))?;
        let res = match packet_type {
            b'0' => Packet::Open(serde_json::from_str(value.slice(1..).as_str())?),
            b'1' => Packet::Close,
            b'2' => Packet::Ping,
            b'3' => Packet::Pong,
            b'4' => Packet::Message(value.slice(1..)),
            b'5' => Packet::Upgrade,
            b'6' => Packet::Noop,
            c => Err(PacketParseError::InvalidPacketType(Some(*c as char)))?,
        };
        Ok(res)
    }
}

impl TryFrom<String> for Packet {
    type Error = PacketParseError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Packet::try_from(Str::from(value))
    }
}

/// An OpenPacket is sent by the server to open a session.
/// It is stored once per connection and drives the heartbeat mechanism.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, PartialOrd)]
#[serde(rename_all = "camelCase")]
pub struct OpenPacket {
    /// The session ID.
    pub sid: String,
    /// The list of available transport upgrades.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// The ping interval, used in the heartbeat mechanism (in milliseconds).
    pub ping_interval: u64,
    /// The ping timeout, used in the heartbeat mechanism (in milliseconds).
    pub ping_timeout: u64,
    /// The maximum number of bytes per chunk. V3 servers do not send it.
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl OpenPacket {
    /// The ping interval as a [`Duration`]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval)
    }
    /// The ping timeout as a [`Duration`]
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout)
    }
}

/// This default implementation should only be used for testing purposes.
impl Default for OpenPacket {
    fn default() -> Self {
        Self {
            sid: "AAAAAAAAAAAAAAAA".to_string(),
            upgrades: Vec::new(),
            ping_interval: 25000,
            ping_timeout: 20000,
            max_payload: Some(100000),
        }
    }
}

/// Buffered packets to send to the server.
/// It is used to ensure atomicity when sending multiple packets,
/// e.g. a binary event header followed by its attachments.
///
/// The [`PacketBuf`] stack size will impact the dynamically allocated buffer
/// of the internal mpsc channel.
pub type PacketBuf = SmallVec<[Packet; 2]>;
