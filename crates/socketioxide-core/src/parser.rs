//! Contains the [`Parse`] trait implemented by the socket.io parsers
//! and the [`ParserState`] used to reconstruct binary packets.
use bytes::Bytes;
use engineioxide_core::Str;

use crate::{Value, packet::Packet};

/// All socket.io parsers should implement this trait.
/// Parsers are stateless, the reconstruction state of a connection is kept in a [`ParserState`]
/// owned by the reader of the connection.
pub trait Parse: Default + Copy {
    /// Convert a packet into a head frame and its adjacent binary attachments.
    fn encode(self, packet: Packet) -> Result<Value, ParseError>;

    /// Parse a given input string. If the payload needs more adjacent binary packets,
    /// the partial packet will be kept and a [`ParseError::NeedsMoreBinaryData`] will be returned.
    fn decode_str(self, state: &mut ParserState, data: Str) -> Result<Packet, ParseError>;

    /// Parse a given input binary. If the payload needs more adjacent binary packets,
    /// the partial packet will be kept and a [`ParseError::NeedsMoreBinaryData`] will be returned.
    fn decode_bin(self, state: &mut ParserState, bin: Bytes) -> Result<Packet, ParseError>;
}

/// The state of a connection while a binary packet is being reconstructed.
#[derive(Debug, Default)]
pub struct ParserState {
    /// The head of the binary packet waiting for its attachments
    partial_packet: Option<Packet>,
    /// The number of attachments announced by the head packet
    expected_attachments: usize,
    /// The attachments received so far
    attachments: Vec<Bytes>,
}

impl ParserState {
    /// Returns true if a binary packet is waiting for attachments.
    pub fn is_reconstructing(&self) -> bool {
        self.partial_packet.is_some()
    }

    /// The number of attachments still expected.
    pub fn missing_attachments(&self) -> usize {
        self.expected_attachments
            .saturating_sub(self.attachments.len())
    }

    /// Keep a binary packet head until `count` attachments are received.
    pub fn start(&mut self, packet: Packet, count: usize) {
        self.partial_packet = Some(packet);
        self.expected_attachments = count;
        self.attachments = Vec::with_capacity(count);
    }

    /// Drop any partial packet.
    pub fn reset(&mut self) {
        self.partial_packet = None;
        self.expected_attachments = 0;
        self.attachments.clear();
    }

    /// Push an attachment to the partial packet.
    /// Returns the reconstructed packet once every attachment is received,
    /// or [`ParseError::NeedsMoreBinaryData`] while some are still missing.
    ///
    /// A binary frame received while no packet is being reconstructed is
    /// an [`ParseError::UnexpectedBinaryPacket`].
    pub fn push_attachment(&mut self, bin: Bytes) -> Result<Packet, ParseError> {
        if !self.is_reconstructing() {
            return Err(ParseError::UnexpectedBinaryPacket);
        }
        self.attachments.push(bin);
        if self.attachments.len() < self.expected_attachments {
            return Err(ParseError::NeedsMoreBinaryData);
        }
        let attachments = std::mem::take(&mut self.attachments);
        let packet = self.partial_packet.take();
        self.reset();
        let mut packet = packet.ok_or(ParseError::UnexpectedBinaryPacket)?;
        packet.reconstruct(&attachments)?;
        Ok(packet)
    }
}

/// Errors when parsing/serializing socket.io packets
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Invalid packet type
    #[error("invalid packet type")]
    InvalidPacketType,

    /// Invalid or missing ack id
    #[error("invalid ack id")]
    InvalidAckId,

    /// Invalid namespace
    #[error("invalid namespace")]
    InvalidNamespace,

    /// Invalid attachments
    #[error("invalid attachments")]
    InvalidAttachments,

    /// Received unexpected binary data
    #[error(
        "received unexpected binary data. Make sure you are using the same parser on both ends."
    )]
    UnexpectedBinaryPacket,

    /// Received unexpected string data
    #[error(
        "received unexpected string data. Make sure you are using the same parser on both ends."
    )]
    UnexpectedStringPacket,

    /// Needs more binary data before deserialization. It is not exactly an error, it is used for control flow,
    /// e.g the common parser needs adjacent binary packets and therefore will return [`ParseError::NeedsMoreBinaryData`]
    /// n times for n adjacent binary packets expected.
    /// In this case the user should call again the parser with the next binary payload.
    #[error("needs more binary data before deserialization")]
    NeedsMoreBinaryData,

    /// The packet could not be serialized
    #[error("serialization error: {0}")]
    Serialize(String),

    /// The packet could not be deserialized
    #[error("deserialization error: {0}")]
    Deserialize(String),
}
