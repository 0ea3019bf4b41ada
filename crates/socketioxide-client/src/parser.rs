//! Contains the parser implementations used by the client.
//!
//! The [`CommonParser`] is used for text framed connections
//! and the [`MsgPackParser`] for binary framed connections.
use bytes::Bytes;
use engineioxide_core::Str;
use socketioxide_core::{
    Value,
    packet::Packet,
    parser::{Parse, ParseError, ParserState},
};
use socketioxide_parser_common::CommonParser;
use socketioxide_parser_msgpack::MsgPackParser;

/// All the parsers available.
/// The parser implementation is done over enum delegation.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) enum Parser {
    /// The default text parser
    #[default]
    Common,
    /// The msgpack record parser
    MsgPack,
}

impl Parser {
    /// Select the parser matching the transport framing
    pub fn new(binary_framing: bool) -> Self {
        if binary_framing {
            Parser::MsgPack
        } else {
            Parser::Common
        }
    }
}

impl Parse for Parser {
    fn encode(self, packet: Packet) -> Result<Value, ParseError> {
        match self {
            Parser::Common => CommonParser.encode(packet),
            Parser::MsgPack => MsgPackParser.encode(packet),
        }
    }

    fn decode_str(self, state: &mut ParserState, data: Str) -> Result<Packet, ParseError> {
        let packet = match self {
            Parser::Common => CommonParser.decode_str(state, data),
            Parser::MsgPack => MsgPackParser.decode_str(state, data),
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(?packet, "str payload decoded");
        packet
    }

    fn decode_bin(self, state: &mut ParserState, bin: Bytes) -> Result<Packet, ParseError> {
        let packet = match self {
            Parser::Common => CommonParser.decode_bin(state, bin),
            Parser::MsgPack => MsgPackParser.decode_bin(state, bin),
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(?packet, "bin payload decoded");
        packet
    }
}
