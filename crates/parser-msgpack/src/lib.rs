#![warn(
    clippy::all,
    clippy::todo,
    clippy::empty_enum,
    clippy::mem_forget,
    clippy::unused_self,
    clippy::filter_map_next,
    clippy::needless_continue,
    clippy::needless_borrow,
    clippy::match_wildcard_for_single_variants,
    clippy::if_let_mutex,
    clippy::await_holding_lock,
    clippy::imprecise_flops,
    clippy::suboptimal_flops,
    clippy::lossy_float_literal,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::fn_params_excessive_bools,
    clippy::exit,
    clippy::inefficient_to_string,
    clippy::linkedlist,
    clippy::macro_use_imports,
    clippy::option_option,
    clippy::verbose_file_reads,
    clippy::unnested_or_patterns,
    rust_2018_idioms,
    rust_2024_compatibility,
    future_incompatible,
    nonstandard_style,
    missing_docs
)]

//! The msgpack parser sub-crate for the socketioxide client.
//!
//! Every packet is a msgpack map sent in a binary frame:
//! ```text
//! { "type": <packet type>, "nsp": <namespace>, "data"?: <payload>, "id"?: <ack id> }
//! ```
//! Binary leaves of the payload are replaced by placeholders and
//! sent as separate binary frames following the record.
use bytes::Bytes;
use socketioxide_core::{
    Str, Value,
    packet::Packet,
    parser::{Parse, ParseError, ParserState},
};

mod de;
mod ser;

/// Parse and serialize from and into the socket.io msgpack packet format.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsgPackParser;

impl Parse for MsgPackParser {
    fn encode(self, packet: Packet) -> Result<Value, ParseError> {
        let (data, bins) = ser::serialize_packet(packet)?;
        Ok(Value::Bytes(data.into(), (!bins.is_empty()).then_some(bins)))
    }

    fn decode_str(self, _: &mut ParserState, _: Str) -> Result<Packet, ParseError> {
        Err(ParseError::UnexpectedStringPacket)
    }

    fn decode_bin(self, state: &mut ParserState, bin: Bytes) -> Result<Packet, ParseError> {
        if state.is_reconstructing() {
            return state.push_attachment(bin);
        }
        let (packet, attachments) = de::deserialize_packet(bin)?;
        if attachments > 0 {
            state.start(packet, attachments);
            Err(ParseError::NeedsMoreBinaryData)
        } else {
            Ok(packet)
        }
    }
}

/// The static binary data was generated with the official socket.io msgpack parser.
#[cfg(test)]
mod tests {
    use serde_json::json;
    use socketioxide_core::value::PayloadValue;

    use super::*;

    fn decode(value: &'static [u8]) -> Packet {
        MsgPackParser
            .decode_bin(&mut ParserState::default(), Bytes::from_static(value))
            .unwrap()
    }
    fn encode(packet: Packet) -> Bytes {
        match MsgPackParser.encode(packet).unwrap() {
            Value::Bytes(b, None) => b,
            _ => panic!("implementation should only return bytes without attachments"),
        }
    }

    const CONNECT_ROOT: &[u8] = &[
        131, 164, 116, 121, 112, 101, 0, 163, 110, 115, 112, 161, 47, 164, 100, 97, 116, 97, 129,
        163, 115, 105, 100, 176, 110, 119, 122, 51, 67, 56, 117, 55, 113, 121, 115, 118, 103, 86,
        113, 106,
    ];
    const DISCONNECT_ROOT: &[u8] = &[130, 164, 116, 121, 112, 101, 1, 163, 110, 115, 112, 161, 47];
    const DISCONNECT_ADMIN: &[u8] = &[
        130, 164, 116, 121, 112, 101, 1, 163, 110, 115, 112, 169, 47, 97, 100, 109, 105, 110, 226,
        132, 162,
    ];
    const EVENT_ROOT: &[u8] = &[
        131, 164, 116, 121, 112, 101, 2, 163, 110, 115, 112, 161, 47, 164, 100, 97, 116, 97, 146,
        165, 101, 118, 101, 110, 116, 129, 164, 100, 97, 116, 97, 168, 118, 97, 108, 117, 101, 226,
        132, 162,
    ];
    const EVENT_ROOT_ACK: &[u8] = &[
        132, 164, 116, 121, 112, 101, 2, 163, 110, 115, 112, 161, 47, 164, 100, 97, 116, 97, 146,
        165, 101, 118, 101, 110, 116, 129, 164, 100, 97, 116, 97, 168, 118, 97, 108, 117, 101, 226,
        132, 162, 162, 105, 100, 1,
    ];
    const ACK_ROOT: &[u8] = &[
        132, 164, 116, 121, 112, 101, 3, 163, 110, 115, 112, 161, 47, 164, 100, 97, 116, 97, 145,
        164, 100, 97, 116, 97, 162, 105, 100, 54,
    ];

    fn connect_root() -> Packet {
        Packet::connect("", Some(json!({ "sid": "nwz3C8u7qysvgVqj" }).into()))
    }
    fn event_root() -> Packet {
        Packet::event("", "event", vec![json!({ "data": "value™" }).into()])
    }

    #[test]
    fn packet_decode_connect_root_ns() {
        assert_eq!(decode(CONNECT_ROOT), connect_root());
    }

    #[test]
    fn packet_encode_connect_root_ns() {
        assert_eq!(encode(connect_root()), CONNECT_ROOT);
    }

    #[test]
    fn packet_disconnect() {
        assert_eq!(decode(DISCONNECT_ROOT), Packet::disconnect(""));
        assert_eq!(encode(Packet::disconnect("/")), DISCONNECT_ROOT);
        assert_eq!(decode(DISCONNECT_ADMIN), Packet::disconnect("/admin™"));
        assert_eq!(encode(Packet::disconnect("/admin™")), DISCONNECT_ADMIN);
        assert_eq!(encode(Packet::disconnect("admin™")), DISCONNECT_ADMIN);
    }

    #[test]
    fn packet_event() {
        assert_eq!(decode(EVENT_ROOT), event_root());
        assert_eq!(encode(event_root()), EVENT_ROOT);

        let mut packet = event_root();
        packet.inner.set_ack_id(1);
        assert_eq!(decode(EVENT_ROOT_ACK), packet);
        assert_eq!(encode(packet), EVENT_ROOT_ACK);
    }

    #[test]
    fn packet_event_ack() {
        let packet = Packet::ack("", vec!["data".into()], 54);
        assert_eq!(decode(ACK_ROOT), packet);
        assert_eq!(encode(packet), ACK_ROOT);
    }

    #[test]
    fn string_frames_are_rejected() {
        let err = MsgPackParser
            .decode_str(&mut ParserState::default(), "0".into())
            .unwrap_err();
        assert_eq!(err, ParseError::UnexpectedStringPacket);
    }

    #[test]
    fn binary_event_with_attachments() {
        let file = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);
        let packet = Packet::event(
            "/files",
            "upload",
            vec!["name".into(), PayloadValue::Binary(file.clone())],
        );
        let (head, bins) = match MsgPackParser.encode(packet.clone()).unwrap() {
            Value::Bytes(head, Some(bins)) => (head, bins),
            _ => panic!("expected a record with attachments"),
        };
        assert_eq!(bins, vec![file.clone()]);

        let mut state = ParserState::default();
        let err = MsgPackParser.decode_bin(&mut state, head).unwrap_err();
        assert_eq!(err, ParseError::NeedsMoreBinaryData);
        assert_eq!(state.missing_attachments(), 1);

        let decoded = MsgPackParser.decode_bin(&mut state, file).unwrap();
        assert_eq!(decoded, packet);
        assert!(!state.is_reconstructing());
    }
}
