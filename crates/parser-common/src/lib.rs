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

//! The common parser sub-crate for the socketioxide client.
//!
//! This is the default parser implementation.
//!
//! It is used to parse and serialize the common packet format of the socket.io protocol:
//! ```text
//! <packet type>[<# of binary attachments>-][<namespace>,][<acknowledgment id>][JSON-stringified payload without binary]
//! + binary attachments extracted
//! ```
use bytes::Bytes;

use socketioxide_core::{
    Str, Value,
    packet::Packet,
    parser::{Parse, ParseError, ParserState},
};

mod de;
mod ser;

/// Parse and serialize from and into the socket.io common packet format.
/// See details in the [socket.io protocol doc](https://socket.io/fr/docs/v4/socket-io-protocol/#packet-encoding).
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonParser;

impl Parse for CommonParser {
    fn encode(self, packet: Packet) -> Result<Value, ParseError> {
        ser::serialize_packet(packet)
    }

    fn decode_str(self, state: &mut ParserState, value: Str) -> Result<Packet, ParseError> {
        // A new head while attachments are still expected means the partial packet is lost.
        state.reset();
        let (packet, incoming_binary_cnt) = de::deserialize_packet(value)?;
        match incoming_binary_cnt {
            Some(cnt) if cnt > 0 => {
                state.start(packet, cnt);
                Err(ParseError::NeedsMoreBinaryData)
            }
            _ => Ok(packet),
        }
    }

    fn decode_bin(self, state: &mut ParserState, data: Bytes) -> Result<Packet, ParseError> {
        state.push_attachment(data)
    }
}
