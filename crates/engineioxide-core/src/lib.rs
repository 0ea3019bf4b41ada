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
    future_incompatible,
    nonstandard_style,
    missing_docs
)]
//! Engine.io core types shared by the socket.io client crates:
//! the control [`Packet`]s, the [`OpenPacket`] handshake, websocket [`Frame`]s and the [`Str`] type.

mod packet;
mod protocol;
mod str;

pub use packet::{Frame, OpenPacket, Packet, PacketBuf, PacketParseError};
pub use protocol::{ProtocolVersion, UnknownProtocolVersionError};
pub use str::Str;
