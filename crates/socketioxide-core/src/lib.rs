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
//! Core types shared by the socket.io parsers and the socket.io client:
//! the [`Packet`](packet::Packet) model, the [`PayloadValue`](value::PayloadValue) data tree
//! and the [`Parse`](parser::Parse) trait.

pub mod packet;
pub mod parser;
pub mod value;

use bytes::Bytes;
pub use engineioxide_core::Str;

/// An encoded socket.io packet, ready to be written on an engine.io connection.
///
/// The head frame is followed by its binary attachments, each one sent as its own binary frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A head sent as a text frame
    Str(Str, Option<Vec<Bytes>>),
    /// A head sent as a binary frame
    Bytes(Bytes, Option<Vec<Bytes>>),
}

impl Value {
    /// The head as a string, if it is a text frame
    pub fn as_str(&self) -> Option<&Str> {
        match self {
            Value::Str(data, _) => Some(data),
            Value::Bytes(_, _) => None,
        }
    }
    /// The head as bytes, if it is a binary frame
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Str(_, _) => None,
            Value::Bytes(data, _) => Some(data),
        }
    }
    /// The binary attachments following the head
    pub fn attachments(&self) -> &[Bytes] {
        match self {
            Value::Str(_, bins) | Value::Bytes(_, bins) => bins.as_deref().unwrap_or_default(),
        }
    }
    /// The length of the head frame
    pub fn len(&self) -> usize {
        match self {
            Value::Str(data, _) => data.len(),
            Value::Bytes(data, _) => data.len(),
        }
    }
    /// Returns true if the head frame is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
