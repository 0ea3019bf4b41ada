#![cfg_attr(docsrs, feature(doc_cfg))]
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
//! Socketioxide-client is a socket.io client built on [`tokio`] and websockets.
//!
//! ## Table of contents
//! * [Features](#features)
//! * [Usage](#usage)
//! * [Handlers](#handlers)
//! * [Extractors](#extractors)
//! * [Acknowledgements](#acknowledgements)
//! * [Binary data](#binary-data)
//! * [Closing](#closing)
//!
//! ## Features
//! * `tracing`: enabled by default, emits logs with the [`tracing`](https://docs.rs/tracing) crate.
//! * `tls`: connect to `https`/`wss` addresses with native-tls.
//!
//! Both the engine.io V3 and V4 protocols are supported, see [`ClientConfig::protocol`].
//! Packets are exchanged as text by default. A [`WsTransport`] with
//! [`binary_framing`](WsTransport::binary_framing) exchanges them as msgpack records.
//!
//! ## Usage
//! ```no_run
//! use socketioxide_client::{Client, ClientConfig, extract::*};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .auth(serde_json::json!({ "token": "secret" }))
//!         .build()?;
//!     let client = Client::new("http://localhost:3000/chat", config)?;
//!
//!     client.on_connect(|s: SocketRef| {
//!         s.emit("join", "general").ok();
//!     })?;
//!     client.on("message", |Data::<String>(msg)| println!("received {msg}"))?;
//!
//!     client.connect().await?;
//!     let reason = client.closed().await;
//!     println!("connection closed: {reason:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Handlers
//! Handlers are registered before [`Client::connect`]:
//! * [`Client::on`] registers a [`MessageHandler`](handler::MessageHandler) for an event.
//! * [`Client::on_connect`] registers a [`ConnectHandler`](handler::ConnectHandler),
//!   called once the server accepted the namespace connection.
//! * [`Client::on_disconnect`] registers a [`DisconnectHandler`](handler::DisconnectHandler),
//!   called exactly once when the connection is closed.
//!
//! The `"connection"` and `"disconnection"` event names are reserved, handlers registered under
//! these names are called together with the lifecycle handlers.
//!
//! Handlers can be sync or async closures, both run in the dispatch task of the packet.
//! Incoming packets are dispatched concurrently so the order in which handlers run is not
//! guaranteed. At most [`ClientConfig::max_concurrent_handlers`] handlers run at the same time,
//! an async handler counts until its future completes.
//!
//! ## Extractors
//! Handler arguments are [extractors](extract), similar to axum's. If an extractor fails,
//! the handler is not called and an error is logged.
//!
//! ## Acknowledgements
//! * If the server asks for an acknowledgement, the return value of the message handler is sent back.
//!   See [`IntoAck`](handler::IntoAck).
//! * [`Client::emit_with_ack`] and [`Client::ack`] wait for the server response,
//!   until a timeout elapses or the connection is closed.
//!
//! ## Binary data
//! [`bytes::Bytes`] values in emitted data are sent as binary attachments.
//! Incoming attachments are put back in place and can be extracted as [`bytes::Bytes`].
//!
//! ## Closing
//! The connection is closed when [`Client::close`] is called, when the server closes it,
//! when the transport fails, when the server stays silent longer than `pingInterval + pingTimeout`
//! or when the outbound queue overflows. See [`DisconnectReason`].
//! Sending on a closed connection is a no-op and pending acknowledgements are rejected.

pub mod extract;
pub mod handler;

pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use errors::{AckError, ClientError, ConfigError, SendError, TransportError};
pub use socket::{ConnectionState, DisconnectReason, Socket};
pub use transport::{Connection, Transport, WsTransport};

pub use engineioxide_core::{Frame, ProtocolVersion};
pub use socketioxide_core::value::{PayloadValue, ValueError};

mod ack;
mod client;
mod config;
mod errors;
mod io;
mod parser;
mod socket;
mod transport;
