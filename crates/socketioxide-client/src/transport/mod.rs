//! The transport contract used by the client to reach a socket.io server.
//!
//! A [`Transport`] opens a [`Connection`]: a sink of outgoing [`Frame`]s
//! and a stream of incoming [`Frame`]s. The default transport is the [`WsTransport`].
use std::{fmt, future::Future, pin::Pin};

use engineioxide_core::{Frame, ProtocolVersion};
use futures_core::Stream;
use futures_util::Sink;
use http::Uri;

use crate::errors::TransportError;

mod ws;
pub use ws::WsTransport;

pub(crate) type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;
pub(crate) type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// Open connections to a socket.io server.
pub trait Transport: Send + Sync + 'static {
    /// Connect to the given url.
    /// The url already contains the `transport`, `EIO` and `t` query parameters.
    fn connect(
        &self,
        url: &Uri,
        protocol: ProtocolVersion,
    ) -> impl Future<Output = Result<Connection, TransportError>> + Send;
}

/// An open connection returned by a [`Transport`].
pub struct Connection {
    pub(crate) sink: FrameSink,
    pub(crate) stream: FrameStream,
    protocol: ProtocolVersion,
    binary_framing: bool,
}

impl Connection {
    /// Create a new connection from a sink of frames and a stream of frames.
    ///
    /// If `binary_framing` is set, socket.io packets are exchanged as msgpack records.
    pub fn new<Si, St>(sink: Si, stream: St, protocol: ProtocolVersion, binary_framing: bool) -> Self
    where
        Si: Sink<Frame, Error = TransportError> + Send + 'static,
        St: Stream<Item = Result<Frame, TransportError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
            protocol,
            binary_framing,
        }
    }

    /// The engine.io protocol version negotiated for this connection
    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    /// Whether socket.io packets are exchanged as binary msgpack records
    pub fn binary_framing(&self) -> bool {
        self.binary_framing
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("protocol", &self.protocol)
            .field("binary_framing", &self.binary_framing)
            .finish()
    }
}
