//! The default websocket transport, built on [`tokio_tungstenite`].
use bytes::Bytes;
use engineioxide_core::{Frame, ProtocolVersion, Str};
use futures_util::{SinkExt, StreamExt, future};
use http::Uri;
use tokio_tungstenite::tungstenite::{self, Message, Utf8Bytes};

use super::{Connection, Transport};
use crate::errors::TransportError;

/// A websocket [`Transport`].
///
/// Enable the `tls` feature to connect to `wss` addresses.
#[derive(Debug, Default, Clone)]
pub struct WsTransport {
    binary_framing: bool,
}

impl WsTransport {
    /// Create a new websocket transport exchanging text framed packets
    pub fn new() -> Self {
        Self::default()
    }

    /// Exchange socket.io packets as binary msgpack records.
    /// The server must use the msgpack parser.
    pub fn binary_framing(mut self, enabled: bool) -> Self {
        self.binary_framing = enabled;
        self
    }
}

impl Transport for WsTransport {
    async fn connect(
        &self,
        url: &Uri,
        protocol: ProtocolVersion,
    ) -> Result<Connection, TransportError> {
        #[cfg(feature = "tracing")]
        tracing::debug!(%url, "connecting websocket");

        let (ws, _) = tokio_tungstenite::connect_async(url).await?;
        let (sink, stream) = ws.split();

        let sink = sink
            .sink_map_err(TransportError::from)
            .with(|frame: Frame| future::ready(into_message(frame)));
        let stream = stream.filter_map(|msg| future::ready(from_message(msg)));

        Ok(Connection::new(sink, stream, protocol, self.binary_framing))
    }
}

fn into_message(frame: Frame) -> Result<Message, TransportError> {
    match frame {
        Frame::Text(text) => {
            let text = Utf8Bytes::try_from(Bytes::from(text))
                .map_err(|e| TransportError::new(TransportError::ABNORMAL, e.to_string()))?;
            Ok(Message::Text(text))
        }
        Frame::Binary(bin) => Ok(Message::Binary(bin)),
    }
}

/// Websocket control messages are handled by tungstenite and skipped.
fn from_message(msg: Result<Message, tungstenite::Error>) -> Option<Result<Frame, TransportError>> {
    match msg {
        // SAFETY: tungstenite already checked that the text frame is valid utf8
        Ok(Message::Text(text)) => Some(Ok(Frame::Text(unsafe {
            Str::from_bytes_unchecked(text.into())
        }))),
        Ok(Message::Binary(bin)) => Some(Ok(Frame::Binary(bin))),
        Ok(Message::Close(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
        Err(e) => Some(Err(e.into())),
    }
}

impl From<tungstenite::Error> for TransportError {
    fn from(err: tungstenite::Error) -> Self {
        use tungstenite::Error;
        let code = match &err {
            Error::Http(res) => res.status().as_u16(),
            Error::ConnectionClosed | Error::AlreadyClosed => 1000,
            Error::Protocol(_) => 1002,
            Error::Capacity(_) => 1009,
            _ => TransportError::ABNORMAL,
        };
        TransportError::new(code, err.to_string())
    }
}
