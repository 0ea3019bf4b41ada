use socketioxide_core::{parser::ParseError, value::ValueError};

/// Error type returned when building a [`Client`](crate::Client) or its [`ClientConfig`](crate::ClientConfig).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The address is empty or cannot be parsed as an uri with a host
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    /// The address scheme is not one of `http`, `https`, `ws` or `wss`
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// The outbound queue needs at least one slot for packets and one for the close frame,
    /// and cannot hold more than [`Semaphore::MAX_PERMITS`](tokio::sync::Semaphore::MAX_PERMITS) packets
    #[error("invalid buffer size {0}, it must be at least 2 and at most the semaphore permit limit")]
    InvalidBufferSize(usize),

    /// The handler limit must be between 1 and [`Semaphore::MAX_PERMITS`](tokio::sync::Semaphore::MAX_PERMITS)
    #[error("invalid handler limit {0}, it must be at least 1 and at most the semaphore permit limit")]
    InvalidHandlerLimit(usize),
}

/// A failure of the underlying transport, while connecting, reading or writing.
///
/// The `code` is the http status of a failed websocket upgrade,
/// or a websocket close code for other failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("transport error {code}: {text}")]
pub struct TransportError {
    /// Numeric error code
    pub code: u16,
    /// Human readable error description
    pub text: String,
}

impl TransportError {
    /// The code used when the connection was closed abnormally.
    pub const ABNORMAL: u16 = 1006;

    /// Create a new transport error
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }
}

/// Error type for sending operations.
#[derive(thiserror::Error, Debug)]
pub enum SendError {
    /// The outbound queue is full, the connection has been closed.
    #[error("outbound queue overflow")]
    Overflow,

    /// The packet could not be encoded
    #[error("error encoding packet: {0}")]
    Encode(#[from] ParseError),

    /// The data could not be converted to a socket.io value
    #[error("error converting data: {0}")]
    Value(#[from] ValueError),
}

/// Error type for ack operations.
#[derive(thiserror::Error, Debug)]
pub enum AckError {
    /// The ack response timed out
    #[error("ack timeout error")]
    Timeout,

    /// The connection was closed before the ack response arrived
    #[error("connection closed before the ack response")]
    Closed,

    /// The packet carrying the ack request could not be sent
    #[error("error sending ack request: {0}")]
    Send(#[from] SendError),

    /// The ack response cannot be converted to the requested type
    #[error("cannot decode ack response: {0}")]
    Decode(#[from] ValueError),
}

impl From<tokio::time::error::Elapsed> for AckError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::Timeout
    }
}

/// Error type for the [`Client`](crate::Client) api.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// Invalid configuration
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The transport could not connect
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Handlers can only be registered and the client connected once
    #[error("client is already connected")]
    AlreadyConnected,

    /// The client has not been connected yet
    #[error("client is not connected")]
    NotConnected,

    /// Error while sending a packet
    #[error("{0}")]
    Send(#[from] SendError),

    /// Error while waiting for an ack response
    #[error("{0}")]
    Ack(#[from] AckError),
}
