//! A [`Socket`] is the connection of the client to its namespace.
//! It is available in handlers through a [`SocketRef`](crate::extract::SocketRef)
//! and from the [`Client`](crate::Client).
use std::{
    fmt,
    sync::{
        Arc, Mutex, OnceLock, PoisonError, Weak,
        atomic::{AtomicBool, AtomicU8, Ordering},
    },
    time::Duration,
};

use engineioxide_core::{OpenPacket, Packet as EPacket, PacketBuf, ProtocolVersion, Str};
use serde::{Serialize, de::DeserializeOwned};
use socketioxide_core::{
    Value,
    packet::{Packet, PacketData},
    parser::Parse,
    value::PayloadValue,
};
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        watch,
    },
    task::JoinHandle,
};

use crate::{
    ack::AckRegistry,
    config::ClientConfig,
    errors::{AckError, SendError},
    extract::decode_args,
    handler::Handlers,
    parser::Parser,
};

/// All the possible reasons for a connection to be closed.
///
/// It can be used as an extractor in the [`on_disconnect`](crate::Client::on_disconnect) handler.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DisconnectReason {
    /// The transport stream ended
    TransportClose,
    /// The transport failed while reading or writing
    TransportError,
    /// The server sent an engine.io close packet
    ServerClose,
    /// The server disconnected the client from the namespace
    ServerNsDisconnect,
    /// The server refused the namespace connection
    ConnectError,
    /// The server did not send anything during `pingInterval + pingTimeout`
    HeartbeatTimeout,
    /// The outbound queue was full
    Overflow,
    /// The server sent a binary attachment that was not expected
    ProtocolViolation,
    /// The first frame received was not a valid open packet
    HandshakeError,
    /// The client closed the connection
    ClientDisconnect,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DisconnectReason::*;
        let str: &'static str = match self {
            TransportClose => "transport was closed",
            TransportError => "transport error",
            ServerClose => "server closed the connection",
            ServerNsDisconnect => "server disconnected the client from the namespace",
            ConnectError => "server refused the namespace connection",
            HeartbeatTimeout => "server did not send anything in time",
            Overflow => "outbound queue overflow",
            ProtocolViolation => "server sent an unexpected binary attachment",
            HandshakeError => "invalid handshake",
            ClientDisconnect => "client closed the connection",
        };
        f.write_str(str)
    }
}

/// The state of a connection.
#[derive(Debug, Copy, Clone, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectionState {
    /// The transport is connected, the engine.io open packet is expected
    Connecting = 0,
    /// The engine.io session is open
    Open = 1,
    /// The namespace connect packet was sent
    NamespaceConnecting = 2,
    /// The server accepted the namespace connection
    NamespaceConnected = 3,
    /// The connection is being closed
    Closing = 4,
    /// The connection is closed
    Closed = 5,
}

impl From<u8> for ConnectionState {
    fn from(value: u8) -> Self {
        use ConnectionState::*;
        match value {
            0 => Connecting,
            1 => Open,
            2 => NamespaceConnecting,
            3 => NamespaceConnected,
            4 => Closing,
            _ => Closed,
        }
    }
}

/// The connection of the client to a namespace.
pub struct Socket {
    ns: Str,
    protocol: ProtocolVersion,
    parser: Parser,
    auth: Option<PayloadValue>,
    ack_timeout: Duration,

    state: AtomicU8,
    /// Liveness flag, it gates every new send
    connected: AtomicBool,
    connect_fired: AtomicBool,

    header: OnceLock<OpenPacket>,
    ns_sid: OnceLock<String>,

    tx: mpsc::Sender<PacketBuf>,
    acks: AckRegistry,
    handlers: Arc<Handlers>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    closed_tx: watch::Sender<Option<DisconnectReason>>,
    me: Weak<Socket>,
}

impl Socket {
    pub(crate) fn new(
        ns: Str,
        protocol: ProtocolVersion,
        parser: Parser,
        handlers: Arc<Handlers>,
        config: &ClientConfig,
    ) -> (Arc<Self>, mpsc::Receiver<PacketBuf>) {
        let (tx, rx) = mpsc::channel(config.max_buffer_size);
        let (closed_tx, _) = watch::channel(None);
        let socket = Arc::new_cyclic(|me| Self {
            ns,
            protocol,
            parser,
            auth: config.auth.clone(),
            ack_timeout: config.ack_timeout,
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            connected: AtomicBool::new(true),
            connect_fired: AtomicBool::new(false),
            header: OnceLock::new(),
            ns_sid: OnceLock::new(),
            tx,
            acks: AckRegistry::default(),
            handlers,
            heartbeat: Mutex::new(None),
            closed_tx,
            me: me.clone(),
        });
        (socket, rx)
    }

    /// The namespace of this socket, `/` for the root namespace
    pub fn ns(&self) -> &str {
        if self.ns.is_empty() { "/" } else { &self.ns }
    }

    /// The engine.io session id, available once the server opened the session
    pub fn id(&self) -> Option<&str> {
        self.header.get().map(|h| h.sid.as_str())
    }

    /// The namespace session id, available once the server accepted the namespace connection
    pub fn ns_id(&self) -> Option<&str> {
        self.ns_sid.get().map(String::as_str)
    }

    /// The engine.io protocol version of the connection
    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    /// The current state of the connection
    pub fn state(&self) -> ConnectionState {
        self.state.load(Ordering::SeqCst).into()
    }

    /// Whether new packets can still be sent.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Emit an event with a single argument.
    ///
    /// The data is converted to a [`PayloadValue`] so [`bytes::Bytes`] fields are sent as binary attachments.
    /// To emit several arguments, use [`Socket::emit_args`].
    ///
    /// Emitting on a closed connection is a no-op.
    pub fn emit<T: ?Sized + Serialize>(
        &self,
        event: impl Into<String>,
        data: &T,
    ) -> Result<(), SendError> {
        let data = PayloadValue::from_data(data)?;
        self.emit_args(event, vec![data])
    }

    /// Emit an event with positional arguments.
    pub fn emit_args(
        &self,
        event: impl Into<String>,
        args: Vec<PayloadValue>,
    ) -> Result<(), SendError> {
        self.send(Packet::event(self.ns.clone(), event, args))
    }

    /// Emit an event with a single argument and wait for its acknowledgement,
    /// during the configured `ack_timeout`.
    ///
    /// The response is decoded as `R`. A single response argument is decoded directly,
    /// several arguments are decoded as a sequence.
    pub async fn emit_with_ack<T: ?Sized + Serialize, R: DeserializeOwned>(
        &self,
        event: impl Into<String>,
        data: &T,
    ) -> Result<R, AckError> {
        let data = PayloadValue::from_data(data).map_err(SendError::from)?;
        let args = self.ack(event, vec![data], self.ack_timeout).await?;
        Ok(decode_args(args)?)
    }

    /// Emit an event with positional arguments and wait for the response arguments.
    ///
    /// Fails with [`AckError::Timeout`] if no response arrives in time,
    /// and with [`AckError::Closed`] if the connection closes first.
    pub async fn ack(
        &self,
        event: impl Into<String>,
        args: Vec<PayloadValue>,
        timeout: Duration,
    ) -> Result<Vec<PayloadValue>, AckError> {
        if !self.is_connected() {
            return Err(AckError::Closed);
        }
        let (id, rx) = self.acks.register();
        let mut packet = Packet::event(self.ns.clone(), event, args);
        packet.inner.set_ack_id(id);
        if let Err(e) = self.send(packet) {
            self.acks.remove(id);
            return Err(e.into());
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(args)) => Ok(args),
            Ok(Err(_)) => Err(AckError::Closed),
            Err(_) => {
                self.acks.remove(id);
                #[cfg(feature = "tracing")]
                tracing::debug!(id, "ack timeout");
                Err(AckError::Timeout)
            }
        }
    }

    /// Close the connection.
    ///
    /// A namespace disconnect packet is sent before the engine.io close packet.
    /// Calling it several times is a no-op.
    pub fn close(&self) {
        self.close_with(DisconnectReason::ClientDisconnect);
    }

    /// Wait for the connection to be closed and get the reason.
    pub async fn closed(&self) -> DisconnectReason {
        let mut rx = self.closed_tx.subscribe();
        let reason = rx.wait_for(Option::is_some).await.ok().and_then(|r| *r);
        reason.unwrap_or(DisconnectReason::TransportClose)
    }

    pub(crate) fn subscribe_closed(&self) -> watch::Receiver<Option<DisconnectReason>> {
        self.closed_tx.subscribe()
    }

    /// The namespace in its wire form, empty for the root namespace
    pub(crate) fn raw_ns(&self) -> &Str {
        &self.ns
    }

    pub(crate) fn parser(&self) -> Parser {
        self.parser
    }

    pub(crate) fn auth(&self) -> Option<PayloadValue> {
        self.auth.clone()
    }

    pub(crate) fn header(&self) -> Option<&OpenPacket> {
        self.header.get()
    }

    /// Store the open packet, returns `false` if it was already set.
    pub(crate) fn set_header(&self, header: OpenPacket) -> bool {
        self.header.set(header).is_ok()
    }

    /// The maximum silence allowed from the server
    pub(crate) fn heartbeat_timeout(&self) -> Option<Duration> {
        self.header
            .get()
            .map(|h| h.ping_interval() + h.ping_timeout())
    }

    /// Move the connection to a new state. A closing connection only moves to closed.
    pub(crate) fn set_state(&self, state: ConnectionState) {
        let _ = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < ConnectionState::Closing as u8 || state == ConnectionState::Closed)
                    .then_some(state as u8)
            });
    }

    pub(crate) fn set_heartbeat(&self, handle: JoinHandle<()>) {
        let mut heartbeat = self.heartbeat.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prev) = heartbeat.replace(handle) {
            prev.abort();
        }
    }

    fn abort_heartbeat(&self) {
        let handle = self
            .heartbeat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// Encode a socket.io packet and queue it.
    pub(crate) fn send(&self, packet: Packet) -> Result<(), SendError> {
        if !self.is_connected() {
            return Ok(());
        }
        let packets = self.encode(packet)?;
        self.enqueue(packets)
    }

    /// Queue an engine.io control packet
    pub(crate) fn send_raw(&self, packet: EPacket) -> Result<(), SendError> {
        self.enqueue(smallvec::smallvec![packet])
    }

    pub(crate) fn send_ack(&self, ack_id: i64, args: Vec<PayloadValue>) -> Result<(), SendError> {
        self.send(Packet::ack(self.ns.clone(), args, ack_id))
    }

    fn encode(&self, packet: Packet) -> Result<PacketBuf, SendError> {
        let (head, attachments) = match self.parser.encode(packet)? {
            Value::Str(head, attachments) => (EPacket::Message(head), attachments),
            Value::Bytes(head, attachments) => (self.binary(head), attachments),
        };
        let mut packets = PacketBuf::new();
        packets.push(head);
        for bin in attachments.into_iter().flatten() {
            packets.push(self.binary(bin));
        }
        Ok(packets)
    }

    fn binary(&self, bin: bytes::Bytes) -> EPacket {
        match self.protocol {
            ProtocolVersion::V3 => EPacket::BinaryV3(bin),
            ProtocolVersion::V4 => EPacket::Binary(bin),
        }
    }

    /// Push packets to the outbound queue.
    ///
    /// The last slot of the queue is kept for the close packet.
    /// When only this slot is left, the connection is closed with an overflow.
    fn enqueue(&self, packets: PacketBuf) -> Result<(), SendError> {
        if !self.is_connected() {
            return Ok(());
        }
        if self.tx.capacity() <= 1 {
            self.close_with(DisconnectReason::Overflow);
            return Err(SendError::Overflow);
        }
        match self.tx.try_send(packets) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.close_with(DisconnectReason::Overflow);
                Err(SendError::Overflow)
            }
            Err(TrySendError::Closed(_)) => Ok(()),
        }
    }

    /// Close the connection with the given reason.
    ///
    /// Only the first call has an effect: the close packet is queued, pending acks are
    /// rejected, the heartbeat is stopped and the disconnect handlers are called.
    pub(crate) fn close_with(&self, reason: DisconnectReason) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(ns = self.ns(), ?reason, "closing connection");

        self.set_state(ConnectionState::Closing);
        let mut packets = PacketBuf::new();
        if reason == DisconnectReason::ClientDisconnect && self.header.get().is_some() {
            match self.encode(Packet::disconnect(self.ns.clone())) {
                Ok(disconnect) => packets.extend(disconnect),
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("cannot encode disconnect packet: {_e}");
                }
            }
        }
        packets.push(EPacket::Close);
        if let Err(_e) = self.tx.try_send(packets) {
            #[cfg(feature = "tracing")]
            tracing::trace!("close packet not queued: {_e}");
        }

        self.acks.clear();
        self.abort_heartbeat();
        self.closed_tx.send_replace(Some(reason));
        if let Some(socket) = self.me.upgrade() {
            self.handlers.on_disconnect(&socket, reason);
        }
        self.set_state(ConnectionState::Closed);
    }

    /// Fire the connection handlers, at most once per connection.
    pub(crate) fn fire_connect(&self) {
        if self.connect_fired.swap(true, Ordering::SeqCst) {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(ns = self.ns(), "connected to namespace");
        if let Some(socket) = self.me.upgrade() {
            self.handlers.on_connect(&socket);
        }
    }

    /// Handle the namespace connect packet sent back by the server
    pub(crate) fn on_ns_connect(&self, data: Option<PayloadValue>) {
        let sid = data
            .as_ref()
            .and_then(|d| d.get("sid"))
            .and_then(PayloadValue::as_str);
        if let Some(sid) = sid {
            self.ns_sid.set(sid.to_string()).ok();
        }
        self.set_state(ConnectionState::NamespaceConnected);
        self.fire_connect();
    }

    /// Dispatch an application packet to the handlers or to the ack registry.
    ///
    /// It completes once the handler, sync or async, has returned.
    pub(crate) async fn dispatch(self: Arc<Self>, packet: Packet) {
        match packet.inner {
            PacketData::Event(data, ack_id) | PacketData::BinaryEvent(data, ack_id) => {
                let Some((event, args)) = data.into_event() else {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("dropping event without name");
                    return;
                };
                let Some(handler) = self.handlers.event(&event) else {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(event, "no handler registered");
                    return;
                };
                if let Some(fut) = handler.call(self.clone(), args, ack_id) {
                    fut.await;
                }
            }
            PacketData::EventAck(data, ack_id) | PacketData::BinaryAck(data, ack_id) => {
                if !self.acks.resolve(ack_id, data.into_args()) {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(id = ack_id, "dropping ack without waiter");
                }
            }
            _other => {
                #[cfg(feature = "tracing")]
                tracing::debug!(?_other, "unexpected packet in dispatch");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_acks(&self) -> usize {
        self.acks.len()
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("ns", &self.ns())
            .field("id", &self.id())
            .field("ns_id", &self.ns_id())
            .field("protocol", &self.protocol)
            .field("state", &self.state())
            .finish()
    }
}
