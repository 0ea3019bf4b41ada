//! The read and write loops of a connection.
//!
//! The read loop drives the protocol state machine and hands application packets
//! to dispatch tasks. The write loop drains the outbound queue into the transport sink.
use std::{sync::Arc, time::Duration};

use engineioxide_core::{Frame, Packet as EPacket, PacketBuf, ProtocolVersion};
use futures_util::{SinkExt, StreamExt};
use socketioxide_core::{
    packet::{Packet, PacketData},
    parser::{Parse, ParseError, ParserState},
};
use tokio::sync::{Semaphore, mpsc};

use crate::{
    errors::{SendError, TransportError},
    socket::{ConnectionState, DisconnectReason, Socket},
    transport::{Connection, FrameSink, FrameStream},
};

const MIN_PING_INTERVAL: Duration = Duration::from_millis(1);

/// Spawn the read and the write loops of a connection.
pub(crate) fn spawn(
    socket: Arc<Socket>,
    conn: Connection,
    rx: mpsc::Receiver<PacketBuf>,
    max_handlers: usize,
) {
    let Connection { sink, stream, .. } = conn;
    let permits = Arc::new(Semaphore::new(max_handlers));
    tokio::spawn(write_loop(socket.clone(), sink, rx));
    tokio::spawn(read_loop(socket, stream, permits));
}

async fn read_loop(socket: Arc<Socket>, mut stream: FrameStream, permits: Arc<Semaphore>) {
    let mut state = ParserState::default();
    let mut closed = socket.subscribe_closed();
    let reason = loop {
        if !socket.is_connected() {
            return;
        }
        let timeout = socket.heartbeat_timeout();
        let next = async {
            match timeout {
                Some(timeout) => tokio::time::timeout(timeout, stream.next()).await,
                None => Ok(stream.next().await),
            }
        };

        tokio::select! {
            _ = closed.changed() => return,
            res = next => match res {
                Err(_) => break DisconnectReason::HeartbeatTimeout,
                Ok(None) => break DisconnectReason::TransportClose,
                Ok(Some(Err(_e))) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(ns = socket.ns(), "transport read error: {_e}");
                    break DisconnectReason::TransportError;
                }
                Ok(Some(Ok(frame))) => {
                    if let Err(reason) = on_frame(&socket, &mut state, frame, &permits).await {
                        break reason;
                    }
                }
            }
        }
    };
    socket.close_with(reason);
}

async fn on_frame(
    socket: &Arc<Socket>,
    state: &mut ParserState,
    frame: Frame,
    permits: &Arc<Semaphore>,
) -> Result<(), DisconnectReason> {
    let decoded = match frame {
        Frame::Text(text) => {
            let packet = match EPacket::try_from(text) {
                Ok(packet) => packet,
                Err(_e) if socket.header().is_none() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("invalid handshake frame: {_e}");
                    return Err(DisconnectReason::HandshakeError);
                }
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(ns = socket.ns(), "dropping invalid engine.io frame: {_e}");
                    return Ok(());
                }
            };
            match packet {
                EPacket::Open(open) => return on_open(socket, open),
                _ if socket.header().is_none() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(?packet, "expected an open packet");
                    return Err(DisconnectReason::HandshakeError);
                }
                EPacket::Ping => return send_control(socket, EPacket::Pong),
                EPacket::Close => return Err(DisconnectReason::ServerClose),
                EPacket::Message(msg) => socket.parser().decode_str(state, msg),
                EPacket::Pong
                | EPacket::Upgrade
                | EPacket::Noop
                | EPacket::Binary(_)
                | EPacket::BinaryV3(_) => return Ok(()),
            }
        }
        Frame::Binary(mut bin) => {
            if socket.header().is_none() {
                return Err(DisconnectReason::HandshakeError);
            }
            if socket.protocol() == ProtocolVersion::V3 && !bin.is_empty() {
                // The first byte is the message type, which we don't need.
                bin = bin.slice(1..);
            }
            socket.parser().decode_bin(state, bin)
        }
    };

    match decoded {
        Ok(packet) => on_packet(socket, packet, permits).await,
        Err(ParseError::NeedsMoreBinaryData) => Ok(()),
        Err(ParseError::UnexpectedBinaryPacket) => Err(DisconnectReason::ProtocolViolation),
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(ns = socket.ns(), "dropping invalid packet: {_e}");
            Ok(())
        }
    }
}

/// Handle the engine.io open packet and start the namespace connection
fn on_open(
    socket: &Arc<Socket>,
    open: engineioxide_core::OpenPacket,
) -> Result<(), DisconnectReason> {
    let interval = open.ping_interval();
    if !socket.set_header(open) {
        #[cfg(feature = "tracing")]
        tracing::debug!(ns = socket.ns(), "ignoring duplicate open packet");
        return Ok(());
    }
    #[cfg(feature = "tracing")]
    tracing::debug!(id = socket.id(), ns = socket.ns(), "engine.io session open");
    socket.set_state(ConnectionState::Open);

    let root = socket.raw_ns().is_empty();
    match socket.protocol() {
        ProtocolVersion::V3 => {
            socket.set_heartbeat(tokio::spawn(heartbeat(Arc::downgrade(socket), interval)));
            if root {
                socket.set_state(ConnectionState::NamespaceConnected);
                socket.fire_connect();
                Ok(())
            } else {
                socket.set_state(ConnectionState::NamespaceConnecting);
                send_packet(socket, Packet::connect(socket.raw_ns().clone(), None))
            }
        }
        ProtocolVersion::V4 => {
            socket.set_state(ConnectionState::NamespaceConnecting);
            send_packet(socket, Packet::connect(socket.raw_ns().clone(), socket.auth()))
        }
    }
}

/// With the V3 protocol the client pings the server every `pingInterval`
async fn heartbeat(socket: std::sync::Weak<Socket>, interval: Duration) {
    // A zero period is rejected by tokio
    let interval = interval.max(MIN_PING_INTERVAL);
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    loop {
        interval.tick().await;
        let Some(socket) = socket.upgrade() else {
            break;
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(ns = socket.ns(), "sending ping");
        if socket.send_raw(EPacket::Ping).is_err() || !socket.is_connected() {
            break;
        }
    }
}

async fn on_packet(
    socket: &Arc<Socket>,
    packet: Packet,
    permits: &Arc<Semaphore>,
) -> Result<(), DisconnectReason> {
    if packet.ns != *socket.raw_ns() {
        #[cfg(feature = "tracing")]
        tracing::trace!(ns = packet.ns.as_str(), "dropping packet for another namespace");
        return Ok(());
    }
    match packet.inner {
        PacketData::Connect(data) => {
            socket.on_ns_connect(data);
            Ok(())
        }
        PacketData::Disconnect => Err(DisconnectReason::ServerNsDisconnect),
        PacketData::ConnectError(_data) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(ns = socket.ns(), ?_data, "namespace connection refused");
            Err(DisconnectReason::ConnectError)
        }
        _ => {
            // The semaphore is never closed
            let Ok(permit) = permits.clone().acquire_owned().await else {
                return Ok(());
            };
            let socket = socket.clone();
            tokio::spawn(async move {
                socket.dispatch(packet).await;
                drop(permit);
            });
            Ok(())
        }
    }
}

fn send_packet(socket: &Socket, packet: Packet) -> Result<(), DisconnectReason> {
    match socket.send(packet) {
        Err(SendError::Overflow) => Err(DisconnectReason::Overflow),
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(ns = socket.ns(), "cannot send packet: {_e}");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

fn send_control(socket: &Socket, packet: EPacket) -> Result<(), DisconnectReason> {
    socket
        .send_raw(packet)
        .map_err(|_| DisconnectReason::Overflow)
}

/// Write the queued packets to the transport.
///
/// The sink is flushed only when the queue is drained.
async fn write_loop(socket: Arc<Socket>, mut sink: FrameSink, mut rx: mpsc::Receiver<PacketBuf>) {
    let mut closed = socket.subscribe_closed();
    let res: Result<(), TransportError> = async {
        loop {
            tokio::select! {
                biased;
                packets = rx.recv() => {
                    let Some(packets) = packets else { break };
                    if write_packets(&mut sink, packets).await? {
                        return Ok(());
                    }
                    while let Ok(packets) = rx.try_recv() {
                        if write_packets(&mut sink, packets).await? {
                            return Ok(());
                        }
                    }
                    sink.flush().await?;
                }
                _ = closed.changed() => {
                    // The close packet could not be queued, drain what is left and close.
                    while let Ok(packets) = rx.try_recv() {
                        if write_packets(&mut sink, packets).await? {
                            return Ok(());
                        }
                    }
                    break;
                }
            }
        }
        sink.send(Frame::from(EPacket::Close)).await?;
        sink.close().await
    }
    .await;

    if let Err(_e) = res {
        #[cfg(feature = "tracing")]
        tracing::debug!(ns = socket.ns(), "transport write error: {_e}");
        socket.close_with(DisconnectReason::TransportError);
    }
}

/// Feed packets to the sink. Returns `true` once the close packet is written and the sink closed.
async fn write_packets(sink: &mut FrameSink, packets: PacketBuf) -> Result<bool, TransportError> {
    for packet in packets {
        match packet {
            // A Noop packet is never meaningful on a websocket connection
            EPacket::Noop => {}
            EPacket::Close => {
                sink.send(Frame::from(EPacket::Close)).await?;
                sink.close().await?;
                return Ok(true);
            }
            packet => sink.feed(Frame::from(packet)).await?,
        }
    }
    Ok(false)
}
