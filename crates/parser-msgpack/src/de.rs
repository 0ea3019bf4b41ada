use bytes::Bytes;
use serde::Deserialize;
use socketioxide_core::{
    packet::{Packet, PacketData, normalize_ns},
    parser::ParseError,
    value::PayloadValue,
};

/// The record sent in a binary frame.
/// Unknown keys are ignored, some implementations omit `data` or send a `null` id.
#[derive(Deserialize)]
struct RawRecord {
    r#type: u8,
    #[serde(default)]
    nsp: Option<String>,
    #[serde(default)]
    data: Option<PayloadValue>,
    #[serde(default)]
    id: Option<i64>,
}

/// Deserialize a packet record.
/// Returns the packet and the number of attachments referenced by its placeholders.
pub fn deserialize_packet(buff: Bytes) -> Result<(Packet, usize), ParseError> {
    let raw: RawRecord = rmp_serde::from_slice(&buff)
        .map_err(|e| ParseError::Deserialize(e.to_string()))?;

    let data = raw.data;
    let ns = normalize_ns(raw.nsp.unwrap_or_default());
    let inner = match raw.r#type {
        0 => PacketData::Connect(data),
        1 => PacketData::Disconnect,
        2 => PacketData::Event(data.unwrap_or_default(), raw.id),
        3 => PacketData::EventAck(
            data.unwrap_or_default(),
            raw.id.ok_or(ParseError::InvalidAckId)?,
        ),
        4 => PacketData::ConnectError(data.unwrap_or_default()),
        5 => PacketData::BinaryEvent(data.unwrap_or_default(), raw.id),
        6 => PacketData::BinaryAck(
            data.unwrap_or_default(),
            raw.id.ok_or(ParseError::InvalidAckId)?,
        ),
        _ => return Err(ParseError::InvalidPacketType),
    };
    let packet = Packet { inner, ns };
    let attachments = packet.attachments_count();
    Ok((packet, attachments))
}
