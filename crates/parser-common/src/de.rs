use std::io::Cursor;

use bytes::Buf;
use socketioxide_core::{
    Str,
    packet::{Packet, PacketData},
    parser::ParseError,
    value::PayloadValue,
};

/// Deserialize a packet head.
/// Returns the packet and, for binary packets, the number of attachments that follow it.
pub fn deserialize_packet(data: Str) -> Result<(Packet, Option<usize>), ParseError> {
    if data.is_empty() {
        return Err(ParseError::InvalidPacketType);
    }
    // It is possible to parse the packet from a byte slice because separators are only ASCII
    let mut reader = Cursor::new(data.as_str());
    let index = reader.get_u8();
    let index = (b'0'..=b'6')
        .contains(&index)
        .then_some(index)
        .ok_or(ParseError::InvalidPacketType)?;

    let attachments: Option<usize> = if index == b'5' || index == b'6' {
        Some(read_attachments(&mut reader).ok_or(ParseError::InvalidAttachments)?)
    } else {
        None
    };

    // Custom nsps will start with a slash
    let ns = if reader.has_remaining().then(|| reader.chunk()[0]) == Some(b'/') {
        read_nsp(&mut reader, &data)
    } else {
        Str::default()
    };
    let ack = read_ack(&mut reader)?;

    let data = data.slice(reader.position() as usize..);
    let inner = match index {
        b'0' => PacketData::Connect((!data.is_empty()).then(|| read_data(&data))),
        b'1' => PacketData::Disconnect,
        b'2' => PacketData::Event(read_data(&data), ack),
        b'3' => PacketData::EventAck(read_data(&data), ack.ok_or(ParseError::InvalidAckId)?),
        b'4' => PacketData::ConnectError(read_data(&data)),
        b'5' => PacketData::BinaryEvent(read_data(&data), ack),
        b'6' => PacketData::BinaryAck(read_data(&data), ack.ok_or(ParseError::InvalidAckId)?),
        _ => return Err(ParseError::InvalidPacketType),
    };
    Ok((Packet { inner, ns }, attachments))
}

/// A malformed json payload is read as `null`.
fn read_data(data: &str) -> PayloadValue {
    if data.is_empty() {
        return PayloadValue::Null;
    }
    serde_json::from_str(data).unwrap_or_default()
}

fn read_attachments(reader: &mut Cursor<&str>) -> Option<usize> {
    let data = *reader.get_ref();
    let start_index = reader.position() as usize;
    loop {
        match reader.has_remaining().then(|| reader.get_u8()) {
            Some(c) if c.is_ascii_digit() => (),
            Some(b'-') if reader.position() as usize > start_index + 1 => {
                break data[start_index..reader.position() as usize - 1]
                    .parse()
                    .ok();
            }
            _ => break None,
        }
    }
}

/// Read the namespace up to its trailing comma.
/// The `/` root namespace is read as an empty string.
fn read_nsp(reader: &mut Cursor<&str>, data: &Str) -> Str {
    let start_index = reader.position() as usize;
    let ns = loop {
        match reader.has_remaining().then(|| reader.get_u8()) {
            Some(b',') => {
                break data.slice(start_index..reader.position() as usize - 1);
            }
            // Some clients do not end the namespace with a comma
            // if it is the end of the packet, e.g `1/custom`
            None => {
                break data.slice(start_index..reader.position() as usize);
            }
            Some(_) => (),
        }
    };
    if ns == "/" { Str::default() } else { ns }
}

/// Read a full decimal run as the ack id.
fn read_ack(reader: &mut Cursor<&str>) -> Result<Option<i64>, ParseError> {
    let start_index = reader.position() as usize;
    let data = *reader.get_ref();
    while reader.has_remaining() && reader.chunk()[0].is_ascii_digit() {
        reader.advance(1);
    }
    let end_index = reader.position() as usize;
    if end_index == start_index {
        return Ok(None);
    }
    data[start_index..end_index]
        .parse()
        .map(Some)
        .map_err(|_| ParseError::InvalidAckId)
}
