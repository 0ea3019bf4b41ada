use std::borrow::Cow;

use rmp::encode;
use socketioxide_core::{
    packet::{Packet, PacketData},
    parser::ParseError,
    value::PayloadValue,
};

/// Manual packet serialization.
///
/// The record is a map `{ type, nsp, data?, id? }`.
/// Binary leaves are replaced by placeholders and returned as attachments.
pub fn serialize_packet(packet: Packet) -> Result<(Vec<u8>, Vec<bytes::Bytes>), ParseError> {
    let inner = packet.inner.into_binary_if_needed();
    let index = inner.index();
    let (data, id, bins) = match inner {
        PacketData::Connect(data) => (data, None, Vec::new()),
        PacketData::Disconnect => (None, None, Vec::new()),
        PacketData::Event(data, id) => (Some(data), id, Vec::new()),
        PacketData::EventAck(data, id) => (Some(data), Some(id), Vec::new()),
        PacketData::ConnectError(data) => (Some(data), None, Vec::new()),
        PacketData::BinaryEvent(mut data, id) => {
            let bins = data.deconstruct();
            (Some(data), id, bins)
        }
        PacketData::BinaryAck(mut data, id) => {
            let bins = data.deconstruct();
            (Some(data), Some(id), bins)
        }
    };

    let mut buff = Vec::with_capacity(32);
    let map_len = 2 + data.is_some() as u32 + id.is_some() as u32;
    encode::write_map_len(&mut buff, map_len).map_err(ser_err)?;
    encode::write_str(&mut buff, "type").map_err(ser_err)?;
    encode::write_uint(&mut buff, index as u64).map_err(ser_err)?;
    encode::write_str(&mut buff, "nsp").map_err(ser_err)?;
    // The root namespace is written in its `/` form
    let nsp = match packet.ns.as_str() {
        "" => Cow::Borrowed("/"),
        ns if !ns.starts_with('/') => Cow::Owned(format!("/{ns}")),
        ns => Cow::Borrowed(ns),
    };
    encode::write_str(&mut buff, &nsp).map_err(ser_err)?;

    if let Some(data) = data {
        serialize_data(&mut buff, &data)?;
    }
    if let Some(id) = id {
        serialize_id(&mut buff, id)?;
    }
    Ok((buff, bins))
}

fn serialize_data(buff: &mut Vec<u8>, data: &PayloadValue) -> Result<(), ParseError> {
    encode::write_str(buff, "data").map_err(ser_err)?;
    rmp_serde::encode::write_named(buff, data).map_err(ser_err)
}

fn serialize_id(buff: &mut Vec<u8>, id: i64) -> Result<(), ParseError> {
    encode::write_str(buff, "id").map_err(ser_err)?;
    encode::write_sint(buff, id).map_err(ser_err)?;
    Ok(())
}

fn ser_err(err: impl std::fmt::Display) -> ParseError {
    ParseError::Serialize(err.to_string())
}

#[cfg(test)]
mod tests {
    use ::bytes::Bytes;
    use rmp::decode::*;
    use serde_json::json;
    use std::io::Cursor;

    use super::*;

    fn assert_str(reader: &mut Cursor<Vec<u8>>, val: &str) {
        let mut buff = [0; 256];
        assert_eq!(read_str(reader, &mut buff).unwrap(), val);
    }

    #[test]
    fn serialize_packet_event() {
        let mut packet = Packet::event("/test", "test_event", vec![1.into(), 2.into(), 3.into()]);
        packet.inner.set_ack_id(42);
        let (serialized, bins) = serialize_packet(packet).unwrap();
        assert!(bins.is_empty());
        let mut reader = Cursor::new(serialized);

        assert_eq!(read_map_len(&mut reader).unwrap(), 4);
        assert_str(&mut reader, "type");
        assert_eq!(read_int::<usize, _>(&mut reader).unwrap(), 2);
        assert_str(&mut reader, "nsp");
        assert_str(&mut reader, "/test");
        assert_str(&mut reader, "data");

        // Check the event data structure
        assert_eq!(read_array_len(&mut reader).unwrap(), 4);
        assert_str(&mut reader, "test_event");
        assert_eq!(read_int::<u8, _>(&mut reader).unwrap(), 1);
        assert_eq!(read_int::<u8, _>(&mut reader).unwrap(), 2);
        assert_eq!(read_int::<u8, _>(&mut reader).unwrap(), 3);

        // Check the ID
        assert_str(&mut reader, "id");
        assert_eq!(read_int::<usize, _>(&mut reader).unwrap(), 42);
    }

    #[test]
    fn serialize_packet_binary_event() {
        let bin = PayloadValue::Binary(Bytes::from_static(&[1, 2, 3, 4]));
        let mut packet = Packet::event("/binary", "bin_event", vec![1.into(), bin.clone(), bin]);
        packet.inner.set_ack_id(99);
        let (serialized, bins) = serialize_packet(packet).unwrap();
        assert_eq!(bins.len(), 2);
        let mut reader = Cursor::new(serialized);

        assert_eq!(read_map_len(&mut reader).unwrap(), 4);
        assert_str(&mut reader, "type");
        assert_eq!(read_int::<usize, _>(&mut reader).unwrap(), 5);
        assert_str(&mut reader, "nsp");
        assert_str(&mut reader, "/binary");
        assert_str(&mut reader, "data");

        // Check the event data structure, binaries are replaced by placeholders
        assert_eq!(read_array_len(&mut reader).unwrap(), 4);
        assert_str(&mut reader, "bin_event");
        assert_eq!(read_int::<u8, _>(&mut reader).unwrap(), 1);
        for num in 0..2u8 {
            assert_eq!(read_map_len(&mut reader).unwrap(), 2);
            assert_str(&mut reader, "_placeholder");
            assert!(read_bool(&mut reader).unwrap());
            assert_str(&mut reader, "num");
            assert_eq!(read_int::<u8, _>(&mut reader).unwrap(), num);
        }

        // Check the ID
        assert_str(&mut reader, "id");
        assert_eq!(read_int::<usize, _>(&mut reader).unwrap(), 99);
    }

    #[test]
    fn serialize_packet_connect_error() {
        let (serialized, _) = serialize_packet(Packet::connect_error("/", "refused")).unwrap();
        let mut reader = Cursor::new(serialized);
        assert_eq!(read_map_len(&mut reader).unwrap(), 3);
        assert_str(&mut reader, "type");
        assert_eq!(read_int::<usize, _>(&mut reader).unwrap(), 4);
        assert_str(&mut reader, "nsp");
        assert_str(&mut reader, "/");
        assert_str(&mut reader, "data");
        assert_eq!(read_map_len(&mut reader).unwrap(), 1);
        assert_str(&mut reader, "message");
        assert_str(&mut reader, "refused");
    }

    #[test]
    fn serialize_packet_connect_without_auth() {
        let (serialized, _) = serialize_packet(Packet::connect("", None)).unwrap();
        let mut reader = Cursor::new(serialized);
        assert_eq!(read_map_len(&mut reader).unwrap(), 2);

        let (serialized, _) =
            serialize_packet(Packet::connect("", Some(json!({ "a": 1 }).into()))).unwrap();
        let mut reader = Cursor::new(serialized);
        assert_eq!(read_map_len(&mut reader).unwrap(), 3);
    }
}
