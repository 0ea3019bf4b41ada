use bytes::{BufMut, BytesMut};
use socketioxide_core::{
    Str, Value,
    packet::{Packet, PacketData},
    parser::ParseError,
};

/// Serialize a packet to its text head and its binary attachments.
///
/// Events and acks carrying binary leaves are promoted to their binary variant,
/// the leaves are replaced by placeholders and returned as attachments.
pub fn serialize_packet(packet: Packet) -> Result<Value, ParseError> {
    let inner = packet.inner.into_binary_if_needed();
    let index = inner.index();
    let (data, ack, bins) = match inner {
        PacketData::Connect(data) => (data, None, Vec::new()),
        PacketData::Disconnect => (None, None, Vec::new()),
        PacketData::Event(data, ack) => (Some(data), ack, Vec::new()),
        PacketData::EventAck(data, ack) => (Some(data), Some(ack), Vec::new()),
        PacketData::ConnectError(data) => (Some(data), None, Vec::new()),
        PacketData::BinaryEvent(mut data, ack) => {
            let bins = data.deconstruct();
            (Some(data), ack, bins)
        }
        PacketData::BinaryAck(mut data, ack) => {
            let bins = data.deconstruct();
            (Some(data), Some(ack), bins)
        }
    };
    let data = data
        .as_ref()
        .map(serde_json::to_vec)
        .transpose()
        .map_err(|e| ParseError::Serialize(e.to_string()))?;

    let capacity = get_size_hint(&packet.ns, data.as_deref(), ack, bins.len());
    let mut buffer = BytesMut::with_capacity(capacity);
    buffer.put_u8(b'0' + index as u8);
    if index == 5 || index == 6 {
        serialize_attachments(&mut buffer, bins.len());
    }
    serialize_nsp(&mut buffer, &packet.ns);
    serialize_ack(&mut buffer, ack);
    if let Some(data) = data {
        buffer.put_slice(&data);
    }

    // SAFETY: the buffer is only made of ascii chars, the namespace and serialized json
    let output = unsafe { Str::from_bytes_unchecked(buffer.freeze()) };
    Ok(Value::Str(output, (!bins.is_empty()).then_some(bins)))
}

/// Adds binary attachment count prefix for binary packets
fn serialize_attachments(buffer: &mut BytesMut, attachments: usize) {
    let mut itoa_buf = itoa::Buffer::new();
    buffer.put_slice(itoa_buf.format(attachments).as_bytes());
    buffer.put_u8(b'-');
}

/// The root namespace is omitted. Other namespaces are written with
/// a leading slash and a trailing comma.
fn serialize_nsp(buffer: &mut BytesMut, nsp: &str) {
    if !nsp.is_empty() && nsp != "/" {
        if !nsp.starts_with('/') {
            buffer.put_u8(b'/');
        }
        buffer.put_slice(nsp.as_bytes());
        buffer.put_u8(b',');
    }
}

fn serialize_ack(buffer: &mut BytesMut, ack: Option<i64>) {
    if let Some(ack) = ack {
        let mut itoa_buf = itoa::Buffer::new();
        buffer.put_slice(itoa_buf.format(ack).as_bytes());
    }
}

fn get_size_hint(ns: &str, data: Option<&[u8]>, ack: Option<i64>, bins: usize) -> usize {
    const PACKET_INDEX_SIZE: usize = 1;
    const BINARY_PUNCTUATION_SIZE: usize = 1;
    const NS_PUNCTUATION_SIZE: usize = 2;
    const MAX_ACK_SIZE: usize = 20;

    let nsp_size = if ns.is_empty() || ns == "/" {
        0
    } else {
        ns.len() + NS_PUNCTUATION_SIZE
    };
    let bin_size = if bins > 0 {
        bins.checked_ilog10().unwrap_or(0) as usize + 1 + BINARY_PUNCTUATION_SIZE
    } else {
        0
    };
    PACKET_INDEX_SIZE
        + bin_size
        + nsp_size
        + ack.map(|_| MAX_ACK_SIZE).unwrap_or(0)
        + data.map(<[u8]>::len).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use socketioxide_core::value::PayloadValue;

    use super::*;

    fn head(value: &Value) -> &str {
        value.as_str().unwrap()
    }

    #[test]
    fn packet_size_hint() {
        let cases: [(&str, &str, Option<&[u8]>, Option<i64>, usize); 5] = [
            ("0", "", None, None, 0),
            ("1/admin,", "/admin", None, None, 0),
            ("2/admin,54[1]", "/admin", Some(b"[1]"), Some(54), 0),
            ("312345678[]", "/", Some(b"[]"), Some(12345678), 0),
            ("512-/a,1[]", "/a", Some(b"[]"), Some(1), 12),
        ];
        for (expected, ns, data, ack, bins) in cases {
            assert!(get_size_hint(ns, data, ack, bins) >= expected.len());
        }
    }

    #[test]
    fn serialize_nsp_leading_slash() {
        let mut buffer = BytesMut::new();
        serialize_nsp(&mut buffer, "admin");
        assert_eq!(&buffer[..], b"/admin,");

        let mut buffer = BytesMut::new();
        serialize_nsp(&mut buffer, "/");
        assert!(buffer.is_empty());
    }

    #[test]
    fn serialize_binary_attachments() {
        let packet = Packet::event(
            "/",
            "event",
            vec![
                PayloadValue::Binary(Bytes::from_static(&[1])),
                PayloadValue::Binary(Bytes::from_static(&[2])),
            ],
        );
        let value = serialize_packet(packet).unwrap();
        assert_eq!(
            head(&value),
            r#"52-["event",{"_placeholder":true,"num":0},{"_placeholder":true,"num":1}]"#
        );
        assert_eq!(
            value.attachments(),
            &[Bytes::from_static(&[1]), Bytes::from_static(&[2])]
        );
    }
}
