use crate::{
    error::{EncodeError, PayloadError},
    packet::{BinarySupport, Packet, PacketCodec},
};

// text payloads carry binary data as base64 and text as byte strings
const CODEC: PacketCodec = PacketCodec {
    binary: BinarySupport::Base64,
    utf8: true,
};

pub(super) fn encode(packets: &[Packet]) -> Result<String, EncodeError> {
    let mut out = String::new();
    for packet in packets {
        let unit = CODEC.encode_text(packet)?;
        out.push_str(&unit.chars().count().to_string());
        out.push(':');
        out.push_str(&unit);
    }
    Ok(out)
}

pub(super) fn decode(data: &str) -> Result<Vec<Packet>, PayloadError> {
    if data.is_empty() {
        return Err(PayloadError::Empty);
    }

    let mut packets = Vec::new();
    let mut rest = data;
    while !rest.is_empty() {
        let (len, tail) = rest.split_once(':').ok_or(PayloadError::InvalidLength)?;
        if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PayloadError::InvalidLength);
        }
        let len: usize = len.parse().map_err(|_| PayloadError::InvalidLength)?;

        let (unit, after) = split_chars(tail, len).ok_or_else(|| PayloadError::Truncated {
            expected: len,
            available: tail.chars().count(),
        })?;

        // zero-length records carry nothing and are skipped
        if !unit.is_empty() {
            let packet = CODEC.decode_text(unit);
            if packet.is_error() {
                return Err(PayloadError::CorruptPacket {
                    index: packets.len(),
                });
            }
            packets.push(packet);
        }
        rest = after;
    }
    Ok(packets)
}

// splits after the first `n` chars, if there are that many
fn split_chars(s: &str, n: usize) -> Option<(&str, &str)> {
    match s.char_indices().nth(n) {
        Some((at, _)) => Some(s.split_at(at)),
        None if s.chars().count() == n => Some((s, "")),
        None => None,
    }
}
