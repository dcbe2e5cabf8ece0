use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    MAX_LENGTH_DIGITS,
    error::{EncodeError, PayloadError},
    packet::{BinarySupport, Encoded, Packet, PacketCodec},
};

const TEXT_FLAG: u8 = 0x00;
const BINARY_FLAG: u8 = 0x01;
const LENGTH_END: u8 = 0xFF;

const CODEC: PacketCodec = PacketCodec {
    binary: BinarySupport::Binary,
    utf8: false,
};

pub(super) fn encode(packets: &[Packet]) -> Result<Bytes, EncodeError> {
    let mut buf = BytesMut::new();
    for packet in packets {
        let (flag, unit) = match CODEC.encode(packet)? {
            Encoded::Text(text) => (TEXT_FLAG, Bytes::from(text)),
            Encoded::Binary(bytes) => (BINARY_FLAG, bytes),
        };

        buf.put_u8(flag);
        // each decimal digit is its own byte value, not ASCII
        for digit in unit.len().to_string().bytes() {
            buf.put_u8(digit - b'0');
        }
        buf.put_u8(LENGTH_END);
        buf.put_slice(&unit);
    }
    Ok(buf.freeze())
}

pub(super) fn decode(data: &Bytes) -> Result<Vec<Packet>, PayloadError> {
    let mut packets = Vec::new();
    let mut at = 0;
    while at < data.len() {
        let is_text = match data[at] {
            TEXT_FLAG => true,
            BINARY_FLAG => false,
            other => return Err(PayloadError::InvalidFlag(other)),
        };
        at += 1;

        let (len, digits) = read_length(&data[at..])?;
        at += digits + 1;

        let available = data.len() - at;
        if available < len {
            return Err(PayloadError::Truncated {
                expected: len,
                available,
            });
        }
        let unit = data.slice(at..at + len);
        at += len;

        let packet = if is_text {
            match std::str::from_utf8(&unit) {
                Ok(text) => CODEC.decode_text(text),
                Err(_) => Packet::parser_error(),
            }
        } else {
            CODEC.decode_binary(&unit)
        };
        if packet.is_error() {
            return Err(PayloadError::CorruptPacket {
                index: packets.len(),
            });
        }
        packets.push(packet);
    }
    Ok(packets)
}

// reads digit bytes up to the 0xFF terminator; returns the length and the
// number of digits
fn read_length(data: &[u8]) -> Result<(usize, usize), PayloadError> {
    let mut len: u64 = 0;
    for (i, &b) in data.iter().enumerate() {
        if b == LENGTH_END {
            if i == 0 {
                return Err(PayloadError::InvalidLength);
            }
            let len = u32::try_from(len).map_err(|_| PayloadError::InvalidLength)?;
            return Ok((len as usize, i));
        }
        if i == MAX_LENGTH_DIGITS {
            return Err(PayloadError::LengthTooLong {
                max: MAX_LENGTH_DIGITS,
            });
        }
        if b > 9 {
            return Err(PayloadError::InvalidLength);
        }
        len = len * 10 + u64::from(b);
    }
    Err(PayloadError::InvalidLength)
}
