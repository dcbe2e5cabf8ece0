use base64::engine::{Engine, general_purpose::STANDARD as BASE64};
use bytes::{BufMut, Bytes, BytesMut};

use super::{Encoded, Packet, PacketData, PacketType, utf8};
use crate::error::EncodeError;

type Result<T> = std::result::Result<T, EncodeError>;

/// Whether the active transport can carry raw binary units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinarySupport {
    /// Binary data goes out as `[type index] ++ data`.
    #[default]
    Binary,
    /// Binary data goes out as text: `"b" ++ type digit ++ base64(data)`.
    Base64,
}

/// Encodes and decodes single packets for one transport.
///
/// `utf8` runs text data through the [`utf8`] byte-string transform on the
/// way out and the whole text unit back through it on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketCodec {
    pub binary: BinarySupport,
    pub utf8: bool,
}

impl PacketCodec {
    #[must_use]
    pub fn new(binary: BinarySupport) -> Self {
        Self {
            binary,
            utf8: false,
        }
    }

    #[must_use]
    pub fn with_utf8(mut self, utf8: bool) -> Self {
        self.utf8 = utf8;
        self
    }

    pub fn encode(&self, packet: &Packet) -> Result<Encoded> {
        if packet.is_error() {
            return Err(EncodeError::ErrorSentinel);
        }

        let encoded = match (&packet.data, self.binary) {
            (Some(PacketData::Binary(data)), BinarySupport::Binary) => {
                let mut buf = BytesMut::with_capacity(1 + data.len());
                buf.put_u8(packet.kind.index());
                buf.put_slice(data);
                Encoded::Binary(buf.freeze())
            }
            _ => Encoded::Text(self.encode_text(packet)?),
        };

        tracing::trace!(kind = packet.kind.name(), len = encoded.len(), binary = encoded.is_binary(), "packet encoded");
        Ok(encoded)
    }

    /// Encodes to a string whatever the data is, base64-ing binary data.
    pub fn encode_text(&self, packet: &Packet) -> Result<String> {
        if packet.is_error() {
            return Err(EncodeError::ErrorSentinel);
        }

        let mut out = String::new();
        match &packet.data {
            Some(PacketData::Binary(data)) => {
                out.push('b');
                out.push(packet.kind.digit());
                out.push_str(&BASE64.encode(data));
            }
            Some(PacketData::Text(text)) => {
                out.push(packet.kind.digit());
                if self.utf8 {
                    out.push_str(&utf8::encode(text));
                } else {
                    out.push_str(text);
                }
            }
            None => out.push(packet.kind.digit()),
        }
        Ok(out)
    }

    pub fn decode(&self, encoded: &Encoded) -> Packet {
        match encoded {
            Encoded::Text(text) => self.decode_text(text),
            Encoded::Binary(bytes) => self.decode_binary(bytes),
        }
    }

    /// Decodes a text unit. Anything malformed yields
    /// [`Packet::parser_error`].
    pub fn decode_text(&self, data: &str) -> Packet {
        if let Some(rest) = data.strip_prefix('b') {
            return decode_base64(rest);
        }

        let transformed;
        let data = if self.utf8 {
            match utf8::decode(data) {
                Ok(s) => {
                    transformed = s;
                    transformed.as_str()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "packet is not a valid byte string");
                    return Packet::parser_error();
                }
            }
        } else {
            data
        };

        let mut chars = data.chars();
        let Some(kind) = chars.next().and_then(PacketType::from_digit) else {
            tracing::warn!(first = ?data.chars().next(), "unknown packet type");
            return Packet::parser_error();
        };

        let rest = chars.as_str();
        let packet = if rest.is_empty() {
            Packet::new(kind)
        } else {
            Packet::text(kind, rest)
        };
        tracing::trace!(kind = kind.name(), len = rest.len(), "packet decoded");
        packet
    }

    /// Decodes a binary unit: type index, then the raw data.
    ///
    /// The packet data shares `data`'s storage.
    #[allow(clippy::unused_self)]
    pub fn decode_binary(&self, data: &Bytes) -> Packet {
        let Some(kind) = data.first().copied().and_then(PacketType::from_index) else {
            tracing::warn!(first = ?data.first(), "unknown binary packet type");
            return Packet::parser_error();
        };
        tracing::trace!(kind = kind.name(), len = data.len() - 1, "binary packet decoded");
        Packet::binary(kind, data.slice(1..))
    }
}

// rest of a text unit after its "b" prefix
fn decode_base64(rest: &str) -> Packet {
    let mut chars = rest.chars();
    let Some(kind) = chars.next().and_then(PacketType::from_digit) else {
        tracing::warn!("unknown base64 packet type");
        return Packet::parser_error();
    };
    match BASE64.decode(chars.as_str()) {
        Ok(data) => Packet::binary(kind, data),
        Err(e) => {
            tracing::warn!(error = %e, "invalid base64 packet data");
            Packet::parser_error()
        }
    }
}
