//! Several packets in one transport payload, for transports without their own
//! message framing.
//!
//! Text payloads are `<length>:<packet>` records back to back. Binary payloads
//! are `<flag><length digits><0xFF><packet>` records, where the flag says
//! whether the record holds a text (0) or binary (1) packet and each length
//! digit is its own byte valued 0-9.

mod binary;
mod text;

use std::ops::ControlFlow;

use crate::{
    error::{EncodeError, PayloadError},
    packet::{BinarySupport, Encoded, Packet},
};

/// Framing used to join packets into one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadEncoding {
    Text,
    Binary,
}

impl PayloadEncoding {
    /// The framing a transport with `support` should send.
    #[must_use]
    pub fn for_transport(support: BinarySupport) -> Self {
        match support {
            BinarySupport::Binary => Self::Binary,
            BinarySupport::Base64 => Self::Text,
        }
    }
}

/// Joins `packets` in order.
pub fn encode_payload(packets: &[Packet], encoding: PayloadEncoding) -> Result<Encoded, EncodeError> {
    let encoded = match encoding {
        PayloadEncoding::Text => Encoded::Text(text::encode(packets)?),
        PayloadEncoding::Binary => Encoded::Binary(binary::encode(packets)?),
    };
    tracing::debug!(count = packets.len(), ?encoding, len = encoded.len(), "payload encoded");
    Ok(encoded)
}

/// Splits a payload into its packets, in order.
///
/// The whole payload is validated before anything is returned: one bad
/// record fails the batch.
pub fn decode_payload(payload: &Encoded) -> Result<Vec<Packet>, PayloadError> {
    let decoded = match payload {
        Encoded::Text(data) => text::decode(data),
        Encoded::Binary(data) => binary::decode(data),
    };
    match &decoded {
        Ok(packets) => tracing::debug!(count = packets.len(), "payload decoded"),
        Err(e) => tracing::warn!(error = %e, len = payload.len(), "corrupt payload"),
    }
    decoded
}

/// Calls `f(packet, index, total)` for each packet of `payload`.
///
/// A corrupt payload produces exactly one call,
/// `f(Packet::parser_error(), 0, 1)`. Returning `ControlFlow::Break` stops
/// delivery of the remaining packets.
pub fn decode_payload_with<F>(payload: &Encoded, mut f: F)
where
    F: FnMut(Packet, usize, usize) -> ControlFlow<()>,
{
    match decode_payload(payload) {
        Ok(packets) => {
            let total = packets.len();
            for (index, packet) in packets.into_iter().enumerate() {
                if f(packet, index, total).is_break() {
                    break;
                }
            }
        }
        Err(_) => {
            let _ = f(Packet::parser_error(), 0, 1);
        }
    }
}
