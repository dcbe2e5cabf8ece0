use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};

use super::{Frame, Opcode};
use crate::{MAX_FRAME_PAYLOAD, role::RolePolicy};

/// Encodes outgoing frames for role `R`, masking with a fresh random key
/// whenever `R` is the client.
#[derive(Debug, Clone, Copy)]
pub struct FrameWriter<R: RolePolicy> {
    _role: PhantomData<R>,
}

impl<R: RolePolicy> Default for FrameWriter<R> {
    fn default() -> Self { Self::new() }
}

impl<R: RolePolicy> FrameWriter<R> {
    #[must_use]
    pub fn new() -> Self { Self { _role: PhantomData } }

    /// Splits a message into `MAX_FRAME_PAYLOAD` fragments: the first carries
    /// `opcode`, the rest are continuations, and only the last has FIN set.
    #[must_use]
    pub fn message(&self, opcode: Opcode, payload: &Bytes) -> Vec<Bytes> {
        if payload.is_empty() {
            return vec![self.encode(Frame::new(opcode, Bytes::new()))];
        }

        let count = payload.len().div_ceil(MAX_FRAME_PAYLOAD);
        let mut chunks = Vec::with_capacity(count);
        for (i, start) in (0..payload.len()).step_by(MAX_FRAME_PAYLOAD).enumerate() {
            let end = (start + MAX_FRAME_PAYLOAD).min(payload.len());
            let opcode = if i == 0 { opcode } else { Opcode::Continuation };
            let frame = Frame::new(opcode, payload.slice(start..end)).with_fin(i + 1 == count);
            chunks.push(self.encode(frame));
        }

        tracing::debug!(len = payload.len(), fragments = count, "{} encoded message", R::NAME);
        chunks
    }

    /// Control frames are never fragmented; the payload is cut at 125 bytes.
    #[must_use]
    pub fn control(&self, opcode: Opcode, payload: &[u8]) -> Bytes {
        debug_assert!(opcode.is_control());
        let len = payload.len().min(125);
        self.encode(Frame::new(opcode, Bytes::copy_from_slice(&payload[..len])))
    }

    #[must_use]
    pub fn encode(&self, frame: Frame) -> Bytes {
        let frame = if R::MASK_OUTGOING {
            let mut mask_key = [0; 4];
            rand::fill(&mut mask_key);
            frame.with_mask(mask_key)
        } else {
            frame
        };

        let mut buf = BytesMut::new();
        frame.encode_into(&mut buf);
        buf.freeze()
    }
}
