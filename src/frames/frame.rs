use bytes::{BufMut, Bytes, BytesMut};

use super::{CloseReason, Opcode, close, mask};

/// Largest possible header: 2 fixed, 8 extended length, 4 mask key.
pub const MAX_HEADER_LEN: usize = 14;

/// One WebSocket frame.
///
/// Decoded frames always hold the unmasked payload; `mask_key` records the
/// key the sender used. When encoding, a `mask_key` makes the frame go out
/// masked with that key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub opcode: Opcode,
    pub mask_key: Option<[u8; 4]>,
    pub payload: Bytes,
}

impl Frame {
    /// An unmasked frame with FIN set.
    pub fn new(opcode: Opcode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin: true,
            opcode,
            mask_key: None,
            payload: payload.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self::new(Opcode::Text, text)
    }

    pub fn binary(payload: impl Into<Bytes>) -> Self { Self::new(Opcode::Binary, payload) }

    pub fn ping(payload: impl Into<Bytes>) -> Self { Self::new(Opcode::Ping, payload) }

    pub fn pong(payload: impl Into<Bytes>) -> Self { Self::new(Opcode::Pong, payload) }

    #[must_use]
    pub fn close(reason: CloseReason, text: &str) -> Self {
        Self::new(Opcode::Close, close::close_payload(reason, text))
    }

    #[must_use]
    pub fn with_fin(mut self, fin: bool) -> Self {
        self.fin = fin;
        self
    }

    #[must_use]
    pub fn with_mask(mut self, mask_key: [u8; 4]) -> Self {
        self.mask_key = Some(mask_key);
        self
    }

    #[must_use]
    pub fn masked(&self) -> bool { self.mask_key.is_some() }

    #[must_use]
    pub fn payload_len(&self) -> u64 { self.payload.len() as u64 }

    /// Close reason and text, for a well formed close frame.
    #[must_use]
    pub fn close_reason(&self) -> Option<(CloseReason, &str)> {
        if self.opcode != Opcode::Close {
            return None;
        }
        close::parse_close_payload(&self.payload)
    }

    /// Bytes of header this frame needs on the wire.
    #[must_use]
    pub fn header_len(&self) -> usize {
        let ext = match self.payload.len() {
            0..=125 => 0,
            126..=0xFFFF => 2,
            _ => 8,
        };
        2 + ext + if self.masked() { 4 } else { 0 }
    }

    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.header_len() + self.payload.len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Appends the wire form of this frame to `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        let len = self.payload.len();
        tracing::trace!(
            opcode = ?self.opcode,
            fin = self.fin,
            len,
            masked = self.masked(),
            "encoding frame"
        );

        buf.reserve(self.header_len() + len);
        buf.put_u8(if self.fin { 0x80 } else { 0 } | self.opcode as u8);

        let mask_bit = if self.masked() { 0x80 } else { 0 };
        #[allow(clippy::cast_possible_truncation)]
        match len {
            0..=125 => buf.put_u8(mask_bit | len as u8),
            126..=0xFFFF => {
                buf.put_u8(mask_bit | 126);
                buf.put_u16(len as u16);
            }
            _ => {
                buf.put_u8(mask_bit | 127);
                buf.put_u64(len as u64);
            }
        }

        match self.mask_key {
            Some(key) => {
                buf.put_slice(&key);
                let start = buf.len();
                buf.put_slice(&self.payload);
                mask(&mut buf[start..], key);
            }
            None => buf.put_slice(&self.payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmasked_text() {
        assert_eq!(
            &Frame::text("Hello").encode()[..],
            &[0x81, 0x05, 0x48, 0x65, 0x6c, 0x6c, 0x6f]
        );
    }

    #[test]
    fn masked_text_matches_rfc() {
        let frame = Frame::text("Hello").with_mask([0x37, 0xfa, 0x21, 0x3d]);
        assert_eq!(
            &frame.encode()[..],
            &[0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58]
        );
    }

    #[test]
    fn fragment_without_fin() {
        let frame = Frame::new(Opcode::Continuation, "lo").with_fin(false);
        assert_eq!(&frame.encode()[..], &[0x00, 0x02, b'l', b'o']);
    }

    #[test]
    fn close_frame_reason() {
        let frame = Frame::close(CloseReason::Policy, "ping timeout");
        assert_eq!(frame.close_reason(), Some((CloseReason::Policy, "ping timeout")));
        assert_eq!(Frame::ping("x").close_reason(), None);
    }
}
