use bytes::Bytes;

use super::{
    Frame, Opcode,
    decode::{PartialFrame, ReaderState, advance},
    frame::MAX_HEADER_LEN,
};
use crate::{MAX_FRAME_PAYLOAD, MAX_MESSAGE_SIZE, cursor::ByteCursor, error::FrameError};

type Result<T> = std::result::Result<T, FrameError>;

/// Limits for one [`FrameStream`].
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Largest payload a single frame may declare.
    pub max_payload: usize,
    /// Cursor capacity. Must hold one partial frame plus one read's worth of
    /// bytes behind it.
    pub capacity: usize,
}

impl StreamConfig {
    /// Capacity sized for `max_payload` frames fed in `MAX_FRAME_PAYLOAD` reads,
    /// saturating at `usize::MAX`.
    #[must_use]
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self {
            max_payload,
            capacity: max_payload
                .saturating_add(MAX_HEADER_LEN)
                .saturating_add(MAX_FRAME_PAYLOAD),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self { Self::with_max_payload(MAX_MESSAGE_SIZE) }
}

/// Decoding state for one inbound byte stream.
///
/// Owns the [`ByteCursor`] the bytes are written into and the reader state of
/// the frame in progress, so a frame split across any number of reads is
/// resumed rather than re-parsed. Frames come out in arrival order.
///
/// Any error is fatal to the stream; the owner should drop it and close the
/// connection.
#[derive(Debug)]
pub struct FrameStream {
    cursor: ByteCursor,
    state: ReaderState,
    frame: PartialFrame,
    max_payload: usize,
}

impl Default for FrameStream {
    fn default() -> Self { Self::new() }
}

impl FrameStream {
    #[must_use]
    pub fn new() -> Self { Self::with_config(StreamConfig::default()) }

    #[must_use]
    pub fn with_config(config: StreamConfig) -> Self {
        Self {
            cursor: ByteCursor::allocate(config.capacity),
            state: ReaderState::FixedHeader,
            frame: PartialFrame::starting_at(0),
            max_payload: config.max_payload,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) -> Result<()> { Ok(self.cursor.write(bytes)?) }

    pub fn push_bytes(&mut self, bytes: Bytes) -> Result<()> {
        Ok(self.cursor.write_bytes(bytes)?)
    }

    /// The stage the frame in progress is waiting in.
    #[must_use]
    pub fn state(&self) -> ReaderState { self.state }

    /// Bytes held that no emitted frame has consumed yet.
    #[must_use]
    pub fn pending(&self) -> usize { self.cursor.retained() }

    /// Returns the next complete frame, or `None` until more bytes are pushed.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let t = advance(self.state, &self.cursor, &mut self.frame)?;
        self.state = t.state;
        self.validate()?;

        if !t.is_complete() {
            tracing::trace!(state = ?t.state, missing = t.leftover.unsigned_abs(), "frame incomplete");
            return Ok(None);
        }

        let end = self.frame.end();
        let done = std::mem::replace(&mut self.frame, PartialFrame::starting_at(end));
        self.state = ReaderState::FixedHeader;
        self.cursor.discard(end);

        let frame = Frame {
            fin: done.fin,
            opcode: Opcode::try_from(done.opcode)?,
            mask_key: done.mask_key,
            payload: done.payload.unwrap_or_default(),
        };
        tracing::trace!(
            opcode = ?frame.opcode,
            fin = frame.fin,
            payload_len = frame.payload.len(),
            masked = frame.masked(),
            leftover = t.leftover,
            "frame decoded"
        );
        Ok(Some(frame))
    }

    /// Decodes every frame currently complete.
    pub fn drain(&mut self) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    // header checks, applied as soon as the fields they need are known
    fn validate(&self) -> Result<()> {
        if self.state == ReaderState::FixedHeader {
            return Ok(());
        }
        let f = &self.frame;

        if f.rsv != 0 {
            tracing::warn!(rsv = f.rsv, "reserved bits set");
            return Err(FrameError::ReservedBits(f.rsv));
        }
        let opcode = Opcode::try_from(f.opcode).inspect_err(|_| {
            tracing::warn!(opcode = f.opcode, "unknown opcode");
        })?;

        let Some(len) = f.payload_len else {
            return Ok(());
        };
        if opcode.is_control() && (!f.fin || len > 125) {
            tracing::warn!(?opcode, fin = f.fin, len, "invalid control frame");
            return Err(FrameError::InvalidControlFrame);
        }
        if len > self.max_payload as u64 {
            tracing::warn!(len, max = self.max_payload, "frame payload too large");
            return Err(FrameError::PayloadTooLarge {
                len,
                max: self.max_payload,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use paste::paste;
    use proptest::{collection::vec, prelude::*};

    use super::*;
    use crate::error::CursorError;

    fn opcode_strategy() -> impl Strategy<Value = Opcode> {
        prop_oneof![
            Just(Opcode::Text),
            Just(Opcode::Binary),
            Just(Opcode::Continuation),
            Just(Opcode::Ping),
            Just(Opcode::Pong),
            Just(Opcode::Close),
        ]
    }

    fn frame_strategy(max_data_len: usize) -> impl Strategy<Value = Frame> {
        (opcode_strategy(), any::<bool>(), any::<Option<[u8; 4]>>()).prop_flat_map(
            move |(opcode, fin, mask_key)| {
                let max_len = if opcode.is_control() { 125 } else { max_data_len };
                vec(any::<u8>(), 0..=max_len).prop_map(move |payload| Frame {
                    fin: fin || opcode.is_control(),
                    opcode,
                    mask_key,
                    payload: payload.into(),
                })
            },
        )
    }

    fn decode_all(bytes: &[u8]) -> Vec<Frame> {
        let mut stream = FrameStream::new();
        stream.push(bytes).unwrap();
        stream.drain().unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn decode_inverts_encode(frame in frame_strategy(70_000)) {
            prop_assert_eq!(decode_all(&frame.encode()), vec![frame]);
        }

        #[test]
        fn masked_payload_is_wire_xor_key(payload in vec(any::<u8>(), 0..512), key in any::<[u8; 4]>()) {
            let wire = Frame::binary(payload.clone()).with_mask(key).encode();
            let body = &wire[wire.len() - payload.len()..];
            let decoded = decode_all(&wire).remove(0);
            prop_assert_eq!(decoded.mask_key, Some(key));
            for (i, b) in decoded.payload.iter().enumerate() {
                prop_assert_eq!(*b, body[i] ^ key[i % 4]);
            }
            prop_assert_eq!(&decoded.payload[..], &payload[..]);
        }

        #[test]
        fn one_byte_at_a_time(frames in vec(frame_strategy(300), 1..4)) {
            let wire: Vec<u8> = frames.iter().flat_map(|f| f.encode()).collect();
            let mut stream = FrameStream::new();
            let mut got = Vec::new();
            for b in &wire {
                stream.push(&[*b]).unwrap();
                got.extend(stream.drain().unwrap());
            }
            prop_assert_eq!(stream.pending(), 0);
            prop_assert_eq!(got, frames);
        }

        #[test]
        fn arbitrary_bytes_never_panic(buf in vec(any::<u8>(), 0..2048)) {
            let mut stream = FrameStream::new();
            stream.push(&buf).unwrap();
            while let Ok(Some(_)) = stream.next_frame() {}
        }
    }

    macro_rules! length_width {
        ($($len:literal => $header:literal),* $(,)?) => {
            $(paste! {
                #[test]
                fn [<length_ $len _uses_ $header _byte_header>]() {
                    let frame = Frame::binary(vec![0x5A; $len]);
                    let wire = frame.encode();
                    assert_eq!(wire.len(), $header + $len);
                    let len7 = wire[1] & 0x7F;
                    match $header {
                        2 => assert_eq!(usize::from(len7), $len),
                        4 => assert_eq!(len7, 126),
                        _ => assert_eq!(len7, 127),
                    }
                    assert_eq!(decode_all(&wire), vec![frame]);
                }
            })*
        };
    }

    length_width!(0 => 2, 125 => 2, 126 => 4, 65535 => 4, 65536 => 10);

    #[test]
    fn split_reads_resume() {
        let a = Frame::text("first").with_mask([1, 2, 3, 4]);
        let b = Frame::binary(vec![7; 300]);
        let wire = [a.encode(), b.encode()].concat();

        let mut stream = FrameStream::new();
        stream.push(&wire[..1]).unwrap();
        assert_eq!(stream.next_frame().unwrap(), None);
        assert_eq!(stream.state(), ReaderState::FixedHeader);

        stream.push(&wire[1..4]).unwrap();
        assert_eq!(stream.next_frame().unwrap(), None);
        assert_eq!(stream.state(), ReaderState::MaskKey);

        // all of `a` and three header bytes of `b`
        stream.push(&wire[4..14]).unwrap();
        assert_eq!(stream.next_frame().unwrap(), Some(a));
        assert_eq!(stream.next_frame().unwrap(), None);
        assert_eq!(stream.state(), ReaderState::ExtendedLength);

        stream.push(&wire[14..]).unwrap();
        assert_eq!(stream.next_frame().unwrap(), Some(b));
        assert_eq!(stream.pending(), 0);
    }

    #[test]
    fn rejects_reserved_bits() {
        let mut stream = FrameStream::new();
        stream.push(&[0xC1, 0x00]).unwrap();
        assert_eq!(stream.next_frame(), Err(FrameError::ReservedBits(0b100)));
    }

    #[test]
    fn rejects_unknown_opcode() {
        let mut stream = FrameStream::new();
        stream.push(&[0x83, 0x00]).unwrap();
        assert_eq!(stream.next_frame(), Err(FrameError::UnknownOpcode(3)));
    }

    #[test]
    fn rejects_fragmented_control() {
        let mut stream = FrameStream::new();
        stream.push(&[0x09, 0x00]).unwrap();
        assert_eq!(stream.next_frame(), Err(FrameError::InvalidControlFrame));
    }

    #[test]
    fn rejects_oversized_declared_length_before_payload_arrives() {
        let mut stream = FrameStream::with_config(StreamConfig::with_max_payload(1024));
        stream.push(&[0x82, 126, 0x08, 0x00]).unwrap();
        assert_eq!(
            stream.next_frame(),
            Err(FrameError::PayloadTooLarge { len: 2048, max: 1024 })
        );
    }

    #[test]
    fn huge_max_payload_saturates_capacity() {
        let config = StreamConfig::with_max_payload(usize::MAX);
        assert_eq!(config.capacity, usize::MAX);

        let frame = Frame::binary(vec![1; MAX_FRAME_PAYLOAD + 1]);
        let mut stream = FrameStream::with_config(config);
        stream.push(&frame.encode()).unwrap();
        assert_eq!(stream.next_frame().unwrap(), Some(frame));
    }

    #[test]
    fn push_beyond_capacity_fails() {
        let mut stream = FrameStream::with_config(StreamConfig {
            max_payload: 16,
            capacity: 8,
        });
        assert_eq!(
            stream.push(&[0; 9]),
            Err(FrameError::Cursor(CursorError::CapacityExceeded {
                requested: 9,
                capacity: 8,
            }))
        );
    }
}
