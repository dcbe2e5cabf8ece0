use bytes::{Bytes, BytesMut};

use super::mask;
use crate::{cursor::ByteCursor, error::CursorError};

type Result<T> = std::result::Result<T, CursorError>;

/// The decoding stage that runs next for the frame in progress.
///
/// Stages only move forward. A stage that is short of bytes leaves the state
/// where it is so the same call can be repeated once more bytes arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// FIN, RSV, opcode, MASK and the 7-bit length.
    FixedHeader,
    /// 16 or 64-bit big-endian length, when the 7-bit length is 126 or 127.
    ExtendedLength,
    MaskKey,
    PayloadBody,
    /// No reader left to run; the frame is complete.
    Complete,
}

/// Outcome of [`advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: ReaderState,
    /// Bytes written past what the frame has needed so far.
    ///
    /// Negative when `state` is starved: it is then minus the number of bytes
    /// still missing for that stage. Once `state` is [`ReaderState::Complete`]
    /// it is the count of bytes after the frame, where the next frame starts.
    pub leftover: i64,
}

impl Transition {
    #[must_use]
    pub fn is_complete(&self) -> bool { self.state == ReaderState::Complete }
}

/// Accumulation state of the frame being decoded.
///
/// Fields fill in stage by stage; `payload_len` is only set once any extended
/// length has been read and `mask_key` once all four key bytes have.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialFrame {
    start: usize,
    consumed: usize,
    pub(crate) fin: bool,
    pub(crate) rsv: u8,
    pub(crate) opcode: u8,
    pub(crate) masked: bool,
    len7: u8,
    pub(crate) payload_len: Option<u64>,
    pub(crate) mask_key: Option<[u8; 4]>,
    pub(crate) payload: Option<Bytes>,
}

impl PartialFrame {
    /// A frame whose first header byte sits at absolute cursor offset `start`.
    #[must_use]
    pub fn starting_at(start: usize) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn start(&self) -> usize { self.start }

    /// Bytes of this frame read so far.
    #[must_use]
    pub fn consumed(&self) -> usize { self.consumed }

    /// Absolute offset one past the last byte read for this frame.
    #[must_use]
    pub fn end(&self) -> usize { self.start + self.consumed }

    #[must_use]
    pub fn payload_len(&self) -> Option<u64> { self.payload_len }

    #[must_use]
    pub fn masked(&self) -> bool { self.masked }

    #[must_use]
    pub fn mask_key(&self) -> Option<[u8; 4]> { self.mask_key }

    // width of the bytes `state` needs before it can decide anything
    fn stage_width(&self, state: ReaderState) -> u64 {
        match state {
            ReaderState::FixedHeader => 2,
            ReaderState::ExtendedLength if self.len7 == 126 => 2,
            ReaderState::ExtendedLength => 8,
            ReaderState::MaskKey => 4,
            ReaderState::PayloadBody => self.payload_len.unwrap_or(0),
            ReaderState::Complete => 0,
        }
    }

    // stage that follows once the length is known
    fn after_length(&self) -> ReaderState {
        if self.masked {
            ReaderState::MaskKey
        } else {
            self.after_mask()
        }
    }

    fn after_mask(&self) -> ReaderState {
        if self.payload_len == Some(0) {
            ReaderState::Complete
        } else {
            ReaderState::PayloadBody
        }
    }
}

/// Runs stages from `state` for as long as `cursor` holds enough bytes.
///
/// Every stage measures availability from the frame's first byte, so calling
/// again with the returned state after more bytes were written picks up
/// exactly where the previous call stopped. Feeding a frame one byte at a time
/// yields the same frame as feeding it whole.
///
/// Never rejects a frame: the only non-error outcomes are "complete" and
/// "need more". An error means the cursor no longer holds the frame's bytes.
pub fn advance(
    mut state: ReaderState,
    cursor: &ByteCursor,
    frame: &mut PartialFrame,
) -> Result<Transition> {
    loop {
        let available = cursor.remaining(frame.start);
        let needed = (frame.consumed as u64).saturating_add(frame.stage_width(state));
        let leftover = leftover(available, needed);
        if leftover < 0 || state == ReaderState::Complete {
            return Ok(Transition { state, leftover });
        }

        let at = frame.end();
        let next = match state {
            ReaderState::FixedHeader => {
                let [b0, b1] = cursor.read_array::<2>(at)?;
                // 0   | 1 2 3 | 4 5 6 7
                // Fin | Rsv   | Opcode
                frame.fin = b0 & 0b1000_0000 != 0;
                frame.rsv = (b0 >> 4) & 0b111;
                frame.opcode = b0 & 0b1111;
                // 0    | 1 2 3 4 5 6 7
                // Mask | Payload len
                frame.masked = b1 & 0b1000_0000 != 0;
                frame.len7 = b1 & 0b0111_1111;
                frame.consumed += 2;

                if frame.len7 >= 126 {
                    ReaderState::ExtendedLength
                } else {
                    frame.payload_len = Some(u64::from(frame.len7));
                    frame.after_length()
                }
            }
            ReaderState::ExtendedLength => {
                let len = if frame.len7 == 126 {
                    frame.consumed += 2;
                    u64::from(cursor.read_u16_be(at)?)
                } else {
                    frame.consumed += 8;
                    cursor.read_u64_be(at)?
                };
                frame.payload_len = Some(len);
                frame.after_length()
            }
            ReaderState::MaskKey => {
                frame.mask_key = Some(cursor.read_array::<4>(at)?);
                frame.consumed += 4;
                frame.after_mask()
            }
            ReaderState::PayloadBody => {
                // needed <= available, so the length fits in usize
                let len = usize::try_from(frame.stage_width(state)).unwrap_or(usize::MAX);
                let raw = cursor.read_range(at, len)?;
                frame.payload = Some(match frame.mask_key {
                    Some(key) => {
                        let mut buf = BytesMut::from(&raw[..]);
                        mask(&mut buf, key);
                        buf.freeze()
                    }
                    None => raw,
                });
                frame.consumed += len;
                ReaderState::Complete
            }
            ReaderState::Complete => unreachable!("returned above"),
        };

        tracing::trace!(from = ?state, to = ?next, at, "reader transition");
        state = next;
    }
}

fn leftover(available: usize, needed: u64) -> i64 {
    let diff = i128::from(available as u64) - i128::from(needed);
    i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(bytes: &[u8]) -> ByteCursor {
        let mut c = ByteCursor::allocate(1 << 20);
        c.write(bytes).unwrap();
        c
    }

    #[test]
    fn empty_cursor_starves_fixed_header() {
        let c = cursor(&[]);
        let mut frame = PartialFrame::starting_at(0);
        let t = advance(ReaderState::FixedHeader, &c, &mut frame).unwrap();
        assert_eq!(
            t,
            Transition {
                state: ReaderState::FixedHeader,
                leftover: -2,
            }
        );
        assert_eq!(frame.consumed(), 0);
    }

    #[test]
    fn short_frame_completes_in_one_call() {
        let c = cursor(&[0x81, 0x02, b'h', b'i', 0x89]);
        let mut frame = PartialFrame::starting_at(0);
        let t = advance(ReaderState::FixedHeader, &c, &mut frame).unwrap();
        assert!(t.is_complete());
        assert_eq!(t.leftover, 1);
        assert_eq!(frame.payload.as_deref(), Some(&b"hi"[..]));
        assert_eq!(frame.end(), 4);
    }

    #[test]
    fn zero_length_skips_payload_body() {
        let c = cursor(&[0x8A, 0x00]);
        let mut frame = PartialFrame::starting_at(0);
        let t = advance(ReaderState::FixedHeader, &c, &mut frame).unwrap();
        assert!(t.is_complete());
        assert_eq!(t.leftover, 0);
        assert_eq!(frame.payload, None);
    }

    #[test]
    fn masked_zero_length_still_reads_key() {
        let c = cursor(&[0x89, 0x80, 1, 2]);
        let mut frame = PartialFrame::starting_at(0);
        let t = advance(ReaderState::FixedHeader, &c, &mut frame).unwrap();
        assert_eq!(t.state, ReaderState::MaskKey);
        assert_eq!(t.leftover, -2);
        assert_eq!(frame.mask_key(), None);
    }

    #[test]
    fn extended_length_waits_for_all_bytes() {
        let c = cursor(&[0x82, 127, 0, 0, 0]);
        let mut frame = PartialFrame::starting_at(0);
        let t = advance(ReaderState::FixedHeader, &c, &mut frame).unwrap();
        assert_eq!(t.state, ReaderState::ExtendedLength);
        assert_eq!(t.leftover, -5);
        assert_eq!(frame.payload_len(), None);
    }

    #[test]
    fn payload_shortfall_is_reported() {
        let c = cursor(&[0x82, 126, 0x01, 0x00, 0xAA]);
        let mut frame = PartialFrame::starting_at(0);
        let t = advance(ReaderState::FixedHeader, &c, &mut frame).unwrap();
        assert_eq!(t.state, ReaderState::PayloadBody);
        assert_eq!(t.leftover, 1 - 256);
        assert_eq!(frame.payload_len(), Some(256));
    }

    #[test]
    fn resumes_from_later_frame_start() {
        let c = cursor(&[0x81, 0x01, b'a', 0x81, 0x01, b'b']);
        let mut frame = PartialFrame::starting_at(3);
        let t = advance(ReaderState::FixedHeader, &c, &mut frame).unwrap();
        assert!(t.is_complete());
        assert_eq!(frame.payload.as_deref(), Some(&b"b"[..]));
    }

    #[test]
    fn huge_declared_length_does_not_overflow() {
        let c = cursor(&[0x82, 127, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        let mut frame = PartialFrame::starting_at(0);
        let t = advance(ReaderState::FixedHeader, &c, &mut frame).unwrap();
        assert_eq!(t.state, ReaderState::PayloadBody);
        assert_eq!(t.leftover, i64::MIN);
        assert_eq!(frame.payload_len(), Some(u64::MAX));
    }
}
