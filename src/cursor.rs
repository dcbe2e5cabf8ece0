use std::collections::VecDeque;

use byteorder::{BigEndian, ByteOrder};
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::CursorError;

type Result<T> = std::result::Result<T, CursorError>;

/// Append-only byte buffer addressed by absolute stream offsets.
///
/// Written bytes are kept as the chunks they arrived in, so reads that fall
/// inside one chunk are zero-copy slices and only reads spanning a chunk
/// boundary copy. Offsets count from the first byte ever written and stay
/// valid across [`discard`](Self::discard).
///
/// `capacity` bounds the retained (written but not yet discarded) bytes. The
/// cursor never grows past it; callers size it for the largest unit they
/// expect to hold.
#[derive(Debug, Default)]
pub struct ByteCursor {
    chunks: VecDeque<Bytes>,
    // absolute offset of chunks[0][0]
    base: usize,
    // absolute offset one past the last written byte
    limit: usize,
    capacity: usize,
}

impl ByteCursor {
    #[must_use]
    pub fn allocate(capacity: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            base: 0,
            limit: 0,
            capacity,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize { self.capacity }

    /// First offset still readable.
    #[must_use]
    pub fn base(&self) -> usize { self.base }

    /// One past the last written offset.
    #[must_use]
    pub fn limit(&self) -> usize { self.limit }

    #[must_use]
    pub fn retained(&self) -> usize { self.limit - self.base }

    /// Bytes available at and after `from`.
    #[must_use]
    pub fn remaining(&self, from: usize) -> usize { self.limit.saturating_sub(from) }

    /// Appends a copy of `bytes`.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_bytes(Bytes::copy_from_slice(bytes))
    }

    /// Appends `bytes` as a new chunk without copying.
    pub fn write_bytes(&mut self, bytes: Bytes) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        let requested = self.retained() + bytes.len();
        if requested > self.capacity {
            tracing::warn!(requested, capacity = self.capacity, "cursor capacity exceeded");
            return Err(CursorError::CapacityExceeded {
                requested,
                capacity: self.capacity,
            });
        }

        self.limit += bytes.len();
        self.chunks.push_back(bytes);
        Ok(())
    }

    pub fn read_at(&self, offset: usize) -> Result<u8> {
        self.check(offset, 1)?;
        let (idx, pos) = self.locate(offset);
        Ok(self.chunks[idx][pos])
    }

    /// Returns `len` bytes starting at `offset`.
    ///
    /// A range inside a single chunk shares that chunk's storage.
    pub fn read_range(&self, offset: usize, len: usize) -> Result<Bytes> {
        self.check(offset, len)?;
        if len == 0 {
            return Ok(Bytes::new());
        }

        let (mut idx, pos) = self.locate(offset);
        let first = &self.chunks[idx];
        if first.len() - pos >= len {
            return Ok(first.slice(pos..pos + len));
        }

        let mut out = BytesMut::with_capacity(len);
        out.put_slice(&first[pos..]);
        while out.len() < len {
            idx += 1;
            let chunk = &self.chunks[idx];
            let take = chunk.len().min(len - out.len());
            out.put_slice(&chunk[..take]);
        }
        Ok(out.freeze())
    }

    pub fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        self.check(offset, N)?;
        let mut out = [0; N];
        let (mut idx, mut pos) = self.locate(offset);
        for b in &mut out {
            while pos == self.chunks[idx].len() {
                idx += 1;
                pos = 0;
            }
            *b = self.chunks[idx][pos];
            pos += 1;
        }
        Ok(out)
    }

    pub fn read_u16_be(&self, offset: usize) -> Result<u16> {
        Ok(BigEndian::read_u16(&self.read_array::<2>(offset)?))
    }

    pub fn read_u64_be(&self, offset: usize) -> Result<u64> {
        Ok(BigEndian::read_u64(&self.read_array::<8>(offset)?))
    }

    /// Releases every byte before `upto`, freeing capacity for new writes.
    pub fn discard(&mut self, upto: usize) {
        let upto = upto.min(self.limit);
        while self.base < upto {
            let Some(front) = self.chunks.front_mut() else {
                break;
            };
            let n = front.len().min(upto - self.base);
            if n == front.len() {
                self.chunks.pop_front();
            } else {
                front.advance(n);
            }
            self.base += n;
        }
    }

    fn check(&self, offset: usize, len: usize) -> Result<()> {
        if offset < self.base {
            return Err(CursorError::Discarded {
                offset,
                base: self.base,
            });
        }
        let end = offset.saturating_add(len);
        if end > self.limit {
            return Err(CursorError::OutOfRange {
                end,
                limit: self.limit,
            });
        }
        Ok(())
    }

    // chunk index and position within it; offset must already be checked
    fn locate(&self, offset: usize) -> (usize, usize) {
        let mut rel = offset - self.base;
        for (idx, chunk) in self.chunks.iter().enumerate() {
            if rel < chunk.len() {
                return (idx, rel);
            }
            rel -= chunk.len();
        }
        (self.chunks.len().saturating_sub(1), rel)
    }
}
