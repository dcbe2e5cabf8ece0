/// Errors raised by [`ByteCursor`](crate::ByteCursor) reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    /// A read addressed bytes past the written limit.
    #[error("read up to offset {end} past limit {limit}")]
    OutOfRange {
        /// Absolute offset one past the last byte the read needed.
        end: usize,
        /// Absolute offset one past the last written byte.
        limit: usize,
    },
    /// A read addressed bytes that were already discarded.
    #[error("offset {offset} was discarded (retained from {base})")]
    Discarded { offset: usize, base: usize },
    /// A write would grow the retained region past its declared capacity.
    #[error("write would retain {requested} bytes, capacity is {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },
}

/// Frame-level rejections made above the decoder state machine.
///
/// The state machine itself only ever reports starvation; these are the
/// checks a [`FrameStream`](crate::FrameStream) applies to what it produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("unknown opcode {0:#x}")]
    UnknownOpcode(u8),
    /// RSV1-3 set without a negotiated extension.
    #[error("reserved bits set ({0:#05b})")]
    ReservedBits(u8),
    /// Control frame that is fragmented or longer than 125 bytes.
    #[error("invalid control frame")]
    InvalidControlFrame,
    #[error("frame payload too large ({len} bytes, max {max})")]
    PayloadTooLarge { len: u64, max: usize },
    #[error(transparent)]
    Cursor(#[from] CursorError),
}

/// A byte string that does not hold UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ByteStringError {
    /// Each char of a byte string stands for one byte, so must be <= U+00FF.
    #[error("char {0:?} is not a byte")]
    NotAByte(char),
    #[error("bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Errors encoding a packet for the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The decode-error sentinel is internal and never sent.
    #[error("the error sentinel packet cannot be encoded")]
    ErrorSentinel,
}

/// A multiplexed payload that cannot be split into packets.
///
/// Any of these aborts the whole batch: once a length field is wrong no later
/// record boundary can be trusted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("empty payload")]
    Empty,
    #[error("invalid record length")]
    InvalidLength,
    #[error("record length has more than {max} digits")]
    LengthTooLong { max: usize },
    #[error("invalid record flag {0:#04x}")]
    InvalidFlag(u8),
    #[error("record truncated (expected {expected}, {available} available)")]
    Truncated { expected: usize, available: usize },
    #[error("record {index} is not a valid packet")]
    CorruptPacket { index: usize },
}

/// Errors interpreting the open packet.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("expected an open packet, got {0:?}")]
    NotOpen(crate::PacketType),
    #[error("no packet received")]
    NoPacket,
    #[error("open packet carries no text data")]
    MissingData,
    #[error("malformed handshake: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the long-polling seam.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("polling transport: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}
