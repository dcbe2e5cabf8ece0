use bytes::{BufMut, Bytes, BytesMut};

/// Close status codes from
/// [RFC 6455](https://www.rfc-editor.org/rfc/rfc6455.html#section-7.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Normal,
    GoingAway,
    ProtoError,
    /// Unsupported data type
    DataType,
    /// No status code was present; never sent on the wire.
    NoneGiven,
    /// Connection dropped without a close frame; never sent on the wire.
    Abnormal,
    /// Invalid UTF-8 in a text message
    DataError,
    Policy,
    TooBig,
    Extension,
    Unexpected,
    /// Valid but unrecognised code (registered or private use)
    Other(u16),
}

impl CloseReason {
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::GoingAway => 1001,
            Self::ProtoError => 1002,
            Self::DataType => 1003,
            Self::NoneGiven => 1005,
            Self::Abnormal => 1006,
            Self::DataError => 1007,
            Self::Policy => 1008,
            Self::TooBig => 1009,
            Self::Extension => 1010,
            Self::Unexpected => 1011,
            Self::Other(code) => code,
        }
    }
}

impl From<u16> for CloseReason {
    fn from(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::GoingAway,
            1002 => Self::ProtoError,
            1003 => Self::DataType,
            1005 => Self::NoneGiven,
            1006 => Self::Abnormal,
            1007 => Self::DataError,
            1008 => Self::Policy,
            1009 => Self::TooBig,
            1010 => Self::Extension,
            1011 => Self::Unexpected,
            other => Self::Other(other),
        }
    }
}

/// Builds a close payload: big-endian code followed by at most 123 bytes of
/// reason text, cut on a char boundary.
#[must_use]
pub fn close_payload(reason: CloseReason, text: &str) -> Bytes {
    let mut end = text.len().min(123);
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut buf = BytesMut::with_capacity(2 + end);
    buf.put_u16(reason.code());
    buf.put_slice(&text.as_bytes()[..end]);
    buf.freeze()
}

/// Splits a close payload into its reason and text, if it is well formed.
///
/// An empty payload carries no code and reads as [`CloseReason::NoneGiven`].
#[must_use]
pub fn parse_close_payload(bytes: &[u8]) -> Option<(CloseReason, &str)> {
    match bytes {
        [] => Some((CloseReason::NoneGiven, "")),
        [_] => None,
        [hi, lo, text @ ..] => {
            let code = u16::from_be_bytes([*hi, *lo]);
            if !matches!(code, 1000..=1003 | 1007..=1011 | 3000..=4999) {
                return None;
            }
            Some((CloseReason::from(code), std::str::from_utf8(text).ok()?))
        }
    }
}
