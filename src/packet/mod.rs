mod codec;
pub mod utf8;

use bytes::Bytes;
pub use codec::{BinarySupport, PacketCodec};

/// Packet kinds and their wire digits.
///
/// `Error` is the decode-failure sentinel; its digit 7 never goes on the wire.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    Open = 0,
    Close = 1,
    Ping = 2,
    Pong = 3,
    Message = 4,
    Upgrade = 5,
    Noop = 6,
    Error = 7,
}

impl PacketType {
    pub const ALL: [PacketType; 7] = [
        Self::Open,
        Self::Close,
        Self::Ping,
        Self::Pong,
        Self::Message,
        Self::Upgrade,
        Self::Noop,
    ];

    /// Wire type index; `None` for anything outside `0..=6`.
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> { Self::ALL.get(usize::from(index)).copied() }

    #[must_use]
    pub fn from_digit(digit: char) -> Option<Self> {
        digit
            .to_digit(10)
            .and_then(|d| u8::try_from(d).ok())
            .and_then(Self::from_index)
    }

    #[must_use]
    pub fn index(self) -> u8 { self as u8 }

    #[must_use]
    pub fn digit(self) -> char { char::from(b'0' + self as u8) }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Message => "message",
            Self::Upgrade => "upgrade",
            Self::Noop => "noop",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketData {
    Text(String),
    Binary(Bytes),
}

/// One engine-level packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub kind: PacketType,
    pub data: Option<PacketData>,
}

impl Packet {
    #[must_use]
    pub fn new(kind: PacketType) -> Self { Self { kind, data: None } }

    pub fn text(kind: PacketType, text: impl Into<String>) -> Self {
        Self {
            kind,
            data: Some(PacketData::Text(text.into())),
        }
    }

    pub fn binary(kind: PacketType, data: impl Into<Bytes>) -> Self {
        Self {
            kind,
            data: Some(PacketData::Binary(data.into())),
        }
    }

    pub fn message(text: impl Into<String>) -> Self { Self::text(PacketType::Message, text) }

    /// The sentinel every failed decode produces.
    #[must_use]
    pub fn parser_error() -> Self { Self::text(PacketType::Error, "parser error") }

    #[must_use]
    pub fn is_error(&self) -> bool { self.kind == PacketType::Error }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            Some(PacketData::Text(t)) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_binary(&self) -> Option<&Bytes> {
        match &self.data {
            Some(PacketData::Binary(b)) => Some(b),
            _ => None,
        }
    }
}

/// One transport unit: what a single packet or payload becomes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    Text(String),
    Binary(Bytes),
}

impl Encoded {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Binary(b) => b.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    #[must_use]
    pub fn is_binary(&self) -> bool { matches!(self, Self::Binary(_)) }
}
