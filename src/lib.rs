#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

mod cursor;
pub mod error;
pub mod frames;
mod handshake;
pub mod packet;
pub mod payload;
mod role;
pub mod transport;

pub use cursor::ByteCursor;
pub use frames::{Frame, FrameStream, Opcode};
pub use handshake::Handshake;
pub use packet::{BinarySupport, Encoded, Packet, PacketCodec, PacketData, PacketType};
pub use payload::{PayloadEncoding, decode_payload, decode_payload_with, encode_payload};
pub use role::{Client, RolePolicy, Server};

/// Engine protocol revision spoken on the wire.
pub const PROTOCOL: u8 = 3;

/// Largest payload the frame encoder puts in one fragment.
pub const MAX_FRAME_PAYLOAD: usize = 32 * 1024;

/// Default limit on a single frame's payload and on a reassembled message.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Most length digits a binary payload record may carry: the decimal width
/// of `u32::MAX`.
pub const MAX_LENGTH_DIGITS: usize = 10;
