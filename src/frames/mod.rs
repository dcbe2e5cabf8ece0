mod close;
pub(crate) mod decode;
mod encode;
mod frame;
mod mask;
mod opcode;
mod stream;

pub use close::{CloseReason, close_payload, parse_close_payload};
pub use decode::{PartialFrame, ReaderState, Transition, advance};
pub use encode::FrameWriter;
pub use frame::{Frame, MAX_HEADER_LEN};
pub use mask::mask;
pub use opcode::Opcode;
pub use stream::{FrameStream, StreamConfig};
