use bytes::{Bytes, BytesMut};

use crate::{
    MAX_MESSAGE_SIZE,
    frames::{CloseReason, Frame, Opcode},
};

/// A complete data message, reassembled from its fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Bytes),
}

#[derive(Debug)]
enum Partial {
    Text(BytesMut),
    Binary(BytesMut),
}

impl Partial {
    fn buf(&mut self) -> &mut BytesMut {
        match self {
            Self::Text(b) | Self::Binary(b) => b,
        }
    }
}

/// Joins Text/Binary frames and their continuations into messages.
#[derive(Debug)]
pub struct MessageAssembler {
    partial: Option<Partial>,
    max_size: usize,
}

impl Default for MessageAssembler {
    fn default() -> Self { Self::new(MAX_MESSAGE_SIZE) }
}

impl MessageAssembler {
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            partial: None,
            max_size,
        }
    }

    /// Feeds one data frame, returning the message it completes.
    ///
    /// On `Err` the connection should be closed with the returned reason.
    pub fn push(&mut self, frame: &Frame) -> Result<Option<Message>, CloseReason> {
        let partial = match (self.partial.as_mut(), frame.opcode) {
            (None, Opcode::Text) => self.partial.insert(Partial::Text(BytesMut::new())),
            (None, Opcode::Binary) => self.partial.insert(Partial::Binary(BytesMut::new())),
            (Some(p), Opcode::Continuation) => p,
            _ => {
                // continuation with nothing to continue, or a new message
                // before the last one finished
                tracing::warn!(opcode = ?frame.opcode, partial = self.partial.is_some(), "unexpected frame");
                return Err(CloseReason::ProtoError);
            }
        };

        let buf = partial.buf();
        if buf.len() + frame.payload.len() > self.max_size {
            tracing::warn!(len = buf.len() + frame.payload.len(), max = self.max_size, "message too big");
            self.partial = None;
            return Err(CloseReason::TooBig);
        }
        buf.extend_from_slice(&frame.payload);
        tracing::trace!(current_len = buf.len(), added = frame.payload.len(), "fragment appended");

        if !frame.fin {
            return Ok(None);
        }
        let message = match self.partial.take() {
            Some(Partial::Binary(buf)) => Message::Binary(buf.freeze()),
            Some(Partial::Text(buf)) => match String::from_utf8(buf.to_vec()) {
                Ok(text) => Message::Text(text),
                Err(_) => {
                    tracing::warn!("invalid UTF-8 in text message");
                    return Err(CloseReason::DataError);
                }
            },
            None => return Ok(None),
        };
        Ok(Some(message))
    }
}
