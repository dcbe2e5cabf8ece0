use std::io;

use async_trait::async_trait;

use crate::{
    error::{HandshakeError, PollError},
    handshake::Handshake,
    packet::{Encoded, Packet},
    payload::{PayloadEncoding, decode_payload, encode_payload},
};

/// The HTTP request/response plumbing behind long-polling.
///
/// Implementations own the request URLs, headers and any TLS; this crate only
/// produces and consumes the bodies.
#[async_trait]
pub trait PollingTransport: Send + Sync {
    /// One GET: waits for and returns the next response body.
    async fn poll(&self) -> io::Result<Encoded>;

    /// One POST carrying `body`.
    async fn post(&self, body: Encoded) -> io::Result<()>;
}

/// Packs outgoing packets into payloads and unpacks incoming ones over a
/// [`PollingTransport`].
#[derive(Debug)]
pub struct Poller<T> {
    transport: T,
    encoding: PayloadEncoding,
}

impl<T: PollingTransport> Poller<T> {
    pub fn new(transport: T, encoding: PayloadEncoding) -> Self { Self { transport, encoding } }

    pub fn transport(&self) -> &T { &self.transport }

    /// Polls for the open packet. Packets the server sent along with it are
    /// returned after the handshake.
    pub async fn handshake(&self) -> Result<(Handshake, Vec<Packet>), PollError> {
        let mut packets = self.recv().await?;
        if packets.is_empty() {
            return Err(HandshakeError::NoPacket.into());
        }
        let open = packets.remove(0);
        Ok((Handshake::from_packet(&open)?, packets))
    }

    /// One poll, decoded. A corrupt payload fails the whole poll.
    pub async fn recv(&self) -> Result<Vec<Packet>, PollError> {
        let body = self.transport.poll().await.inspect_err(|e| {
            tracing::warn!(error = %e, "poll failed");
        })?;
        Ok(decode_payload(&body)?)
    }

    /// Sends `packets`, in order, as one payload.
    pub async fn send(&self, packets: &[Packet]) -> Result<(), PollError> {
        let body = encode_payload(packets, self.encoding)?;
        self.transport.post(body).await.inspect_err(|e| {
            tracing::warn!(error = %e, "post failed");
        })?;
        Ok(())
    }
}
