use std::io;

use bytes::Bytes;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc::Sender,
};

use super::{Message, MessageAssembler};
use crate::{
    MAX_FRAME_PAYLOAD,
    frames::{CloseReason, Frame, FrameStream, FrameWriter, Opcode, StreamConfig},
    packet::{Encoded, Packet, PacketCodec},
    role::RolePolicy,
};

/// The packet a complete Text or Binary frame carries.
///
/// Control frames and fragments carry none.
pub fn packet_from_frame(frame: &Frame, codec: &PacketCodec) -> Option<Packet> {
    if !frame.fin {
        return None;
    }
    match frame.opcode {
        Opcode::Text => Some(match std::str::from_utf8(&frame.payload) {
            Ok(text) => codec.decode_text(text),
            Err(_) => Packet::parser_error(),
        }),
        Opcode::Binary => Some(codec.decode_binary(&frame.payload)),
        _ => None,
    }
}

fn packet_from_message(message: &Message, codec: &PacketCodec) -> Packet {
    match message {
        Message::Text(text) => codec.decode_text(text),
        Message::Binary(bytes) => codec.decode_binary(bytes),
    }
}

/// Encodes `packet` as one message, fragmented and masked for role `R`.
pub async fn write_packet<R, W>(
    writer: &mut W,
    frames: &FrameWriter<R>,
    codec: &PacketCodec,
    packet: &Packet,
) -> io::Result<()>
where
    R: RolePolicy,
    W: AsyncWrite + Unpin,
{
    let encoded = codec
        .encode(packet)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let (opcode, payload) = match encoded {
        Encoded::Text(text) => (Opcode::Text, Bytes::from(text)),
        Encoded::Binary(bytes) => (Opcode::Binary, bytes),
    };

    for chunk in frames.message(opcode, &payload) {
        writer.write_all(&chunk).await?;
    }
    writer.flush().await
}

// one read into the stream; false on EOF
async fn fill<Rd>(reader: &mut Rd, buf: &mut [u8], stream: &mut FrameStream) -> io::Result<bool>
where
    Rd: AsyncRead + Unpin,
{
    let n = reader.read(buf).await?;
    if n == 0 {
        tracing::info!(pending = stream.pending(), "EOF");
        return Ok(false);
    }
    tracing::trace!(bytes = n, "read socket");
    stream.push(&buf[..n]).map_err(invalid_data)?;
    Ok(true)
}

/// Reads `reader` to EOF, sending every decoded frame to `tx` in order.
///
/// Stops early, without error, once `tx` is closed. A frame the stream
/// rejects ends the loop with `InvalidData`.
pub async fn read_frames<Rd>(reader: &mut Rd, config: StreamConfig, tx: &Sender<Frame>) -> io::Result<()>
where
    Rd: AsyncRead + Unpin,
{
    let mut buf = vec![0; MAX_FRAME_PAYLOAD];
    let mut stream = FrameStream::with_config(config);
    while fill(reader, &mut buf, &mut stream).await? {
        while let Some(frame) = stream.next_frame().map_err(invalid_data)? {
            if tx.send(frame).await.is_err() {
                tracing::debug!("frame receiver dropped");
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Reads `reader` until a close frame or EOF, sending the packet of every
/// complete message to `tx` in order.
///
/// Returns the peer's close reason and text when it sent a close frame.
/// Ping and pong frames are skipped; liveness is checked with ping packets.
pub async fn read_packets<Rd>(
    reader: &mut Rd,
    config: StreamConfig,
    codec: PacketCodec,
    tx: &Sender<Packet>,
) -> io::Result<Option<(CloseReason, String)>>
where
    Rd: AsyncRead + Unpin,
{
    let mut buf = vec![0; MAX_FRAME_PAYLOAD];
    let mut stream = FrameStream::with_config(config);
    let mut assembler = MessageAssembler::new(config.max_payload);

    while fill(reader, &mut buf, &mut stream).await? {
        while let Some(frame) = stream.next_frame().map_err(invalid_data)? {
            match frame.opcode {
                Opcode::Ping | Opcode::Pong => {
                    tracing::trace!(opcode = ?frame.opcode, "skipping control frame");
                }
                Opcode::Close => {
                    let reason = frame.close_reason().map(|(r, text)| (r, text.to_owned()));
                    tracing::info!(?reason, "received close frame");
                    return Ok(reason);
                }
                _ => {
                    let message = assembler.push(&frame).map_err(|reason| {
                        io::Error::new(io::ErrorKind::InvalidData, format!("{reason:?}"))
                    })?;
                    let Some(message) = message else {
                        continue;
                    };
                    let packet = packet_from_message(&message, &codec);
                    if tx.send(packet).await.is_err() {
                        tracing::debug!("packet receiver dropped");
                        return Ok(None);
                    }
                }
            }
        }
    }
    Ok(None)
}

fn invalid_data(e: crate::error::FrameError) -> io::Error { io::Error::new(io::ErrorKind::InvalidData, e) }
