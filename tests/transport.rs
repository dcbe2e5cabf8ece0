use std::{collections::VecDeque, io, sync::Mutex};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, sync::mpsc};
use wust_eio::{
    BinarySupport, Client, Encoded, Frame, Packet, PacketCodec, PacketType, PayloadEncoding,
    encode_payload,
    error::{HandshakeError, PayloadError, PollError},
    frames::{CloseReason, FrameWriter, StreamConfig},
    transport::{Poller, PollingTransport, read_frames, read_packets, write_packet},
};

#[tokio::test]
async fn packets_cross_a_socket() {
    let (mut client, mut server) = tokio::io::duplex(1024);
    let codec = PacketCodec::new(BinarySupport::Binary);
    let writer = FrameWriter::<Client>::new();

    let big = "x".repeat(wust_eio::MAX_FRAME_PAYLOAD + 100);
    let sent = vec![
        Packet::message("hello"),
        Packet::binary(PacketType::Message, vec![1, 2, 3]),
        Packet::message(big),
        Packet::new(PacketType::Ping),
    ];

    let to_send = sent.clone();
    let sender = tokio::spawn(async move {
        for packet in &to_send {
            write_packet(&mut client, &writer, &codec, packet).await.unwrap();
        }
        client.write_all(&Frame::ping(&b"hb"[..]).encode()).await.unwrap();
        client
            .write_all(&Frame::close(CloseReason::GoingAway, "done").encode())
            .await
            .unwrap();
    });

    let (tx, mut rx) = mpsc::channel(16);
    let close = read_packets(&mut server, StreamConfig::default(), codec, &tx)
        .await
        .unwrap();
    sender.await.unwrap();
    drop(tx);

    let mut received = Vec::new();
    while let Some(packet) = rx.recv().await {
        received.push(packet);
    }
    assert_eq!(received, sent);
    assert_eq!(close, Some((CloseReason::GoingAway, "done".to_owned())));
}

#[tokio::test]
async fn frames_stop_at_eof() {
    let (mut client, mut server) = tokio::io::duplex(64);
    let frames = vec![Frame::text("4a"), Frame::binary(vec![4; 10])];
    let wire: Vec<u8> = frames.iter().flat_map(Frame::encode).collect();
    client.write_all(&wire).await.unwrap();
    drop(client);

    let (tx, mut rx) = mpsc::channel(16);
    read_frames(&mut server, StreamConfig::default(), &tx).await.unwrap();
    drop(tx);

    let mut got = Vec::new();
    while let Some(frame) = rx.recv().await {
        got.push(frame);
    }
    assert_eq!(got, frames);
}

#[tokio::test]
async fn rejected_frame_is_invalid_data() {
    let (mut client, mut server) = tokio::io::duplex(64);
    client.write_all(&[0x83, 0x00]).await.unwrap();
    drop(client);

    let (tx, _rx) = mpsc::channel(16);
    let err = read_frames(&mut server, StreamConfig::default(), &tx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
}

#[derive(Default)]
struct MemoryTransport {
    responses: Mutex<VecDeque<Encoded>>,
    posted: Mutex<Vec<Encoded>>,
}

#[async_trait]
impl PollingTransport for MemoryTransport {
    async fn poll(&self) -> io::Result<Encoded> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no response"))
    }

    async fn post(&self, body: Encoded) -> io::Result<()> {
        self.posted.lock().unwrap().push(body);
        Ok(())
    }
}

const OPEN: &str = r#"{"sid":"abc","upgrades":["websocket"],"pingInterval":25000,"pingTimeout":20000}"#;

#[tokio::test]
async fn poller_handshake_and_exchange() {
    let transport = MemoryTransport::default();
    {
        let mut responses = transport.responses.lock().unwrap();
        responses.push_back(
            encode_payload(
                &[Packet::text(PacketType::Open, OPEN), Packet::message("welcome")],
                PayloadEncoding::Binary,
            )
            .unwrap(),
        );
        responses.push_back(Encoded::Text("1:6".into()));
        responses.push_back(Encoded::Text("3:4hi5:".into()));
    }

    let poller = Poller::new(transport, PayloadEncoding::Text);
    let (handshake, rest) = poller.handshake().await.unwrap();
    assert_eq!(handshake.sid, "abc");
    assert_eq!(rest, [Packet::message("welcome")]);

    assert_eq!(poller.recv().await.unwrap(), [Packet::new(PacketType::Noop)]);
    assert!(matches!(
        poller.recv().await,
        Err(PollError::Payload(PayloadError::Truncated { .. }))
    ));
    assert!(matches!(poller.recv().await, Err(PollError::Io(_))));

    poller
        .send(&[Packet::message("a"), Packet::new(PacketType::Pong)])
        .await
        .unwrap();
    assert_eq!(
        *poller.transport().posted.lock().unwrap(),
        [Encoded::Text("2:4a1:3".into())]
    );
}

#[tokio::test]
async fn poller_requires_open_packet() {
    let transport = MemoryTransport::default();
    transport
        .responses
        .lock()
        .unwrap()
        .push_back(Encoded::Text("1:4".into()));

    let poller = Poller::new(transport, PayloadEncoding::Text);
    assert!(matches!(
        poller.handshake().await,
        Err(PollError::Handshake(HandshakeError::NotOpen(PacketType::Message)))
    ));
}

#[tokio::test]
async fn sentinel_cannot_be_sent() {
    let poller = Poller::new(MemoryTransport::default(), PayloadEncoding::Binary);
    assert!(matches!(
        poller.send(&[Packet::parser_error()]).await,
        Err(PollError::Encode(_))
    ));
}
