use std::{
    fs::File,
    io::{self, Read},
    ops::ControlFlow,
    path::PathBuf,
};

use clap::{Parser, ValueEnum};
use tokio::{net::TcpStream, sync::mpsc};
use tracing_subscriber::EnvFilter;
use wust_eio::{
    BinarySupport, Encoded, Frame, FrameStream, PacketCodec, decode_payload_with,
    frames::StreamConfig,
    transport::{packet_from_frame, read_frames},
};

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Raw WebSocket frames
    Frames,
    /// `<len>:<packet>` text payload
    Text,
    /// `<flag><digits><0xFF><packet>` binary payload
    Binary,
}

#[derive(Parser)]
#[command(author, version, about = "Decode captured transport bytes")]
struct Args {
    /// What the input holds
    #[arg(short, long, value_enum, default_value_t = Mode::Frames)]
    mode: Mode,

    /// Capture file; stdin when absent
    input: Option<PathBuf>,

    /// Read frames live from a TCP peer instead of a capture
    #[arg(short, long, conflicts_with = "input")]
    connect: Option<String>,

    /// Largest frame payload to accept
    #[arg(long, default_value_t = wust_eio::MAX_MESSAGE_SIZE)]
    max_payload: usize,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("wust_eio=info".parse().unwrap()),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let config = StreamConfig::with_max_payload(args.max_payload);

    if let Some(addr) = args.connect {
        return dump_live(&addr, config).await;
    }

    let mut data = Vec::new();
    match &args.input {
        Some(path) => File::open(path)?.read_to_end(&mut data)?,
        None => io::stdin().read_to_end(&mut data)?,
    };

    match args.mode {
        Mode::Frames => dump_frames(&data, config),
        Mode::Text => {
            let text = String::from_utf8(data)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            dump_payload(&Encoded::Text(text));
            Ok(())
        }
        Mode::Binary => {
            dump_payload(&Encoded::Binary(data.into()));
            Ok(())
        }
    }
}

fn dump_frames(data: &[u8], config: StreamConfig) -> io::Result<()> {
    let mut stream = FrameStream::with_config(config);
    stream
        .push(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let frames = stream
        .drain()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let codec = PacketCodec::new(BinarySupport::Binary);
    for frame in frames {
        println!(
            "{:?} fin={} masked={} len={} packet={:?}",
            frame.opcode,
            frame.fin,
            frame.masked(),
            frame.payload.len(),
            packet_from_frame(&frame, &codec),
        );
    }
    if stream.pending() > 0 {
        println!("{} trailing bytes in {:?}", stream.pending(), stream.state());
    }
    Ok(())
}

fn dump_payload(payload: &Encoded) {
    decode_payload_with(payload, |packet, index, total| {
        println!("[{}/{total}] {} {:?}", index + 1, packet.kind.name(), packet.data);
        ControlFlow::Continue(())
    });
}

async fn dump_live(addr: &str, config: StreamConfig) -> io::Result<()> {
    let mut socket = TcpStream::connect(addr).await?;
    let (tx, mut rx) = mpsc::channel::<Frame>(64);

    let printer = tokio::spawn(async move {
        let codec = PacketCodec::new(BinarySupport::Binary);
        while let Some(frame) = rx.recv().await {
            println!("{:?} {:?}", frame.opcode, packet_from_frame(&frame, &codec));
        }
    });

    let result = read_frames(&mut socket, config, &tx).await;
    drop(tx);
    let _ = printer.await;
    result
}
