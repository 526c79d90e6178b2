//! A toy game transport with HyQuery installed ahead of its own dispatch on
//! the same UDP socket.
//!
//! This binary exists to exercise the demultiplexer contract end to end: it
//! is not part of the library's public surface and the workspace does not
//! depend on it. Real embedders wire [`hyquery::HyQuery`] into their own
//! transport loop the same way this does -- call `handle_datagram` first,
//! and only fall through to the game protocol on [`hyquery::Disposition::PassThrough`].

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::Parser;
use hyquery::{host::StaticHost, Disposition, HyQuery, HyQueryConfig};
use hyquery_protocol::PlayerEntry;
use tokio::net::UdpSocket;
use uuid::Uuid;

/// Runs a fake game server that answers a one-byte "ping" on the same port
/// HyQuery listens on, demonstrating that foreign traffic passes through
/// untouched.
#[derive(Parser, Debug)]
struct Args {
    /// Address to bind the shared game/query socket to.
    #[arg(long, default_value = "0.0.0.0:25565")]
    bind: SocketAddr,

    /// Directory HyQuery reads/writes `HyQuery/config.json` under.
    #[arg(long, default_value = "./demo-data")]
    data_dir: String,
}

/// The "ping" byte this demo's fake game protocol answers with a "pong".
const GAME_PING: u8 = 0x01;
const GAME_PONG: u8 = 0x02;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let host = Arc::new(StaticHost {
        server_name: "HyQuery Demo Server".to_string(),
        motd: "Running the embedded query service".to_string(),
        max_players: 20,
        players: vec![
            PlayerEntry::local("Alice", Uuid::from_u128(1)),
            PlayerEntry::local("Bob", Uuid::from_u128(2)),
        ],
        ..StaticHost::default()
    });

    let config = match HyQueryConfig::load(&args.data_dir) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("could not load config from {}, using defaults: {e}", args.data_dir);
            HyQueryConfig::default()
        }
    };

    let service = Arc::new(HyQuery::from_config(config, host).await.context("building HyQuery service")?);
    service.start().context("starting HyQuery background tasks")?;

    let socket = Arc::new(UdpSocket::bind(args.bind).await.context("binding shared game/query socket")?);
    tracing::info!("listening on {} (HyQuery ahead of the fake game transport)", args.bind);

    let mut buf = [0u8; 2048];
    loop {
        let (n, source) = tokio::select! {
            result = socket.recv_from(&mut buf) => result.context("reading from the shared socket")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                service.shutdown().await.ok();
                return Ok(());
            }
        };

        let datagram = &buf[..n];
        match service.handle_datagram(datagram, source).await {
            Disposition::Reply(reply) => {
                if let Err(e) = socket.send_to(&reply, source).await {
                    tracing::warn!("failed to send HyQuery reply to {source}: {e}");
                }
            }
            Disposition::Handled => {
                // Either answered with nothing, or dropped -- the fake game
                // transport below never sees this datagram.
            }
            Disposition::PassThrough => handle_game_packet(&socket, datagram, source).await,
        }
    }
}

/// Everything HyQuery doesn't recognize lands here. A real embedder's own
/// protocol dispatch would run instead; this one just answers a ping.
async fn handle_game_packet(socket: &UdpSocket, datagram: &[u8], source: SocketAddr) {
    if datagram == [GAME_PING] {
        if let Err(e) = socket.send_to(&[GAME_PONG], source).await {
            tracing::warn!("failed to send game pong to {source}: {e}");
        }
    } else {
        tracing::debug!("dropping {} unrecognized bytes from {source}", datagram.len());
    }
}
