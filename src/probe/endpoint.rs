use std::net::SocketAddr;
use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

pub const DEFAULT_PORT: u16 = 55555;

/// Connects to a waiting receiver
pub async fn connect(peer_addr: SocketAddr) -> anyhow::Result<TcpStream> {
    debug!(?peer_addr, "connecting");
    let stream = TcpStream::connect(peer_addr).await
        .with_context(|| format!("connecting to {}", peer_addr))?;

    // every segment should go out as soon as it is written
    stream.set_nodelay(true)?;

    info!(?peer_addr, "connected");
    Ok(stream)
}

/// Binds to `bind_addr` and waits for a single sender to connect
pub async fn accept_one(bind_addr: SocketAddr) -> anyhow::Result<(TcpStream, SocketAddr)> {
    let listener = TcpListener::bind(bind_addr).await
        .with_context(|| format!("binding to {}", bind_addr))?;
    accept_from(listener).await
}

pub async fn accept_from(listener: TcpListener) -> anyhow::Result<(TcpStream, SocketAddr)> {
    info!(local_addr = ?listener.local_addr()?, "waiting for sender");
    let (stream, peer_addr) = listener.accept().await?;
    info!(?peer_addr, "sender connected");
    Ok((stream, peer_addr))
}
