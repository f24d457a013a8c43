//! Standalone WebSocket listener.

use crate::config::Config;
use crate::lobby::Lobby;
use crate::session::{drive_session, Frame};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};

/// Connection tracking state (shared across connection handlers).
#[derive(Debug, Default)]
pub struct ConnectionState {
    /// Number of connections per IP address.
    ip_connections: HashMap<IpAddr, usize>,
    /// Total number of connections.
    total_connections: usize,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.total_connections
    }

    /// Try to add a connection, returns true if allowed.
    pub fn try_add_connection(&mut self, ip: IpAddr, max_total: usize, max_per_ip: usize) -> bool {
        if self.total_connections >= max_total {
            return false;
        }

        let current = self.ip_connections.get(&ip).copied().unwrap_or(0);
        if current >= max_per_ip {
            return false;
        }

        *self.ip_connections.entry(ip).or_insert(0) += 1;
        self.total_connections += 1;
        true
    }

    /// Remove a connection.
    pub fn remove_connection(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_connections.get_mut(&ip) {
            if *count > 0 {
                *count -= 1;
                self.total_connections = self.total_connections.saturating_sub(1);
            }
            if *count == 0 {
                self.ip_connections.remove(&ip);
            }
        }
    }
}

/// Run the duel server on a plain WebSocket listener.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    let conn_state = Arc::new(RwLock::new(ConnectionState::new()));
    let lobby = Arc::new(Lobby::new(config.server.max_rooms, config.timing));

    let max_connections = config.server.max_connections;
    let ip_limit = config.server.ip_limit;
    let join_timeout = config.server.join_timeout();

    loop {
        let (stream, addr) = listener.accept().await?;
        let ip = addr.ip();

        {
            let mut state = conn_state.write().await;
            if !state.try_add_connection(ip, max_connections, ip_limit) {
                warn!("Connection rejected (limit reached): {}", addr);
                continue;
            }
        }

        let lobby = Arc::clone(&lobby);
        let conn_state = Arc::clone(&conn_state);

        tokio::spawn(async move {
            let result = handle_connection(stream, addr, &lobby, join_timeout).await;

            // Always remove from connection tracking when done
            {
                let mut state = conn_state.write().await;
                state.remove_connection(addr.ip());
            }

            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    lobby: &Lobby,
    join_timeout: Duration,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (write, read) = ws_stream.split();

    let frames = read.map(|msg| {
        msg.map(|msg| match msg {
            Message::Binary(data) => Frame::Packet(data),
            Message::Close(_) => Frame::Close,
            _ => Frame::Ignored,
        })
        .map_err(anyhow::Error::from)
    });
    let sink = Box::pin(
        write
            .sink_map_err(anyhow::Error::from)
            .with(|data: Bytes| async move { Ok::<_, anyhow::Error>(Message::Binary(data)) }),
    );

    drive_session(frames, sink, lobby, join_timeout).await
}
