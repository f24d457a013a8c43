//! Duel - Game server with HTTP endpoints.

use axum::{
    Router,
    extract::{ConnectInfo, State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::IntoResponse,
    routing::get,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use server::{Frame, Lobby, RoomSummary, drive_session, room::MAX_PLAYERS};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct AppState {
    lobby: Arc<Lobby>,
    join_timeout: Duration,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,server=debug")),
        )
        .init();

    info!("Light Duel v{}", env!("CARGO_PKG_VERSION"));

    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Tick: {} ms", config.timing.tick_interval_ms);
    info!("  Max rooms: {}", config.server.max_rooms);

    let state = AppState {
        lobby: Arc::new(Lobby::new(config.server.max_rooms, config.timing)),
        join_timeout: config.server.join_timeout(),
    };

    let app = Router::new()
        .route("/game", get(websocket_handler))
        .route("/health", get(health))
        .route("/rooms", get(list_rooms))
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
        )
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Game WebSocket endpoint: ws://{}/game", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}

/// Handle WebSocket connections for the game
async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("WebSocket connection from {}", addr);

    ws.on_upgrade(move |socket| handle_websocket(socket, addr, state))
}

/// Adapt the axum socket to the session driver.
async fn handle_websocket(socket: WebSocket, addr: SocketAddr, state: AppState) {
    let (write, read) = socket.split();

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

    if let Err(e) = drive_session(frames, sink, &state.lobby, state.join_timeout).await {
        error!("Connection error from {}: {}", addr, e);
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn list_rooms(State(state): State<AppState>) -> String {
    format_rooms(&state.lobby.rooms().await)
}

/// One line per open room: id, mode tag and seats taken.
fn format_rooms(rooms: &[RoomSummary]) -> String {
    rooms
        .iter()
        .map(|room| {
            let mode = if room.mode.is_empty() { "-" } else { room.mode.as_str() };
            format!("{}\t{}\t{}/{}\n", room.id, mode, room.reserved, MAX_PLAYERS)
        })
        .collect()
}
