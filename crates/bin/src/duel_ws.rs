//! Light Duel over a bare WebSocket listener, without the HTTP routes.

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = server::Config::load()?;
    let (server, timing) = (&config.server, &config.timing);
    tracing::info!(
        "duel-ws v{} on {}:{} (max rooms {}, join timeout {}s)",
        env!("CARGO_PKG_VERSION"),
        server.bind,
        server.port,
        server.max_rooms,
        server.join_timeout_secs,
    );
    tracing::info!(
        "timing: tick {} ms, start delay {} ms, dispose delay {} ms",
        timing.tick_interval_ms,
        timing.start_delay_ms,
        timing.dispose_delay_ms,
    );

    server::run(config).await
}
