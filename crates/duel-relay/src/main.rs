//! duel-relay server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on 0.0.0.0:8080, WebSocket endpoint at /ws
//! duel-relay
//!
//! # Pick the port, turn on debug logging
//! PORT=9000 RUST_LOG=duel_relay=debug duel-relay
//!
//! # Echo every frame back instead of pairing players
//! RELAY_MODE=echo duel-relay
//! ```

use duel_relay::{RelayError, RelayServer, ServerConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = ServerConfig::from_env()?;
    let server = RelayServer::builder().config(config).build().await?;

    match server.local_addr() {
        Ok(addr) => tracing::info!(%addr, "duel-relay listening"),
        Err(e) => tracing::warn!(error = %e, "cannot read local address"),
    }

    server.run().await
}
