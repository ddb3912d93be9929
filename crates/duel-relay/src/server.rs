//! `RelayServer` builder and accept loop.
//!
//! Ties the layers together: transport → session loop → room manager.

use std::net::SocketAddr;
use std::sync::Arc;

use duel_relay_protocol::{Codec, JsonCodec};
use duel_relay_room::RoomManager;
use duel_relay_transport::{TransportError, WebSocketTransport};

use crate::config::{RelayMode, ServerConfig};
use crate::handler::handle_connection;
use crate::RelayError;

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Arc<RoomManager<C>>,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn run() -> Result<(), duel_relay::RelayError> {
/// use duel_relay::RelayServerBuilder;
///
/// let server = RelayServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder {
    config: ServerConfig,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces every setting at once, e.g. with
    /// [`ServerConfig::from_env`].
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the path WebSocket upgrades are accepted on.
    pub fn path(mut self, path: &str) -> Self {
        self.config.path = path.to_string();
        self
    }

    /// Sets how many frames a connection may have queued.
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.config.outbound_capacity = capacity.max(1);
        self
    }

    /// Chooses between room relaying and plain echo.
    pub fn mode(mut self, mode: RelayMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Binds the listener. Frames are JSON.
    ///
    /// # Errors
    /// Returns `RelayError::Config` if the outbound queue capacity is 0,
    /// and a transport error if the address cannot be bound.
    pub async fn build(self) -> Result<RelayServer<JsonCodec>, RelayError> {
        if self.config.outbound_capacity == 0 {
            return Err(RelayError::Config(
                "outbound_capacity must be at least 1".to_string(),
            ));
        }

        let transport =
            WebSocketTransport::bind(&self.config.bind_addr, &self.config.path)
                .await?;

        let state = Arc::new(ServerState {
            rooms: Arc::new(RoomManager::new(JsonCodec)),
            codec: JsonCodec,
            config: self.config,
        });

        Ok(RelayServer { transport, state })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl RelayServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }
}

impl<C: Codec> RelayServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the room manager shared by every connection.
    pub fn rooms(&self) -> Arc<RoomManager<C>> {
        Arc::clone(&self.state.rooms)
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each connection is upgraded and served on its own task, so a slow
    /// handshake or a failing session never holds up anyone else.
    pub async fn run(mut self) -> Result<(), RelayError> {
        tracing::info!(
            mode = %self.state.config.mode,
            path = %self.state.config.path,
            "relay server running"
        );

        loop {
            let pending = match self.transport.accept_stream().await {
                Ok(pending) => pending,
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                    continue;
                }
            };

            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                let addr = pending.peer_addr();
                let conn = match pending.upgrade().await {
                    Ok(conn) => conn,
                    Err(TransportError::Upgrade(reason)) => {
                        tracing::debug!(%addr, %reason, "upgrade refused");
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(%addr, error = %e, "upgrade failed");
                        return;
                    }
                };
                if let Err(e) = handle_connection(conn, state).await {
                    tracing::debug!(
                        error = %e,
                        "connection ended with error"
                    );
                }
            });
        }
    }
}
