//! `KniffelServer` builder and accept loop.
//!
//! This is the entry point for running a Kniffel server. It ties
//! together the layers: transport → gateway → room registry.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use kniffel_protocol::JsonCodec;
use kniffel_room::{GameRecorder, RoomConfig, RoomRegistry, TracingRecorder};
use kniffel_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{KniffelError, ServerConfig};

/// The current protocol version. Clients must send this in `Hello` or
/// be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) registry: RoomRegistry,
    pub(crate) codec: JsonCodec,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Kniffel server.
///
/// # Example
///
/// ```rust,no_run
/// use kniffel::prelude::*;
///
/// # async fn run() -> Result<(), KniffelError> {
/// let server = KniffelServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct KniffelServerBuilder {
    config: ServerConfig,
    recorder: Arc<dyn GameRecorder>,
}

impl KniffelServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            recorder: Arc::new(TracingRecorder),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn room_config(mut self, room: RoomConfig) -> Self {
        self.config.room = room;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Sets where finished games are reported. Defaults to the log.
    pub fn recorder(mut self, recorder: Arc<dyn GameRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Binds the listener. Connections are accepted once
    /// [`KniffelServer::run`] is called.
    pub async fn build(self) -> Result<KniffelServer, KniffelError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            registry: RoomRegistry::with_recorder(self.config.room.clone(), self.recorder),
            codec: JsonCodec,
            config: self.config,
        });

        Ok(KniffelServer { transport, state })
    }
}

impl Default for KniffelServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Kniffel server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct KniffelServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl KniffelServer {
    /// Creates a new builder.
    pub fn builder() -> KniffelServerBuilder {
        KniffelServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, KniffelError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the accept loop, spawning a handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), KniffelError> {
        tracing::info!("Kniffel server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
