//! Transport abstraction layer for Kniffel.
//!
//! Provides the [`Transport`] and [`Connection`] traits that the gateway
//! is written against. A connection splits into a writer and a reader so
//! one task can push room broadcasts while another waits for requests.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketReader, WebSocketTransport, WebSocketWriter};

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// The address the transport is listening on.
    fn local_addr(&self) -> Result<SocketAddr, Self::Error>;
}

/// An accepted connection, ready to be split into its two halves.
pub trait Connection: Send + 'static {
    type Error: std::error::Error + Send + Sync;
    type Writer: ConnectionWriter<Error = Self::Error>;
    type Reader: ConnectionReader<Error = Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// The remote peer's address.
    fn peer_addr(&self) -> SocketAddr;

    /// Splits the connection so reading and writing can run in
    /// separate tasks.
    fn split(self) -> (Self::Writer, Self::Reader);
}

/// The sending half of a connection.
pub trait ConnectionWriter: Send + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one message to the remote peer.
    async fn send(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Closes the connection.
    async fn close(&mut self) -> Result<(), Self::Error>;
}

/// The receiving half of a connection.
pub trait ConnectionReader: Send + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, Self::Error>;
}
