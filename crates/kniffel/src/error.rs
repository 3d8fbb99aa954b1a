//! Unified error type for the Kniffel server.

use kniffel_protocol::ProtocolError;
use kniffel_room::GameError;
use kniffel_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so `?` lifts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum KniffelError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, bad handshake).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A rejected room action.
    #[error(transparent)]
    Game(#[from] GameError),

    /// An environment variable held a value that couldn't be parsed.
    #[error("invalid value {value:?} for {var}")]
    Config { var: &'static str, value: String },
}
