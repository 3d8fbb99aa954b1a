//! Wire protocol for the Kniffel server.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Requests** ([`ClientMessage`]) — one tagged variant per client action.
//! - **Events** ([`ServerMessage`]) — room snapshots, game-over standings,
//!   and errors directed at a single caller.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how messages become bytes.
//!
//! It knows nothing about sockets or room actors.
//!
//! ```text
//! Transport (frames) → Protocol (ClientMessage / ServerMessage) → Room
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, Difficulty, ErrorKind, Phase, PlayerId, PlayerView, RoomCode, RoomEvent,
    RoomSnapshot, ServerMessage, Standing,
};
