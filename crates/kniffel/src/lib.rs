//! # Kniffel
//!
//! A multiplayer Kniffel (Yahtzee) room server. Browser clients connect
//! over WebSocket, speak JSON messages from [`kniffel_protocol`], and play
//! in rooms driven by [`kniffel_room`] actors, optionally against bots.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kniffel::prelude::*;
//!
//! # async fn run() -> Result<(), KniffelError> {
//! let server = KniffelServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::KniffelError;
pub use server::{KniffelServer, KniffelServerBuilder, PROTOCOL_VERSION};

/// Everything needed to embed a server or write a client against it.
pub mod prelude {
    pub use crate::{
        KniffelError, KniffelServer, KniffelServerBuilder, PROTOCOL_VERSION, ServerConfig,
    };
    pub use kniffel_protocol::{
        ClientMessage, Difficulty, ErrorKind, Phase, PlayerId, RoomCode, RoomEvent, RoomSnapshot,
        ServerMessage, Standing,
    };
    pub use kniffel_room::{AiDelays, FinishedGame, GameRecorder, RoomConfig};
    pub use kniffel_rules::{Category, Dice, Scorecard};
}
