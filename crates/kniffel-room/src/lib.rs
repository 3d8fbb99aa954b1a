//! Room lifecycle management for Kniffel.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! [`Room`] state outright. Every mutation for a room is a command in that
//! task's queue, so actions against one room are applied strictly one at
//! a time while different rooms progress independently.
//!
//! # Key types
//!
//! - [`Room`] — the game state machine and turn driver (pure, no I/O)
//! - [`bot`] — the automated player's decision policy
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`RoomRegistry`] — creates rooms, resolves room codes, drops empty rooms
//! - [`GameRecorder`] — hook notified when a game finishes
//! - [`RoomConfig`] — player limits and AI pacing

pub mod bot;
mod config;
mod error;
mod game;
mod recorder;
mod registry;
mod room;

pub use config::{AiDelays, RoomConfig};
pub use error::GameError;
pub use game::{Departure, MAX_ROLLS, Player, Room, ScoreOutcome, TOTAL_ROUNDS};
pub use recorder::{FinishedGame, GameRecorder, TracingRecorder};
pub use registry::RoomRegistry;
pub use room::{LeaveOutcome, PlayerSender, RoomHandle};
