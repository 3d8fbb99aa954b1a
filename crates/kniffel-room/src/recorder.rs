//! Hook for reporting finished games to an outside collaborator.
//!
//! The room actor hands each finished game to a [`GameRecorder`] on a
//! spawned task and never waits for it, so a slow or failing recorder
//! cannot stall gameplay.

use kniffel_protocol::{RoomCode, Standing};

/// The final result of one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedGame {
    pub room_code: RoomCode,
    pub winner: Standing,
    /// Highest total first, ties in join order.
    pub standings: Vec<Standing>,
}

/// Receives finished games, e.g. for a history or stats store.
pub trait GameRecorder: Send + Sync + 'static {
    fn record(&self, game: &FinishedGame);
}

/// Default recorder: writes the result to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl GameRecorder for TracingRecorder {
    fn record(&self, game: &FinishedGame) {
        tracing::info!(
            room_code = %game.room_code,
            winner = %game.winner.name,
            winning_score = game.winner.total_score,
            players = game.standings.len(),
            "game finished"
        );
    }
}
