//! Room configuration.

use std::time::Duration;

use kniffel_protocol::Difficulty;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AiDelays
// ---------------------------------------------------------------------------

/// How long an automated player "thinks" before each action.
///
/// Purely cosmetic pacing so clients can follow AI turns; the room keeps
/// serving other commands while a delay is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiDelays {
    pub easy: Duration,
    pub medium: Duration,
    pub hard: Duration,
}

impl AiDelays {
    /// The same delay for every difficulty. Handy in tests.
    pub fn uniform(delay: Duration) -> Self {
        Self {
            easy: delay,
            medium: delay,
            hard: delay,
        }
    }

    /// Medium thinks for `base`; easy for 3/5 of it and hard for 3/2.
    pub fn scaled(base: Duration) -> Self {
        Self {
            easy: base * 3 / 5,
            medium: base,
            hard: base * 3 / 2,
        }
    }

    pub fn for_difficulty(&self, difficulty: Difficulty) -> Duration {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

impl Default for AiDelays {
    fn default() -> Self {
        Self::scaled(Duration::from_millis(1000))
    }
}

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every room the registry creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Minimum seats (human or AI) before the host may start.
    pub min_players: usize,

    /// Maximum seats in a room.
    pub max_players: usize,

    /// AI thinking time per difficulty.
    pub ai_delay: AiDelays,

    /// Capacity of each room's command queue. Senders wait when it fills.
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 6,
            ai_delay: AiDelays::default(),
            channel_size: 64,
        }
    }
}
