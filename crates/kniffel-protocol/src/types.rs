//! Core protocol types for the Kniffel wire format.
//!
//! Every request a client can make is one variant of [`ClientMessage`];
//! every event the server emits is one variant of [`ServerMessage`].
//! Both are internally tagged (`{"type": "roll_dice", ...}`) so browser
//! clients can switch on a single field.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use kniffel_rules::{Category, Dice, KeepMask, Scorecard};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Counter for allocating player IDs (humans and AI alike).
static NEXT_PLAYER_ID: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for a player.
///
/// Humans get one per connection; every AI seat gets its own. Serialized
/// as a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl PlayerId {
    /// Allocates a process-unique player ID.
    pub fn next() -> Self {
        Self(NEXT_PLAYER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The 4-character code that names a live room and doubles as its join
/// token. Always upper-case ASCII letters and digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Length of every room code.
    pub const LEN: usize = 4;

    /// Characters a generated code may contain.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Parses user input into a code: trims, upper-cases, then checks
    /// length and alphabet.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] if the input isn't 4 letters/digits.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let code = input.trim().to_ascii_uppercase();
        if code.len() != Self::LEN || !code.bytes().all(|b| Self::ALPHABET.contains(&b)) {
            return Err(ProtocolError::InvalidMessage(format!(
                "room code must be {} letters or digits, got {input:?}",
                Self::LEN
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game enums
// ---------------------------------------------------------------------------

/// Strength of an automated player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => f.write_str("easy"),
            Self::Medium => f.write_str("medium"),
            Self::Hard => f.write_str("hard"),
        }
    }
}

/// The lifecycle phase of a room.
///
/// ```text
/// Waiting ──(host starts)──→ Playing ──(all cards full)──→ Finished
///    ↑                                                        │
///    └───────────────────(host restarts)──────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Playing,
    Finished,
}

impl Phase {
    /// Returns `true` if the room accepts new players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` while turns are being played.
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("waiting"),
            Self::Playing => f.write_str("playing"),
            Self::Finished => f.write_str("finished"),
        }
    }
}

/// Why an action was rejected. Sent only to the player who attempted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    RoomNotFound,
    RoomFull,
    NotAuthorized,
    InsufficientPlayers,
    NotYourTurn,
    NoRollsRemaining,
    MustRollFirst,
    CategoryAlreadyUsed,
    InvalidInput,
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// One seat at the table as observers see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub is_ai: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    pub scores: Scorecard,
    pub upper_bonus: u32,
    pub total: u32,
}

/// Full room state, broadcast after every applied mutation.
///
/// `version` increases by one per mutation, so clients can verify they
/// see snapshots in the order the room applied them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_code: RoomCode,
    pub version: u64,
    pub phase: Phase,
    /// Seats in turn order (join order).
    pub players: Vec<PlayerView>,
    pub current_player_index: usize,
    pub current_round: u8,
    pub rolls_left: u8,
    pub dice: Dice,
    pub kept: KeepMask,
}

impl RoomSnapshot {
    /// The seat whose turn it is, if a game is running.
    pub fn current_player(&self) -> Option<&PlayerView> {
        if self.phase.is_playing() {
            self.players.get(self.current_player_index)
        } else {
            None
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.id == id)
    }
}

/// One line of the final ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub player_id: PlayerId,
    pub name: String,
    pub total_score: u32,
}

/// What caused a [`ServerMessage::RoomUpdate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoomEvent {
    RoomCreated,
    PlayerJoined {
        player_id: PlayerId,
        name: String,
    },
    AiPlayerAdded {
        player_id: PlayerId,
        name: String,
        difficulty: Difficulty,
    },
    GameStarted,
    DiceRolled {
        player_id: PlayerId,
    },
    ScoreSubmitted {
        player_id: PlayerId,
        category: Category,
        points: u32,
    },
    PlayerLeft {
        player_id: PlayerId,
        /// Set when the departing player held the host role.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_host: Option<PlayerId>,
    },
    GameRestarted,
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Every request a client can send.
///
/// Room codes arrive as raw strings and are normalized by the gateway, so
/// a lower-case or padded code still finds its room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First message on every connection.
    Hello { version: u32 },

    CreateRoom { display_name: String },

    JoinRoom { room_code: String, display_name: String },

    /// Host only, while waiting.
    AddAiPlayer { room_code: String, difficulty: Difficulty },

    /// Host only.
    StartGame { room_code: String },

    /// `kept[i] == true` keeps die `i`. Must have exactly five entries.
    RollDice { room_code: String, kept: Vec<bool> },

    SubmitScore { room_code: String, category: Category },

    /// Host only, once the game is finished.
    RestartGame { room_code: String },

    /// Leave the current room but keep the connection.
    LeaveRoom,

    Heartbeat { client_time: u64 },
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Every event the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reply to `Hello`: the identity this connection plays as.
    Welcome {
        player_id: PlayerId,
        protocol_version: u32,
    },

    /// Sent to a player who just created or joined a room, before the
    /// first snapshot.
    Joined {
        room_code: RoomCode,
        player_id: PlayerId,
    },

    /// Broadcast to everyone in the room after each applied mutation.
    RoomUpdate { event: RoomEvent, room: RoomSnapshot },

    /// Broadcast exactly once when the room reaches `Finished`.
    GameOver {
        room_code: RoomCode,
        winner: Standing,
        standings: Vec<Standing>,
    },

    /// Reply to `LeaveRoom`.
    Left { room_code: RoomCode },

    HeartbeatAck { client_time: u64, server_time: u64 },

    /// A rejected action. Only the caller receives this.
    Error { kind: ErrorKind, message: String },
}

// =========================================================================
// Tests
// =========================================================================
