//! Error types for the room layer.

use kniffel_protocol::{ErrorKind, ProtocolError, RoomCode};
use kniffel_rules::Category;

/// Why a room rejected an action.
///
/// Every variant is a validation failure against the room's current state;
/// the room is never left half-mutated when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// No live room has this code.
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    /// No open seat: the room is at capacity or its game already began.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// A host-only action attempted by someone else.
    #[error("only the host can {0}")]
    NotAuthorized(&'static str),

    /// The host tried to start with too few seats filled.
    #[error("need at least {required} players to start, have {present}")]
    InsufficientPlayers { required: usize, present: usize },

    /// The caller doesn't hold the turn (or no game is running).
    #[error("it is not your turn")]
    NotYourTurn,

    /// All three rolls of this turn are used.
    #[error("no rolls left this turn")]
    NoRollsRemaining,

    /// Scoring before the first roll of the turn.
    #[error("roll at least once before scoring")]
    MustRollFirst,

    /// The caller's scorecard already holds this category.
    #[error("category {0} is already filled")]
    CategoryAlreadyUsed(Category),

    /// Malformed request: bad keep-mask, bad room code, bad name, or an
    /// action that makes no sense in the current phase.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The room's actor has stopped (room closed mid-request).
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}

impl GameError {
    /// The wire-level classification sent back to the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RoomNotFound(_) | Self::Unavailable(_) => ErrorKind::RoomNotFound,
            Self::RoomFull(_) => ErrorKind::RoomFull,
            Self::NotAuthorized(_) => ErrorKind::NotAuthorized,
            Self::InsufficientPlayers { .. } => ErrorKind::InsufficientPlayers,
            Self::NotYourTurn => ErrorKind::NotYourTurn,
            Self::NoRollsRemaining => ErrorKind::NoRollsRemaining,
            Self::MustRollFirst => ErrorKind::MustRollFirst,
            Self::CategoryAlreadyUsed(_) => ErrorKind::CategoryAlreadyUsed,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }
}

impl From<ProtocolError> for GameError {
    fn from(err: ProtocolError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_reports_as_not_found() {
        let code = RoomCode::parse("ABCD").unwrap();
        assert_eq!(GameError::Unavailable(code).kind(), ErrorKind::RoomNotFound);
    }

    #[test]
    fn test_protocol_error_becomes_invalid_input() {
        let err: GameError = RoomCode::parse("??").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("room code"));
    }

    #[test]
    fn test_messages_are_human_readable() {
        let err = GameError::InsufficientPlayers {
            required: 2,
            present: 1,
        };
        assert_eq!(err.to_string(), "need at least 2 players to start, have 1");
        assert_eq!(
            GameError::CategoryAlreadyUsed(Category::Chance).to_string(),
            "category chance is already filled"
        );
    }
}
