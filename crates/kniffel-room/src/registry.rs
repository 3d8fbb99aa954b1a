//! Room registry: creates rooms, resolves room codes, forgets empty rooms.

use std::collections::HashMap;
use std::sync::Arc;

use kniffel_protocol::{PlayerId, RoomCode, RoomSnapshot};
use rand::Rng;
use tokio::sync::RwLock;

use crate::game::validate_display_name;
use crate::room::spawn_room;
use crate::{
    GameError, GameRecorder, LeaveOutcome, PlayerSender, RoomConfig, RoomHandle, TracingRecorder,
};

/// Tracks every live room by its code.
///
/// The map lock is held only for lookups, inserts, and removals, never
/// across an await on a room actor, so rooms progress independently. The
/// registry is an owned service object: the gateway holds one in an `Arc`
/// and tests build their own.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomCode, RoomHandle>>,
    config: RoomConfig,
    recorder: Arc<dyn GameRecorder>,
}

impl RoomRegistry {
    /// Creates an empty registry that logs finished games.
    pub fn new(config: RoomConfig) -> Self {
        Self::with_recorder(config, Arc::new(TracingRecorder))
    }

    /// Creates an empty registry that reports finished games to `recorder`.
    pub fn with_recorder(config: RoomConfig, recorder: Arc<dyn GameRecorder>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            config,
            recorder,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Opens a new room with a fresh code and seats `host` in it.
    ///
    /// `sender` receives `Joined` followed by the first snapshot.
    pub async fn create_room(
        &self,
        host: PlayerId,
        display_name: &str,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, GameError> {
        let name = validate_display_name(display_name)?;

        let mut rooms = self.rooms.write().await;
        let code = unused_code(&rooms);
        let (handle, snapshot) = spawn_room(
            code.clone(),
            host,
            name,
            sender,
            &self.config,
            Arc::clone(&self.recorder),
        );
        rooms.insert(code.clone(), handle);
        tracing::info!(room_code = %code, %host, rooms = rooms.len(), "room created");
        Ok(snapshot)
    }

    /// Returns the handle for `code`, if that room is live.
    pub async fn get(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.read().await.get(code).cloned()
    }

    /// Resolves `code` or fails with [`GameError::RoomNotFound`].
    pub async fn room(&self, code: &RoomCode) -> Result<RoomHandle, GameError> {
        self.get(code)
            .await
            .ok_or_else(|| GameError::RoomNotFound(code.clone()))
    }

    /// Seats a human in an existing room.
    pub async fn join(
        &self,
        code: &RoomCode,
        player_id: PlayerId,
        display_name: &str,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, GameError> {
        let name = validate_display_name(display_name)?;
        let handle = self.room(code).await?;
        handle.join(player_id, name, sender).await
    }

    /// Removes a player from a room, dropping the room once no humans
    /// remain.
    pub async fn leave(
        &self,
        code: &RoomCode,
        player_id: PlayerId,
    ) -> Result<LeaveOutcome, GameError> {
        let handle = self.room(code).await?;
        let outcome = match handle.leave(player_id).await {
            Ok(outcome) => outcome,
            // The actor already stopped; nothing left to leave.
            Err(GameError::Unavailable(_)) => LeaveOutcome {
                removed: false,
                room_closed: true,
            },
            Err(err) => return Err(err),
        };
        if outcome.room_closed {
            self.forget(code).await;
        }
        Ok(outcome)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    async fn forget(&self, code: &RoomCode) {
        if self.rooms.write().await.remove(code).is_some() {
            tracing::info!(room_code = %code, "room removed");
        }
    }
}

/// Draws random codes until one is not in use.
fn unused_code(rooms: &HashMap<RoomCode, RoomHandle>) -> RoomCode {
    let mut rng = rand::rng();
    loop {
        let code: String = (0..RoomCode::LEN)
            .map(|_| {
                let idx = rng.random_range(0..RoomCode::ALPHABET.len());
                char::from(RoomCode::ALPHABET[idx])
            })
            .collect();
        if let Ok(code) = RoomCode::parse(&code) {
            if !rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn test_create_room_assigns_unique_codes() {
        let registry = RoomRegistry::new(RoomConfig::default());
        let mut codes = std::collections::HashSet::new();
        for i in 0..20 {
            let (tx, _rx) = mpsc::unbounded_channel();
            let snap = registry
                .create_room(PlayerId::next(), &format!("host{i}"), tx)
                .await
                .unwrap();
            assert_eq!(snap.room_code.as_str().len(), RoomCode::LEN);
            codes.insert(snap.room_code);
        }
        assert_eq!(codes.len(), 20);
    }

    #[tokio::test]
    async fn test_create_room_rejects_blank_name() {
        let registry = RoomRegistry::new(RoomConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let err = registry
            .create_room(PlayerId::next(), "   ", tx)
            .await
            .unwrap_err();
        assert!(matches!(err, GameError::InvalidInput(_)));
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn test_join_unknown_room() {
        let registry = RoomRegistry::new(RoomConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let code = RoomCode::parse("ZZZZ").unwrap();
        let err = registry
            .join(&code, PlayerId::next(), "guest", tx)
            .await
            .unwrap_err();
        assert_eq!(err, GameError::RoomNotFound(code));
    }

    #[tokio::test]
    async fn test_leave_last_human_forgets_room() {
        let registry = RoomRegistry::new(RoomConfig::default());
        let host = PlayerId::next();
        let (tx, _rx) = mpsc::unbounded_channel();
        let snap = registry.create_room(host, "host", tx).await.unwrap();
        assert_eq!(registry.room_count().await, 1);

        let outcome = registry.leave(&snap.room_code, host).await.unwrap();
        assert!(outcome.room_closed);
        assert_eq!(registry.room_count().await, 0);
        assert!(registry.get(&snap.room_code).await.is_none());
    }
}
