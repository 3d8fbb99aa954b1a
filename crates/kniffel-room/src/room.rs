//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Every action against a room travels through the actor's bounded
//! command queue and is applied in arrival order, so two actions on the
//! same room can never interleave. Rooms don't share any lock with each
//! other; the registry only holds their [`RoomHandle`]s.
//!
//! Automated players are driven from inside the actor. After any applied
//! mutation that leaves a bot holding the turn, the actor spawns a timer
//! that sleeps for the bot's thinking delay and then posts an
//! [`RoomCommand::AiTurn`] back into the queue, tagged with the room's
//! epoch. If the roster or phase changed in the meantime, the command
//! is recognised as stale and dropped.

use std::collections::HashMap;
use std::sync::Arc;

use kniffel_protocol::{
    Difficulty, PlayerId, RoomCode, RoomEvent, RoomSnapshot, ServerMessage, Standing,
};
use kniffel_rules::Category;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::bot::{self, BotAction};
use crate::{AiDelays, FinishedGame, GameError, GameRecorder, Player, Room, RoomConfig};

/// Channel sender for delivering server messages to one connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

type Reply<T> = oneshot::Sender<Result<T, GameError>>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
        reply: Reply<RoomSnapshot>,
    },
    AddAi {
        by: PlayerId,
        difficulty: Difficulty,
        reply: Reply<RoomSnapshot>,
    },
    Start {
        by: PlayerId,
        reply: Reply<RoomSnapshot>,
    },
    Roll {
        by: PlayerId,
        kept: Vec<bool>,
        reply: Reply<RoomSnapshot>,
    },
    Score {
        by: PlayerId,
        category: Category,
        reply: Reply<RoomSnapshot>,
    },
    Restart {
        by: PlayerId,
        reply: Reply<RoomSnapshot>,
    },
    Leave {
        player_id: PlayerId,
        reply: Reply<LeaveOutcome>,
    },
    Snapshot {
        reply: Reply<RoomSnapshot>,
    },
    /// A bot's thinking delay elapsed. Ignored unless `epoch` and
    /// `player_id` still match the room.
    AiTurn {
        epoch: u64,
        player_id: PlayerId,
    },
}

/// What happened when a player left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// `false` if the player wasn't seated in the room.
    pub removed: bool,
    /// No humans remain; the actor has stopped and the room should be
    /// forgotten.
    pub room_closed: bool,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone: it's just the room code and an `mpsc::Sender`. Every
/// method waits for the actor's reply, so a returned snapshot already
/// reflects the applied action.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Seats a human and registers the channel their messages go to.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, GameError> {
        self.request(|reply| RoomCommand::Join {
            player_id,
            name,
            sender,
            reply,
        })
        .await
    }

    pub async fn add_ai(
        &self,
        by: PlayerId,
        difficulty: Difficulty,
    ) -> Result<RoomSnapshot, GameError> {
        self.request(|reply| RoomCommand::AddAi {
            by,
            difficulty,
            reply,
        })
        .await
    }

    pub async fn start(&self, by: PlayerId) -> Result<RoomSnapshot, GameError> {
        self.request(|reply| RoomCommand::Start { by, reply }).await
    }

    pub async fn roll(&self, by: PlayerId, kept: Vec<bool>) -> Result<RoomSnapshot, GameError> {
        self.request(|reply| RoomCommand::Roll { by, kept, reply })
            .await
    }

    pub async fn submit_score(
        &self,
        by: PlayerId,
        category: Category,
    ) -> Result<RoomSnapshot, GameError> {
        self.request(|reply| RoomCommand::Score {
            by,
            category,
            reply,
        })
        .await
    }

    pub async fn restart(&self, by: PlayerId) -> Result<RoomSnapshot, GameError> {
        self.request(|reply| RoomCommand::Restart { by, reply }).await
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<LeaveOutcome, GameError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, GameError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Sends a command and waits for its reply. A stopped actor surfaces
    /// as [`GameError::Unavailable`].
    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| GameError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| GameError::Unavailable(self.code.clone()))?
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

struct RoomActor {
    room: Room,
    ai_delay: AiDelays,
    /// Outbound channels of the humans seated here.
    senders: HashMap<PlayerId, PlayerSender>,
    rng: StdRng,
    receiver: mpsc::Receiver<RoomCommand>,
    /// Lets bot timers post back without keeping the queue open.
    self_tx: mpsc::WeakSender<RoomCommand>,
    pending_ai: Option<JoinHandle<()>>,
    recorder: Arc<dyn GameRecorder>,
}

impl RoomActor {
    async fn run(mut self) {
        let code = self.room.code().clone();
        tracing::info!(room_code = %code, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    player_id,
                    name,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(player_id, name, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::AddAi {
                    by,
                    difficulty,
                    reply,
                } => {
                    let result = self.handle_add_ai(by, difficulty);
                    let _ = reply.send(result);
                }
                RoomCommand::Start { by, reply } => {
                    let result = self.handle_start(by);
                    let _ = reply.send(result);
                }
                RoomCommand::Roll { by, kept, reply } => {
                    let result = self.apply_roll(by, &kept);
                    let _ = reply.send(result);
                }
                RoomCommand::Score {
                    by,
                    category,
                    reply,
                } => {
                    let result = self.apply_score(by, category);
                    let _ = reply.send(result);
                }
                RoomCommand::Restart { by, reply } => {
                    let result = self.handle_restart(by);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { player_id, reply } => {
                    let outcome = self.handle_leave(player_id);
                    let _ = reply.send(Ok(outcome));
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(Ok(self.room.snapshot()));
                }
                RoomCommand::AiTurn { epoch, player_id } => {
                    self.handle_ai_turn(epoch, player_id);
                }
            }

            if self.room.human_count() == 0 {
                tracing::info!(room_code = %code, "no humans left, closing room");
                break;
            }
        }

        if let Some(task) = self.pending_ai.take() {
            task.abort();
        }
        tracing::info!(room_code = %code, "room actor stopped");
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, GameError> {
        self.room.join(Player::human(player_id, name.clone()))?;

        tracing::info!(
            room_code = %self.room.code(),
            %player_id,
            players = self.room.players().len(),
            "player joined"
        );
        let _ = sender.send(ServerMessage::Joined {
            room_code: self.room.code().clone(),
            player_id,
        });
        self.senders.insert(player_id, sender);
        Ok(self.after_mutation(RoomEvent::PlayerJoined { player_id, name }, None))
    }

    fn handle_add_ai(
        &mut self,
        by: PlayerId,
        difficulty: Difficulty,
    ) -> Result<RoomSnapshot, GameError> {
        let added = self.room.add_ai(by, difficulty)?;
        let event = RoomEvent::AiPlayerAdded {
            player_id: added.id,
            name: added.name.clone(),
            difficulty,
        };
        tracing::info!(
            room_code = %self.room.code(),
            %difficulty,
            players = self.room.players().len(),
            "automated player added"
        );
        Ok(self.after_mutation(event, None))
    }

    fn handle_start(&mut self, by: PlayerId) -> Result<RoomSnapshot, GameError> {
        self.room.start(by, &mut self.rng)?;
        tracing::info!(
            room_code = %self.room.code(),
            players = self.room.players().len(),
            "game started"
        );
        Ok(self.after_mutation(RoomEvent::GameStarted, None))
    }

    fn apply_roll(&mut self, by: PlayerId, kept: &[bool]) -> Result<RoomSnapshot, GameError> {
        self.room.roll(by, kept, &mut self.rng)?;
        tracing::debug!(
            room_code = %self.room.code(),
            player_id = %by,
            dice = ?self.room.dice().values(),
            rolls_left = self.room.rolls_left(),
            "dice rolled"
        );
        Ok(self.after_mutation(RoomEvent::DiceRolled { player_id: by }, None))
    }

    fn apply_score(&mut self, by: PlayerId, category: Category) -> Result<RoomSnapshot, GameError> {
        let outcome = self.room.submit_score(by, category, &mut self.rng)?;
        tracing::debug!(
            room_code = %self.room.code(),
            player_id = %by,
            %category,
            points = outcome.points,
            "score submitted"
        );
        let event = RoomEvent::ScoreSubmitted {
            player_id: by,
            category,
            points: outcome.points,
        };
        Ok(self.after_mutation(event, outcome.game_over))
    }

    fn handle_restart(&mut self, by: PlayerId) -> Result<RoomSnapshot, GameError> {
        self.room.restart(by)?;
        tracing::info!(room_code = %self.room.code(), "game restarted");
        Ok(self.after_mutation(RoomEvent::GameRestarted, None))
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> LeaveOutcome {
        self.senders.remove(&player_id);
        let removed = match self.room.remove_player(player_id, &mut self.rng) {
            Some(departure) => {
                tracing::info!(
                    room_code = %self.room.code(),
                    %player_id,
                    players = self.room.players().len(),
                    "player left"
                );
                let event = RoomEvent::PlayerLeft {
                    player_id,
                    new_host: departure.new_host,
                };
                self.after_mutation(event, departure.game_over);
                true
            }
            None => false,
        };
        LeaveOutcome {
            removed,
            room_closed: self.room.human_count() == 0,
        }
    }

    /// Plays one bot action if the bot still holds the turn it was
    /// scheduled for.
    fn handle_ai_turn(&mut self, epoch: u64, player_id: PlayerId) {
        let stale = epoch != self.room.epoch() || !self.room.phase().is_playing();
        let current = self
            .room
            .current_player()
            .filter(|p| !stale && p.id == player_id);
        let Some((difficulty, card)) =
            current.and_then(|p| p.difficulty.map(|d| (d, p.scores.clone())))
        else {
            tracing::debug!(
                room_code = %self.room.code(),
                %player_id,
                epoch,
                "stale automated turn ignored"
            );
            return;
        };
        self.pending_ai = None;

        let action = bot::decide(
            difficulty,
            self.room.rolls_left(),
            self.room.dice(),
            &card,
            &mut self.rng,
        );
        let result = match action {
            BotAction::Roll(keep) => self.apply_roll(player_id, &keep),
            BotAction::Score(category) => self.apply_score(player_id, category),
        };
        if let Err(err) = result {
            tracing::warn!(
                room_code = %self.room.code(),
                %player_id,
                error = %err,
                "automated action rejected"
            );
        }
    }

    /// Broadcasts the new state, announces a finished game, and hands the
    /// turn to a bot if one holds it.
    fn after_mutation(
        &mut self,
        event: RoomEvent,
        game_over: Option<Vec<Standing>>,
    ) -> RoomSnapshot {
        let snapshot = self.room.snapshot();
        self.broadcast(ServerMessage::RoomUpdate {
            event,
            room: snapshot.clone(),
        });

        if let Some(standings) = game_over {
            self.finish(standings);
        }

        self.schedule_ai();
        snapshot
    }

    fn finish(&self, standings: Vec<Standing>) {
        let Some(winner) = standings.first().cloned() else {
            return;
        };
        let room_code = self.room.code().clone();
        tracing::info!(
            room_code = %room_code,
            winner = %winner.player_id,
            score = winner.total_score,
            "game over"
        );
        self.broadcast(ServerMessage::GameOver {
            room_code: room_code.clone(),
            winner: winner.clone(),
            standings: standings.clone(),
        });

        let recorder = Arc::clone(&self.recorder);
        let game = FinishedGame {
            room_code,
            winner,
            standings,
        };
        tokio::spawn(async move { recorder.record(&game) });
    }

    /// Cancels any pending bot timer and starts a new one if a bot holds
    /// the turn.
    fn schedule_ai(&mut self) {
        if let Some(task) = self.pending_ai.take() {
            task.abort();
        }

        let Some(player) = self.room.current_player() else {
            return;
        };
        let Some(difficulty) = player.difficulty else {
            return;
        };

        let delay = self.ai_delay.for_difficulty(difficulty);
        let epoch = self.room.epoch();
        let player_id = player.id;
        let tx = self.self_tx.clone();
        self.pending_ai = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(RoomCommand::AiTurn { epoch, player_id }).await;
            }
        }));
    }

    /// Sends to every seated human. Closed channels are skipped; the
    /// gateway's disconnect handling removes the player.
    fn broadcast(&self, msg: ServerMessage) {
        for sender in self.senders.values() {
            let _ = sender.send(msg.clone());
        }
    }
}

/// Spawns a room actor with `host` seated and returns its handle plus the
/// initial snapshot.
///
/// The host's channel receives `Joined` and the `RoomCreated` update
/// before this returns.
pub(crate) fn spawn_room(
    code: RoomCode,
    host: PlayerId,
    host_name: String,
    sender: PlayerSender,
    config: &RoomConfig,
    recorder: Arc<dyn GameRecorder>,
) -> (RoomHandle, RoomSnapshot) {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));

    let mut actor = RoomActor {
        room: Room::new(code.clone(), Player::human(host, host_name), config),
        ai_delay: config.ai_delay.clone(),
        senders: HashMap::new(),
        rng: StdRng::from_os_rng(),
        receiver: rx,
        self_tx: tx.downgrade(),
        pending_ai: None,
        recorder,
    };

    let _ = sender.send(ServerMessage::Joined {
        room_code: code.clone(),
        player_id: host,
    });
    actor.senders.insert(host, sender);
    let snapshot = actor.after_mutation(RoomEvent::RoomCreated, None);

    tokio::spawn(actor.run());

    (RoomHandle { code, sender: tx }, snapshot)
}
