//! The room state machine and turn driver.
//!
//! [`Room`] holds everything about one game session and is the only code
//! that mutates it. Every operation validates first and mutates second, so
//! a rejected action leaves the room exactly as it was. No I/O happens
//! here: the actor in `room.rs` owns a `Room`, feeds it commands, and
//! broadcasts the resulting snapshots.

use std::cmp::Reverse;

use kniffel_protocol::{
    Difficulty, Phase, PlayerId, PlayerView, RoomCode, RoomSnapshot, Standing,
};
use kniffel_rules::{Category, DICE_COUNT, Dice, KeepMask, Scorecard};
use rand::Rng;

use crate::{GameError, RoomConfig};

/// Rolls available at the start of every turn.
pub const MAX_ROLLS: u8 = 3;

/// Rounds in a full game: one per category.
pub const TOTAL_ROUNDS: u8 = Category::COUNT as u8;

/// Longest display name accepted, in characters.
const MAX_NAME_CHARS: usize = 24;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One seat at the table.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    /// `Some` for automated players.
    pub difficulty: Option<Difficulty>,
    pub scores: Scorecard,
}

impl Player {
    pub fn human(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_host: false,
            difficulty: None,
            scores: Scorecard::new(),
        }
    }

    pub fn ai(id: PlayerId, name: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            difficulty: Some(difficulty),
            ..Self::human(id, name)
        }
    }

    pub fn is_ai(&self) -> bool {
        self.difficulty.is_some()
    }

    fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            is_host: self.is_host,
            is_ai: self.is_ai(),
            difficulty: self.difficulty,
            scores: self.scores.clone(),
            upper_bonus: self.scores.upper_bonus(),
            total: self.scores.total(),
        }
    }
}

/// Trims a display name and checks it is non-empty and not too long.
pub(crate) fn validate_display_name(name: &str) -> Result<String, GameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidInput("display name is empty".into()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(GameError::InvalidInput(format!(
            "display name is longer than {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of an accepted score submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreOutcome {
    pub points: u32,
    /// Final standings, present only on the submission that finished the game.
    pub game_over: Option<Vec<Standing>>,
}

/// Result of removing a player from the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// The player who inherited the host role, if the leaver held it.
    pub new_host: Option<PlayerId>,
    /// Final standings if the departure completed the game.
    pub game_over: Option<Vec<Standing>>,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One game session: roster, turn pointer, dice, and phase.
#[derive(Debug, Clone)]
pub struct Room {
    code: RoomCode,
    min_players: usize,
    max_players: usize,
    /// Turn order is join order.
    players: Vec<Player>,
    current: usize,
    round: u8,
    rolls_left: u8,
    dice: Dice,
    kept: KeepMask,
    phase: Phase,
    /// Bumped on structural changes (start, removal, restart). Deferred AI
    /// actions carry the epoch they were scheduled under.
    epoch: u64,
    /// Bumped on every applied mutation.
    version: u64,
    ai_added: u32,
}

impl Room {
    /// Creates a waiting room whose only seat is the host.
    pub fn new(code: RoomCode, mut host: Player, config: &RoomConfig) -> Self {
        host.is_host = true;
        Self {
            code,
            min_players: config.min_players.max(1),
            max_players: config.max_players.max(1),
            players: vec![host],
            current: 0,
            round: 1,
            rolls_left: MAX_ROLLS,
            dice: Dice::default(),
            kept: [false; DICE_COUNT],
            phase: Phase::Waiting,
            epoch: 0,
            version: 0,
            ai_added: 0,
        }
    }

    // -- Accessors --------------------------------------------------------

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn current_player_index(&self) -> usize {
        self.current
    }

    /// The player holding the turn, only while `Playing`.
    pub fn current_player(&self) -> Option<&Player> {
        if self.phase.is_playing() {
            self.players.get(self.current)
        } else {
            None
        }
    }

    pub fn current_round(&self) -> u8 {
        self.round
    }

    pub fn rolls_left(&self) -> u8 {
        self.rolls_left
    }

    pub fn dice(&self) -> &Dice {
        &self.dice
    }

    pub fn kept(&self) -> &KeepMask {
        &self.kept
    }

    pub fn human_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_ai()).count()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    // -- Roster -----------------------------------------------------------

    /// Seats a new human player.
    pub fn join(&mut self, player: Player) -> Result<(), GameError> {
        if !self.phase.is_joinable() || self.is_full() {
            return Err(GameError::RoomFull(self.code.clone()));
        }
        if self.player(player.id).is_some() {
            return Err(GameError::InvalidInput(format!(
                "player {} is already in room {}",
                player.id, self.code
            )));
        }
        self.players.push(Player {
            is_host: false,
            ..player
        });
        self.version += 1;
        Ok(())
    }

    /// Seats an automated player. Host only, while waiting.
    pub fn add_ai(&mut self, by: PlayerId, difficulty: Difficulty) -> Result<&Player, GameError> {
        self.require_host(by, "add automated players")?;
        if !self.phase.is_joinable() || self.is_full() {
            return Err(GameError::RoomFull(self.code.clone()));
        }
        self.ai_added += 1;
        let name = format!("Bot {}", self.ai_added);
        self.players.push(Player::ai(PlayerId::next(), name, difficulty));
        self.version += 1;
        Ok(&self.players[self.players.len() - 1])
    }

    /// Removes a player, repairing host and turn state.
    ///
    /// If the leaver held the turn, the turn passes exactly as if they had
    /// finished it (including the round wrap). Returns `None` if the
    /// player wasn't seated here.
    pub fn remove_player<R: Rng + ?Sized>(
        &mut self,
        id: PlayerId,
        rng: &mut R,
    ) -> Option<Departure> {
        let idx = self.players.iter().position(|p| p.id == id)?;
        let removed = self.players.remove(idx);
        self.epoch += 1;
        self.version += 1;

        let mut new_host = None;
        if removed.is_host {
            if let Some(heir) = self.players.iter_mut().find(|p| !p.is_ai()) {
                heir.is_host = true;
                new_host = Some(heir.id);
            }
        }

        let mut game_over = None;
        if self.players.is_empty() {
            self.current = 0;
        } else if self.phase.is_playing() {
            if self.all_cards_complete() {
                game_over = Some(self.finish());
            } else if idx < self.current {
                self.current -= 1;
            } else if idx == self.current {
                // The next seat slid into `idx`; only a wrap needs handling.
                if self.current >= self.players.len() {
                    self.current = 0;
                    self.round += 1;
                }
                self.reset_turn(rng);
            }
        } else if self.current >= self.players.len() {
            self.current = 0;
        }

        Some(Departure { new_host, game_over })
    }

    // -- Turn driver ------------------------------------------------------

    /// `Waiting → Playing`. Host only.
    pub fn start<R: Rng + ?Sized>(&mut self, by: PlayerId, rng: &mut R) -> Result<(), GameError> {
        self.require_host(by, "start the game")?;
        if !self.phase.is_joinable() {
            return Err(GameError::InvalidInput(format!(
                "game is already {}",
                self.phase
            )));
        }
        if self.players.len() < self.min_players {
            return Err(GameError::InsufficientPlayers {
                required: self.min_players,
                present: self.players.len(),
            });
        }

        self.phase = Phase::Playing;
        self.current = 0;
        self.round = 1;
        self.epoch += 1;
        self.version += 1;
        self.reset_turn(rng);
        Ok(())
    }

    /// Rerolls every die not flagged in `kept`.
    pub fn roll<R: Rng + ?Sized>(
        &mut self,
        by: PlayerId,
        kept: &[bool],
        rng: &mut R,
    ) -> Result<(), GameError> {
        self.require_turn(by)?;
        let mask: KeepMask = kept.try_into().map_err(|_| {
            GameError::InvalidInput(format!(
                "keep-mask must have {DICE_COUNT} entries, got {}",
                kept.len()
            ))
        })?;
        if self.rolls_left == 0 {
            return Err(GameError::NoRollsRemaining);
        }

        self.dice.reroll(&mask, rng);
        self.kept = mask;
        self.rolls_left -= 1;
        self.version += 1;
        Ok(())
    }

    /// Writes the current dice into one of the caller's open categories and
    /// passes the turn.
    pub fn submit_score<R: Rng + ?Sized>(
        &mut self,
        by: PlayerId,
        category: Category,
        rng: &mut R,
    ) -> Result<ScoreOutcome, GameError> {
        self.require_turn(by)?;
        if self.rolls_left >= MAX_ROLLS {
            return Err(GameError::MustRollFirst);
        }

        let dice = self.dice;
        let points = self.players[self.current]
            .scores
            .record_dice(category, &dice)
            .map_err(|_| GameError::CategoryAlreadyUsed(category))?;
        self.version += 1;

        let game_over = if self.all_cards_complete() {
            Some(self.finish())
        } else {
            self.advance_turn(rng);
            None
        };
        Ok(ScoreOutcome { points, game_over })
    }

    /// `Finished → Waiting` with cleared scorecards. Host only.
    pub fn restart(&mut self, by: PlayerId) -> Result<(), GameError> {
        self.require_host(by, "restart the game")?;
        if self.phase != Phase::Finished {
            return Err(GameError::InvalidInput(format!(
                "cannot restart while {}",
                self.phase
            )));
        }
        for p in &mut self.players {
            p.scores.clear();
        }
        self.phase = Phase::Waiting;
        self.current = 0;
        self.round = 1;
        self.rolls_left = MAX_ROLLS;
        self.kept = [false; DICE_COUNT];
        self.epoch += 1;
        self.version += 1;
        Ok(())
    }

    /// Players ranked by total, highest first. Equal totals keep join order.
    pub fn standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .players
            .iter()
            .map(|p| Standing {
                player_id: p.id,
                name: p.name.clone(),
                total_score: p.scores.total(),
            })
            .collect();
        // Stable sort: ties stay in join order.
        standings.sort_by_key(|s| Reverse(s.total_score));
        standings
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_code: self.code.clone(),
            version: self.version,
            phase: self.phase,
            players: self.players.iter().map(Player::view).collect(),
            current_player_index: self.current,
            current_round: self.round,
            rolls_left: self.rolls_left,
            dice: self.dice,
            kept: self.kept,
        }
    }

    // -- Internals --------------------------------------------------------

    fn require_host(&self, by: PlayerId, action: &'static str) -> Result<(), GameError> {
        match self.player(by) {
            Some(p) if p.is_host => Ok(()),
            _ => Err(GameError::NotAuthorized(action)),
        }
    }

    fn require_turn(&self, by: PlayerId) -> Result<(), GameError> {
        match self.current_player() {
            Some(p) if p.id == by => Ok(()),
            _ => Err(GameError::NotYourTurn),
        }
    }

    fn all_cards_complete(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.scores.is_complete())
    }

    fn advance_turn<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.current = (self.current + 1) % self.players.len();
        if self.current == 0 {
            self.round += 1;
        }
        self.reset_turn(rng);
    }

    fn reset_turn<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.rolls_left = MAX_ROLLS;
        self.dice = Dice::roll(rng);
        self.kept = [false; DICE_COUNT];
    }

    fn finish(&mut self) -> Vec<Standing> {
        self.phase = Phase::Finished;
        self.epoch += 1;
        self.standings()
    }
}

// =========================================================================
// Tests
// =========================================================================
