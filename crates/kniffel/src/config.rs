//! Server configuration.

use std::str::FromStr;
use std::time::Duration;

use kniffel_room::{AiDelays, RoomConfig};
use serde::{Deserialize, Serialize};

use crate::KniffelError;

/// Everything the server needs to start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// How long a new connection may take to send `Hello`.
    pub handshake_timeout: Duration,

    /// A connection silent for this long is treated as disconnected.
    /// Clients keep it alive with `Heartbeat`.
    pub idle_timeout: Duration,

    /// Applied to every room.
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Builds a config from `KNIFFEL_*` environment variables, falling back
    /// to defaults for anything unset.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `KNIFFEL_BIND` | `bind_addr` |
    /// | `KNIFFEL_MIN_PLAYERS` | `room.min_players` |
    /// | `KNIFFEL_MAX_PLAYERS` | `room.max_players` |
    /// | `KNIFFEL_IDLE_TIMEOUT_SECS` | `idle_timeout` |
    /// | `KNIFFEL_AI_DELAY_MS` | `room.ai_delay` (medium; easy and hard scale from it) |
    ///
    /// # Errors
    /// [`KniffelError::Config`] if a variable is set but doesn't parse.
    pub fn from_env() -> Result<Self, KniffelError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, KniffelError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("KNIFFEL_BIND") {
            config.bind_addr = addr;
        }
        if let Some(n) = parse_var(&lookup, "KNIFFEL_MIN_PLAYERS")? {
            config.room.min_players = n;
        }
        if let Some(n) = parse_var(&lookup, "KNIFFEL_MAX_PLAYERS")? {
            config.room.max_players = n;
        }
        if let Some(secs) = parse_var(&lookup, "KNIFFEL_IDLE_TIMEOUT_SECS")? {
            config.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var(&lookup, "KNIFFEL_AI_DELAY_MS")? {
            config.room.ai_delay = AiDelays::scaled(Duration::from_millis(ms));
        }

        if config.room.min_players == 0 || config.room.min_players > config.room.max_players {
            return Err(KniffelError::Config {
                var: "KNIFFEL_MIN_PLAYERS",
                value: config.room.min_players.to_string(),
            });
        }
        Ok(config)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, KniffelError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| KniffelError::Config { var, value }),
    }
}
