//! Per-connection handler: handshake, request dispatch, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `Hello` → validate version, allocate a `PlayerId`
//!   2. Send `Welcome`
//!   3. Loop: decode requests → forward to the registry or a room
//!
//! Outbound traffic (replies, room broadcasts) goes through one unbounded
//! channel per connection, drained by a dedicated writer task. The room
//! actor holds a clone of that channel's sender, so broadcasts never wait
//! on this connection's reader.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use kniffel_protocol::{
    ClientMessage, Codec, ErrorKind, JsonCodec, PlayerId, ProtocolError, RoomCode, ServerMessage,
};
use kniffel_room::{GameError, PlayerSender, RoomHandle};
use kniffel_transport::{
    Connection, ConnectionReader, ConnectionWriter, WebSocketConnection, WebSocketReader,
    WebSocketWriter,
};
use tokio::sync::mpsc;

use crate::KniffelError;
use crate::server::{PROTOCOL_VERSION, ServerState};

/// One player's connection state. Leaves the player's room when dropped.
///
/// `Drop` is synchronous, so the leave runs on a spawned task. This
/// covers every exit path: clean close, idle timeout, read error, panic.
struct Session {
    player_id: PlayerId,
    room: Option<RoomCode>,
    outbound: PlayerSender,
    state: Arc<ServerState>,
}

impl Drop for Session {
    fn drop(&mut self) {
        let Some(code) = self.room.take() else {
            return;
        };
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Err(e) = state.registry.leave(&code, player_id).await {
                tracing::debug!(
                    %player_id,
                    room_code = %code,
                    error = %e,
                    "leave on disconnect failed"
                );
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), KniffelError> {
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    tracing::debug!(%conn_id, %peer, "handling new connection");

    let (mut writer, mut reader) = conn.split();

    // --- Step 1: Handshake ---
    let player_id = perform_handshake(&mut writer, &mut reader, &state).await?;
    tracing::info!(%conn_id, %player_id, "player connected");

    let (outbound, rx) = mpsc::unbounded_channel();
    tokio::spawn(write_loop(writer, rx, state.codec));

    let mut session = Session {
        player_id,
        room: None,
        outbound,
        state: Arc::clone(&state),
    };

    // --- Step 2: Request loop ---
    loop {
        let data = match tokio::time::timeout(state.config.idle_timeout, reader.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%player_id, "connection idle, dropping");
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode request");
                session.send(ServerMessage::Error {
                    kind: ErrorKind::InvalidInput,
                    message: e.to_string(),
                });
                continue;
            }
        };

        if let Err(e) = session.dispatch(msg).await {
            tracing::debug!(%player_id, error = %e, "request rejected");
            session.send(ServerMessage::Error {
                kind: e.kind(),
                message: e.to_string(),
            });
        }
    }

    // `session` drops here → leave fires, then the writer drains and closes.
    Ok(())
}

/// Waits for `Hello`, checks the version, and answers `Welcome`.
async fn perform_handshake(
    writer: &mut WebSocketWriter,
    reader: &mut WebSocketReader,
    state: &ServerState,
) -> Result<PlayerId, KniffelError> {
    let data = match tokio::time::timeout(state.config.handshake_timeout, reader.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            let reason = "connection closed before handshake".to_string();
            return Err(ProtocolError::InvalidMessage(reason).into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            send_direct(writer, state, handshake_error("handshake timed out")).await?;
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let version = match state.codec.decode::<ClientMessage>(&data) {
        Ok(ClientMessage::Hello { version }) => version,
        _ => {
            send_direct(writer, state, handshake_error("first message must be hello")).await?;
            return Err(ProtocolError::InvalidMessage("first message must be Hello".into()).into());
        }
    };

    if version != PROTOCOL_VERSION {
        let message = format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}");
        send_direct(writer, state, handshake_error(&message)).await?;
        return Err(ProtocolError::InvalidMessage(message).into());
    }

    let player_id = PlayerId::next();
    send_direct(
        writer,
        state,
        ServerMessage::Welcome {
            player_id,
            protocol_version: PROTOCOL_VERSION,
        },
    )
    .await?;
    Ok(player_id)
}

fn handshake_error(message: &str) -> ServerMessage {
    ServerMessage::Error {
        kind: ErrorKind::InvalidInput,
        message: message.to_string(),
    }
}

/// Writes one message straight to the socket. Used only before the
/// writer task exists.
async fn send_direct(
    writer: &mut WebSocketWriter,
    state: &ServerState,
    msg: ServerMessage,
) -> Result<(), KniffelError> {
    let bytes = state.codec.encode(&msg)?;
    writer.send(&bytes).await?;
    Ok(())
}

/// Drains a connection's outbound channel onto the socket, then closes it.
async fn write_loop(
    mut writer: WebSocketWriter,
    mut rx: mpsc::UnboundedReceiver<ServerMessage>,
    codec: JsonCodec,
) {
    while let Some(msg) = rx.recv().await {
        let bytes = match codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode outbound message");
                continue;
            }
        };
        if let Err(e) = writer.send(&bytes).await {
            tracing::debug!(error = %e, "send failed, stopping writer");
            return;
        }
    }
    let _ = writer.close().await;
}

impl Session {
    /// Queues a message for this connection only.
    fn send(&self, msg: ServerMessage) {
        let _ = self.outbound.send(msg);
    }

    async fn dispatch(&mut self, msg: ClientMessage) -> Result<(), GameError> {
        let registry = &self.state.registry;
        let player_id = self.player_id;

        match msg {
            ClientMessage::Hello { .. } => {
                return Err(GameError::InvalidInput("already greeted".into()));
            }

            ClientMessage::CreateRoom { display_name } => {
                self.ensure_roomless()?;
                let snapshot = registry
                    .create_room(player_id, &display_name, self.outbound.clone())
                    .await?;
                self.room = Some(snapshot.room_code);
            }

            ClientMessage::JoinRoom {
                room_code,
                display_name,
            } => {
                self.ensure_roomless()?;
                let code = RoomCode::parse(&room_code)?;
                registry
                    .join(&code, player_id, &display_name, self.outbound.clone())
                    .await?;
                self.room = Some(code);
            }

            ClientMessage::AddAiPlayer {
                room_code,
                difficulty,
            } => {
                self.room_handle(&room_code).await?.add_ai(player_id, difficulty).await?;
            }

            ClientMessage::StartGame { room_code } => {
                self.room_handle(&room_code).await?.start(player_id).await?;
            }

            ClientMessage::RollDice { room_code, kept } => {
                self.room_handle(&room_code).await?.roll(player_id, kept).await?;
            }

            ClientMessage::SubmitScore {
                room_code,
                category,
            } => {
                self.room_handle(&room_code)
                    .await?
                    .submit_score(player_id, category)
                    .await?;
            }

            ClientMessage::RestartGame { room_code } => {
                self.room_handle(&room_code).await?.restart(player_id).await?;
            }

            ClientMessage::LeaveRoom => {
                let code = self
                    .room
                    .take()
                    .ok_or_else(|| GameError::InvalidInput("not in a room".into()))?;
                match registry.leave(&code, player_id).await {
                    Ok(_) | Err(GameError::RoomNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
                self.send(ServerMessage::Left { room_code: code });
            }

            ClientMessage::Heartbeat { client_time } => {
                self.send(ServerMessage::HeartbeatAck {
                    client_time,
                    server_time: unix_millis(),
                });
            }
        }
        Ok(())
    }

    fn ensure_roomless(&self) -> Result<(), GameError> {
        match &self.room {
            Some(code) => Err(GameError::InvalidInput(format!("already in room {code}"))),
            None => Ok(()),
        }
    }

    /// Resolves a client-supplied code. Membership and turn checks are
    /// left to the room itself.
    async fn room_handle(&self, room_code: &str) -> Result<RoomHandle, GameError> {
        let code = RoomCode::parse(room_code)?;
        self.state.registry.room(&code).await
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
