//! Integration tests for the Kniffel server: handshake, rooms, and full
//! games over a real WebSocket connection.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use kniffel::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn test_config() -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1:0".into(),
        room: RoomConfig {
            ai_delay: AiDelays::uniform(Duration::from_millis(1)),
            ..RoomConfig::default()
        },
        ..ServerConfig::default()
    }
}

/// Starts a server on a random port and returns the address.
async fn start_server(config: ServerConfig) -> String {
    let server = KniffelServer::builder()
        .config(config)
        .build()
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("should have local addr").to_string();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, msg: &ClientMessage) {
    let text = serde_json::to_string(msg).unwrap();
    ws.send(Message::Text(text.into())).await.unwrap();
}

async fn send_raw(ws: &mut ClientWs, text: &str) {
    ws.send(Message::Text(text.to_owned().into())).await.unwrap();
}

/// Next server message, or `None` if the connection closed.
async fn recv(ws: &mut ClientWs) -> Option<ServerMessage> {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for server");
        match frame {
            Some(Ok(Message::Text(text))) => {
                return Some(serde_json::from_str(text.as_str()).expect("valid server message"));
            }
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return None,
            Some(Ok(_)) => continue,
        }
    }
}

async fn expect_msg(ws: &mut ClientWs) -> ServerMessage {
    recv(ws).await.expect("connection closed unexpectedly")
}

/// Asserts nothing arrives within a short window.
async fn expect_silence(ws: &mut ClientWs) {
    let got = tokio::time::timeout(Duration::from_millis(100), ws.next()).await;
    assert!(got.is_err(), "expected no message, got {got:?}");
}

/// Connects and completes the handshake.
async fn hello(addr: &str) -> (ClientWs, PlayerId) {
    let mut ws = connect(addr).await;
    send(&mut ws, &ClientMessage::Hello { version: PROTOCOL_VERSION }).await;
    match expect_msg(&mut ws).await {
        ServerMessage::Welcome {
            player_id,
            protocol_version,
        } => {
            assert_eq!(protocol_version, PROTOCOL_VERSION);
            (ws, player_id)
        }
        other => panic!("expected Welcome, got {other:?}"),
    }
}

/// Creates a room and consumes `Joined` + the first update.
async fn create_room(ws: &mut ClientWs, name: &str) -> RoomSnapshot {
    send(
        ws,
        &ClientMessage::CreateRoom {
            display_name: name.into(),
        },
    )
    .await;
    assert!(matches!(expect_msg(ws).await, ServerMessage::Joined { .. }));
    match expect_msg(ws).await {
        ServerMessage::RoomUpdate {
            event: RoomEvent::RoomCreated,
            room,
        } => room,
        other => panic!("expected RoomCreated, got {other:?}"),
    }
}

async fn expect_update(ws: &mut ClientWs) -> (RoomEvent, RoomSnapshot) {
    match expect_msg(ws).await {
        ServerMessage::RoomUpdate { event, room } => (event, room),
        other => panic!("expected RoomUpdate, got {other:?}"),
    }
}

async fn expect_error(ws: &mut ClientWs) -> ErrorKind {
    match expect_msg(ws).await {
        ServerMessage::Error { kind, .. } => kind,
        other => panic!("expected Error, got {other:?}"),
    }
}

// =========================================================================
// Handshake and connection
// =========================================================================

#[tokio::test]
async fn test_handshake_assigns_distinct_ids() {
    let addr = start_server(test_config()).await;
    let (_a, id_a) = hello(&addr).await;
    let (_b, id_b) = hello(&addr).await;
    assert_ne!(id_a, id_b);
}

#[tokio::test]
async fn test_wrong_version_is_rejected_and_closed() {
    let addr = start_server(test_config()).await;
    let mut ws = connect(&addr).await;
    send(&mut ws, &ClientMessage::Hello { version: 99 }).await;

    assert_eq!(expect_error(&mut ws).await, ErrorKind::InvalidInput);
    assert!(recv(&mut ws).await.is_none());
}

#[tokio::test]
async fn test_silent_handshake_times_out_with_error() {
    let config = ServerConfig {
        handshake_timeout: Duration::from_millis(100),
        ..test_config()
    };
    let addr = start_server(config).await;
    let mut ws = connect(&addr).await;

    assert_eq!(expect_error(&mut ws).await, ErrorKind::InvalidInput);
    assert!(recv(&mut ws).await.is_none());
}

#[tokio::test]
async fn test_first_message_must_be_hello() {
    let addr = start_server(test_config()).await;
    let mut ws = connect(&addr).await;
    send(&mut ws, &ClientMessage::Heartbeat { client_time: 1 }).await;

    assert_eq!(expect_error(&mut ws).await, ErrorKind::InvalidInput);
    assert!(recv(&mut ws).await.is_none());
}

#[tokio::test]
async fn test_heartbeat_is_acknowledged() {
    let addr = start_server(test_config()).await;
    let (mut ws, _) = hello(&addr).await;
    send(&mut ws, &ClientMessage::Heartbeat { client_time: 1234 }).await;

    match expect_msg(&mut ws).await {
        ServerMessage::HeartbeatAck {
            client_time,
            server_time,
        } => {
            assert_eq!(client_time, 1234);
            assert!(server_time > 0);
        }
        other => panic!("expected HeartbeatAck, got {other:?}"),
    }
}

#[tokio::test]
async fn test_garbage_is_reported_and_connection_survives() {
    let addr = start_server(test_config()).await;
    let (mut ws, _) = hello(&addr).await;

    send_raw(&mut ws, "not json").await;
    assert_eq!(expect_error(&mut ws).await, ErrorKind::InvalidInput);

    send_raw(&mut ws, r#"{"type":"submit_score","room_code":"AB12","category":"yahtzee"}"#).await;
    assert_eq!(expect_error(&mut ws).await, ErrorKind::InvalidInput);

    send(&mut ws, &ClientMessage::Heartbeat { client_time: 1 }).await;
    assert!(matches!(
        expect_msg(&mut ws).await,
        ServerMessage::HeartbeatAck { .. }
    ));
}

#[tokio::test]
async fn test_idle_connection_is_dropped() {
    let config = ServerConfig {
        idle_timeout: Duration::from_millis(200),
        ..test_config()
    };
    let addr = start_server(config).await;
    let (mut ws, _) = hello(&addr).await;

    assert!(recv(&mut ws).await.is_none());
}

// =========================================================================
// Rooms
// =========================================================================

#[tokio::test]
async fn test_create_and_join_room() {
    let addr = start_server(test_config()).await;
    let (mut host, host_id) = hello(&addr).await;
    let (mut guest, guest_id) = hello(&addr).await;

    let room = create_room(&mut host, "Ada").await;
    assert_eq!(room.players.len(), 1);
    assert_eq!(room.players[0].id, host_id);
    assert!(room.players[0].is_host);
    assert_eq!(room.phase, Phase::Waiting);

    // Lower-case code still finds the room.
    send(
        &mut guest,
        &ClientMessage::JoinRoom {
            room_code: room.room_code.as_str().to_lowercase(),
            display_name: "Grace".into(),
        },
    )
    .await;
    match expect_msg(&mut guest).await {
        ServerMessage::Joined {
            room_code,
            player_id,
        } => {
            assert_eq!(room_code, room.room_code);
            assert_eq!(player_id, guest_id);
        }
        other => panic!("expected Joined, got {other:?}"),
    }
    let (_, guest_view) = expect_update(&mut guest).await;

    let (event, host_view) = expect_update(&mut host).await;
    assert_eq!(
        event,
        RoomEvent::PlayerJoined {
            player_id: guest_id,
            name: "Grace".into()
        }
    );
    assert_eq!(host_view, guest_view);
    assert_eq!(host_view.version, room.version + 1);
}

#[tokio::test]
async fn test_join_unknown_room() {
    let addr = start_server(test_config()).await;
    let (mut ws, _) = hello(&addr).await;
    send(
        &mut ws,
        &ClientMessage::JoinRoom {
            room_code: "QQQQ".into(),
            display_name: "lost".into(),
        },
    )
    .await;
    assert_eq!(expect_error(&mut ws).await, ErrorKind::RoomNotFound);

    send(
        &mut ws,
        &ClientMessage::JoinRoom {
            room_code: "??".into(),
            display_name: "lost".into(),
        },
    )
    .await;
    assert_eq!(expect_error(&mut ws).await, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_cannot_create_while_in_room() {
    let addr = start_server(test_config()).await;
    let (mut ws, _) = hello(&addr).await;
    create_room(&mut ws, "Ada").await;

    send(
        &mut ws,
        &ClientMessage::CreateRoom {
            display_name: "again".into(),
        },
    )
    .await;
    assert_eq!(expect_error(&mut ws).await, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_errors_go_only_to_the_caller() {
    let addr = start_server(test_config()).await;
    let (mut host, _) = hello(&addr).await;
    let (mut guest, _) = hello(&addr).await;
    let room = create_room(&mut host, "Ada").await;
    let code = room.room_code.to_string();

    send(
        &mut guest,
        &ClientMessage::JoinRoom {
            room_code: code.clone(),
            display_name: "Grace".into(),
        },
    )
    .await;
    expect_msg(&mut guest).await;
    expect_update(&mut guest).await;
    expect_update(&mut host).await;

    send(&mut guest, &ClientMessage::StartGame { room_code: code }).await;
    assert_eq!(expect_error(&mut guest).await, ErrorKind::NotAuthorized);
    expect_silence(&mut host).await;
}

#[tokio::test]
async fn test_start_alone_needs_more_players() {
    let addr = start_server(test_config()).await;
    let (mut host, _) = hello(&addr).await;
    let room = create_room(&mut host, "Ada").await;

    send(
        &mut host,
        &ClientMessage::StartGame {
            room_code: room.room_code.to_string(),
        },
    )
    .await;
    assert_eq!(expect_error(&mut host).await, ErrorKind::InsufficientPlayers);
}

#[tokio::test]
async fn test_leave_room_acknowledges_and_notifies() {
    let addr = start_server(test_config()).await;
    let (mut host, _) = hello(&addr).await;
    let (mut guest, guest_id) = hello(&addr).await;
    let room = create_room(&mut host, "Ada").await;

    send(
        &mut guest,
        &ClientMessage::JoinRoom {
            room_code: room.room_code.to_string(),
            display_name: "Grace".into(),
        },
    )
    .await;
    expect_msg(&mut guest).await;
    expect_update(&mut guest).await;
    expect_update(&mut host).await;

    send(&mut guest, &ClientMessage::LeaveRoom).await;
    match expect_msg(&mut guest).await {
        ServerMessage::Left { room_code } => assert_eq!(room_code, room.room_code),
        other => panic!("expected Left, got {other:?}"),
    }
    let (event, view) = expect_update(&mut host).await;
    assert_eq!(
        event,
        RoomEvent::PlayerLeft {
            player_id: guest_id,
            new_host: None
        }
    );
    assert_eq!(view.players.len(), 1);

    send(&mut guest, &ClientMessage::LeaveRoom).await;
    assert_eq!(expect_error(&mut guest).await, ErrorKind::InvalidInput);
}

#[tokio::test]
async fn test_disconnect_hands_host_to_remaining_human() {
    let addr = start_server(test_config()).await;
    let (mut host, host_id) = hello(&addr).await;
    let (mut guest, guest_id) = hello(&addr).await;
    let room = create_room(&mut host, "Ada").await;

    send(
        &mut guest,
        &ClientMessage::JoinRoom {
            room_code: room.room_code.to_string(),
            display_name: "Grace".into(),
        },
    )
    .await;
    expect_msg(&mut guest).await;
    expect_update(&mut guest).await;

    host.close(None).await.unwrap();

    let (event, view) = expect_update(&mut guest).await;
    assert_eq!(
        event,
        RoomEvent::PlayerLeft {
            player_id: host_id,
            new_host: Some(guest_id)
        }
    );
    assert!(view.player(guest_id).unwrap().is_host);
}

// =========================================================================
// Full game against a bot
// =========================================================================

#[tokio::test]
async fn test_full_game_against_bot() {
    let addr = start_server(test_config()).await;
    let (mut ws, me) = hello(&addr).await;
    let room = create_room(&mut ws, "Ada").await;
    let code = room.room_code.to_string();

    send(
        &mut ws,
        &ClientMessage::AddAiPlayer {
            room_code: code.clone(),
            difficulty: Difficulty::Medium,
        },
    )
    .await;
    let (event, _) = expect_update(&mut ws).await;
    assert!(matches!(event, RoomEvent::AiPlayerAdded { .. }));

    send(
        &mut ws,
        &ClientMessage::StartGame {
            room_code: code.clone(),
        },
    )
    .await;

    let mut last_version = room.version + 1;
    let standings = loop {
        match expect_msg(&mut ws).await {
            ServerMessage::RoomUpdate { room, .. } => {
                assert!(room.version > last_version, "snapshots arrive in order");
                last_version = room.version;

                // Every update during our turn answers our own last action.
                let Some(current) = room.current_player() else {
                    continue;
                };
                if current.id != me {
                    continue;
                }
                if room.rolls_left == 3 {
                    send(
                        &mut ws,
                        &ClientMessage::RollDice {
                            room_code: code.clone(),
                            kept: vec![false; 5],
                        },
                    )
                    .await;
                } else {
                    let category = current.scores.open_categories()[0];
                    send(
                        &mut ws,
                        &ClientMessage::SubmitScore {
                            room_code: code.clone(),
                            category,
                        },
                    )
                    .await;
                }
            }
            ServerMessage::GameOver {
                room_code,
                winner,
                standings,
            } => {
                assert_eq!(room_code, room.room_code);
                assert_eq!(standings[0], winner);
                break standings;
            }
            other => panic!("unexpected message {other:?}"),
        }
    };

    assert_eq!(standings.len(), 2);
    assert!(standings[0].total_score >= standings[1].total_score);

    // No second GameOver, and the finished room rejects play.
    expect_silence(&mut ws).await;
    send(
        &mut ws,
        &ClientMessage::RollDice {
            room_code: code,
            kept: vec![false; 5],
        },
    )
    .await;
    assert_eq!(expect_error(&mut ws).await, ErrorKind::NotYourTurn);
}
