//! WebSocket handler for room presence and board updates
//!
//! Clients join a room they are a member of, then receive presence changes,
//! board updates from other members and the domain events published by the
//! application services for that room.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::entities::RoomRole;
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{RoomId, UserId};
use crate::infrastructure::session::{ClientId, PresenceEntry, SessionError, SessionManager};
use crate::infrastructure::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let client_id = ClientId::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    tracing::info!(client_id = %client_id, "WebSocket connection established");

    // Forward queued messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    if let Some(response) = handle_message(msg, &state, client_id, tx.clone()).await
                    {
                        if tx.send(response).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(client_id = %client_id, error = %e, "Failed to parse message");
                    let error = ServerMessage::error("PARSE_ERROR", format!("Invalid message format: {e}"));
                    if tx.send(error).is_err() {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!(client_id = %client_id, "WebSocket connection closed by client");
                break;
            }
            Err(e) => {
                tracing::error!(client_id = %client_id, error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    let (rooms, connections) = {
        let mut sessions = state.sessions.write().await;
        if let Some((room_id, participant)) = sessions.leave_room(client_id) {
            announce_presence(&sessions, room_id);
            tracing::info!(
                client_id = %client_id,
                user_id = %participant.user_id,
                room_id = %room_id,
                "Client disconnected from room"
            );
        }
        (sessions.room_count(), sessions.connection_count())
    };

    send_task.abort();
    tracing::info!(
        client_id = %client_id,
        open_rooms = rooms,
        connections,
        "WebSocket connection terminated"
    );
}

async fn handle_message(
    msg: ClientMessage,
    state: &AppState,
    client_id: ClientId,
    sender: mpsc::UnboundedSender<ServerMessage>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Heartbeat => Some(ServerMessage::Pong),

        ClientMessage::JoinRoom { room_id, user_id } => {
            tracing::info!(client_id = %client_id, user_id = %user_id, room_id = %room_id, "Joining room");

            let room = match state.room_service.get_room(room_id).await {
                Ok(room) => room,
                Err(e) => {
                    tracing::warn!(room_id = %room_id, error = %e, "Join refused");
                    return Some(ServerMessage::error("ROOM_NOT_FOUND", e.to_string()));
                }
            };
            let Some(role) = room.member(&user_id).map(|m| m.role) else {
                return Some(ServerMessage::error(
                    "NOT_A_MEMBER",
                    format!("{user_id} is not a member of {}", room.name),
                ));
            };

            let mut sessions = state.sessions.write().await;
            if let Some(previous) = sessions.join_room(room_id, client_id, user_id, role, sender) {
                announce_presence(&sessions, previous);
            }
            let participants = sessions.presence(room_id);
            sessions.broadcast_to_room_except(
                room_id,
                &ServerMessage::PresenceChanged {
                    room_id,
                    participants: participants.clone(),
                },
                client_id,
            );
            let board = sessions.board(room_id).cloned();

            Some(ServerMessage::RoomJoined {
                room_id,
                role,
                participants,
                board,
            })
        }

        ClientMessage::LeaveRoom => {
            let mut sessions = state.sessions.write().await;
            match sessions.leave_room(client_id) {
                Some((room_id, _)) => {
                    announce_presence(&sessions, room_id);
                    Some(ServerMessage::RoomLeft { room_id })
                }
                None => Some(not_in_room()),
            }
        }

        ClientMessage::BoardUpdate { payload } => {
            let result = state.sessions.write().await.update_board(client_id, payload);
            match result {
                Ok(room_id) => {
                    tracing::debug!(client_id = %client_id, room_id = %room_id, "Board updated");
                    None
                }
                Err(SessionError::ReadOnly) => Some(ServerMessage::error(
                    "READ_ONLY",
                    SessionError::ReadOnly.to_string(),
                )),
                Err(SessionError::ClientNotInRoom(_)) => Some(not_in_room()),
            }
        }

        ClientMessage::Presence => {
            let sessions = state.sessions.read().await;
            match sessions.client_room(client_id) {
                Some(room_id) => Some(ServerMessage::PresenceChanged {
                    room_id,
                    participants: sessions.presence(room_id),
                }),
                None => Some(not_in_room()),
            }
        }
    }
}

fn announce_presence(sessions: &SessionManager, room_id: RoomId) {
    let message = ServerMessage::PresenceChanged {
        room_id,
        participants: sessions.presence(room_id),
    };
    sessions.broadcast_to_room(room_id, &message);
}

fn not_in_room() -> ServerMessage {
    ServerMessage::error("NOT_IN_ROOM", "Join a room first")
}

/// Messages from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Attach this connection to a room the user is a member of
    JoinRoom { room_id: RoomId, user_id: UserId },
    LeaveRoom,
    /// Replace the shared board state; opaque to the server
    BoardUpdate { payload: serde_json::Value },
    /// Ask for the current presence list
    Presence,
    Heartbeat,
}

/// Messages from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    RoomJoined {
        room_id: RoomId,
        role: RoomRole,
        participants: Vec<PresenceEntry>,
        board: Option<serde_json::Value>,
    },
    RoomLeft {
        room_id: RoomId,
    },
    PresenceChanged {
        room_id: RoomId,
        participants: Vec<PresenceEntry>,
    },
    BoardUpdated {
        room_id: RoomId,
        user_id: UserId,
        payload: serde_json::Value,
    },
    /// A domain event published by the application services
    Event {
        room_id: RoomId,
        event: DomainEvent,
    },
    Error {
        code: String,
        message: String,
    },
    Pong,
}

impl ServerMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
