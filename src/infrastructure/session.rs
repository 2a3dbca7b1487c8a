//! Room presence for WebSocket connections
//!
//! Every connection gets a `ClientId` and an outbound channel. Joining a room
//! registers that channel so presence changes, board updates and domain
//! events reach everyone connected to the room.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};

use crate::domain::entities::RoomRole;
use crate::domain::value_objects::{RoomId, UserId};
use crate::infrastructure::websocket::ServerMessage;

/// Unique identifier for a connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(uuid::Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What other members see about a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub client_id: ClientId,
    pub user_id: UserId,
    pub role: RoomRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct RoomParticipant {
    pub client_id: ClientId,
    pub user_id: UserId,
    pub role: RoomRole,
    pub joined_at: DateTime<Utc>,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

impl RoomParticipant {
    pub fn entry(&self) -> PresenceEntry {
        PresenceEntry {
            client_id: self.client_id,
            user_id: self.user_id.clone(),
            role: self.role,
            joined_at: self.joined_at,
        }
    }

    /// Returns false once the connection's send task has gone away
    pub fn send(&self, message: ServerMessage) -> bool {
        self.sender.send(message).is_ok()
    }
}

/// Connections currently attached to one room
#[derive(Debug)]
pub struct RoomPresence {
    pub room_id: RoomId,
    pub participants: HashMap<ClientId, RoomParticipant>,
    /// Last board state anyone pushed; replayed to late joiners
    pub board: Option<serde_json::Value>,
    pub opened_at: DateTime<Utc>,
}

impl RoomPresence {
    pub fn new(room_id: RoomId, board: Option<serde_json::Value>) -> Self {
        Self {
            room_id,
            participants: HashMap::new(),
            board,
            opened_at: Utc::now(),
        }
    }

    /// Presence list, oldest connection first
    pub fn presence(&self) -> Vec<PresenceEntry> {
        let mut entries: Vec<_> = self.participants.values().map(RoomParticipant::entry).collect();
        entries.sort_by_key(|e| e.joined_at);
        entries
    }

    /// Send to every participant, returning how many received it
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        self.participants
            .values()
            .filter(|p| p.send(message.clone()))
            .count()
    }

    pub fn broadcast_except(&self, message: &ServerMessage, exclude: ClientId) -> usize {
        self.participants
            .values()
            .filter(|p| p.client_id != exclude)
            .filter(|p| p.send(message.clone()))
            .count()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Client not in any room: {0}")]
    ClientNotInRoom(ClientId),

    #[error("Spectators cannot update the board")]
    ReadOnly,
}

/// All open rooms and which room each client sits in
#[derive(Debug, Default)]
pub struct SessionManager {
    rooms: HashMap<RoomId, RoomPresence>,
    client_rooms: HashMap<ClientId, RoomId>,
    /// Boards of rooms that emptied out, restored when someone rejoins
    idle_boards: HashMap<RoomId, serde_json::Value>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a client to a room
    ///
    /// A client sits in at most one room; if it was elsewhere it is moved and
    /// the room it left is returned so callers can announce the departure.
    pub fn join_room(
        &mut self,
        room_id: RoomId,
        client_id: ClientId,
        user_id: UserId,
        role: RoomRole,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Option<RoomId> {
        let previous = match self.client_rooms.get(&client_id) {
            Some(current) if *current != room_id => self.leave_room(client_id).map(|(id, _)| id),
            _ => None,
        };

        let idle_boards = &mut self.idle_boards;
        let presence = self
            .rooms
            .entry(room_id)
            .or_insert_with(|| RoomPresence::new(room_id, idle_boards.remove(&room_id)));
        presence.participants.insert(
            client_id,
            RoomParticipant {
                client_id,
                user_id,
                role,
                joined_at: Utc::now(),
                sender,
            },
        );
        self.client_rooms.insert(client_id, room_id);
        previous
    }

    /// Detach a client; empty rooms are closed but keep their board
    pub fn leave_room(&mut self, client_id: ClientId) -> Option<(RoomId, RoomParticipant)> {
        let room_id = self.client_rooms.remove(&client_id)?;
        let presence = self.rooms.get_mut(&room_id)?;
        let participant = presence.participants.remove(&client_id)?;
        if presence.participants.is_empty() {
            if let Some(board) = self.rooms.remove(&room_id).and_then(|p| p.board) {
                self.idle_boards.insert(room_id, board);
            }
        }
        Some((room_id, participant))
    }

    /// Current board of a room, whether or not anyone is connected
    pub fn board(&self, room_id: RoomId) -> Option<&serde_json::Value> {
        match self.rooms.get(&room_id) {
            Some(presence) => presence.board.as_ref(),
            None => self.idle_boards.get(&room_id),
        }
    }

    pub fn client_room(&self, client_id: ClientId) -> Option<RoomId> {
        self.client_rooms.get(&client_id).copied()
    }

    pub fn room(&self, room_id: RoomId) -> Option<&RoomPresence> {
        self.rooms.get(&room_id)
    }

    pub fn participant(&self, client_id: ClientId) -> Option<&RoomParticipant> {
        let room_id = self.client_rooms.get(&client_id)?;
        self.rooms.get(room_id)?.participants.get(&client_id)
    }

    pub fn presence(&self, room_id: RoomId) -> Vec<PresenceEntry> {
        self.rooms
            .get(&room_id)
            .map(RoomPresence::presence)
            .unwrap_or_default()
    }

    /// Store a new board state and relay it to the rest of the room
    pub fn update_board(
        &mut self,
        client_id: ClientId,
        payload: serde_json::Value,
    ) -> Result<RoomId, SessionError> {
        let room_id = self
            .client_room(client_id)
            .ok_or(SessionError::ClientNotInRoom(client_id))?;
        let presence = self
            .rooms
            .get_mut(&room_id)
            .ok_or(SessionError::ClientNotInRoom(client_id))?;
        let participant = presence
            .participants
            .get(&client_id)
            .ok_or(SessionError::ClientNotInRoom(client_id))?;
        if participant.role == RoomRole::Spectator {
            return Err(SessionError::ReadOnly);
        }

        let message = ServerMessage::BoardUpdated {
            room_id,
            user_id: participant.user_id.clone(),
            payload: payload.clone(),
        };
        presence.board = Some(payload);
        presence.broadcast_except(&message, client_id);
        Ok(room_id)
    }

    pub fn broadcast_to_room(&self, room_id: RoomId, message: &ServerMessage) -> usize {
        self.rooms
            .get(&room_id)
            .map(|p| p.broadcast(message))
            .unwrap_or(0)
    }

    pub fn broadcast_to_room_except(
        &self,
        room_id: RoomId,
        message: &ServerMessage,
        exclude: ClientId,
    ) -> usize {
        self.rooms
            .get(&room_id)
            .map(|p| p.broadcast_except(message, exclude))
            .unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.client_rooms.len()
    }
}

/// Session state shared between the socket handlers and the broadcaster
pub type SharedSessions = Arc<RwLock<SessionManager>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn join(
        manager: &mut SessionManager,
        room_id: RoomId,
        user: &str,
        role: RoomRole,
    ) -> (ClientId, mpsc::UnboundedReceiver<ServerMessage>) {
        let client_id = ClientId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        manager.join_room(room_id, client_id, UserId::from(user), role, tx);
        (client_id, rx)
    }

    #[test]
    fn test_join_room() {
        let mut manager = SessionManager::new();
        let room_id = RoomId::new();
        let (client_id, _rx) = join(&mut manager, room_id, "gm", RoomRole::Gm);

        assert_eq!(manager.client_room(client_id), Some(room_id));
        assert_eq!(manager.room_count(), 1);
        assert_eq!(manager.presence(room_id).len(), 1);
        assert_eq!(
            manager.participant(client_id).map(|p| p.role),
            Some(RoomRole::Gm)
        );
    }

    #[test]
    fn test_leave_closes_empty_room() {
        let mut manager = SessionManager::new();
        let room_id = RoomId::new();
        let (client_id, _rx) = join(&mut manager, room_id, "gm", RoomRole::Gm);

        let (left, participant) = manager.leave_room(client_id).unwrap();
        assert_eq!(left, room_id);
        assert_eq!(participant.user_id, UserId::from("gm"));
        assert_eq!(manager.room_count(), 0);
        assert!(manager.leave_room(client_id).is_none());
    }

    #[test]
    fn test_joining_another_room_moves_client() {
        let mut manager = SessionManager::new();
        let first = RoomId::new();
        let second = RoomId::new();
        let (client_id, _rx) = join(&mut manager, first, "alex", RoomRole::Player);
        let (_other, _other_rx) = join(&mut manager, first, "sam", RoomRole::Player);

        let (tx, _rx2) = mpsc::unbounded_channel();
        let previous = manager.join_room(second, client_id, UserId::from("alex"), RoomRole::Player, tx);

        assert_eq!(previous, Some(first));
        assert_eq!(manager.presence(first).len(), 1);
        assert_eq!(manager.presence(second).len(), 1);
        assert_eq!(manager.connection_count(), 2);
    }

    #[test]
    fn test_broadcast_except_skips_sender() {
        let mut manager = SessionManager::new();
        let room_id = RoomId::new();
        let (gm, mut gm_rx) = join(&mut manager, room_id, "gm", RoomRole::Gm);
        let (_player, mut player_rx) = join(&mut manager, room_id, "alex", RoomRole::Player);

        let delivered = manager.broadcast_to_room_except(room_id, &ServerMessage::Pong, gm);

        assert_eq!(delivered, 1);
        assert!(matches!(player_rx.try_recv(), Ok(ServerMessage::Pong)));
        assert!(gm_rx.try_recv().is_err());
    }

    #[test]
    fn test_board_update_is_kept_and_relayed() {
        let mut manager = SessionManager::new();
        let room_id = RoomId::new();
        let (gm, mut gm_rx) = join(&mut manager, room_id, "gm", RoomRole::Gm);
        let (_player, mut player_rx) = join(&mut manager, room_id, "alex", RoomRole::Player);

        let payload = serde_json::json!({ "tokens": [{ "x": 3, "y": 4 }] });
        assert_eq!(manager.update_board(gm, payload.clone()).unwrap(), room_id);

        assert_eq!(manager.room(room_id).and_then(|r| r.board.clone()), Some(payload));
        assert!(matches!(
            player_rx.try_recv(),
            Ok(ServerMessage::BoardUpdated { user_id, .. }) if user_id == UserId::from("gm")
        ));
        assert!(gm_rx.try_recv().is_err());
    }

    #[test]
    fn test_board_survives_room_emptying() {
        let mut manager = SessionManager::new();
        let room_id = RoomId::new();
        let (gm, _gm_rx) = join(&mut manager, room_id, "gm", RoomRole::Gm);
        let payload = serde_json::json!({ "map": "crypt" });
        manager.update_board(gm, payload.clone()).unwrap();

        manager.leave_room(gm).unwrap();
        assert_eq!(manager.room_count(), 0);
        assert_eq!(manager.board(room_id), Some(&payload));

        let (_player, _player_rx) = join(&mut manager, room_id, "alex", RoomRole::Player);
        assert_eq!(manager.room(room_id).and_then(|r| r.board.clone()), Some(payload));
    }

    #[test]
    fn test_spectators_cannot_update_board() {
        let mut manager = SessionManager::new();
        let room_id = RoomId::new();
        let (watcher, _rx) = join(&mut manager, room_id, "watcher", RoomRole::Spectator);

        let result = manager.update_board(watcher, serde_json::json!({}));
        assert!(matches!(result, Err(SessionError::ReadOnly)));

        let stranger = ClientId::new();
        let result = manager.update_board(stranger, serde_json::json!({}));
        assert!(matches!(result, Err(SessionError::ClientNotInRoom(_))));
    }

    #[test]
    fn test_closed_receiver_is_not_counted() {
        let mut manager = SessionManager::new();
        let room_id = RoomId::new();
        let (_gm, gm_rx) = join(&mut manager, room_id, "gm", RoomRole::Gm);
        drop(gm_rx);

        assert_eq!(manager.broadcast_to_room(room_id, &ServerMessage::Pong), 0);
    }
}
