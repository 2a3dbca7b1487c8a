//! Room broadcaster - Implements RoomBroadcastPort on top of SessionManager
//!
//! Application services publish domain events without knowing about
//! sockets; this adapter wraps each event in a `ServerMessage` and fans it out
//! to the connections attached to the room.

use async_trait::async_trait;

use crate::application::ports::outbound::RoomBroadcastPort;
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::RoomId;
use crate::infrastructure::session::SharedSessions;
use crate::infrastructure::websocket::ServerMessage;

pub struct RoomBroadcaster {
    sessions: SharedSessions,
}

impl RoomBroadcaster {
    pub fn new(sessions: SharedSessions) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl RoomBroadcastPort for RoomBroadcaster {
    async fn publish(&self, room_id: RoomId, event: DomainEvent) {
        let kind = event.kind();
        let message = ServerMessage::Event { room_id, event };
        let delivered = self.sessions.read().await.broadcast_to_room(room_id, &message);
        tracing::debug!(room_id = %room_id, kind, delivered, "Published room event");
    }
}
