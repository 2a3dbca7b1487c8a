//! Broadcast port - pushes domain events to everyone connected to a room

use async_trait::async_trait;

use crate::domain::events::DomainEvent;
use crate::domain::value_objects::RoomId;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomBroadcastPort: Send + Sync {
    /// Fire and forget; rooms without listeners drop the event
    async fn publish(&self, room_id: RoomId, event: DomainEvent);
}
