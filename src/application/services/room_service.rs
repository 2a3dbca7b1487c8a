//! Room Service - Application service for campaign rooms and membership

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument};

use super::error::{validate_text, ServiceError, ServiceResult};
use super::settings_service::SettingsService;
use crate::application::ports::outbound::RoomRepository;
use crate::domain::entities::{Room, RoomRole};
use crate::domain::value_objects::{RoomId, UserId};

/// Request to create a new room
#[derive(Debug, Clone)]
pub struct CreateRoomRequest {
    pub name: String,
    pub description: Option<String>,
    pub gm: UserId,
}

/// Request to update an existing room
#[derive(Debug, Clone, Default)]
pub struct UpdateRoomRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Room service trait defining the application use cases
#[async_trait]
pub trait RoomService: Send + Sync {
    async fn create_room(&self, request: CreateRoomRequest) -> ServiceResult<Room>;

    async fn get_room(&self, id: RoomId) -> ServiceResult<Room>;

    async fn list_rooms(&self) -> ServiceResult<Vec<Room>>;

    async fn update_room(&self, id: RoomId, request: UpdateRoomRequest) -> ServiceResult<Room>;

    /// Delete a room together with everything in it
    async fn delete_room(&self, id: RoomId) -> ServiceResult<()>;

    /// Join a room; joining again keeps the existing membership
    async fn join_room(&self, id: RoomId, user: UserId, role: RoomRole) -> ServiceResult<Room>;

    async fn leave_room(&self, id: RoomId, user: UserId) -> ServiceResult<Room>;
}

pub struct RoomServiceImpl {
    rooms: Arc<dyn RoomRepository>,
    settings: Arc<SettingsService>,
}

impl RoomServiceImpl {
    pub fn new(rooms: Arc<dyn RoomRepository>, settings: Arc<SettingsService>) -> Self {
        Self { rooms, settings }
    }

    async fn load(&self, id: RoomId) -> ServiceResult<Room> {
        self.rooms
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Room", id))
    }
}

#[async_trait]
impl RoomService for RoomServiceImpl {
    #[instrument(skip(self, request), fields(name = %request.name, gm = %request.gm))]
    async fn create_room(&self, request: CreateRoomRequest) -> ServiceResult<Room> {
        let settings = self.settings.get().await;
        validate_text(
            "Room",
            &request.name,
            request.description.as_deref(),
            settings.max_name_length,
            settings.max_description_length,
        )?;

        let mut room = Room::new(request.name.trim(), request.gm);
        if let Some(description) = request.description {
            room = room.with_description(description);
        }
        self.rooms.save(&room).await?;

        info!(room_id = %room.id, "Created room: {}", room.name);
        Ok(room)
    }

    #[instrument(skip(self))]
    async fn get_room(&self, id: RoomId) -> ServiceResult<Room> {
        debug!(room_id = %id, "Fetching room");
        self.load(id).await
    }

    #[instrument(skip(self))]
    async fn list_rooms(&self) -> ServiceResult<Vec<Room>> {
        let rooms = self.rooms.list().await?;
        debug!(count = rooms.len(), "Listed rooms");
        Ok(rooms)
    }

    #[instrument(skip(self, request), fields(room_id = %id))]
    async fn update_room(&self, id: RoomId, request: UpdateRoomRequest) -> ServiceResult<Room> {
        let settings = self.settings.get().await;
        let mut room = self.load(id).await?;

        if let Some(name) = request.name {
            validate_text("Room", &name, None, settings.max_name_length, 0)?;
            room.name = name.trim().to_string();
        }
        if let Some(description) = request.description {
            validate_text(
                "Room",
                &room.name,
                Some(&description),
                settings.max_name_length,
                settings.max_description_length,
            )?;
            room.description = description;
        }
        room.updated_at = Utc::now();
        self.rooms.save(&room).await?;

        info!(room_id = %id, "Updated room: {}", room.name);
        Ok(room)
    }

    #[instrument(skip(self))]
    async fn delete_room(&self, id: RoomId) -> ServiceResult<()> {
        let room = self.load(id).await?;
        self.rooms.delete(id).await?;
        info!(room_id = %id, "Deleted room: {}", room.name);
        Ok(())
    }

    #[instrument(skip(self), fields(room_id = %id, user = %user))]
    async fn join_room(&self, id: RoomId, user: UserId, role: RoomRole) -> ServiceResult<Room> {
        let mut room = self.load(id).await?;
        if room.member(&user).is_some() {
            debug!("User already a member");
            return Ok(room);
        }
        let role = room.join(user, role).role;
        self.rooms.save(&room).await?;
        info!(?role, "User joined room");
        Ok(room)
    }

    #[instrument(skip(self), fields(room_id = %id, user = %user))]
    async fn leave_room(&self, id: RoomId, user: UserId) -> ServiceResult<Room> {
        let mut room = self.load(id).await?;
        if room.is_gm(&user) {
            return Err(ServiceError::Forbidden(
                "The game master cannot leave their own room".to_string(),
            ));
        }
        if room.leave(&user) {
            self.rooms.save(&room).await?;
            info!("User left room");
        }
        Ok(room)
    }
}
