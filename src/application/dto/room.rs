use serde::{Deserialize, Serialize};

use crate::application::services::{CreateRoomRequest, UpdateRoomRequest};
use crate::domain::entities::{Room, RoomMember, RoomRole};
use crate::domain::value_objects::UserId;

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequestDto {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub gm: String,
}

impl From<CreateRoomRequestDto> for CreateRoomRequest {
    fn from(dto: CreateRoomRequestDto) -> Self {
        Self {
            name: dto.name,
            description: dto.description,
            gm: UserId::new(dto.gm),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateRoomRequestDto {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl From<UpdateRoomRequestDto> for UpdateRoomRequest {
    fn from(dto: UpdateRoomRequestDto) -> Self {
        Self {
            name: dto.name,
            description: dto.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MembershipRequestDto {
    pub user_id: String,
    #[serde(default = "default_role")]
    pub role: RoomRole,
}

fn default_role() -> RoomRole {
    RoomRole::Player
}

#[derive(Debug, Serialize)]
pub struct RoomResponseDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub gm: String,
    pub members: Vec<RoomMember>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Room> for RoomResponseDto {
    fn from(room: Room) -> Self {
        Self {
            id: room.id.to_string(),
            name: room.name,
            description: room.description,
            gm: room.gm.to_string(),
            members: room.members,
            created_at: room.created_at.to_rfc3339(),
            updated_at: room.updated_at.to_rfc3339(),
        }
    }
}
