//! Room API routes

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{parse_id, service_error, ApiError};
use crate::application::dto::{
    CreateRoomRequestDto, MembershipRequestDto, RoomResponseDto, UpdateRoomRequestDto,
};
use crate::application::services::RoomService;
use crate::domain::value_objects::{RoomId, UserId};
use crate::infrastructure::session::PresenceEntry;
use crate::infrastructure::state::AppState;

/// List all rooms
pub async fn list_rooms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<RoomResponseDto>>, ApiError> {
    let rooms = state.room_service.list_rooms().await.map_err(service_error)?;
    Ok(Json(rooms.into_iter().map(RoomResponseDto::from).collect()))
}

/// Create a room; the GM becomes its first member
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoomRequestDto>,
) -> Result<(StatusCode, Json<RoomResponseDto>), ApiError> {
    let room = state
        .room_service
        .create_room(req.into())
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(RoomResponseDto::from(room))))
}

pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RoomResponseDto>, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let room = state.room_service.get_room(room_id).await.map_err(service_error)?;
    Ok(Json(RoomResponseDto::from(room)))
}

pub async fn update_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoomRequestDto>,
) -> Result<Json<RoomResponseDto>, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let room = state
        .room_service
        .update_room(room_id, req.into())
        .await
        .map_err(service_error)?;
    Ok(Json(RoomResponseDto::from(room)))
}

/// Delete a room and everything in it
pub async fn delete_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    state.room_service.delete_room(room_id).await.map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn join_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<MembershipRequestDto>,
) -> Result<Json<RoomResponseDto>, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let room = state
        .room_service
        .join_room(room_id, UserId::new(req.user_id), req.role)
        .await
        .map_err(service_error)?;
    Ok(Json(RoomResponseDto::from(room)))
}

pub async fn leave_room(
    State(state): State<Arc<AppState>>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<Json<RoomResponseDto>, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let room = state
        .room_service
        .leave_room(room_id, UserId::new(user_id))
        .await
        .map_err(service_error)?;
    Ok(Json(RoomResponseDto::from(room)))
}

/// Who is connected to the room over WebSocket right now
pub async fn room_presence(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PresenceEntry>>, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    state.room_service.get_room(room_id).await.map_err(service_error)?;
    Ok(Json(state.sessions.read().await.presence(room_id)))
}
