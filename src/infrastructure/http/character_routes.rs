//! Character API routes

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{parse_id, service_error, ApiError};
use crate::application::dto::{
    CharacterResponseDto, CreateCharacterRequestDto, UpdateCharacterRequestDto,
};
use crate::application::services::{CharacterService, SheetReport};
use crate::domain::value_objects::{CharacterId, RoomId};
use crate::infrastructure::state::AppState;

/// List characters in a room
pub async fn list_characters(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CharacterResponseDto>>, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let characters = state
        .character_service
        .list_characters(room_id)
        .await
        .map_err(service_error)?;
    Ok(Json(characters.into_iter().map(CharacterResponseDto::from).collect()))
}

/// Create a character; the sheet must respect its power level limits
pub async fn create_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateCharacterRequestDto>,
) -> Result<(StatusCode, Json<CharacterResponseDto>), ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let character = state
        .character_service
        .create_character(req.into_request(room_id))
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(CharacterResponseDto::from(character))))
}

pub async fn get_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CharacterResponseDto>, ApiError> {
    let character_id: CharacterId = parse_id(&id, "character")?;
    let character = state
        .character_service
        .get_character(character_id)
        .await
        .map_err(service_error)?;
    Ok(Json(CharacterResponseDto::from(character)))
}

pub async fn update_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCharacterRequestDto>,
) -> Result<Json<CharacterResponseDto>, ApiError> {
    let character_id: CharacterId = parse_id(&id, "character")?;
    let character = state
        .character_service
        .update_character(character_id, req.into())
        .await
        .map_err(service_error)?;
    Ok(Json(CharacterResponseDto::from(character)))
}

pub async fn delete_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let character_id: CharacterId = parse_id(&id, "character")?;
    state
        .character_service
        .delete_character(character_id)
        .await
        .map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Point costs and limit violations of a stored sheet
pub async fn check_sheet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SheetReport>, ApiError> {
    let character_id: CharacterId = parse_id(&id, "character")?;
    let report = state
        .character_service
        .check_sheet(character_id)
        .await
        .map_err(service_error)?;
    Ok(Json(report))
}
