//! Item API routes

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{parse_id, service_error, ApiError};
use crate::application::dto::{
    CreateItemRequestDto, EquipItemRequestDto, ItemResponseDto, TransferItemRequestDto,
    UpdateItemRequestDto,
};
use crate::application::services::ItemService;
use crate::domain::value_objects::{ItemId, RoomId};
use crate::infrastructure::state::AppState;

/// List items in a room, carried or not
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ItemResponseDto>>, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let items = state.item_service.list_items(room_id).await.map_err(service_error)?;
    Ok(Json(items.into_iter().map(ItemResponseDto::from).collect()))
}

pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateItemRequestDto>,
) -> Result<(StatusCode, Json<ItemResponseDto>), ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let item = state
        .item_service
        .create_item(req.into_request(room_id))
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(ItemResponseDto::from(item))))
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponseDto>, ApiError> {
    let item_id: ItemId = parse_id(&id, "item")?;
    let item = state.item_service.get_item(item_id).await.map_err(service_error)?;
    Ok(Json(ItemResponseDto::from(item)))
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequestDto>,
) -> Result<Json<ItemResponseDto>, ApiError> {
    let item_id: ItemId = parse_id(&id, "item")?;
    let item = state
        .item_service
        .update_item(item_id, req.into())
        .await
        .map_err(service_error)?;
    Ok(Json(ItemResponseDto::from(item)))
}

pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let item_id: ItemId = parse_id(&id, "item")?;
    state.item_service.delete_item(item_id).await.map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Hand the item to another character in the room, or drop it
pub async fn transfer_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TransferItemRequestDto>,
) -> Result<Json<ItemResponseDto>, ApiError> {
    let item_id: ItemId = parse_id(&id, "item")?;
    let item = state
        .item_service
        .transfer_item(item_id, req.owner)
        .await
        .map_err(service_error)?;
    Ok(Json(ItemResponseDto::from(item)))
}

pub async fn set_equipped(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<EquipItemRequestDto>,
) -> Result<Json<ItemResponseDto>, ApiError> {
    let item_id: ItemId = parse_id(&id, "item")?;
    let item = state
        .item_service
        .set_equipped(item_id, req.equipped)
        .await
        .map_err(service_error)?;
    Ok(Json(ItemResponseDto::from(item)))
}
