//! Warfare battle API routes

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{parse_id, service_error, ApiError};
use crate::application::dto::{
    BattleResponseDto, CreateBattleRequestDto, EngageUnitRequestDto, RallyRequestDto,
    SetInitiativeRequestDto, SiegeRequestDto, UnitAttackRequestDto, UnitResponseDto,
};
use crate::application::services::WarfareService;
use crate::domain::services::{RallyReport, SiegeReport, UnitAttackReport};
use crate::domain::value_objects::{RoomId, TurnChange, UnitId, WarfareCombatId};
use crate::infrastructure::state::AppState;

#[derive(Debug, serde::Serialize)]
pub struct BattleEndedResponse {
    pub rounds: u32,
}

pub async fn list_battles(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<BattleResponseDto>>, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let battles = state
        .warfare_service
        .list_battles(room_id)
        .await
        .map_err(service_error)?;
    Ok(Json(battles.into_iter().map(BattleResponseDto::from).collect()))
}

pub async fn create_battle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateBattleRequestDto>,
) -> Result<(StatusCode, Json<BattleResponseDto>), ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let battle = state
        .warfare_service
        .create_battle(room_id, req.name)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(BattleResponseDto::from(battle))))
}

pub async fn get_battle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BattleResponseDto>, ApiError> {
    let battle_id: WarfareCombatId = parse_id(&id, "battle")?;
    let battle = state
        .warfare_service
        .get_battle(battle_id)
        .await
        .map_err(service_error)?;
    Ok(Json(BattleResponseDto::from(battle)))
}

pub async fn delete_battle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let battle_id: WarfareCombatId = parse_id(&id, "battle")?;
    state
        .warfare_service
        .delete_battle(battle_id)
        .await
        .map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn engage_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<EngageUnitRequestDto>,
) -> Result<(StatusCode, Json<UnitResponseDto>), ApiError> {
    let battle_id: WarfareCombatId = parse_id(&id, "battle")?;
    let unit = state
        .warfare_service
        .add_unit(battle_id, req.unit_id, req.initiative)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(UnitResponseDto::from(unit))))
}

/// Pull a unit out of the battle, keeping the casualties it took
pub async fn withdraw_unit(
    State(state): State<Arc<AppState>>,
    Path((id, unit_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let battle_id: WarfareCombatId = parse_id(&id, "battle")?;
    let unit_id: UnitId = parse_id(&unit_id, "unit")?;
    state
        .warfare_service
        .remove_unit(battle_id, unit_id)
        .await
        .map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn roll_initiative(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BTreeMap<UnitId, i32>>, ApiError> {
    let battle_id: WarfareCombatId = parse_id(&id, "battle")?;
    let rolled = state
        .warfare_service
        .roll_initiative(battle_id)
        .await
        .map_err(service_error)?;
    Ok(Json(rolled.into_iter().collect()))
}

pub async fn set_initiative(
    State(state): State<Arc<AppState>>,
    Path((id, unit_id)): Path<(String, String)>,
    Json(req): Json<SetInitiativeRequestDto>,
) -> Result<StatusCode, ApiError> {
    let battle_id: WarfareCombatId = parse_id(&id, "battle")?;
    let unit_id: UnitId = parse_id(&unit_id, "unit")?;
    state
        .warfare_service
        .set_initiative(battle_id, unit_id, req.initiative)
        .await
        .map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start_battle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TurnChange<UnitId>>, ApiError> {
    let battle_id: WarfareCombatId = parse_id(&id, "battle")?;
    let change = state.warfare_service.start(battle_id).await.map_err(service_error)?;
    Ok(Json(change))
}

pub async fn next_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TurnChange<UnitId>>, ApiError> {
    let battle_id: WarfareCombatId = parse_id(&id, "battle")?;
    let change = state
        .warfare_service
        .next_turn(battle_id)
        .await
        .map_err(service_error)?;
    Ok(Json(change))
}

pub async fn previous_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TurnChange<UnitId>>, ApiError> {
    let battle_id: WarfareCombatId = parse_id(&id, "battle")?;
    let change = state
        .warfare_service
        .previous_turn(battle_id)
        .await
        .map_err(service_error)?;
    Ok(Json(change))
}

pub async fn attack(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UnitAttackRequestDto>,
) -> Result<Json<UnitAttackReport>, ApiError> {
    let battle_id: WarfareCombatId = parse_id(&id, "battle")?;
    let report = state
        .warfare_service
        .attack(battle_id, req.attacker, req.target)
        .await
        .map_err(service_error)?;
    Ok(Json(report))
}

pub async fn siege(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SiegeRequestDto>,
) -> Result<Json<SiegeReport>, ApiError> {
    let battle_id: WarfareCombatId = parse_id(&id, "battle")?;
    let report = state
        .warfare_service
        .siege(battle_id, req.attacker, req.fortification)
        .await
        .map_err(service_error)?;
    Ok(Json(report))
}

pub async fn rally(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RallyRequestDto>,
) -> Result<Json<RallyReport>, ApiError> {
    let battle_id: WarfareCombatId = parse_id(&id, "battle")?;
    let report = state
        .warfare_service
        .rally(battle_id, req.unit_id)
        .await
        .map_err(service_error)?;
    Ok(Json(report))
}

pub async fn end_battle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BattleEndedResponse>, ApiError> {
    let battle_id: WarfareCombatId = parse_id(&id, "battle")?;
    let rounds = state.warfare_service.end(battle_id).await.map_err(service_error)?;
    Ok(Json(BattleEndedResponse { rounds }))
}
