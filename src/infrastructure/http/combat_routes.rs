//! Combat API routes
//!
//! Every action answers with the rules report of what happened; clients
//! re-fetch the encounter for the full picture.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{parse_id, service_error, ApiError};
use crate::application::dto::{
    AddCombatantRequestDto, ApplyConditionRequestDto, CombatResponseDto, CombatantResponseDto,
    CreateCombatRequestDto, DropEffectRequestDto, HealRequestDto, RemoveConditionRequestDto,
    SetInitiativeRequestDto,
};
use crate::application::services::CombatService;
use crate::domain::entities::TurnReport;
use crate::domain::services::{AttackReport, AttackRequest, HealingReport};
use crate::domain::value_objects::{
    CombatId, Condition, EffectId, ParticipantId, RoomId, TurnChange,
};
use crate::infrastructure::state::AppState;

#[derive(Debug, serde::Serialize)]
pub struct CombatEndedResponse {
    pub rounds: u32,
}

#[derive(Debug, serde::Serialize)]
pub struct RemovedConditionsResponse {
    pub removed: usize,
}

pub async fn list_combats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CombatResponseDto>>, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let combats = state
        .combat_service
        .list_combats(room_id)
        .await
        .map_err(service_error)?;
    Ok(Json(combats.into_iter().map(CombatResponseDto::from).collect()))
}

pub async fn create_combat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateCombatRequestDto>,
) -> Result<(StatusCode, Json<CombatResponseDto>), ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let combat = state
        .combat_service
        .create_combat(room_id, req.name)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(CombatResponseDto::from(combat))))
}

pub async fn get_combat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CombatResponseDto>, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let combat = state
        .combat_service
        .get_combat(combat_id)
        .await
        .map_err(service_error)?;
    Ok(Json(CombatResponseDto::from(combat)))
}

pub async fn delete_combat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    state
        .combat_service
        .delete_combat(combat_id)
        .await
        .map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Bring a character from the room into the encounter
pub async fn add_combatant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AddCombatantRequestDto>,
) -> Result<(StatusCode, Json<CombatantResponseDto>), ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let combatant = state
        .combat_service
        .add_character(combat_id, req.character_id, req.initiative)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(CombatantResponseDto::from(&combatant))))
}

pub async fn remove_combatant(
    State(state): State<Arc<AppState>>,
    Path((id, participant_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let participant_id: ParticipantId = parse_id(&participant_id, "participant")?;
    state
        .combat_service
        .remove_participant(combat_id, participant_id)
        .await
        .map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Roll for everyone still without initiative
pub async fn roll_initiative(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BTreeMap<ParticipantId, i32>>, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let rolled = state
        .combat_service
        .roll_initiative(combat_id)
        .await
        .map_err(service_error)?;
    Ok(Json(rolled.into_iter().collect()))
}

pub async fn set_initiative(
    State(state): State<Arc<AppState>>,
    Path((id, participant_id)): Path<(String, String)>,
    Json(req): Json<SetInitiativeRequestDto>,
) -> Result<StatusCode, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let participant_id: ParticipantId = parse_id(&participant_id, "participant")?;
    state
        .combat_service
        .set_initiative(combat_id, participant_id, req.initiative)
        .await
        .map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start_combat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TurnChange<ParticipantId>>, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let change = state.combat_service.start(combat_id).await.map_err(service_error)?;
    Ok(Json(change))
}

/// End the current turn: end-of-turn saves, expiries, then the next turn
pub async fn next_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TurnReport>, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let report = state
        .combat_service
        .next_turn(combat_id)
        .await
        .map_err(service_error)?;
    Ok(Json(report))
}

pub async fn previous_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TurnChange<ParticipantId>>, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let change = state
        .combat_service
        .previous_turn(combat_id)
        .await
        .map_err(service_error)?;
    Ok(Json(change))
}

pub async fn attack(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AttackRequest>,
) -> Result<Json<AttackReport>, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let report = state
        .combat_service
        .attack(combat_id, req)
        .await
        .map_err(service_error)?;
    Ok(Json(report))
}

pub async fn heal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<HealRequestDto>,
) -> Result<Json<HealingReport>, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let report = state
        .combat_service
        .heal(combat_id, req.healer, req.target, req.power_id)
        .await
        .map_err(service_error)?;
    Ok(Json(report))
}

/// GM override; answers with the effects the new condition broke
pub async fn apply_condition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ApplyConditionRequestDto>,
) -> Result<Json<Vec<EffectId>>, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let dropped = state
        .combat_service
        .apply_condition(combat_id, req.target, req.condition, req.expiry)
        .await
        .map_err(service_error)?;
    Ok(Json(dropped))
}

pub async fn remove_condition(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RemoveConditionRequestDto>,
) -> Result<Json<RemovedConditionsResponse>, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let removed = state
        .combat_service
        .remove_condition(combat_id, req.target, req.condition)
        .await
        .map_err(service_error)?;
    Ok(Json(RemovedConditionsResponse { removed }))
}

/// Stop maintaining an effect; answers with the conditions it lifted
pub async fn drop_effect(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<DropEffectRequestDto>,
) -> Result<Json<Vec<Condition>>, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let lifted = state
        .combat_service
        .drop_effect(combat_id, req.maintainer, req.effect)
        .await
        .map_err(service_error)?;
    Ok(Json(lifted))
}

pub async fn end_combat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CombatEndedResponse>, ApiError> {
    let combat_id: CombatId = parse_id(&id, "combat")?;
    let rounds = state.combat_service.end(combat_id).await.map_err(service_error)?;
    Ok(Json(CombatEndedResponse { rounds }))
}
