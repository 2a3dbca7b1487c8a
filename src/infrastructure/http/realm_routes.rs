//! Domain, unit and fortification API routes

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{parse_id, service_error, ApiError};
use crate::application::dto::{
    CreateDomainRequestDto, CreateFortificationRequestDto, CreateUnitRequestDto,
    DomainResponseDto, FortificationResponseDto, GarrisonRequestDto, IntrigueRequestDto,
    RepairRequestDto, RestoreDefenseRequestDto, UnitResponseDto, UpdateDomainRequestDto,
    UpdateUnitRequestDto,
};
use crate::application::services::RealmService;
use crate::domain::services::IntrigueReport;
use crate::domain::value_objects::{DomainId, FortificationId, RoomId, UnitId};
use crate::infrastructure::state::AppState;

#[derive(Debug, serde::Serialize)]
pub struct TreasuryResponse {
    pub treasury: i32,
}

pub async fn list_domains(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<DomainResponseDto>>, ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let domains = state
        .realm_service
        .list_domains(room_id)
        .await
        .map_err(service_error)?;
    Ok(Json(domains.into_iter().map(DomainResponseDto::from).collect()))
}

pub async fn create_domain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateDomainRequestDto>,
) -> Result<(StatusCode, Json<DomainResponseDto>), ApiError> {
    let room_id: RoomId = parse_id(&id, "room")?;
    let domain = state
        .realm_service
        .create_domain(req.into_request(room_id))
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(DomainResponseDto::from(domain))))
}

pub async fn get_domain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DomainResponseDto>, ApiError> {
    let domain_id: DomainId = parse_id(&id, "domain")?;
    let domain = state
        .realm_service
        .get_domain(domain_id)
        .await
        .map_err(service_error)?;
    Ok(Json(DomainResponseDto::from(domain)))
}

pub async fn update_domain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDomainRequestDto>,
) -> Result<Json<DomainResponseDto>, ApiError> {
    let domain_id: DomainId = parse_id(&id, "domain")?;
    let domain = state
        .realm_service
        .update_domain(domain_id, req.into())
        .await
        .map_err(service_error)?;
    Ok(Json(DomainResponseDto::from(domain)))
}

/// Delete a domain with its units and fortifications
pub async fn delete_domain(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let domain_id: DomainId = parse_id(&id, "domain")?;
    state
        .realm_service
        .delete_domain(domain_id)
        .await
        .map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Domain skill check against another domain's defense
pub async fn intrigue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<IntrigueRequestDto>,
) -> Result<Json<IntrigueReport>, ApiError> {
    let domain_id: DomainId = parse_id(&id, "domain")?;
    let report = state
        .realm_service
        .intrigue(domain_id, req.skill, req.target, req.defense)
        .await
        .map_err(service_error)?;
    Ok(Json(report))
}

pub async fn restore_defense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RestoreDefenseRequestDto>,
) -> Result<Json<DomainResponseDto>, ApiError> {
    let domain_id: DomainId = parse_id(&id, "domain")?;
    let domain = state
        .realm_service
        .restore_defense(domain_id, req.defense)
        .await
        .map_err(service_error)?;
    Ok(Json(DomainResponseDto::from(domain)))
}

pub async fn pay_upkeep(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TreasuryResponse>, ApiError> {
    let domain_id: DomainId = parse_id(&id, "domain")?;
    let treasury = state
        .realm_service
        .pay_upkeep(domain_id)
        .await
        .map_err(service_error)?;
    Ok(Json(TreasuryResponse { treasury }))
}

pub async fn list_units(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<UnitResponseDto>>, ApiError> {
    let domain_id: DomainId = parse_id(&id, "domain")?;
    let units = state
        .realm_service
        .list_units(domain_id)
        .await
        .map_err(service_error)?;
    Ok(Json(units.into_iter().map(UnitResponseDto::from).collect()))
}

/// Raise a unit; `purchase` pays its cost from the treasury
pub async fn create_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateUnitRequestDto>,
) -> Result<(StatusCode, Json<UnitResponseDto>), ApiError> {
    let domain_id: DomainId = parse_id(&id, "domain")?;
    let unit = state
        .realm_service
        .create_unit(req.into_request(domain_id))
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(UnitResponseDto::from(unit))))
}

pub async fn get_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UnitResponseDto>, ApiError> {
    let unit_id: UnitId = parse_id(&id, "unit")?;
    let unit = state.realm_service.get_unit(unit_id).await.map_err(service_error)?;
    Ok(Json(UnitResponseDto::from(unit)))
}

pub async fn update_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUnitRequestDto>,
) -> Result<Json<UnitResponseDto>, ApiError> {
    let unit_id: UnitId = parse_id(&id, "unit")?;
    let unit = state
        .realm_service
        .update_unit(unit_id, req.into())
        .await
        .map_err(service_error)?;
    Ok(Json(UnitResponseDto::from(unit)))
}

pub async fn delete_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let unit_id: UnitId = parse_id(&id, "unit")?;
    state.realm_service.delete_unit(unit_id).await.map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn garrison_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<GarrisonRequestDto>,
) -> Result<Json<UnitResponseDto>, ApiError> {
    let unit_id: UnitId = parse_id(&id, "unit")?;
    let unit = state
        .realm_service
        .garrison_unit(unit_id, req.fortification)
        .await
        .map_err(service_error)?;
    Ok(Json(UnitResponseDto::from(unit)))
}

pub async fn list_fortifications(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<FortificationResponseDto>>, ApiError> {
    let domain_id: DomainId = parse_id(&id, "domain")?;
    let fortifications = state
        .realm_service
        .list_fortifications(domain_id)
        .await
        .map_err(service_error)?;
    Ok(Json(
        fortifications
            .into_iter()
            .map(FortificationResponseDto::from)
            .collect(),
    ))
}

pub async fn create_fortification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateFortificationRequestDto>,
) -> Result<(StatusCode, Json<FortificationResponseDto>), ApiError> {
    let domain_id: DomainId = parse_id(&id, "domain")?;
    let fortification = state
        .realm_service
        .create_fortification(domain_id, req.name, req.kind)
        .await
        .map_err(service_error)?;
    Ok((
        StatusCode::CREATED,
        Json(FortificationResponseDto::from(fortification)),
    ))
}

pub async fn get_fortification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FortificationResponseDto>, ApiError> {
    let fortification_id: FortificationId = parse_id(&id, "fortification")?;
    let fortification = state
        .realm_service
        .get_fortification(fortification_id)
        .await
        .map_err(service_error)?;
    Ok(Json(FortificationResponseDto::from(fortification)))
}

/// Delete a fortification; its garrison moves to the field
pub async fn delete_fortification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let fortification_id: FortificationId = parse_id(&id, "fortification")?;
    state
        .realm_service
        .delete_fortification(fortification_id)
        .await
        .map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn repair_fortification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RepairRequestDto>,
) -> Result<Json<FortificationResponseDto>, ApiError> {
    let fortification_id: FortificationId = parse_id(&id, "fortification")?;
    let fortification = state
        .realm_service
        .repair_fortification(fortification_id, req.amount)
        .await
        .map_err(service_error)?;
    Ok(Json(FortificationResponseDto::from(fortification)))
}
