//! HTTP REST API routes

mod character_routes;
mod combat_routes;
mod item_routes;
mod realm_routes;
mod room_routes;
mod settings_routes;
mod warfare_routes;

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    routing::{delete, get, post, put},
    Router,
};

use crate::application::ports::outbound::RepoError;
use crate::application::services::ServiceError;
use crate::domain::entities::{CombatError, WarfareError};
use crate::domain::value_objects::TurnOrderError;
use crate::infrastructure::state::AppState;

/// Error half of every handler result
pub type ApiError = (StatusCode, String);

/// Create all API routes
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Rooms
        .route("/api/rooms", get(room_routes::list_rooms))
        .route("/api/rooms", post(room_routes::create_room))
        .route("/api/rooms/{id}", get(room_routes::get_room))
        .route("/api/rooms/{id}", put(room_routes::update_room))
        .route("/api/rooms/{id}", delete(room_routes::delete_room))
        .route("/api/rooms/{id}/members", post(room_routes::join_room))
        .route(
            "/api/rooms/{id}/members/{user_id}",
            delete(room_routes::leave_room),
        )
        .route("/api/rooms/{id}/presence", get(room_routes::room_presence))
        // Characters
        .route(
            "/api/rooms/{id}/characters",
            get(character_routes::list_characters),
        )
        .route(
            "/api/rooms/{id}/characters",
            post(character_routes::create_character),
        )
        .route("/api/characters/{id}", get(character_routes::get_character))
        .route(
            "/api/characters/{id}",
            put(character_routes::update_character),
        )
        .route(
            "/api/characters/{id}",
            delete(character_routes::delete_character),
        )
        .route(
            "/api/characters/{id}/sheet",
            get(character_routes::check_sheet),
        )
        // Items
        .route("/api/rooms/{id}/items", get(item_routes::list_items))
        .route("/api/rooms/{id}/items", post(item_routes::create_item))
        .route("/api/items/{id}", get(item_routes::get_item))
        .route("/api/items/{id}", put(item_routes::update_item))
        .route("/api/items/{id}", delete(item_routes::delete_item))
        .route("/api/items/{id}/owner", put(item_routes::transfer_item))
        .route("/api/items/{id}/equipped", put(item_routes::set_equipped))
        // Combat
        .route("/api/rooms/{id}/combats", get(combat_routes::list_combats))
        .route("/api/rooms/{id}/combats", post(combat_routes::create_combat))
        .route("/api/combats/{id}", get(combat_routes::get_combat))
        .route("/api/combats/{id}", delete(combat_routes::delete_combat))
        .route(
            "/api/combats/{id}/combatants",
            post(combat_routes::add_combatant),
        )
        .route(
            "/api/combats/{id}/combatants/{participant_id}",
            delete(combat_routes::remove_combatant),
        )
        .route(
            "/api/combats/{id}/combatants/{participant_id}/initiative",
            put(combat_routes::set_initiative),
        )
        .route(
            "/api/combats/{id}/initiative",
            post(combat_routes::roll_initiative),
        )
        .route("/api/combats/{id}/start", post(combat_routes::start_combat))
        .route("/api/combats/{id}/next", post(combat_routes::next_turn))
        .route(
            "/api/combats/{id}/previous",
            post(combat_routes::previous_turn),
        )
        .route("/api/combats/{id}/attack", post(combat_routes::attack))
        .route("/api/combats/{id}/heal", post(combat_routes::heal))
        .route(
            "/api/combats/{id}/conditions",
            post(combat_routes::apply_condition),
        )
        .route(
            "/api/combats/{id}/conditions/remove",
            post(combat_routes::remove_condition),
        )
        .route(
            "/api/combats/{id}/effects/drop",
            post(combat_routes::drop_effect),
        )
        .route("/api/combats/{id}/end", post(combat_routes::end_combat))
        // Domains, units and fortifications
        .route("/api/rooms/{id}/domains", get(realm_routes::list_domains))
        .route("/api/rooms/{id}/domains", post(realm_routes::create_domain))
        .route("/api/domains/{id}", get(realm_routes::get_domain))
        .route("/api/domains/{id}", put(realm_routes::update_domain))
        .route("/api/domains/{id}", delete(realm_routes::delete_domain))
        .route("/api/domains/{id}/intrigue", post(realm_routes::intrigue))
        .route(
            "/api/domains/{id}/restore",
            post(realm_routes::restore_defense),
        )
        .route("/api/domains/{id}/upkeep", post(realm_routes::pay_upkeep))
        .route("/api/domains/{id}/units", get(realm_routes::list_units))
        .route("/api/domains/{id}/units", post(realm_routes::create_unit))
        .route("/api/units/{id}", get(realm_routes::get_unit))
        .route("/api/units/{id}", put(realm_routes::update_unit))
        .route("/api/units/{id}", delete(realm_routes::delete_unit))
        .route("/api/units/{id}/garrison", put(realm_routes::garrison_unit))
        .route(
            "/api/domains/{id}/fortifications",
            get(realm_routes::list_fortifications),
        )
        .route(
            "/api/domains/{id}/fortifications",
            post(realm_routes::create_fortification),
        )
        .route(
            "/api/fortifications/{id}",
            get(realm_routes::get_fortification),
        )
        .route(
            "/api/fortifications/{id}",
            delete(realm_routes::delete_fortification),
        )
        .route(
            "/api/fortifications/{id}/repair",
            post(realm_routes::repair_fortification),
        )
        // Warfare
        .route("/api/rooms/{id}/battles", get(warfare_routes::list_battles))
        .route("/api/rooms/{id}/battles", post(warfare_routes::create_battle))
        .route("/api/battles/{id}", get(warfare_routes::get_battle))
        .route("/api/battles/{id}", delete(warfare_routes::delete_battle))
        .route("/api/battles/{id}/units", post(warfare_routes::engage_unit))
        .route(
            "/api/battles/{id}/units/{unit_id}",
            delete(warfare_routes::withdraw_unit),
        )
        .route(
            "/api/battles/{id}/units/{unit_id}/initiative",
            put(warfare_routes::set_initiative),
        )
        .route(
            "/api/battles/{id}/initiative",
            post(warfare_routes::roll_initiative),
        )
        .route("/api/battles/{id}/start", post(warfare_routes::start_battle))
        .route("/api/battles/{id}/next", post(warfare_routes::next_turn))
        .route(
            "/api/battles/{id}/previous",
            post(warfare_routes::previous_turn),
        )
        .route("/api/battles/{id}/attack", post(warfare_routes::attack))
        .route("/api/battles/{id}/siege", post(warfare_routes::siege))
        .route("/api/battles/{id}/rally", post(warfare_routes::rally))
        .route("/api/battles/{id}/end", post(warfare_routes::end_battle))
        .merge(settings_routes::settings_routes())
}

/// Parse a path id, naming the kind of id in the error
pub(crate) fn parse_id<T: FromStr>(raw: &str, kind: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, format!("Invalid {kind} ID")))
}

/// Map a service failure to a status code and message
pub(crate) fn service_error(error: ServiceError) -> ApiError {
    let status = match &error {
        ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::LimitViolations(violations) => {
            let details: Vec<String> = violations.iter().map(ToString::to_string).collect();
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("{error}: {}", details.join("; ")),
            );
        }
        ServiceError::Domain(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::Combat(
            CombatError::UnknownParticipant(_)
            | CombatError::UnknownPower(_)
            | CombatError::UnknownEffect(_)
            | CombatError::TurnOrder(TurnOrderError::UnknownParticipant(_)),
        ) => StatusCode::NOT_FOUND,
        ServiceError::Warfare(
            WarfareError::UnknownUnit(_) | WarfareError::TurnOrder(TurnOrderError::UnknownParticipant(_)),
        ) => StatusCode::NOT_FOUND,
        ServiceError::Combat(_) | ServiceError::Warfare(_) => StatusCode::CONFLICT,
        ServiceError::Repository(RepoError::NotFound { .. }) => StatusCode::NOT_FOUND,
        ServiceError::Repository(e) => {
            tracing::error!(error = %e, "Repository failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::LimitViolation;
    use crate::domain::value_objects::{CharacterId, ParticipantId, UnitId};

    #[test]
    fn test_status_codes() {
        let status = |e: ServiceError| service_error(e).0;

        assert_eq!(status(ServiceError::not_found("Room", "x")), StatusCode::NOT_FOUND);
        assert_eq!(status(ServiceError::validation("bad")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(CombatError::UnknownParticipant(ParticipantId::new()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(CombatError::AlreadyInCombat(CharacterId::new()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(CombatError::TurnOrder(TurnOrderError::Empty).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(WarfareError::UnknownUnit(UnitId::new()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(RepoError::database("disk full").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_limit_violations_are_listed() {
        let (status, message) = service_error(ServiceError::LimitViolations(vec![
            LimitViolation::PowerLevelOutOfRange { value: 25 },
        ]));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(message.contains("power level 25"));
    }

    #[test]
    fn test_parse_id() {
        let id = CharacterId::new();
        let parsed: CharacterId = parse_id(&id.to_string(), "character").unwrap();
        assert_eq!(parsed, id);

        let err = parse_id::<CharacterId>("nope", "character").unwrap_err();
        assert_eq!(err, (StatusCode::BAD_REQUEST, "Invalid character ID".to_string()));
    }
}
