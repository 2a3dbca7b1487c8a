//! Game settings API routes

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use super::{service_error, ApiError};
use crate::application::services::ServiceError;
use crate::domain::value_objects::AppSettings;
use crate::infrastructure::state::AppState;

pub fn settings_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/settings", get(get_settings))
        .route("/api/settings", put(update_settings))
        .route("/api/settings/reset", post(reset_settings))
}

async fn get_settings(State(state): State<Arc<AppState>>) -> Json<AppSettings> {
    Json(state.settings_service.get().await)
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<AppSettings>,
) -> Result<Json<AppSettings>, ApiError> {
    check_settings(&settings)?;
    state
        .settings_service
        .update(settings.clone())
        .await
        .map_err(|e| service_error(e.into()))?;
    Ok(Json(settings))
}

/// Drop stored overrides, falling back to the environment and defaults
async fn reset_settings(State(state): State<Arc<AppState>>) -> Result<Json<AppSettings>, ApiError> {
    state
        .settings_service
        .reset()
        .await
        .map(Json)
        .map_err(|e| service_error(e.into()))
}

fn check_settings(settings: &AppSettings) -> Result<(), ApiError> {
    let problem = if settings.default_power_level < 1 {
        Some("default_power_level must be at least 1")
    } else if settings.points_per_level < 1 {
        Some("points_per_level must be at least 1")
    } else if settings.max_name_length == 0 {
        Some("max_name_length must be positive")
    } else if settings.morale_dc < 1 || settings.rally_dc < 1 {
        Some("difficulty classes must be at least 1")
    } else {
        None
    };
    match problem {
        Some(message) => Err(service_error(ServiceError::validation(message))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_checks() {
        assert!(check_settings(&AppSettings::default()).is_ok());
    }

    #[test]
    fn test_zero_points_per_level_rejected() {
        let settings = AppSettings {
            points_per_level: 0,
            ..AppSettings::default()
        };
        let (status, message) = check_settings(&settings).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(message.contains("points_per_level"));
    }
}
