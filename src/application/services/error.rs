//! Errors returned by application services

use crate::application::ports::outbound::RepoError;
use crate::domain::entities::{CombatError, LimitViolation, ValidationError, WarfareError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("{0}")]
    Validation(String),
    #[error("character sheet breaks {} rule(s)", .0.len())]
    LimitViolations(Vec<LimitViolation>),
    #[error("{0}")]
    Forbidden(String),
    #[error(transparent)]
    Domain(#[from] ValidationError),
    #[error(transparent)]
    Combat(#[from] CombatError),
    #[error(transparent)]
    Warfare(#[from] WarfareError),
    #[error(transparent)]
    Repository(#[from] RepoError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Shared name/description checks
pub(crate) fn validate_text(
    kind: &str,
    name: &str,
    description: Option<&str>,
    max_name: usize,
    max_description: usize,
) -> ServiceResult<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::validation(format!("{kind} name cannot be empty")));
    }
    if name.len() > max_name {
        return Err(ServiceError::validation(format!(
            "{kind} name cannot exceed {max_name} characters"
        )));
    }
    if let Some(description) = description {
        if description.len() > max_description {
            return Err(ServiceError::validation(format!(
                "{kind} description cannot exceed {max_description} characters"
            )));
        }
    }
    Ok(())
}
