use async_trait::async_trait;

use super::RepoError;
use crate::domain::value_objects::AppSettings;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SettingsRepositoryPort: Send + Sync {
    async fn get(&self) -> Result<AppSettings, RepoError>;
    async fn save(&self, settings: &AppSettings) -> Result<(), RepoError>;
    async fn reset(&self) -> Result<AppSettings, RepoError>;
}
