use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::application::ports::outbound::{RepoError, SettingsRepositoryPort};
use crate::domain::value_objects::AppSettings;

pub struct SettingsService {
    repository: Arc<dyn SettingsRepositoryPort>,
    cache: RwLock<Option<AppSettings>>,
}

impl SettingsService {
    pub fn new(repository: Arc<dyn SettingsRepositoryPort>) -> Self {
        Self {
            repository,
            cache: RwLock::new(None),
        }
    }

    /// Get current settings (cached)
    pub async fn get(&self) -> AppSettings {
        let cache = self.cache.read().await;
        if let Some(settings) = &*cache {
            return settings.clone();
        }
        drop(cache);

        match self.repository.get().await {
            Ok(settings) => {
                *self.cache.write().await = Some(settings.clone());
                settings
            }
            Err(e) => {
                warn!(error = %e, "Falling back to environment settings");
                AppSettings::from_env()
            }
        }
    }

    /// Update settings and refresh the cache
    pub async fn update(&self, settings: AppSettings) -> Result<(), RepoError> {
        self.repository.save(&settings).await?;
        info!(
            points_per_level = settings.points_per_level,
            morale_dc = settings.morale_dc,
            "Settings updated"
        );
        *self.cache.write().await = Some(settings);
        Ok(())
    }

    /// Reset to env/defaults and clear DB values
    pub async fn reset(&self) -> Result<AppSettings, RepoError> {
        let settings = self.repository.reset().await?;
        *self.cache.write().await = Some(settings.clone());
        Ok(settings)
    }
}

#[cfg(test)]
pub(crate) fn default_settings() -> Arc<SettingsService> {
    use crate::application::ports::outbound::MockSettingsRepositoryPort;

    let mut repo = MockSettingsRepositoryPort::new();
    repo.expect_get().returning(|| Ok(AppSettings::default()));
    Arc::new(SettingsService::new(Arc::new(repo)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::MockSettingsRepositoryPort;

    #[tokio::test]
    async fn test_get_is_cached() {
        let mut repo = MockSettingsRepositoryPort::new();
        repo.expect_get()
            .times(1)
            .returning(|| Ok(AppSettings { morale_dc: 12, ..AppSettings::default() }));
        let service = SettingsService::new(Arc::new(repo));

        assert_eq!(service.get().await.morale_dc, 12);
        assert_eq!(service.get().await.morale_dc, 12);
    }

    #[tokio::test]
    async fn test_update_replaces_cache() {
        let mut repo = MockSettingsRepositoryPort::new();
        repo.expect_save().times(1).returning(|_| Ok(()));
        let service = SettingsService::new(Arc::new(repo));

        let settings = AppSettings { rally_dc: 9, ..AppSettings::default() };
        service.update(settings).await.unwrap();
        assert_eq!(service.get().await.rally_dc, 9);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_old_values() {
        let mut repo = MockSettingsRepositoryPort::new();
        repo.expect_save()
            .returning(|_| Err(RepoError::database("disk full")));
        repo.expect_get().returning(|| Ok(AppSettings::default()));
        let service = SettingsService::new(Arc::new(repo));

        let result = service
            .update(AppSettings { rally_dc: 9, ..AppSettings::default() })
            .await;
        assert!(result.is_err());
        assert_eq!(service.get().await.rally_dc, 15);
    }
}
