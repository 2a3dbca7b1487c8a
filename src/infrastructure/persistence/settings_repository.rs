//! Game settings stored as key/value rows

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::application::ports::outbound::{RepoError, SettingsRepositoryPort};
use crate::domain::value_objects::AppSettings;

pub struct SqliteSettingsRepository {
    pool: SqlitePool,
}

impl SqliteSettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepositoryPort for SqliteSettingsRepository {
    async fn get(&self) -> Result<AppSettings, RepoError> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await
            .map_err(RepoError::database)?;

        // Stored values win over the environment
        Ok(AppSettings::from_env().with_pairs(rows.iter().map(|(k, v)| (k.as_str(), v.as_str()))))
    }

    async fn save(&self, settings: &AppSettings) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await.map_err(RepoError::database)?;
        for (key, value) in settings.to_pairs() {
            sqlx::query(
                "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(RepoError::database)?;
        }
        tx.commit().await.map_err(RepoError::database)?;

        tracing::debug!("Saved settings");
        Ok(())
    }

    async fn reset(&self) -> Result<AppSettings, RepoError> {
        sqlx::query("DELETE FROM settings")
            .execute(&self.pool)
            .await
            .map_err(RepoError::database)?;

        Ok(AppSettings::from_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::SqliteDatabase;

    #[tokio::test]
    async fn test_empty_table_gives_defaults() {
        let db = SqliteDatabase::in_memory().await;
        assert_eq!(db.settings().get().await.unwrap(), AppSettings::default());
    }

    #[tokio::test]
    async fn test_save_then_reset() {
        let db = SqliteDatabase::in_memory().await;
        let repo = db.settings();
        let custom = AppSettings {
            morale_dc: 12,
            points_per_level: 20,
            ..AppSettings::default()
        };
        repo.save(&custom).await.unwrap();
        assert_eq!(repo.get().await.unwrap(), custom);

        assert_eq!(repo.reset().await.unwrap(), AppSettings::default());
        assert_eq!(repo.get().await.unwrap(), AppSettings::default());
    }
}
