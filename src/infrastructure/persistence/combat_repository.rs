//! Combat repository backed by SQLite
//!
//! The whole encounter, turn order and applied conditions included, is one
//! document.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::DocumentTable;
use crate::application::ports::outbound::{CombatRepository, RepoError};
use crate::domain::entities::Combat;
use crate::domain::value_objects::{CombatId, RoomId};

pub struct SqliteCombatRepository {
    table: DocumentTable,
}

impl SqliteCombatRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            table: DocumentTable::new(pool, "combats", &["room_id"]),
        }
    }
}

#[async_trait]
impl CombatRepository for SqliteCombatRepository {
    async fn get(&self, id: CombatId) -> Result<Option<Combat>, RepoError> {
        self.table.get(id.to_string()).await
    }

    async fn list_in_room(&self, room_id: RoomId) -> Result<Vec<Combat>, RepoError> {
        self.table.list_by("room_id", room_id.to_string()).await
    }

    async fn save(&self, combat: &Combat) -> Result<(), RepoError> {
        self.table
            .upsert(combat.id.to_string(), vec![Some(combat.room_id.to_string())], combat)
            .await?;
        tracing::debug!(combat_id = %combat.id, round = combat.round(), "Saved combat");
        Ok(())
    }

    async fn delete(&self, id: CombatId) -> Result<(), RepoError> {
        self.table.delete(id.to_string()).await?;
        tracing::debug!(combat_id = %id, "Deleted combat");
        Ok(())
    }
}
