//! Battle repository backed by SQLite

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::DocumentTable;
use crate::application::ports::outbound::{RepoError, WarfareRepository};
use crate::domain::entities::WarfareCombat;
use crate::domain::value_objects::{RoomId, WarfareCombatId};

pub struct SqliteWarfareRepository {
    table: DocumentTable,
}

impl SqliteWarfareRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            table: DocumentTable::new(pool, "battles", &["room_id"]),
        }
    }
}

#[async_trait]
impl WarfareRepository for SqliteWarfareRepository {
    async fn get(&self, id: WarfareCombatId) -> Result<Option<WarfareCombat>, RepoError> {
        self.table.get(id.to_string()).await
    }

    async fn list_in_room(&self, room_id: RoomId) -> Result<Vec<WarfareCombat>, RepoError> {
        self.table.list_by("room_id", room_id.to_string()).await
    }

    async fn save(&self, battle: &WarfareCombat) -> Result<(), RepoError> {
        self.table
            .upsert(battle.id.to_string(), vec![Some(battle.room_id.to_string())], battle)
            .await?;
        tracing::debug!(battle_id = %battle.id, "Saved battle");
        Ok(())
    }

    async fn delete(&self, id: WarfareCombatId) -> Result<(), RepoError> {
        self.table.delete(id.to_string()).await?;
        tracing::debug!(battle_id = %id, "Deleted battle");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Unit;
    use crate::domain::value_objects::{
        Ancestry, CasualtyDie, DomainId, Equipment, Experience, UnitType,
    };
    use crate::infrastructure::persistence::SqliteDatabase;

    #[tokio::test]
    async fn test_battle_keeps_engaged_units() {
        let db = SqliteDatabase::in_memory().await;
        let repo = db.battles();
        let room = RoomId::new();
        let mut battle = WarfareCombat::new(room, "Siege of Highmarch");
        let unit = Unit::new(
            DomainId::new(),
            "Outriders",
            Ancestry::Elf,
            UnitType::Cavalry,
            Experience::Seasoned,
            Equipment::Medium,
            CasualtyDie::D6,
        );
        let unit_id = battle.add_unit(unit).unwrap();
        battle.set_initiative(unit_id, 14).unwrap();
        repo.save(&battle).await.unwrap();

        let loaded = repo.get(battle.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Siege of Highmarch");
        assert_eq!(loaded.unit(unit_id).map(|u| u.name.clone()).unwrap(), "Outriders");
        assert_eq!(repo.list_in_room(room).await.unwrap().len(), 1);

        repo.delete(battle.id).await.unwrap();
        assert!(repo.list_in_room(room).await.unwrap().is_empty());
    }
}
