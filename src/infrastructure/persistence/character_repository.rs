//! Character repository backed by SQLite

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::DocumentTable;
use crate::application::ports::outbound::{CharacterRepository, RepoError};
use crate::domain::entities::Character;
use crate::domain::value_objects::{CharacterId, RoomId};

pub struct SqliteCharacterRepository {
    table: DocumentTable,
}

impl SqliteCharacterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            table: DocumentTable::new(pool, "characters", &["room_id"]),
        }
    }
}

#[async_trait]
impl CharacterRepository for SqliteCharacterRepository {
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError> {
        self.table.get(id.to_string()).await
    }

    async fn list_in_room(&self, room_id: RoomId) -> Result<Vec<Character>, RepoError> {
        self.table.list_by("room_id", room_id.to_string()).await
    }

    async fn save(&self, character: &Character) -> Result<(), RepoError> {
        self.table
            .upsert(
                character.id.to_string(),
                vec![Some(character.room_id.to_string())],
                character,
            )
            .await?;
        tracing::debug!(character_id = %character.id, room_id = %character.room_id, "Saved character");
        Ok(())
    }

    async fn delete(&self, id: CharacterId) -> Result<(), RepoError> {
        self.table.delete(id.to_string()).await?;
        tracing::debug!(character_id = %id, "Deleted character");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Ability;
    use crate::infrastructure::persistence::SqliteDatabase;

    #[tokio::test]
    async fn test_sheet_survives_round_trip() {
        let db = SqliteDatabase::in_memory().await;
        let repo = db.characters();
        let mut character = Character::new(RoomId::new(), "Vesper", 10);
        character.abilities.set(Ability::Agility, 4);
        repo.save(&character).await.unwrap();

        let loaded = repo.get(character.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Vesper");
        assert_eq!(loaded.abilities.get(Ability::Agility), 4);
        assert_eq!(loaded.initiative_bonus(), character.initiative_bonus());
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_room() {
        let db = SqliteDatabase::in_memory().await;
        let repo = db.characters();
        let room = RoomId::new();
        repo.save(&Character::new(room, "Vesper", 10)).await.unwrap();
        repo.save(&Character::new(room, "Marrow", 10)).await.unwrap();
        repo.save(&Character::new(RoomId::new(), "Stranger", 10)).await.unwrap();

        let names: Vec<_> = repo
            .list_in_room(room)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Vesper", "Marrow"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = SqliteDatabase::in_memory().await;
        let repo = db.characters();
        let character = Character::new(RoomId::new(), "Vesper", 10);
        repo.save(&character).await.unwrap();
        repo.delete(character.id).await.unwrap();
        assert!(repo.get(character.id).await.unwrap().is_none());
    }
}
