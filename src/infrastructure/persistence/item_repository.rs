//! Item repository backed by SQLite

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::DocumentTable;
use crate::application::ports::outbound::{ItemRepository, RepoError};
use crate::domain::entities::Item;
use crate::domain::value_objects::{CharacterId, ItemId, RoomId};

pub struct SqliteItemRepository {
    table: DocumentTable,
}

impl SqliteItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            table: DocumentTable::new(pool, "items", &["room_id", "owner_id"]),
        }
    }
}

#[async_trait]
impl ItemRepository for SqliteItemRepository {
    async fn get(&self, id: ItemId) -> Result<Option<Item>, RepoError> {
        self.table.get(id.to_string()).await
    }

    async fn list_in_room(&self, room_id: RoomId) -> Result<Vec<Item>, RepoError> {
        self.table.list_by("room_id", room_id.to_string()).await
    }

    async fn list_carried_by(&self, owner: CharacterId) -> Result<Vec<Item>, RepoError> {
        self.table.list_by("owner_id", owner.to_string()).await
    }

    async fn save(&self, item: &Item) -> Result<(), RepoError> {
        self.table
            .upsert(
                item.id.to_string(),
                vec![
                    Some(item.room_id.to_string()),
                    item.owner.map(|owner| owner.to_string()),
                ],
                item,
            )
            .await?;
        tracing::debug!(item_id = %item.id, owner = ?item.owner, "Saved item");
        Ok(())
    }

    async fn delete(&self, id: ItemId) -> Result<(), RepoError> {
        self.table.delete(id.to_string()).await?;
        tracing::debug!(item_id = %id, "Deleted item");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ItemKind;
    use crate::infrastructure::persistence::SqliteDatabase;

    #[tokio::test]
    async fn test_owner_index_follows_transfers() {
        let db = SqliteDatabase::in_memory().await;
        let repo = db.items();
        let room = RoomId::new();
        let vesper = CharacterId::new();
        let marrow = CharacterId::new();
        let mut mail = Item::new(room, "Chain Mail", ItemKind::Armor { protection: 2 }).carried_by(vesper);
        repo.save(&mail).await.unwrap();
        repo.save(&Item::new(room, "Rope", ItemKind::Gear)).await.unwrap();

        assert_eq!(repo.list_carried_by(vesper).await.unwrap().len(), 1);

        mail.owner = Some(marrow);
        repo.save(&mail).await.unwrap();

        assert!(repo.list_carried_by(vesper).await.unwrap().is_empty());
        let carried = repo.list_carried_by(marrow).await.unwrap();
        assert_eq!(carried[0].kind, ItemKind::Armor { protection: 2 });
        assert_eq!(repo.list_in_room(room).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unowned_items_are_not_carried() {
        let db = SqliteDatabase::in_memory().await;
        let repo = db.items();
        let rope = Item::new(RoomId::new(), "Rope", ItemKind::Gear);
        repo.save(&rope).await.unwrap();

        assert!(repo.list_carried_by(CharacterId::new()).await.unwrap().is_empty());
        repo.delete(rope.id).await.unwrap();
        assert!(repo.get(rope.id).await.unwrap().is_none());
    }
}
