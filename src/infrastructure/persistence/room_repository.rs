//! Room repository backed by SQLite

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::DocumentTable;
use crate::application::ports::outbound::{RepoError, RoomRepository};
use crate::domain::entities::Room;
use crate::domain::value_objects::RoomId;

/// Tables cleared when a room goes, children before parents
const ROOM_CASCADE: &[&str] = &[
    "DELETE FROM units WHERE domain_id IN (SELECT id FROM domains WHERE room_id = ?)",
    "DELETE FROM fortifications WHERE domain_id IN (SELECT id FROM domains WHERE room_id = ?)",
    "DELETE FROM domains WHERE room_id = ?",
    "DELETE FROM battles WHERE room_id = ?",
    "DELETE FROM combats WHERE room_id = ?",
    "DELETE FROM items WHERE room_id = ?",
    "DELETE FROM characters WHERE room_id = ?",
    "DELETE FROM rooms WHERE id = ?",
];

pub struct SqliteRoomRepository {
    table: DocumentTable,
}

impl SqliteRoomRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            table: DocumentTable::new(pool, "rooms", &[]),
        }
    }
}

#[async_trait]
impl RoomRepository for SqliteRoomRepository {
    async fn get(&self, id: RoomId) -> Result<Option<Room>, RepoError> {
        self.table.get(id.to_string()).await
    }

    async fn list(&self) -> Result<Vec<Room>, RepoError> {
        self.table.list_all().await
    }

    async fn save(&self, room: &Room) -> Result<(), RepoError> {
        self.table.upsert(room.id.to_string(), vec![], room).await?;
        tracing::debug!(room_id = %room.id, "Saved room");
        Ok(())
    }

    async fn delete(&self, id: RoomId) -> Result<(), RepoError> {
        let mut tx = self.table.pool().begin().await.map_err(RepoError::database)?;
        for statement in ROOM_CASCADE {
            sqlx::query(statement)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(RepoError::database)?;
        }
        tx.commit().await.map_err(RepoError::database)?;

        tracing::debug!(room_id = %id, "Deleted room and its contents");
        Ok(())
    }
}
