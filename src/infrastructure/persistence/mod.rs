//! SQLite persistence adapters
//!
//! Each aggregate is stored as one row: its id, the ids it is listed by, and
//! the aggregate itself as a JSON document.

mod character_repository;
mod combat_repository;
mod item_repository;
mod realm_repository;
mod room_repository;
mod settings_repository;
mod warfare_repository;

pub use character_repository::SqliteCharacterRepository;
pub use combat_repository::SqliteCombatRepository;
pub use item_repository::SqliteItemRepository;
pub use realm_repository::{
    SqliteDomainRepository, SqliteFortificationRepository, SqliteUnitRepository,
};
pub use room_repository::SqliteRoomRepository;
pub use settings_repository::SqliteSettingsRepository;
pub use warfare_repository::SqliteWarfareRepository;

use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::application::ports::outbound::RepoError;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS rooms (
        id TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS characters (
        id TEXT PRIMARY KEY,
        room_id TEXT NOT NULL,
        data TEXT NOT NULL,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_characters_room ON characters (room_id)",
    "CREATE TABLE IF NOT EXISTS items (
        id TEXT PRIMARY KEY,
        room_id TEXT NOT NULL,
        owner_id TEXT,
        data TEXT NOT NULL,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_items_room ON items (room_id)",
    "CREATE INDEX IF NOT EXISTS idx_items_owner ON items (owner_id)",
    "CREATE TABLE IF NOT EXISTS combats (
        id TEXT PRIMARY KEY,
        room_id TEXT NOT NULL,
        data TEXT NOT NULL,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_combats_room ON combats (room_id)",
    "CREATE TABLE IF NOT EXISTS domains (
        id TEXT PRIMARY KEY,
        room_id TEXT NOT NULL,
        data TEXT NOT NULL,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_domains_room ON domains (room_id)",
    "CREATE TABLE IF NOT EXISTS units (
        id TEXT PRIMARY KEY,
        domain_id TEXT NOT NULL,
        data TEXT NOT NULL,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_units_domain ON units (domain_id)",
    "CREATE TABLE IF NOT EXISTS fortifications (
        id TEXT PRIMARY KEY,
        domain_id TEXT NOT NULL,
        data TEXT NOT NULL,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_fortifications_domain ON fortifications (domain_id)",
    "CREATE TABLE IF NOT EXISTS battles (
        id TEXT PRIMARY KEY,
        room_id TEXT NOT NULL,
        data TEXT NOT NULL,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE INDEX IF NOT EXISTS idx_battles_room ON battles (room_id)",
    "CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
];

/// Connection pool plus accessors for every repository
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database url: {url}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {url}"))?;

        let database = Self { pool };
        database.initialize_schema().await?;
        Ok(database)
    }

    /// A private database that lives as long as its single connection
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        let database = Self { pool };
        database.initialize_schema().await.unwrap();
        database
    }

    async fn initialize_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to initialize schema")?;
        }
        tracing::debug!("Initialized SQLite schema");
        Ok(())
    }

    pub fn rooms(&self) -> SqliteRoomRepository {
        SqliteRoomRepository::new(self.pool.clone())
    }

    pub fn characters(&self) -> SqliteCharacterRepository {
        SqliteCharacterRepository::new(self.pool.clone())
    }

    pub fn items(&self) -> SqliteItemRepository {
        SqliteItemRepository::new(self.pool.clone())
    }

    pub fn combats(&self) -> SqliteCombatRepository {
        SqliteCombatRepository::new(self.pool.clone())
    }

    pub fn domains(&self) -> SqliteDomainRepository {
        SqliteDomainRepository::new(self.pool.clone())
    }

    pub fn units(&self) -> SqliteUnitRepository {
        SqliteUnitRepository::new(self.pool.clone())
    }

    pub fn fortifications(&self) -> SqliteFortificationRepository {
        SqliteFortificationRepository::new(self.pool.clone())
    }

    pub fn battles(&self) -> SqliteWarfareRepository {
        SqliteWarfareRepository::new(self.pool.clone())
    }

    pub fn settings(&self) -> SqliteSettingsRepository {
        SqliteSettingsRepository::new(self.pool.clone())
    }
}

/// JSON-document table shared by the aggregate repositories
///
/// `columns` are the lookup columns stored next to the document, in the order
/// their values are passed to `upsert`.
#[derive(Clone)]
pub(crate) struct DocumentTable {
    pool: SqlitePool,
    table: &'static str,
    columns: &'static [&'static str],
}

impl DocumentTable {
    pub(crate) fn new(pool: SqlitePool, table: &'static str, columns: &'static [&'static str]) -> Self {
        Self { pool, table, columns }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, id: String) -> Result<Option<T>, RepoError> {
        let sql = format!("SELECT data FROM {} WHERE id = ?", self.table);
        let row: Option<(String,)> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepoError::database)?;

        row.map(|(json,)| decode(&json)).transpose()
    }

    /// All documents whose `column` equals `value`, oldest first
    pub(crate) async fn list_by<T: DeserializeOwned>(
        &self,
        column: &str,
        value: String,
    ) -> Result<Vec<T>, RepoError> {
        let sql = format!(
            "SELECT data FROM {} WHERE {} = ? ORDER BY rowid",
            self.table, column
        );
        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(RepoError::database)?;

        rows.iter().map(|(json,)| decode(json)).collect()
    }

    pub(crate) async fn list_all<T: DeserializeOwned>(&self) -> Result<Vec<T>, RepoError> {
        let sql = format!("SELECT data FROM {} ORDER BY rowid", self.table);
        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(RepoError::database)?;

        rows.iter().map(|(json,)| decode(json)).collect()
    }

    /// Insert or update; an update keeps the row's position in listings
    pub(crate) async fn upsert<T: Serialize>(
        &self,
        id: String,
        values: Vec<Option<String>>,
        document: &T,
    ) -> Result<(), RepoError> {
        let json = serde_json::to_string(document).map_err(RepoError::serialization)?;

        let mut names = vec!["id"];
        names.extend_from_slice(self.columns);
        names.push("data");
        let placeholders = vec!["?"; names.len()].join(", ");
        let updates: Vec<String> = names[1..]
            .iter()
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}, updated_at) VALUES ({}, CURRENT_TIMESTAMP)
             ON CONFLICT(id) DO UPDATE SET {}, updated_at = CURRENT_TIMESTAMP",
            self.table,
            names.join(", "),
            placeholders,
            updates.join(", "),
        );

        let mut query = sqlx::query(&sql).bind(id);
        for value in values {
            query = query.bind(value);
        }
        query
            .bind(json)
            .execute(&self.pool)
            .await
            .map_err(RepoError::database)?;
        Ok(())
    }

    pub(crate) async fn delete(&self, id: String) -> Result<(), RepoError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", self.table);
        sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RepoError::database)?;
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(json: &str) -> Result<T, RepoError> {
    serde_json::from_str(json).map_err(RepoError::serialization)
}
