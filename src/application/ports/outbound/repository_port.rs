//! Repository ports - Interfaces for data persistence
//!
//! Application services depend on these traits, not on the SQLite
//! implementations in infrastructure.

use async_trait::async_trait;

use crate::domain::entities::{
    Character, Combat, Domain, Fortification, Item, Room, Unit, WarfareCombat,
};
use crate::domain::value_objects::{
    CharacterId, CombatId, DomainId, FortificationId, ItemId, RoomId, UnitId, WarfareCombatId,
};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepoError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn database(error: impl ToString) -> Self {
        Self::Database(error.to_string())
    }

    pub fn serialization(error: impl ToString) -> Self {
        Self::Serialization(error.to_string())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn get(&self, id: RoomId) -> Result<Option<Room>, RepoError>;
    async fn list(&self) -> Result<Vec<Room>, RepoError>;
    async fn save(&self, room: &Room) -> Result<(), RepoError>;
    /// Delete a room and everything stored in it
    async fn delete(&self, id: RoomId) -> Result<(), RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CharacterRepository: Send + Sync {
    async fn get(&self, id: CharacterId) -> Result<Option<Character>, RepoError>;
    async fn list_in_room(&self, room_id: RoomId) -> Result<Vec<Character>, RepoError>;
    async fn save(&self, character: &Character) -> Result<(), RepoError>;
    async fn delete(&self, id: CharacterId) -> Result<(), RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn get(&self, id: ItemId) -> Result<Option<Item>, RepoError>;
    async fn list_in_room(&self, room_id: RoomId) -> Result<Vec<Item>, RepoError>;
    async fn list_carried_by(&self, owner: CharacterId) -> Result<Vec<Item>, RepoError>;
    async fn save(&self, item: &Item) -> Result<(), RepoError>;
    async fn delete(&self, id: ItemId) -> Result<(), RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CombatRepository: Send + Sync {
    async fn get(&self, id: CombatId) -> Result<Option<Combat>, RepoError>;
    async fn list_in_room(&self, room_id: RoomId) -> Result<Vec<Combat>, RepoError>;
    async fn save(&self, combat: &Combat) -> Result<(), RepoError>;
    async fn delete(&self, id: CombatId) -> Result<(), RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainRepository: Send + Sync {
    async fn get(&self, id: DomainId) -> Result<Option<Domain>, RepoError>;
    async fn list_in_room(&self, room_id: RoomId) -> Result<Vec<Domain>, RepoError>;
    async fn save(&self, domain: &Domain) -> Result<(), RepoError>;
    async fn delete(&self, id: DomainId) -> Result<(), RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UnitRepository: Send + Sync {
    async fn get(&self, id: UnitId) -> Result<Option<Unit>, RepoError>;
    async fn list_in_domain(&self, domain_id: DomainId) -> Result<Vec<Unit>, RepoError>;
    async fn save(&self, unit: &Unit) -> Result<(), RepoError>;
    async fn delete(&self, id: UnitId) -> Result<(), RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FortificationRepository: Send + Sync {
    async fn get(&self, id: FortificationId) -> Result<Option<Fortification>, RepoError>;
    async fn list_in_domain(&self, domain_id: DomainId) -> Result<Vec<Fortification>, RepoError>;
    async fn save(&self, fortification: &Fortification) -> Result<(), RepoError>;
    async fn delete(&self, id: FortificationId) -> Result<(), RepoError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WarfareRepository: Send + Sync {
    async fn get(&self, id: WarfareCombatId) -> Result<Option<WarfareCombat>, RepoError>;
    async fn list_in_room(&self, room_id: RoomId) -> Result<Vec<WarfareCombat>, RepoError>;
    async fn save(&self, battle: &WarfareCombat) -> Result<(), RepoError>;
    async fn delete(&self, id: WarfareCombatId) -> Result<(), RepoError>;
}
