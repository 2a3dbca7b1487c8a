//! Domain, unit and fortification repositories backed by SQLite

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::DocumentTable;
use crate::application::ports::outbound::{
    DomainRepository, FortificationRepository, RepoError, UnitRepository,
};
use crate::domain::entities::{Domain, Fortification, Unit};
use crate::domain::value_objects::{DomainId, FortificationId, RoomId, UnitId};

pub struct SqliteDomainRepository {
    table: DocumentTable,
}

impl SqliteDomainRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            table: DocumentTable::new(pool, "domains", &["room_id"]),
        }
    }
}

#[async_trait]
impl DomainRepository for SqliteDomainRepository {
    async fn get(&self, id: DomainId) -> Result<Option<Domain>, RepoError> {
        self.table.get(id.to_string()).await
    }

    async fn list_in_room(&self, room_id: RoomId) -> Result<Vec<Domain>, RepoError> {
        self.table.list_by("room_id", room_id.to_string()).await
    }

    async fn save(&self, domain: &Domain) -> Result<(), RepoError> {
        self.table
            .upsert(domain.id.to_string(), vec![Some(domain.room_id.to_string())], domain)
            .await?;
        tracing::debug!(domain_id = %domain.id, treasury = domain.treasury, "Saved domain");
        Ok(())
    }

    async fn delete(&self, id: DomainId) -> Result<(), RepoError> {
        self.table.delete(id.to_string()).await?;
        tracing::debug!(domain_id = %id, "Deleted domain");
        Ok(())
    }
}

pub struct SqliteUnitRepository {
    table: DocumentTable,
}

impl SqliteUnitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            table: DocumentTable::new(pool, "units", &["domain_id"]),
        }
    }
}

#[async_trait]
impl UnitRepository for SqliteUnitRepository {
    async fn get(&self, id: UnitId) -> Result<Option<Unit>, RepoError> {
        self.table.get(id.to_string()).await
    }

    async fn list_in_domain(&self, domain_id: DomainId) -> Result<Vec<Unit>, RepoError> {
        self.table.list_by("domain_id", domain_id.to_string()).await
    }

    async fn save(&self, unit: &Unit) -> Result<(), RepoError> {
        self.table
            .upsert(unit.id.to_string(), vec![Some(unit.domain_id.to_string())], unit)
            .await?;
        tracing::debug!(unit_id = %unit.id, hp = unit.hp, "Saved unit");
        Ok(())
    }

    async fn delete(&self, id: UnitId) -> Result<(), RepoError> {
        self.table.delete(id.to_string()).await?;
        tracing::debug!(unit_id = %id, "Deleted unit");
        Ok(())
    }
}

pub struct SqliteFortificationRepository {
    table: DocumentTable,
}

impl SqliteFortificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            table: DocumentTable::new(pool, "fortifications", &["domain_id"]),
        }
    }
}

#[async_trait]
impl FortificationRepository for SqliteFortificationRepository {
    async fn get(&self, id: FortificationId) -> Result<Option<Fortification>, RepoError> {
        self.table.get(id.to_string()).await
    }

    async fn list_in_domain(&self, domain_id: DomainId) -> Result<Vec<Fortification>, RepoError> {
        self.table.list_by("domain_id", domain_id.to_string()).await
    }

    async fn save(&self, fortification: &Fortification) -> Result<(), RepoError> {
        self.table
            .upsert(
                fortification.id.to_string(),
                vec![Some(fortification.domain_id.to_string())],
                fortification,
            )
            .await?;
        tracing::debug!(fortification_id = %fortification.id, hp = fortification.hp, "Saved fortification");
        Ok(())
    }

    async fn delete(&self, id: FortificationId) -> Result<(), RepoError> {
        self.table.delete(id.to_string()).await?;
        tracing::debug!(fortification_id = %id, "Deleted fortification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::DomainDefense;
    use crate::domain::value_objects::{
        Ancestry, CasualtyDie, Equipment, Experience, FortificationKind, UnitType,
    };
    use crate::infrastructure::persistence::SqliteDatabase;

    #[tokio::test]
    async fn test_domain_keeps_defense_tracks() {
        let db = SqliteDatabase::in_memory().await;
        let repo = db.domains();
        let mut domain = Domain::new(RoomId::new(), "Highmarch", 3).with_treasury(40);
        domain.lower_defense(DomainDefense::Resolve);
        repo.save(&domain).await.unwrap();

        let loaded = repo.get(domain.id).await.unwrap().unwrap();
        assert_eq!(loaded.treasury, 40);
        assert_eq!(
            loaded.defenses.get(DomainDefense::Resolve),
            domain.defenses.get(DomainDefense::Resolve)
        );
    }

    #[tokio::test]
    async fn test_units_and_fortifications_listed_by_domain() {
        let db = SqliteDatabase::in_memory().await;
        let domain_id = DomainId::new();
        let keep = Fortification::new(domain_id, "Old Keep", FortificationKind::Keep);
        db.fortifications().save(&keep).await.unwrap();
        let pikes = Unit::new(
            domain_id,
            "Pikes",
            Ancestry::Dwarf,
            UnitType::Infantry,
            Experience::Veteran,
            Equipment::Heavy,
            CasualtyDie::D8,
        )
        .garrisoned_in(keep.id);
        db.units().save(&pikes).await.unwrap();

        let units = db.units().list_in_domain(domain_id).await.unwrap();
        assert_eq!(units, vec![pikes]);
        let forts = db.fortifications().list_in_domain(domain_id).await.unwrap();
        assert_eq!(forts, vec![keep]);
        assert!(db.units().list_in_domain(DomainId::new()).await.unwrap().is_empty());
    }
}
