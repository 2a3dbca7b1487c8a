//! Realm Service - Domains, their units and fortifications

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::error::{validate_text, ServiceError, ServiceResult};
use super::settings_service::SettingsService;
use crate::application::ports::outbound::{
    DomainRepository, FortificationRepository, RoomBroadcastPort, RoomRepository, UnitRepository,
};
use crate::domain::entities::{
    Domain, DomainDefense, DomainDefenses, DomainSkill, DomainSkills, Fortification, Unit,
    WarfareError,
};
use crate::domain::events::DomainEvent;
use crate::domain::services::{intrigue, pay_upkeep, IntrigueReport};
use crate::domain::value_objects::{
    Ancestry, CasualtyDie, Dice, DomainId, Equipment, Experience, FortificationId,
    FortificationKind, RoomId, UnitId, UnitType, UserId,
};

#[derive(Debug, Clone)]
pub struct CreateDomainRequest {
    pub room_id: RoomId,
    pub owner: Option<UserId>,
    pub name: String,
    pub description: Option<String>,
    pub size: i32,
    pub skills: Option<DomainSkills>,
    /// Defaults to every defense at size + 2
    pub defenses: Option<DomainDefenses>,
    pub treasury: i32,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateDomainRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub owner: Option<Option<UserId>>,
    pub size: Option<i32>,
    pub skills: Option<DomainSkills>,
    pub defenses: Option<DomainDefenses>,
    pub treasury: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct CreateUnitRequest {
    pub domain_id: DomainId,
    pub name: String,
    pub ancestry: Ancestry,
    pub unit_type: UnitType,
    pub experience: Experience,
    pub equipment: Equipment,
    pub size: CasualtyDie,
    pub garrison: Option<FortificationId>,
    /// Pay the unit's cost from the domain treasury
    pub purchase: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUnitRequest {
    pub name: Option<String>,
    pub experience: Option<Experience>,
    pub equipment: Option<Equipment>,
    pub hp: Option<i32>,
}

#[async_trait]
pub trait RealmService: Send + Sync {
    async fn create_domain(&self, request: CreateDomainRequest) -> ServiceResult<Domain>;

    async fn get_domain(&self, id: DomainId) -> ServiceResult<Domain>;

    async fn list_domains(&self, room_id: RoomId) -> ServiceResult<Vec<Domain>>;

    async fn update_domain(&self, id: DomainId, request: UpdateDomainRequest) -> ServiceResult<Domain>;

    /// Delete a domain along with its units and fortifications
    async fn delete_domain(&self, id: DomainId) -> ServiceResult<()>;

    async fn intrigue(
        &self,
        actor: DomainId,
        skill: DomainSkill,
        target: DomainId,
        defense: DomainDefense,
    ) -> ServiceResult<IntrigueReport>;

    async fn restore_defense(&self, id: DomainId, defense: DomainDefense) -> ServiceResult<Domain>;

    /// Pay upkeep for every unit of the domain; returns the remaining treasury
    async fn pay_upkeep(&self, id: DomainId) -> ServiceResult<i32>;

    async fn create_unit(&self, request: CreateUnitRequest) -> ServiceResult<Unit>;

    async fn get_unit(&self, id: UnitId) -> ServiceResult<Unit>;

    async fn list_units(&self, domain_id: DomainId) -> ServiceResult<Vec<Unit>>;

    async fn update_unit(&self, id: UnitId, request: UpdateUnitRequest) -> ServiceResult<Unit>;

    async fn delete_unit(&self, id: UnitId) -> ServiceResult<()>;

    /// Station a unit in one of its domain's fortifications, or withdraw it
    async fn garrison_unit(
        &self,
        id: UnitId,
        fortification: Option<FortificationId>,
    ) -> ServiceResult<Unit>;

    async fn create_fortification(
        &self,
        domain_id: DomainId,
        name: String,
        kind: FortificationKind,
    ) -> ServiceResult<Fortification>;

    async fn get_fortification(&self, id: FortificationId) -> ServiceResult<Fortification>;

    async fn list_fortifications(&self, domain_id: DomainId) -> ServiceResult<Vec<Fortification>>;

    /// Delete a fortification; units stationed there lose their garrison
    async fn delete_fortification(&self, id: FortificationId) -> ServiceResult<()>;

    /// Restore structure points; `None` repairs fully
    async fn repair_fortification(
        &self,
        id: FortificationId,
        amount: Option<i32>,
    ) -> ServiceResult<Fortification>;
}

pub struct RealmServiceImpl {
    domains: Arc<dyn DomainRepository>,
    units: Arc<dyn UnitRepository>,
    fortifications: Arc<dyn FortificationRepository>,
    rooms: Arc<dyn RoomRepository>,
    settings: Arc<SettingsService>,
    broadcast: Arc<dyn RoomBroadcastPort>,
    dice: Arc<dyn Dice>,
}

impl RealmServiceImpl {
    pub fn new(
        domains: Arc<dyn DomainRepository>,
        units: Arc<dyn UnitRepository>,
        fortifications: Arc<dyn FortificationRepository>,
        rooms: Arc<dyn RoomRepository>,
        settings: Arc<SettingsService>,
        broadcast: Arc<dyn RoomBroadcastPort>,
        dice: Arc<dyn Dice>,
    ) -> Self {
        Self {
            domains,
            units,
            fortifications,
            rooms,
            settings,
            broadcast,
            dice,
        }
    }

    async fn load_domain(&self, id: DomainId) -> ServiceResult<Domain> {
        self.domains
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Domain", id))
    }

    async fn load_unit(&self, id: UnitId) -> ServiceResult<Unit> {
        self.units
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Unit", id))
    }

    async fn load_fortification(&self, id: FortificationId) -> ServiceResult<Fortification> {
        self.fortifications
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Fortification", id))
    }

    async fn validate_domain(&self, domain: &Domain) -> ServiceResult<()> {
        let settings = self.settings.get().await;
        validate_text(
            "Domain",
            &domain.name,
            Some(&domain.description),
            settings.max_name_length,
            settings.max_description_length,
        )?;
        domain.validate()?;
        Ok(())
    }

    async fn validate_name(&self, kind: &str, name: &str) -> ServiceResult<()> {
        let settings = self.settings.get().await;
        validate_text(
            kind,
            name,
            None,
            settings.max_name_length,
            settings.max_description_length,
        )
    }

    /// The fortification must exist and belong to `domain_id`
    async fn check_garrison(
        &self,
        domain_id: DomainId,
        fortification: Option<FortificationId>,
    ) -> ServiceResult<()> {
        let Some(id) = fortification else {
            return Ok(());
        };
        let fortification = self.load_fortification(id).await?;
        if fortification.domain_id != domain_id {
            return Err(ServiceError::validation(format!(
                "{} belongs to another domain",
                fortification.name
            )));
        }
        Ok(())
    }

    async fn announce_domain(&self, domain: &Domain) {
        self.broadcast.publish(
            domain.room_id,
            DomainEvent::DomainSaved {
                domain_id: domain.id,
                name: domain.name.clone(),
                in_crisis: domain.is_in_crisis(),
            },
        ).await;
    }

    async fn announce_unit(&self, room_id: RoomId, unit: &Unit) {
        self.broadcast.publish(
            room_id,
            DomainEvent::UnitSaved {
                unit_id: unit.id,
                domain_id: unit.domain_id,
                hp: unit.hp,
            },
        ).await;
    }

    async fn announce_fortification(&self, room_id: RoomId, fortification: &Fortification) {
        self.broadcast.publish(
            room_id,
            DomainEvent::FortificationSaved {
                fortification_id: fortification.id,
                hp: fortification.hp,
                breached: fortification.is_breached(),
            },
        ).await;
    }
}

#[async_trait]
impl RealmService for RealmServiceImpl {
    #[instrument(skip(self, request), fields(room_id = %request.room_id, name = %request.name))]
    async fn create_domain(&self, request: CreateDomainRequest) -> ServiceResult<Domain> {
        self.rooms
            .get(request.room_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Room", request.room_id))?;

        let mut domain = Domain::new(request.room_id, request.name.trim(), request.size)
            .with_treasury(request.treasury);
        if let Some(owner) = request.owner {
            domain = domain.with_owner(owner);
        }
        if let Some(description) = request.description {
            domain.description = description;
        }
        if let Some(skills) = request.skills {
            domain = domain.with_skills(skills);
        }
        if let Some(defenses) = request.defenses {
            domain = domain.with_defenses(defenses);
        }

        self.validate_domain(&domain).await?;
        self.domains.save(&domain).await?;
        self.announce_domain(&domain).await;
        info!(domain_id = %domain.id, size = domain.size, "Created domain: {}", domain.name);
        Ok(domain)
    }

    #[instrument(skip(self))]
    async fn get_domain(&self, id: DomainId) -> ServiceResult<Domain> {
        self.load_domain(id).await
    }

    #[instrument(skip(self))]
    async fn list_domains(&self, room_id: RoomId) -> ServiceResult<Vec<Domain>> {
        let domains = self.domains.list_in_room(room_id).await?;
        debug!(room_id = %room_id, count = domains.len(), "Listed domains");
        Ok(domains)
    }

    #[instrument(skip(self, request), fields(domain_id = %id))]
    async fn update_domain(&self, id: DomainId, request: UpdateDomainRequest) -> ServiceResult<Domain> {
        let mut domain = self.load_domain(id).await?;
        if let Some(name) = request.name {
            domain.name = name.trim().to_string();
        }
        if let Some(description) = request.description {
            domain.description = description;
        }
        if let Some(owner) = request.owner {
            domain.owner = owner;
        }
        if let Some(size) = request.size {
            domain.size = size;
        }
        if let Some(skills) = request.skills {
            domain.skills = skills;
        }
        if let Some(defenses) = request.defenses {
            domain.defenses = defenses;
        }
        if let Some(treasury) = request.treasury {
            domain.treasury = treasury;
        }
        domain.touch();

        self.validate_domain(&domain).await?;
        self.domains.save(&domain).await?;
        self.announce_domain(&domain).await;
        info!(domain_id = %id, "Updated domain: {}", domain.name);
        Ok(domain)
    }

    #[instrument(skip(self))]
    async fn delete_domain(&self, id: DomainId) -> ServiceResult<()> {
        let domain = self.load_domain(id).await?;
        for unit in self.units.list_in_domain(id).await? {
            self.units.delete(unit.id).await?;
        }
        for fortification in self.fortifications.list_in_domain(id).await? {
            self.fortifications.delete(fortification.id).await?;
        }
        self.domains.delete(id).await?;
        info!(domain_id = %id, "Deleted domain: {}", domain.name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn intrigue(
        &self,
        actor: DomainId,
        skill: DomainSkill,
        target: DomainId,
        defense: DomainDefense,
    ) -> ServiceResult<IntrigueReport> {
        if actor == target {
            return Err(ServiceError::validation("A domain cannot scheme against itself"));
        }
        let actor = self.load_domain(actor).await?;
        let mut target = self.load_domain(target).await?;
        if actor.room_id != target.room_id {
            return Err(ServiceError::validation(format!(
                "{} and {} are in different rooms",
                actor.name, target.name
            )));
        }

        let report = intrigue(&actor, skill, &mut target, defense, self.dice.as_ref());
        if report.success {
            target.touch();
            self.domains.save(&target).await?;
            self.announce_domain(&target).await;
        }
        info!(
            actor = %actor.name,
            target = %target.name,
            %skill,
            %defense,
            success = report.success,
            in_crisis = report.in_crisis,
            "Intrigue resolved"
        );
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn restore_defense(&self, id: DomainId, defense: DomainDefense) -> ServiceResult<Domain> {
        let mut domain = self.load_domain(id).await?;
        let level = domain.restore_defense(defense);
        domain.touch();
        self.domains.save(&domain).await?;
        self.announce_domain(&domain).await;
        debug!(domain_id = %id, %defense, level, "Restored defense");
        Ok(domain)
    }

    #[instrument(skip(self))]
    async fn pay_upkeep(&self, id: DomainId) -> ServiceResult<i32> {
        let mut domain = self.load_domain(id).await?;
        let units = self.units.list_in_domain(id).await?;
        let remaining = match pay_upkeep(&mut domain, &units) {
            Ok(remaining) => remaining,
            Err(err) => {
                warn!(domain_id = %id, error = %err, "Upkeep not paid");
                return Err(err.into());
            }
        };
        domain.touch();
        self.domains.save(&domain).await?;
        self.announce_domain(&domain).await;
        info!(domain_id = %id, units = units.len(), remaining, "Paid upkeep");
        Ok(remaining)
    }

    #[instrument(skip(self, request), fields(domain_id = %request.domain_id, name = %request.name))]
    async fn create_unit(&self, request: CreateUnitRequest) -> ServiceResult<Unit> {
        self.validate_name("Unit", &request.name).await?;
        let mut domain = self.load_domain(request.domain_id).await?;
        self.check_garrison(domain.id, request.garrison).await?;

        let mut unit = Unit::new(
            domain.id,
            request.name.trim(),
            request.ancestry,
            request.unit_type,
            request.experience,
            request.equipment,
            request.size,
        );
        unit.garrison = request.garrison;

        if request.purchase {
            let needed = unit.cost();
            domain
                .spend(needed)
                .map_err(|available| WarfareError::InsufficientTreasury { needed, available })?;
            domain.touch();
            self.domains.save(&domain).await?;
            self.announce_domain(&domain).await;
        }

        self.units.save(&unit).await?;
        self.announce_unit(domain.room_id, &unit).await;
        info!(unit_id = %unit.id, cost = unit.cost(), "Raised unit: {}", unit.name);
        Ok(unit)
    }

    #[instrument(skip(self))]
    async fn get_unit(&self, id: UnitId) -> ServiceResult<Unit> {
        self.load_unit(id).await
    }

    #[instrument(skip(self))]
    async fn list_units(&self, domain_id: DomainId) -> ServiceResult<Vec<Unit>> {
        Ok(self.units.list_in_domain(domain_id).await?)
    }

    #[instrument(skip(self, request), fields(unit_id = %id))]
    async fn update_unit(&self, id: UnitId, request: UpdateUnitRequest) -> ServiceResult<Unit> {
        let mut unit = self.load_unit(id).await?;
        if let Some(name) = request.name {
            self.validate_name("Unit", &name).await?;
            unit.name = name.trim().to_string();
        }
        if let Some(experience) = request.experience {
            unit.experience = experience;
        }
        if let Some(equipment) = request.equipment {
            unit.equipment = equipment;
        }
        if let Some(hp) = request.hp {
            if !(0..=unit.max_hp()).contains(&hp) {
                return Err(ServiceError::validation(format!(
                    "Unit hp must be between 0 and {}",
                    unit.max_hp()
                )));
            }
            unit.hp = hp;
        }
        unit.touch();

        let domain = self.load_domain(unit.domain_id).await?;
        self.units.save(&unit).await?;
        self.announce_unit(domain.room_id, &unit).await;
        info!(unit_id = %id, status = %unit.status(), "Updated unit: {}", unit.name);
        Ok(unit)
    }

    #[instrument(skip(self))]
    async fn delete_unit(&self, id: UnitId) -> ServiceResult<()> {
        let unit = self.load_unit(id).await?;
        self.units.delete(id).await?;
        info!(unit_id = %id, "Disbanded unit: {}", unit.name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn garrison_unit(
        &self,
        id: UnitId,
        fortification: Option<FortificationId>,
    ) -> ServiceResult<Unit> {
        let mut unit = self.load_unit(id).await?;
        self.check_garrison(unit.domain_id, fortification).await?;
        unit.garrison = fortification;
        unit.touch();

        let domain = self.load_domain(unit.domain_id).await?;
        self.units.save(&unit).await?;
        self.announce_unit(domain.room_id, &unit).await;
        debug!(unit_id = %id, garrison = ?fortification, "Changed garrison");
        Ok(unit)
    }

    #[instrument(skip(self, name), fields(domain_id = %domain_id))]
    async fn create_fortification(
        &self,
        domain_id: DomainId,
        name: String,
        kind: FortificationKind,
    ) -> ServiceResult<Fortification> {
        self.validate_name("Fortification", &name).await?;
        let domain = self.load_domain(domain_id).await?;

        let fortification = Fortification::new(domain_id, name.trim(), kind);
        self.fortifications.save(&fortification).await?;
        self.announce_fortification(domain.room_id, &fortification).await;
        info!(fortification_id = %fortification.id, ?kind, "Built fortification: {}", fortification.name);
        Ok(fortification)
    }

    #[instrument(skip(self))]
    async fn get_fortification(&self, id: FortificationId) -> ServiceResult<Fortification> {
        self.load_fortification(id).await
    }

    #[instrument(skip(self))]
    async fn list_fortifications(&self, domain_id: DomainId) -> ServiceResult<Vec<Fortification>> {
        Ok(self.fortifications.list_in_domain(domain_id).await?)
    }

    #[instrument(skip(self))]
    async fn delete_fortification(&self, id: FortificationId) -> ServiceResult<()> {
        let fortification = self.load_fortification(id).await?;
        for mut unit in self.units.list_in_domain(fortification.domain_id).await? {
            if unit.garrison == Some(id) {
                unit.garrison = None;
                unit.touch();
                self.units.save(&unit).await?;
            }
        }
        self.fortifications.delete(id).await?;
        info!(fortification_id = %id, "Razed fortification: {}", fortification.name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn repair_fortification(
        &self,
        id: FortificationId,
        amount: Option<i32>,
    ) -> ServiceResult<Fortification> {
        if matches!(amount, Some(a) if a < 1) {
            return Err(ServiceError::validation("Repair amount must be positive"));
        }
        let mut fortification = self.load_fortification(id).await?;
        let domain = self.load_domain(fortification.domain_id).await?;
        let hp = fortification.repair(amount);
        fortification.touch();
        self.fortifications.save(&fortification).await?;
        self.announce_fortification(domain.room_id, &fortification).await;
        info!(fortification_id = %id, hp, "Repaired fortification");
        Ok(fortification)
    }
}
