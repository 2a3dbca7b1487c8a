//! Warfare Service - Battles between domain units
//!
//! A battle keeps copies of the units it engages. After each resolved action
//! the changed unit (or fortification) is written back to its own repository
//! so casualties and breaches outlive the battle.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::error::{validate_text, ServiceError, ServiceResult};
use super::settings_service::SettingsService;
use crate::application::ports::outbound::{
    DomainRepository, FortificationRepository, RoomBroadcastPort, RoomRepository, UnitRepository,
    WarfareRepository,
};
use crate::domain::entities::{Fortification, Unit, WarfareCombat};
use crate::domain::events::DomainEvent;
use crate::domain::services::{
    rally, siege, unit_attack, RallyReport, SiegeReport, UnitAttackReport, WarfareRules,
};
use crate::domain::value_objects::{
    Dice, FortificationId, RoomId, TurnChange, UnitId, WarfareCombatId,
};

#[async_trait]
pub trait WarfareService: Send + Sync {
    async fn create_battle(&self, room_id: RoomId, name: String) -> ServiceResult<WarfareCombat>;

    async fn get_battle(&self, id: WarfareCombatId) -> ServiceResult<WarfareCombat>;

    async fn list_battles(&self, room_id: RoomId) -> ServiceResult<Vec<WarfareCombat>>;

    async fn delete_battle(&self, id: WarfareCombatId) -> ServiceResult<()>;

    /// Engage a unit; joining a running battle rolls initiative unless one is given
    async fn add_unit(
        &self,
        id: WarfareCombatId,
        unit_id: UnitId,
        initiative: Option<i32>,
    ) -> ServiceResult<Unit>;

    async fn remove_unit(&self, id: WarfareCombatId, unit_id: UnitId) -> ServiceResult<()>;

    async fn roll_initiative(&self, id: WarfareCombatId) -> ServiceResult<Vec<(UnitId, i32)>>;

    async fn set_initiative(
        &self,
        id: WarfareCombatId,
        unit_id: UnitId,
        initiative: i32,
    ) -> ServiceResult<()>;

    async fn start(&self, id: WarfareCombatId) -> ServiceResult<TurnChange<UnitId>>;

    async fn next_turn(&self, id: WarfareCombatId) -> ServiceResult<TurnChange<UnitId>>;

    async fn previous_turn(&self, id: WarfareCombatId) -> ServiceResult<TurnChange<UnitId>>;

    async fn attack(
        &self,
        id: WarfareCombatId,
        attacker: UnitId,
        target: UnitId,
    ) -> ServiceResult<UnitAttackReport>;

    async fn siege(
        &self,
        id: WarfareCombatId,
        attacker: UnitId,
        fortification: FortificationId,
    ) -> ServiceResult<SiegeReport>;

    async fn rally(&self, id: WarfareCombatId, unit_id: UnitId) -> ServiceResult<RallyReport>;

    async fn end(&self, id: WarfareCombatId) -> ServiceResult<u32>;
}

pub struct WarfareServiceImpl {
    battles: Arc<dyn WarfareRepository>,
    units: Arc<dyn UnitRepository>,
    fortifications: Arc<dyn FortificationRepository>,
    domains: Arc<dyn DomainRepository>,
    rooms: Arc<dyn RoomRepository>,
    settings: Arc<SettingsService>,
    broadcast: Arc<dyn RoomBroadcastPort>,
    dice: Arc<dyn Dice>,
    write_lock: Mutex<()>,
}

impl WarfareServiceImpl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        battles: Arc<dyn WarfareRepository>,
        units: Arc<dyn UnitRepository>,
        fortifications: Arc<dyn FortificationRepository>,
        domains: Arc<dyn DomainRepository>,
        rooms: Arc<dyn RoomRepository>,
        settings: Arc<SettingsService>,
        broadcast: Arc<dyn RoomBroadcastPort>,
        dice: Arc<dyn Dice>,
    ) -> Self {
        Self {
            battles,
            units,
            fortifications,
            domains,
            rooms,
            settings,
            broadcast,
            dice,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self, id: WarfareCombatId) -> ServiceResult<WarfareCombat> {
        self.battles
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Battle", id))
    }

    async fn rules(&self) -> WarfareRules {
        WarfareRules::from(&self.settings.get().await)
    }

    async fn save(&self, battle: &mut WarfareCombat, action: &str) -> ServiceResult<()> {
        battle.touch();
        self.battles.save(battle).await?;
        self.broadcast.publish(
            battle.room_id,
            DomainEvent::WarfareUpdated {
                battle_id: battle.id,
                action: action.to_string(),
                round: battle.order.round(),
                current: battle.order.current_id(),
            },
        ).await;
        Ok(())
    }

    /// Write a unit's battle state back to the roster
    async fn write_back(&self, room_id: RoomId, unit: &Unit) -> ServiceResult<()> {
        let mut unit = unit.clone();
        unit.touch();
        self.units.save(&unit).await?;
        self.broadcast.publish(
            room_id,
            DomainEvent::UnitSaved {
                unit_id: unit.id,
                domain_id: unit.domain_id,
                hp: unit.hp,
            },
        ).await;
        Ok(())
    }

    async fn garrison_of(&self, unit: &Unit) -> ServiceResult<Option<Fortification>> {
        match unit.garrison {
            Some(id) => Ok(self.fortifications.get(id).await?),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl WarfareService for WarfareServiceImpl {
    #[instrument(skip(self, name), fields(room_id = %room_id))]
    async fn create_battle(&self, room_id: RoomId, name: String) -> ServiceResult<WarfareCombat> {
        let settings = self.settings.get().await;
        validate_text(
            "Battle",
            &name,
            None,
            settings.max_name_length,
            settings.max_description_length,
        )?;
        self.rooms
            .get(room_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Room", room_id))?;

        let mut battle = WarfareCombat::new(room_id, name.trim());
        self.save(&mut battle, "created").await?;
        info!(battle_id = %battle.id, "Created battle: {}", battle.name);
        Ok(battle)
    }

    #[instrument(skip(self))]
    async fn get_battle(&self, id: WarfareCombatId) -> ServiceResult<WarfareCombat> {
        self.load(id).await
    }

    #[instrument(skip(self))]
    async fn list_battles(&self, room_id: RoomId) -> ServiceResult<Vec<WarfareCombat>> {
        let battles = self.battles.list_in_room(room_id).await?;
        debug!(room_id = %room_id, count = battles.len(), "Listed battles");
        Ok(battles)
    }

    #[instrument(skip(self))]
    async fn delete_battle(&self, id: WarfareCombatId) -> ServiceResult<()> {
        let _guard = self.write_lock.lock().await;
        let battle = self.load(id).await?;
        self.battles.delete(id).await?;
        self.broadcast.publish(
            battle.room_id,
            DomainEvent::WarfareEnded {
                battle_id: id,
                rounds: battle.order.round(),
            },
        ).await;
        info!(battle_id = %id, "Deleted battle: {}", battle.name);
        Ok(())
    }

    #[instrument(skip(self), fields(battle_id = %id, unit_id = %unit_id))]
    async fn add_unit(
        &self,
        id: WarfareCombatId,
        unit_id: UnitId,
        initiative: Option<i32>,
    ) -> ServiceResult<Unit> {
        let unit = self
            .units
            .get(unit_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Unit", unit_id))?;
        let domain = self
            .domains
            .get(unit.domain_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Domain", unit.domain_id))?;

        let _guard = self.write_lock.lock().await;
        let mut battle = self.load(id).await?;
        if domain.room_id != battle.room_id {
            return Err(ServiceError::validation(format!(
                "{} of {} is not in the battle's room",
                unit.name, domain.name
            )));
        }

        let initiative = match initiative {
            Some(value) => Some(value),
            None if battle.order.is_active() => Some(self.dice.d20() + unit.stats().command),
            None => None,
        };
        match initiative {
            Some(value) => battle.add_unit_with_initiative(unit.clone(), value)?,
            None => battle.add_unit(unit.clone())?,
        };
        self.save(&mut battle, "unit_added").await?;
        info!(initiative = ?initiative, "{} joined the battle", unit.name);
        Ok(unit)
    }

    #[instrument(skip(self))]
    async fn remove_unit(&self, id: WarfareCombatId, unit_id: UnitId) -> ServiceResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut battle = self.load(id).await?;
        let unit = battle.remove_unit(unit_id)?;
        self.save(&mut battle, "unit_removed").await?;
        self.write_back(battle.room_id, &unit).await?;
        info!(battle_id = %id, "{} withdrew from the battle", unit.name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn roll_initiative(&self, id: WarfareCombatId) -> ServiceResult<Vec<(UnitId, i32)>> {
        let _guard = self.write_lock.lock().await;
        let mut battle = self.load(id).await?;
        let rolled = battle.roll_initiative(self.dice.as_ref())?;
        self.save(&mut battle, "initiative_rolled").await?;
        debug!(battle_id = %id, count = rolled.len(), "Rolled initiative");
        Ok(rolled)
    }

    #[instrument(skip(self))]
    async fn set_initiative(
        &self,
        id: WarfareCombatId,
        unit_id: UnitId,
        initiative: i32,
    ) -> ServiceResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut battle = self.load(id).await?;
        battle.set_initiative(unit_id, initiative)?;
        self.save(&mut battle, "initiative_set").await
    }

    #[instrument(skip(self))]
    async fn start(&self, id: WarfareCombatId) -> ServiceResult<TurnChange<UnitId>> {
        let _guard = self.write_lock.lock().await;
        let mut battle = self.load(id).await?;
        let change = battle.start()?;
        self.save(&mut battle, "started").await?;
        info!(battle_id = %id, first = %change.started, "Battle started");
        Ok(change)
    }

    #[instrument(skip(self))]
    async fn next_turn(&self, id: WarfareCombatId) -> ServiceResult<TurnChange<UnitId>> {
        let _guard = self.write_lock.lock().await;
        let mut battle = self.load(id).await?;
        let change = battle.next_turn()?;
        self.save(&mut battle, "next_turn").await?;
        info!(battle_id = %id, round = change.round, current = %change.started, "Turn advanced");
        Ok(change)
    }

    #[instrument(skip(self))]
    async fn previous_turn(&self, id: WarfareCombatId) -> ServiceResult<TurnChange<UnitId>> {
        let _guard = self.write_lock.lock().await;
        let mut battle = self.load(id).await?;
        let change = battle.previous_turn()?;
        self.save(&mut battle, "previous_turn").await?;
        Ok(change)
    }

    #[instrument(skip(self))]
    async fn attack(
        &self,
        id: WarfareCombatId,
        attacker: UnitId,
        target: UnitId,
    ) -> ServiceResult<UnitAttackReport> {
        if attacker == target {
            return Err(ServiceError::validation("A unit cannot attack itself"));
        }
        let rules = self.rules().await;

        let _guard = self.write_lock.lock().await;
        let mut battle = self.load(id).await?;
        let attacking = battle.ensure_can_act(attacker)?.clone();
        let mut defending = battle.unit(target)?.clone();
        let garrison = self.garrison_of(&defending).await?;

        let report = unit_attack(
            &attacking,
            &mut defending,
            garrison.as_ref(),
            rules,
            self.dice.as_ref(),
        )?;
        *battle.unit_mut(target)? = defending.clone();

        self.save(&mut battle, "attack").await?;
        self.write_back(battle.room_id, &defending).await?;
        info!(
            battle_id = %id,
            hit = report.hit,
            casualties = report.casualties,
            status = %report.status,
            "{} attacked {}",
            attacking.name,
            defending.name
        );
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn siege(
        &self,
        id: WarfareCombatId,
        attacker: UnitId,
        fortification: FortificationId,
    ) -> ServiceResult<SiegeReport> {
        let _guard = self.write_lock.lock().await;
        let mut battle = self.load(id).await?;
        let attacking = battle.ensure_can_act(attacker)?.clone();
        let mut walls = self
            .fortifications
            .get(fortification)
            .await?
            .ok_or_else(|| ServiceError::not_found("Fortification", fortification))?;
        if walls.domain_id == attacking.domain_id {
            return Err(ServiceError::validation(format!(
                "{} cannot besiege its own domain's {}",
                attacking.name, walls.name
            )));
        }

        let report = siege(&attacking, &mut walls, self.dice.as_ref())?;
        walls.touch();
        self.fortifications.save(&walls).await?;
        self.broadcast.publish(
            battle.room_id,
            DomainEvent::FortificationSaved {
                fortification_id: walls.id,
                hp: walls.hp,
                breached: report.breached,
            },
        ).await;
        self.save(&mut battle, "siege").await?;
        info!(
            battle_id = %id,
            damage = report.damage,
            breached = report.breached,
            "{} besieged {}",
            attacking.name,
            walls.name
        );
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn rally(&self, id: WarfareCombatId, unit_id: UnitId) -> ServiceResult<RallyReport> {
        let rules = self.rules().await;

        let _guard = self.write_lock.lock().await;
        let mut battle = self.load(id).await?;
        let mut unit = battle.ensure_can_act(unit_id)?.clone();
        let report = rally(&mut unit, rules, self.dice.as_ref())?;
        *battle.unit_mut(unit_id)? = unit.clone();

        self.save(&mut battle, "rally").await?;
        self.write_back(battle.room_id, &unit).await?;
        info!(battle_id = %id, rallied = report.rallied, "{} tried to rally", unit.name);
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn end(&self, id: WarfareCombatId) -> ServiceResult<u32> {
        let _guard = self.write_lock.lock().await;
        let mut battle = self.load(id).await?;
        let rounds = battle.end()?;
        battle.touch();
        self.battles.save(&battle).await?;
        self.broadcast.publish(
            battle.room_id,
            DomainEvent::WarfareEnded {
                battle_id: id,
                rounds,
            },
        ).await;
        info!(battle_id = %id, rounds, "Battle ended");
        Ok(rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use crate::application::ports::outbound::{
        MockDomainRepository, MockFortificationRepository, MockRoomBroadcastPort,
        MockRoomRepository, MockUnitRepository, MockWarfareRepository,
    };
    use crate::application::services::settings_service::default_settings;
    use crate::domain::entities::{Domain, UnitStatus, WarfareError};
    use crate::domain::value_objects::{
        Ancestry, CasualtyDie, DomainId, Equipment, Experience, FortificationKind, ScriptedDice,
        UnitType,
    };

    struct Mocks {
        battles: MockWarfareRepository,
        units: MockUnitRepository,
        fortifications: MockFortificationRepository,
        domains: MockDomainRepository,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                battles: MockWarfareRepository::new(),
                units: MockUnitRepository::new(),
                fortifications: MockFortificationRepository::new(),
                domains: MockDomainRepository::new(),
            }
        }

        /// Serve `battle` from a shared slot that saves write into
        fn with_battle(mut self, battle: WarfareCombat) -> (Self, Arc<StdMutex<WarfareCombat>>) {
            let slot = Arc::new(StdMutex::new(battle));
            let read = Arc::clone(&slot);
            self.battles
                .expect_get()
                .returning(move |_| Ok(Some(read.lock().unwrap().clone())));
            let write = Arc::clone(&slot);
            self.battles.expect_save().returning(move |battle| {
                *write.lock().unwrap() = battle.clone();
                Ok(())
            });
            (self, slot)
        }

        fn into_service(self, dice: ScriptedDice) -> WarfareServiceImpl {
            let mut broadcast = MockRoomBroadcastPort::new();
            broadcast.expect_publish().return_const(());
            WarfareServiceImpl::new(
                Arc::new(self.battles),
                Arc::new(self.units),
                Arc::new(self.fortifications),
                Arc::new(self.domains),
                Arc::new(MockRoomRepository::new()),
                default_settings(),
                Arc::new(broadcast),
                Arc::new(dice),
            )
        }
    }

    fn regulars(domain_id: DomainId, name: &str) -> Unit {
        Unit::new(
            domain_id,
            name,
            Ancestry::Human,
            UnitType::Infantry,
            Experience::Regular,
            Equipment::Light,
            CasualtyDie::D4,
        )
    }

    /// Two units, `first` acting
    fn skirmish(first: Unit, second: Unit) -> WarfareCombat {
        let mut battle = WarfareCombat::new(RoomId::new(), "Ford");
        let a = battle.add_unit(first).unwrap();
        let b = battle.add_unit(second).unwrap();
        battle.set_initiative(a, 20).unwrap();
        battle.set_initiative(b, 10).unwrap();
        battle.start().unwrap();
        battle
    }

    #[tokio::test]
    async fn test_attack_writes_casualties_back() {
        let attacker = regulars(DomainId::new(), "Red");
        let target = regulars(DomainId::new(), "Blue");
        let (a, t) = (attacker.id, target.id);

        let (mut mocks, slot) = Mocks::new().with_battle(skirmish(attacker, target));
        mocks
            .units
            .expect_save()
            .withf(move |u| u.id == t && u.hp == 3)
            .times(1)
            .returning(|_| Ok(()));

        // Attack and power rolls both land; d4 unit drops to 3 of 4, still healthy
        let id = slot.lock().unwrap().id;
        let report = mocks
            .into_service(ScriptedDice::new([19, 19]))
            .attack(id, a, t)
            .await
            .unwrap();

        assert!(report.hit);
        assert_eq!(report.casualties, 1);
        assert_eq!(report.status, UnitStatus::Healthy);
        assert_eq!(slot.lock().unwrap().unit(t).unwrap().hp, 3);
    }

    #[tokio::test]
    async fn test_attack_out_of_turn_rejected() {
        let first = regulars(DomainId::new(), "Red");
        let second = regulars(DomainId::new(), "Blue");
        let (a, b) = (first.id, second.id);
        let (mut mocks, slot) = Mocks::new().with_battle(skirmish(first, second));
        mocks.units.expect_save().never();

        let id = slot.lock().unwrap().id;
        let result = mocks.into_service(ScriptedDice::new([])).attack(id, b, a).await;
        assert!(matches!(
            result,
            Err(ServiceError::Warfare(WarfareError::NotYourTurn(_)))
        ));
    }

    #[tokio::test]
    async fn test_unit_joining_running_battle_rolls_initiative() {
        let room_id = RoomId::new();
        let domain = Domain::new(room_id, "Avalon", 2);
        let mut battle = WarfareCombat::new(room_id, "Ford");
        let first = regulars(domain.id, "Red");
        let first_id = battle.add_unit(first).unwrap();
        battle.set_initiative(first_id, 15).unwrap();
        battle.start().unwrap();
        let battle_id = battle.id;

        let late = regulars(domain.id, "Reserve");
        let late_id = late.id;
        let (mut mocks, slot) = Mocks::new().with_battle(battle);
        mocks.units.expect_get().returning(move |_| Ok(Some(late.clone())));
        mocks.domains.expect_get().returning(move |_| Ok(Some(domain.clone())));

        // 7 + Human command 1 + Regular command 1
        mocks
            .into_service(ScriptedDice::new([7]))
            .add_unit(battle_id, late_id, None)
            .await
            .unwrap();

        let battle = slot.lock().unwrap();
        let engaged = battle.order.get(late_id).unwrap();
        assert_eq!(engaged.initiative, Some(9));
    }

    #[tokio::test]
    async fn test_siege_own_fortification_rejected() {
        let domain_id = DomainId::new();
        let rams = regulars(domain_id, "Rams");
        let rams_id = rams.id;
        let walls = Fortification::new(domain_id, "Home Keep", FortificationKind::Keep);
        let walls_id = walls.id;

        let (mut mocks, slot) =
            Mocks::new().with_battle(skirmish(rams, regulars(DomainId::new(), "Foe")));
        mocks
            .fortifications
            .expect_get()
            .returning(move |_| Ok(Some(walls.clone())));
        mocks.fortifications.expect_save().never();

        let id = slot.lock().unwrap().id;
        let result = mocks
            .into_service(ScriptedDice::new([]))
            .siege(id, rams_id, walls_id)
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_rally_healthy_unit_rejected() {
        let first = regulars(DomainId::new(), "Red");
        let a = first.id;
        let (mocks, slot) =
            Mocks::new().with_battle(skirmish(first, regulars(DomainId::new(), "Blue")));
        let id = slot.lock().unwrap().id;

        let result = mocks.into_service(ScriptedDice::new([])).rally(id, a).await;
        assert!(matches!(
            result,
            Err(ServiceError::Warfare(WarfareError::NotDiminished(_)))
        ));
    }
}
