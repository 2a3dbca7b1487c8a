//! Combat Service - Application service for character combat
//!
//! Every mutating call loads the combat, applies one rules operation, saves
//! it and tells the room. Mutations are serialized so two players acting at
//! once cannot overwrite each other's result.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::error::{validate_text, ServiceError, ServiceResult};
use super::settings_service::SettingsService;
use crate::application::ports::outbound::{
    CharacterRepository, CombatRepository, ItemRepository, RoomBroadcastPort, RoomRepository,
};
use crate::domain::entities::{Combat, CombatError, Combatant, ConditionExpiry, TurnReport};
use crate::domain::events::DomainEvent;
use crate::domain::services::{
    resolve_attack, resolve_healing, AttackReport, AttackRequest, HealingReport,
};
use crate::domain::value_objects::{
    CharacterId, CombatId, Condition, Dice, EffectId, ParticipantId, PowerId, RoomId, TurnChange,
};

#[async_trait]
pub trait CombatService: Send + Sync {
    async fn create_combat(&self, room_id: RoomId, name: String) -> ServiceResult<Combat>;

    async fn get_combat(&self, id: CombatId) -> ServiceResult<Combat>;

    async fn list_combats(&self, room_id: RoomId) -> ServiceResult<Vec<Combat>>;

    async fn delete_combat(&self, id: CombatId) -> ServiceResult<()>;

    /// Bring a character into the fight; joining a running fight rolls
    /// initiative unless one is given
    async fn add_character(
        &self,
        id: CombatId,
        character_id: CharacterId,
        initiative: Option<i32>,
    ) -> ServiceResult<Combatant>;

    async fn remove_participant(&self, id: CombatId, participant: ParticipantId) -> ServiceResult<()>;

    async fn roll_initiative(&self, id: CombatId) -> ServiceResult<Vec<(ParticipantId, i32)>>;

    async fn set_initiative(
        &self,
        id: CombatId,
        participant: ParticipantId,
        initiative: i32,
    ) -> ServiceResult<()>;

    async fn start(&self, id: CombatId) -> ServiceResult<TurnChange<ParticipantId>>;

    async fn next_turn(&self, id: CombatId) -> ServiceResult<TurnReport>;

    async fn previous_turn(&self, id: CombatId) -> ServiceResult<TurnChange<ParticipantId>>;

    async fn attack(&self, id: CombatId, request: AttackRequest) -> ServiceResult<AttackReport>;

    async fn heal(
        &self,
        id: CombatId,
        healer: ParticipantId,
        target: ParticipantId,
        power_id: PowerId,
    ) -> ServiceResult<HealingReport>;

    /// GM override; returns effects dropped because of the new condition
    async fn apply_condition(
        &self,
        id: CombatId,
        target: ParticipantId,
        condition: Condition,
        expiry: ConditionExpiry,
    ) -> ServiceResult<Vec<EffectId>>;

    async fn remove_condition(
        &self,
        id: CombatId,
        target: ParticipantId,
        condition: Condition,
    ) -> ServiceResult<usize>;

    async fn drop_effect(
        &self,
        id: CombatId,
        maintainer: ParticipantId,
        effect: EffectId,
    ) -> ServiceResult<Vec<Condition>>;

    /// End the combat, returning the number of rounds fought
    async fn end(&self, id: CombatId) -> ServiceResult<u32>;
}

pub struct CombatServiceImpl {
    combats: Arc<dyn CombatRepository>,
    characters: Arc<dyn CharacterRepository>,
    items: Arc<dyn ItemRepository>,
    rooms: Arc<dyn RoomRepository>,
    settings: Arc<SettingsService>,
    broadcast: Arc<dyn RoomBroadcastPort>,
    dice: Arc<dyn Dice>,
    write_lock: Mutex<()>,
}

impl CombatServiceImpl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        combats: Arc<dyn CombatRepository>,
        characters: Arc<dyn CharacterRepository>,
        items: Arc<dyn ItemRepository>,
        rooms: Arc<dyn RoomRepository>,
        settings: Arc<SettingsService>,
        broadcast: Arc<dyn RoomBroadcastPort>,
        dice: Arc<dyn Dice>,
    ) -> Self {
        Self {
            combats,
            characters,
            items,
            rooms,
            settings,
            broadcast,
            dice,
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self, id: CombatId) -> ServiceResult<Combat> {
        self.combats
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Combat", id))
    }

    /// Load, apply `operation`, save and announce `action` to the room
    async fn mutate<T, F>(&self, id: CombatId, action: &str, operation: F) -> ServiceResult<T>
    where
        F: FnOnce(&mut Combat, &dyn Dice) -> Result<T, CombatError> + Send,
        T: Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut combat = self.load(id).await?;
        let result = operation(&mut combat, self.dice.as_ref())?;
        combat.touch();
        self.combats.save(&combat).await?;
        self.announce(&combat, action).await;
        Ok(result)
    }

    async fn announce(&self, combat: &Combat, action: &str) {
        self.broadcast.publish(
            combat.room_id,
            DomainEvent::CombatUpdated {
                combat_id: combat.id,
                action: action.to_string(),
                round: combat.round(),
                current: combat.order.current_id(),
            },
        ).await;
    }
}

#[async_trait]
impl CombatService for CombatServiceImpl {
    #[instrument(skip(self, name), fields(room_id = %room_id))]
    async fn create_combat(&self, room_id: RoomId, name: String) -> ServiceResult<Combat> {
        let settings = self.settings.get().await;
        validate_text(
            "Combat",
            &name,
            None,
            settings.max_name_length,
            settings.max_description_length,
        )?;
        self.rooms
            .get(room_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Room", room_id))?;

        let combat = Combat::new(room_id, name.trim());
        self.combats.save(&combat).await?;
        self.announce(&combat, "created").await;
        info!(combat_id = %combat.id, "Created combat: {}", combat.name);
        Ok(combat)
    }

    #[instrument(skip(self))]
    async fn get_combat(&self, id: CombatId) -> ServiceResult<Combat> {
        self.load(id).await
    }

    #[instrument(skip(self))]
    async fn list_combats(&self, room_id: RoomId) -> ServiceResult<Vec<Combat>> {
        let combats = self.combats.list_in_room(room_id).await?;
        debug!(room_id = %room_id, count = combats.len(), "Listed combats");
        Ok(combats)
    }

    #[instrument(skip(self))]
    async fn delete_combat(&self, id: CombatId) -> ServiceResult<()> {
        let _guard = self.write_lock.lock().await;
        let combat = self.load(id).await?;
        self.combats.delete(id).await?;
        self.broadcast.publish(
            combat.room_id,
            DomainEvent::CombatEnded {
                combat_id: id,
                rounds: combat.round(),
            },
        ).await;
        info!(combat_id = %id, "Deleted combat: {}", combat.name);
        Ok(())
    }

    #[instrument(skip(self), fields(combat_id = %id, character_id = %character_id))]
    async fn add_character(
        &self,
        id: CombatId,
        character_id: CharacterId,
        initiative: Option<i32>,
    ) -> ServiceResult<Combatant> {
        let character = self
            .characters
            .get(character_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Character", character_id))?;
        let items = self.items.list_carried_by(character_id).await?;

        let combat = self.load(id).await?;
        if combat.room_id != character.room_id {
            return Err(ServiceError::validation(format!(
                "{} is not in the combat's room",
                character.name
            )));
        }

        let name = character.name.clone();
        let combatant = self
            .mutate(id, "combatant_added", move |combat, dice| {
                let mut combatant = Combatant::from_character(&character, &items);
                combatant.initiative = match initiative {
                    Some(value) => Some(value),
                    None if combat.order.is_active() => {
                        Some(dice.d20() + combatant.initiative_bonus())
                    }
                    None => None,
                };
                let joined = combatant.clone();
                combat.add_combatant(combatant)?;
                Ok(joined)
            })
            .await?;

        info!(participant_id = %combatant.id, "{} joined the combat", name);
        Ok(combatant)
    }

    #[instrument(skip(self))]
    async fn remove_participant(&self, id: CombatId, participant: ParticipantId) -> ServiceResult<()> {
        let removed = self
            .mutate(id, "combatant_removed", |combat, _| combat.remove_combatant(participant))
            .await?;
        info!(combat_id = %id, "{} left the combat", removed.name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn roll_initiative(&self, id: CombatId) -> ServiceResult<Vec<(ParticipantId, i32)>> {
        let rolled = self
            .mutate(id, "initiative_rolled", |combat, dice| combat.roll_initiative(dice))
            .await?;
        debug!(combat_id = %id, count = rolled.len(), "Rolled initiative");
        Ok(rolled)
    }

    #[instrument(skip(self))]
    async fn set_initiative(
        &self,
        id: CombatId,
        participant: ParticipantId,
        initiative: i32,
    ) -> ServiceResult<()> {
        self.mutate(id, "initiative_set", |combat, _| {
            combat.set_initiative(participant, initiative)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn start(&self, id: CombatId) -> ServiceResult<TurnChange<ParticipantId>> {
        let change = self.mutate(id, "started", |combat, _| combat.start()).await?;
        info!(combat_id = %id, first = %change.started, "Combat started");
        Ok(change)
    }

    #[instrument(skip(self))]
    async fn next_turn(&self, id: CombatId) -> ServiceResult<TurnReport> {
        let report = self
            .mutate(id, "next_turn", |combat, dice| combat.next_turn(dice))
            .await?;
        info!(
            combat_id = %id,
            round = report.change.round,
            current = %report.change.started,
            expired = report.expired.len(),
            recoveries = report.recoveries.len(),
            "Turn advanced"
        );
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn previous_turn(&self, id: CombatId) -> ServiceResult<TurnChange<ParticipantId>> {
        self.mutate(id, "previous_turn", |combat, _| combat.previous_turn())
            .await
    }

    #[instrument(skip(self, request), fields(attacker = %request.attacker, target = %request.target))]
    async fn attack(&self, id: CombatId, request: AttackRequest) -> ServiceResult<AttackReport> {
        let report = self
            .mutate(id, "attack", move |combat, dice| {
                resolve_attack(combat, request, dice)
            })
            .await?;
        info!(
            combat_id = %id,
            hit = report.hit,
            critical = report.critical,
            "{} attacked with {}",
            report.attacker,
            report.power_name
        );
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn heal(
        &self,
        id: CombatId,
        healer: ParticipantId,
        target: ParticipantId,
        power_id: PowerId,
    ) -> ServiceResult<HealingReport> {
        let report = self
            .mutate(id, "healed", move |combat, dice| {
                resolve_healing(combat, healer, target, power_id, dice)
            })
            .await?;
        info!(
            combat_id = %id,
            removed = report.removed.len(),
            wounds_removed = report.wounds_removed,
            "Healing resolved"
        );
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn apply_condition(
        &self,
        id: CombatId,
        target: ParticipantId,
        condition: Condition,
        expiry: ConditionExpiry,
    ) -> ServiceResult<Vec<EffectId>> {
        self.mutate(id, "condition_applied", move |combat, _| {
            combat.apply_condition(target, condition, expiry)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn remove_condition(
        &self,
        id: CombatId,
        target: ParticipantId,
        condition: Condition,
    ) -> ServiceResult<usize> {
        self.mutate(id, "condition_removed", move |combat, _| {
            combat.remove_condition(target, condition)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn drop_effect(
        &self,
        id: CombatId,
        maintainer: ParticipantId,
        effect: EffectId,
    ) -> ServiceResult<Vec<Condition>> {
        self.mutate(id, "effect_dropped", move |combat, _| {
            combat.drop_effect(maintainer, effect)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn end(&self, id: CombatId) -> ServiceResult<u32> {
        let _guard = self.write_lock.lock().await;
        let mut combat = self.load(id).await?;
        let rounds = combat.end()?;
        combat.touch();
        self.combats.save(&combat).await?;
        self.broadcast.publish(
            combat.room_id,
            DomainEvent::CombatEnded {
                combat_id: id,
                rounds,
            },
        ).await;
        info!(combat_id = %id, rounds, "Combat ended");
        Ok(rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use crate::application::ports::outbound::{
        MockCharacterRepository, MockCombatRepository, MockItemRepository, MockRoomBroadcastPort,
        MockRoomRepository,
    };
    use crate::application::services::settings_service::default_settings;
    use crate::domain::entities::{Character, EffectKind, Power};
    use crate::domain::value_objects::{AbilityScores, ScriptedDice, TurnOrderError};

    /// Combat repository backed by a single shared slot
    fn stored_combat(combat: Combat) -> (MockCombatRepository, Arc<StdMutex<Combat>>) {
        let slot = Arc::new(StdMutex::new(combat));
        let mut repo = MockCombatRepository::new();
        let read = Arc::clone(&slot);
        repo.expect_get()
            .returning(move |_| Ok(Some(read.lock().unwrap().clone())));
        let write = Arc::clone(&slot);
        repo.expect_save().returning(move |combat| {
            *write.lock().unwrap() = combat.clone();
            Ok(())
        });
        (repo, slot)
    }

    fn service(
        combats: MockCombatRepository,
        characters: MockCharacterRepository,
        items: MockItemRepository,
        dice: ScriptedDice,
    ) -> CombatServiceImpl {
        let mut broadcast = MockRoomBroadcastPort::new();
        broadcast.expect_publish().return_const(());
        CombatServiceImpl::new(
            Arc::new(combats),
            Arc::new(characters),
            Arc::new(items),
            Arc::new(MockRoomRepository::new()),
            default_settings(),
            Arc::new(broadcast),
            Arc::new(dice),
        )
    }

    fn brawler(room_id: RoomId) -> Character {
        Character::new(room_id, "Brawler", 10).with_abilities(AbilityScores {
            fighting: 8,
            agility: 2,
            stamina: 6,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_add_character_to_running_combat_rolls_initiative() {
        let room_id = RoomId::new();
        let mut combat = Combat::new(room_id, "Ambush");
        let mut first = Combatant::from_character(&brawler(room_id), &[]);
        first.initiative = Some(12);
        combat.add_combatant(first).unwrap();
        combat.start().unwrap();
        let combat_id = combat.id;
        let (combats, slot) = stored_combat(combat);

        let late = brawler(room_id);
        let late_id = late.id;
        let mut characters = MockCharacterRepository::new();
        characters.expect_get().returning(move |_| Ok(Some(late.clone())));
        let mut items = MockItemRepository::new();
        items.expect_list_carried_by().returning(|_| Ok(vec![]));

        // d20 of 9 plus initiative bonus 2
        let svc = service(combats, characters, items, ScriptedDice::new([9]));
        let joined = svc.add_character(combat_id, late_id, None).await.unwrap();

        assert_eq!(joined.initiative, Some(11));
        assert_eq!(slot.lock().unwrap().combatants().count(), 2);
    }

    #[tokio::test]
    async fn test_character_from_other_room_cannot_join() {
        let combat = Combat::new(RoomId::new(), "Ambush");
        let combat_id = combat.id;
        let (combats, slot) = stored_combat(combat);

        let outsider = brawler(RoomId::new());
        let outsider_id = outsider.id;
        let mut characters = MockCharacterRepository::new();
        characters
            .expect_get()
            .returning(move |_| Ok(Some(outsider.clone())));
        let mut items = MockItemRepository::new();
        items.expect_list_carried_by().returning(|_| Ok(vec![]));

        let result = service(combats, characters, items, ScriptedDice::new([]))
            .add_character(combat_id, outsider_id, None)
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert_eq!(slot.lock().unwrap().combatants().count(), 0);
    }

    #[tokio::test]
    async fn test_attack_is_saved() {
        let room_id = RoomId::new();
        let punch = Power::new("Punch", EffectKind::Damage, 8);
        let punch_id = punch.id;
        let mut combat = Combat::new(room_id, "Brawl");
        let mut attacker = Combatant::from_character(&brawler(room_id).with_power(punch), &[]);
        attacker.initiative = Some(20);
        let mut target = Combatant::from_character(&brawler(room_id), &[]);
        target.initiative = Some(5);
        let a = combat.add_combatant(attacker).unwrap();
        let t = combat.add_combatant(target).unwrap();
        combat.start().unwrap();
        let combat_id = combat.id;
        let (combats, slot) = stored_combat(combat);

        // Natural 20 hits; resistance roll of 1 fails badly
        let svc = service(
            combats,
            MockCharacterRepository::new(),
            MockItemRepository::new(),
            ScriptedDice::new([20, 1]),
        );
        let report = svc
            .attack(
                combat_id,
                AttackRequest { attacker: a, target: t, power_id: punch_id, situational_modifier: 0 },
            )
            .await
            .unwrap();

        assert!(report.hit);
        assert!(report.critical);
        assert_eq!(slot.lock().unwrap().combatant(t).unwrap().wounds, 1);
    }

    #[tokio::test]
    async fn test_start_empty_combat_fails() {
        let combat = Combat::new(RoomId::new(), "Nobody");
        let combat_id = combat.id;
        let (combats, _) = stored_combat(combat);

        let result = service(
            combats,
            MockCharacterRepository::new(),
            MockItemRepository::new(),
            ScriptedDice::new([]),
        )
        .start(combat_id)
        .await;
        assert!(matches!(
            result,
            Err(ServiceError::Combat(CombatError::TurnOrder(TurnOrderError::Empty)))
        ));
    }

    #[tokio::test]
    async fn test_end_reports_rounds() {
        let room_id = RoomId::new();
        let mut combat = Combat::new(room_id, "Short");
        let mut only = Combatant::from_character(&brawler(room_id), &[]);
        only.initiative = Some(10);
        combat.add_combatant(only).unwrap();
        combat.start().unwrap();
        let combat_id = combat.id;
        let (combats, slot) = stored_combat(combat);

        let svc = service(
            combats,
            MockCharacterRepository::new(),
            MockItemRepository::new(),
            ScriptedDice::new([]),
        );
        assert_eq!(svc.end(combat_id).await.unwrap(), 1);
        assert!(slot.lock().unwrap().order.is_ended());
    }
}
