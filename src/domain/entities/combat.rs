//! Combat entity - a turn-based encounter between characters
//!
//! Combatants carry a snapshot of the derived numbers of the character they
//! represent, taken when they join. Everything that happens during the fight
//! (conditions, wounds, weakened traits, maintained effects) lives on the
//! combatant, so a combat can be resolved without touching character sheets.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Character, Item, Power, PowerDuration, PowerRange};
use crate::domain::value_objects::{
    Ability, CharacterId, CheckRoll, CombatId, Condition, ConditionSet, Defense, Dice, EffectId,
    ParticipantId, PowerId, RoomId, TurnChange, TurnEntry, TurnOrder, TurnOrderError, TurnState,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CombatError {
    #[error(transparent)]
    TurnOrder(#[from] TurnOrderError),
    #[error("combat is not in progress")]
    NotActive,
    #[error("participant not found: {0}")]
    UnknownParticipant(ParticipantId),
    #[error("character is already in this combat: {0}")]
    AlreadyInCombat(CharacterId),
    #[error("power not found: {0}")]
    UnknownPower(PowerId),
    #[error("{0} is not an attack")]
    NotAnAttack(String),
    #[error("{0} is not a healing power")]
    NotHealing(String),
    #[error("{0} cannot act")]
    CannotAct(String),
    #[error("it is not {0}'s turn")]
    NotYourTurn(String),
    #[error("maintained effect not found: {0}")]
    UnknownEffect(EffectId),
}

/// Numbers copied from the character sheet when a combatant joins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantStats {
    pub dodge: i32,
    pub parry: i32,
    pub fortitude: i32,
    /// Toughness without Defensive Roll
    pub toughness: i32,
    pub will: i32,
    pub defensive_roll: i32,
    pub close_attack: i32,
    pub ranged_attack: i32,
    pub initiative_bonus: i32,
    pub immunities: Vec<String>,
    pub impervious: BTreeMap<Defense, i32>,
    /// Powers and equipped weapons usable in the fight
    pub powers: Vec<Power>,
}

impl CombatantStats {
    pub fn from_character(character: &Character, items: &[Item]) -> Self {
        let carried: Vec<&Item> = items
            .iter()
            .filter(|i| i.owner == Some(character.id))
            .collect();
        let armor: i32 = carried.iter().map(|i| i.protection()).sum();

        let mut powers = character.powers.clone();
        powers.extend(carried.iter().filter_map(|i| i.as_attack()));

        let impervious = [
            Defense::Dodge,
            Defense::Parry,
            Defense::Fortitude,
            Defense::Toughness,
            Defense::Will,
        ]
        .into_iter()
        .map(|d| (d, character.impervious(d)))
        .filter(|(_, rank)| *rank > 0)
        .collect();

        Self {
            dodge: character.defense(Defense::Dodge, 0),
            parry: character.defense(Defense::Parry, 0),
            fortitude: character.defense(Defense::Fortitude, 0),
            toughness: character.defense(Defense::Toughness, armor) - character.defensive_roll(),
            will: character.defense(Defense::Will, 0),
            defensive_roll: character.defensive_roll(),
            close_attack: character.attack_bonus(PowerRange::Close).unwrap_or(0),
            ranged_attack: character.attack_bonus(PowerRange::Ranged).unwrap_or(0),
            initiative_bonus: character.initiative_bonus(),
            immunities: character.immunities(),
            impervious,
            powers,
        }
    }

    pub fn find_power(&self, id: PowerId) -> Option<&Power> {
        self.powers.iter().find_map(|p| p.find(id))
    }
}

/// Where an applied condition came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionSource {
    Damage,
    Affliction { effect: EffectId, power: PowerId },
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionExpiry {
    /// Expires once the affected combatant has ended this many more turns
    EndOfTurns { remaining: u8 },
    /// Resistance check at the end of each of the affected combatant's turns
    Recovery { dc: i32, defense: Defense, degree: u8 },
    UntilRemoved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCondition {
    pub condition: Condition,
    pub source: ConditionSource,
    pub expiry: ConditionExpiry,
}

/// An effect the combatant keeps going on someone else
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintainedEffect {
    pub id: EffectId,
    pub power_id: PowerId,
    pub power_name: String,
    pub duration: PowerDuration,
    pub target: ParticipantId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub id: ParticipantId,
    pub character_id: CharacterId,
    pub name: String,
    pub is_npc: bool,
    pub initiative: Option<i32>,
    pub stats: CombatantStats,
    pub conditions: Vec<AppliedCondition>,
    /// Accumulated damage penalty to Toughness
    pub wounds: i32,
    /// Ranks lost per trait name
    pub weakened: BTreeMap<String, i32>,
    pub maintaining: Vec<MaintainedEffect>,
}

impl Combatant {
    pub fn from_character(character: &Character, items: &[Item]) -> Self {
        Self {
            id: ParticipantId::new(),
            character_id: character.id,
            name: character.name.clone(),
            is_npc: character.is_npc,
            initiative: None,
            stats: CombatantStats::from_character(character, items),
            conditions: Vec::new(),
            wounds: 0,
            weakened: BTreeMap::new(),
            maintaining: Vec::new(),
        }
    }

    pub fn condition_set(&self) -> ConditionSet {
        ConditionSet::from_conditions(self.conditions.iter().map(|c| c.condition))
    }

    pub fn has_condition(&self, condition: Condition) -> bool {
        self.conditions.iter().any(|c| c.condition == condition)
    }

    pub fn can_act(&self) -> bool {
        self.condition_set().can_act()
    }

    pub fn check_modifier(&self) -> i32 {
        self.condition_set().check_modifier()
    }

    fn weakened_ranks(&self, trait_name: &str) -> i32 {
        self.weakened
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case(trait_name))
            .map(|(_, ranks)| *ranks)
            .sum()
    }

    /// Defense total after conditions, wounds and weakening
    ///
    /// Weakening the defense itself or the ability it is based on both count.
    pub fn defense_total(&self, defense: Defense) -> i32 {
        let conditions = self.condition_set();
        let weakened = self.weakened_ranks(&defense.to_string())
            + self.weakened_ranks(&defense.base_ability().to_string());
        match defense {
            Defense::Dodge => conditions.active_defense(self.stats.dodge - weakened),
            Defense::Parry => conditions.active_defense(self.stats.parry - weakened),
            Defense::Fortitude => self.stats.fortitude - weakened,
            Defense::Will => self.stats.will - weakened,
            Defense::Toughness => {
                let roll = if conditions.keeps_active_bonuses() {
                    self.stats.defensive_roll
                } else {
                    0
                };
                self.stats.toughness + roll - self.wounds - weakened
            }
        }
    }

    /// Initiative bonus after Agility loss
    pub fn initiative_bonus(&self) -> i32 {
        self.stats.initiative_bonus - self.weakened_ranks(&Ability::Agility.to_string())
    }

    pub fn attack_bonus(&self, range: PowerRange) -> Option<i32> {
        match range {
            PowerRange::Close => {
                Some(self.stats.close_attack - self.weakened_ranks(&Ability::Fighting.to_string()))
            }
            PowerRange::Ranged => {
                Some(self.stats.ranged_attack - self.weakened_ranks(&Ability::Dexterity.to_string()))
            }
            PowerRange::Perception => None,
        }
    }

    pub fn impervious(&self, defense: Defense) -> i32 {
        self.stats.impervious.get(&defense).copied().unwrap_or(0)
    }

    pub fn is_immune_to(&self, power: &Power) -> bool {
        self.stats.immunities.iter().any(|immunity| {
            power.has_descriptor(immunity) || immunity.eq_ignore_ascii_case(power.effect.name())
        })
    }

    pub fn add_condition(&mut self, condition: Condition, source: ConditionSource, expiry: ConditionExpiry) {
        self.conditions.push(AppliedCondition { condition, source, expiry });
    }

    /// Remove every instance of a condition, returning how many were removed
    pub fn remove_condition(&mut self, condition: Condition) -> usize {
        let before = self.conditions.len();
        self.conditions.retain(|c| c.condition != condition);
        before - self.conditions.len()
    }

    pub fn remove_effect_conditions(&mut self, effect: EffectId) -> Vec<Condition> {
        let mut removed = Vec::new();
        self.conditions.retain(|c| match c.source {
            ConditionSource::Affliction { effect: e, .. } if e == effect => {
                removed.push(c.condition);
                false
            }
            _ => true,
        });
        removed
    }

    /// Highest degree an affliction power currently holds on this combatant
    pub fn affliction_degree(&self, power: PowerId) -> Option<(EffectId, u8)> {
        self.conditions.iter().find_map(|c| match (c.source, c.expiry) {
            (ConditionSource::Affliction { effect, power: p }, ConditionExpiry::Recovery { degree, .. })
                if p == power =>
            {
                Some((effect, degree))
            }
            _ => None,
        })
    }
}

impl TurnEntry for Combatant {
    type Id = ParticipantId;

    fn turn_id(&self) -> ParticipantId {
        self.id
    }

    fn initiative(&self) -> Option<i32> {
        self.initiative
    }

    fn set_initiative(&mut self, initiative: i32) {
        self.initiative = Some(initiative);
    }

    fn tiebreaker(&self) -> i32 {
        self.initiative_bonus()
    }
}

/// Outcome of an end-of-turn recovery check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub effect: EffectId,
    pub roll: CheckRoll,
    pub recovered: bool,
    pub conditions: Vec<Condition>,
}

/// Everything that happened when the turn passed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    pub change: TurnChange<ParticipantId>,
    pub expired: Vec<Condition>,
    pub recoveries: Vec<RecoveryReport>,
    pub dropped_effects: Vec<EffectId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combat {
    pub id: CombatId,
    pub room_id: RoomId,
    pub name: String,
    pub order: TurnOrder<Combatant>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Combat {
    pub fn new(room_id: RoomId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CombatId::new(),
            room_id,
            name: name.into(),
            order: TurnOrder::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> TurnState {
        self.order.state()
    }

    pub fn round(&self) -> u32 {
        self.order.round()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn combatant(&self, id: ParticipantId) -> Result<&Combatant, CombatError> {
        self.order.get(id).ok_or(CombatError::UnknownParticipant(id))
    }

    pub fn combatant_mut(&mut self, id: ParticipantId) -> Result<&mut Combatant, CombatError> {
        self.order.get_mut(id).ok_or(CombatError::UnknownParticipant(id))
    }

    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.order.entries()
    }

    pub fn current(&self) -> Option<&Combatant> {
        self.order.current()
    }

    pub fn add_combatant(&mut self, combatant: Combatant) -> Result<ParticipantId, CombatError> {
        if self.combatants().any(|c| c.character_id == combatant.character_id) {
            return Err(CombatError::AlreadyInCombat(combatant.character_id));
        }
        let id = combatant.id;
        self.order.add(combatant)?;
        Ok(id)
    }

    /// Remove a combatant; effects it maintained end with it
    pub fn remove_combatant(&mut self, id: ParticipantId) -> Result<Combatant, CombatError> {
        let removed = self.order.remove(id)?;
        for effect in &removed.maintaining {
            if let Some(target) = self.order.get_mut(effect.target) {
                target.remove_effect_conditions(effect.id);
            }
        }
        for combatant in self.order.entries_mut() {
            combatant.maintaining.retain(|m| m.target != id);
        }
        Ok(removed)
    }

    /// Roll d20 + initiative bonus for every combatant without initiative
    pub fn roll_initiative(&mut self, dice: &dyn Dice) -> Result<Vec<(ParticipantId, i32)>, CombatError> {
        let pending: Vec<(ParticipantId, i32)> = self
            .combatants()
            .filter(|c| c.initiative.is_none())
            .map(|c| (c.id, c.initiative_bonus()))
            .collect();

        let mut rolled = Vec::with_capacity(pending.len());
        for (id, bonus) in pending {
            let initiative = dice.d20() + bonus;
            self.order.set_initiative(id, initiative)?;
            rolled.push((id, initiative));
        }
        Ok(rolled)
    }

    pub fn set_initiative(&mut self, id: ParticipantId, initiative: i32) -> Result<(), CombatError> {
        Ok(self.order.set_initiative(id, initiative)?)
    }

    pub fn start(&mut self) -> Result<TurnChange<ParticipantId>, CombatError> {
        Ok(self.order.start()?)
    }

    /// End the current turn, run end-of-turn upkeep and pass the turn on
    pub fn next_turn(&mut self, dice: &dyn Dice) -> Result<TurnReport, CombatError> {
        let acting = self.order.current_id().ok_or(CombatError::NotActive)?;
        let (expired, recoveries) = self.end_of_turn(acting, dice)?;
        let dropped_effects = self.enforce_maintenance();
        let change = self.order.advance()?;
        Ok(TurnReport {
            change,
            expired,
            recoveries,
            dropped_effects,
        })
    }

    pub fn previous_turn(&mut self) -> Result<TurnChange<ParticipantId>, CombatError> {
        Ok(self.order.previous()?)
    }

    pub fn end(&mut self) -> Result<u32, CombatError> {
        Ok(self.order.end()?)
    }

    /// Whether `id` is taking its turn right now
    pub fn is_acting(&self, id: ParticipantId) -> bool {
        self.order.current_id() == Some(id)
    }

    pub fn apply_condition(
        &mut self,
        target: ParticipantId,
        condition: Condition,
        expiry: ConditionExpiry,
    ) -> Result<Vec<EffectId>, CombatError> {
        self.combatant_mut(target)?
            .add_condition(condition, ConditionSource::Manual, expiry);
        Ok(self.enforce_maintenance())
    }

    pub fn remove_condition(&mut self, target: ParticipantId, condition: Condition) -> Result<usize, CombatError> {
        Ok(self.combatant_mut(target)?.remove_condition(condition))
    }

    /// Stop maintaining an effect, lifting whatever it imposed
    pub fn drop_effect(&mut self, maintainer: ParticipantId, effect: EffectId) -> Result<Vec<Condition>, CombatError> {
        let combatant = self.combatant_mut(maintainer)?;
        let index = combatant
            .maintaining
            .iter()
            .position(|m| m.id == effect)
            .ok_or(CombatError::UnknownEffect(effect))?;
        let maintained = combatant.maintaining.remove(index);

        Ok(self
            .order
            .get_mut(maintained.target)
            .map(|t| t.remove_effect_conditions(effect))
            .unwrap_or_default())
    }

    /// Drop concentration effects of stunned combatants and sustained effects
    /// of incapacitated ones, then forget effects that no longer hold anything
    pub fn enforce_maintenance(&mut self) -> Vec<EffectId> {
        let mut broken: Vec<(ParticipantId, EffectId, ParticipantId)> = Vec::new();
        for combatant in self.combatants() {
            let conditions = combatant.condition_set();
            for effect in &combatant.maintaining {
                let lost = match effect.duration {
                    PowerDuration::Concentration => !conditions.can_act(),
                    PowerDuration::Sustained => conditions.is_incapacitated(),
                    _ => false,
                };
                if lost {
                    broken.push((combatant.id, effect.id, effect.target));
                }
            }
        }

        for (maintainer, effect, target) in &broken {
            if let Some(target) = self.order.get_mut(*target) {
                target.remove_effect_conditions(*effect);
            }
            if let Some(maintainer) = self.order.get_mut(*maintainer) {
                maintainer.maintaining.retain(|m| m.id != *effect);
            }
        }

        // Effects whose conditions were recovered from are no longer maintained
        let live: Vec<EffectId> = self
            .combatants()
            .flat_map(|c| c.conditions.iter())
            .filter_map(|c| match c.source {
                ConditionSource::Affliction { effect, .. } => Some(effect),
                _ => None,
            })
            .collect();
        for combatant in self.order.entries_mut() {
            combatant.maintaining.retain(|m| live.contains(&m.id));
        }

        broken.into_iter().map(|(_, effect, _)| effect).collect()
    }

    fn end_of_turn(
        &mut self,
        id: ParticipantId,
        dice: &dyn Dice,
    ) -> Result<(Vec<Condition>, Vec<RecoveryReport>), CombatError> {
        let combatant = self.combatant_mut(id)?;

        let mut expired = Vec::new();
        for applied in combatant.conditions.iter_mut() {
            if let ConditionExpiry::EndOfTurns { remaining } = &mut applied.expiry {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    expired.push(applied.condition);
                }
            }
        }
        combatant.conditions.retain(|c| {
            !matches!(c.expiry, ConditionExpiry::EndOfTurns { remaining: 0 })
        });

        // One recovery check per affliction still below the third degree
        let mut pending: Vec<(EffectId, i32, Defense)> = Vec::new();
        for applied in &combatant.conditions {
            if let (
                ConditionSource::Affliction { effect, .. },
                ConditionExpiry::Recovery { dc, defense, degree },
            ) = (applied.source, applied.expiry)
            {
                if degree < 3 && !pending.iter().any(|(e, _, _)| *e == effect) {
                    pending.push((effect, dc, defense));
                }
            }
        }

        let mut recoveries = Vec::new();
        for (effect, dc, defense) in pending {
            let modifier = combatant.defense_total(defense) + combatant.check_modifier();
            let roll = CheckRoll::roll(dice, modifier, dc);
            let recovered = roll.outcome().is_success();
            let conditions = if recovered {
                combatant.remove_effect_conditions(effect)
            } else {
                Vec::new()
            };
            recoveries.push(RecoveryReport {
                effect,
                roll,
                recovered,
                conditions,
            });
        }

        for ranks in combatant.weakened.values_mut() {
            *ranks -= 1;
        }
        combatant.weakened.retain(|_, ranks| *ranks > 0);

        Ok((expired, recoveries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{AfflictionTiers, EffectKind, ItemKind};
    use crate::domain::value_objects::{AbilityScores, Advantage, DefenseRanks, ScriptedDice};

    fn hero(name: &str, agility: i32) -> Character {
        Character::new(RoomId::new(), name, 10)
            .with_abilities(AbilityScores { agility, stamina: 4, fighting: 6, ..Default::default() })
            .with_defenses(DefenseRanks { dodge: 4, parry: 2, fortitude: 3, will: 5 })
    }

    fn combatant(name: &str, agility: i32, initiative: i32) -> Combatant {
        let mut c = Combatant::from_character(&hero(name, agility), &[]);
        c.initiative = Some(initiative);
        c
    }

    #[test]
    fn test_stats_snapshot_includes_equipment() {
        let character = hero("Knight", 2).with_advantage(Advantage::DefensiveRoll { ranks: 2 });
        let mut armor = Item::new(character.room_id, "Plate", ItemKind::Armor { protection: 3 })
            .carried_by(character.id);
        armor.set_equipped(true);
        let mut lance = Item::new(
            character.room_id,
            "Lance",
            ItemKind::Weapon { damage_rank: 4, range: PowerRange::Close },
        )
        .carried_by(character.id);
        lance.set_equipped(true);
        let stranger = Item::new(character.room_id, "Other", ItemKind::Armor { protection: 9 });

        let stats = CombatantStats::from_character(&character, &[armor, lance, stranger]);
        assert_eq!(stats.toughness, 7);
        assert_eq!(stats.defensive_roll, 2);
        assert_eq!(stats.powers.len(), 1);
        assert_eq!(stats.dodge, 6);
    }

    #[test]
    fn test_defense_totals_respond_to_conditions_and_wounds() {
        let mut c = Combatant::from_character(
            &hero("Dodger", 4).with_advantage(Advantage::DefensiveRoll { ranks: 2 }),
            &[],
        );
        assert_eq!(c.defense_total(Defense::Dodge), 8);
        assert_eq!(c.defense_total(Defense::Toughness), 6);

        c.wounds = 2;
        c.add_condition(Condition::Vulnerable, ConditionSource::Manual, ConditionExpiry::UntilRemoved);
        assert_eq!(c.defense_total(Defense::Dodge), 4);
        assert_eq!(c.defense_total(Defense::Toughness), 2);

        c.weakened.insert("dodge".to_string(), 2);
        assert_eq!(c.defense_total(Defense::Dodge), 3);
    }

    #[test]
    fn test_same_character_cannot_join_twice() {
        let character = hero("Solo", 1);
        let mut combat = Combat::new(character.room_id, "Ambush");
        combat.add_combatant(Combatant::from_character(&character, &[])).unwrap();
        let again = combat.add_combatant(Combatant::from_character(&character, &[]));
        assert_eq!(again, Err(CombatError::AlreadyInCombat(character.id)));
    }

    #[test]
    fn test_roll_initiative_only_for_missing() {
        let mut combat = Combat::new(RoomId::new(), "Ambush");
        let fast = combat.add_combatant(combatant("Fast", 5, 22)).unwrap();
        let mut slow = combatant("Slow", 1, 0);
        slow.initiative = None;
        let slow = combat.add_combatant(slow).unwrap();

        let dice = ScriptedDice::new([10]);
        let rolled = combat.roll_initiative(&dice).unwrap();
        assert_eq!(rolled, vec![(slow, 11)]);

        combat.start().unwrap();
        assert_eq!(combat.current().map(|c| c.id), Some(fast));
    }

    #[test]
    fn test_dazed_expires_after_targets_next_turn() {
        let mut combat = Combat::new(RoomId::new(), "Brawl");
        let a = combat.add_combatant(combatant("A", 0, 20)).unwrap();
        let b = combat.add_combatant(combatant("B", 0, 10)).unwrap();
        combat.start().unwrap();

        combat
            .apply_condition(b, Condition::Dazed, ConditionExpiry::EndOfTurns { remaining: 1 })
            .unwrap();

        let dice = ScriptedDice::new([]);
        let report = combat.next_turn(&dice).unwrap();
        assert_eq!(report.change.started, b);
        assert!(report.expired.is_empty());

        let report = combat.next_turn(&dice).unwrap();
        assert_eq!(report.change.started, a);
        assert_eq!(report.expired, vec![Condition::Dazed]);
        assert!(!combat.combatant(b).unwrap().has_condition(Condition::Dazed));
    }

    #[test]
    fn test_recovery_check_clears_low_degree_affliction() {
        let mut combat = Combat::new(RoomId::new(), "Mind Games");
        let a = combat.add_combatant(combatant("A", 0, 20)).unwrap();
        combat.start().unwrap();

        let effect = EffectId::new();
        let power = PowerId::new();
        let target = combat.combatant_mut(a).unwrap();
        target.add_condition(
            Condition::Dazed,
            ConditionSource::Affliction { effect, power },
            ConditionExpiry::Recovery { dc: 18, defense: Defense::Will, degree: 1 },
        );

        // Will 5 + 13 = 18 meets the DC
        let dice = ScriptedDice::new([13]);
        let report = combat.next_turn(&dice).unwrap();
        assert_eq!(report.recoveries.len(), 1);
        assert!(report.recoveries[0].recovered);
        assert!(combat.combatant(a).unwrap().conditions.is_empty());
    }

    #[test]
    fn test_third_degree_affliction_does_not_recover() {
        let mut combat = Combat::new(RoomId::new(), "Mind Games");
        let a = combat.add_combatant(combatant("A", 0, 20)).unwrap();
        combat.start().unwrap();
        combat.combatant_mut(a).unwrap().add_condition(
            Condition::Incapacitated,
            ConditionSource::Affliction { effect: EffectId::new(), power: PowerId::new() },
            ConditionExpiry::Recovery { dc: 18, defense: Defense::Will, degree: 3 },
        );

        let dice = ScriptedDice::new([]);
        let report = combat.next_turn(&dice).unwrap();
        assert!(report.recoveries.is_empty());
        assert!(combat.combatant(a).unwrap().has_condition(Condition::Incapacitated));
    }

    #[test]
    fn test_concentration_breaks_when_maintainer_is_stunned() {
        let mut combat = Combat::new(RoomId::new(), "Telepaths");
        let caster = combat.add_combatant(combatant("Caster", 0, 20)).unwrap();
        let victim = combat.add_combatant(combatant("Victim", 0, 10)).unwrap();
        combat.start().unwrap();

        let snare = Power::new(
            "Snare",
            EffectKind::Affliction {
                tiers: AfflictionTiers {
                    first: vec![Condition::Hindered],
                    second: vec![Condition::Immobile],
                    third: vec![Condition::Paralyzed],
                },
            },
            8,
        )
        .with_duration(PowerDuration::Concentration);
        let effect = EffectId::new();
        combat.combatant_mut(victim).unwrap().add_condition(
            Condition::Immobile,
            ConditionSource::Affliction { effect, power: snare.id },
            ConditionExpiry::Recovery { dc: 18, defense: Defense::Will, degree: 2 },
        );
        combat.combatant_mut(caster).unwrap().maintaining.push(MaintainedEffect {
            id: effect,
            power_id: snare.id,
            power_name: snare.name.clone(),
            duration: snare.duration,
            target: victim,
        });

        let dropped = combat
            .apply_condition(caster, Condition::Stunned, ConditionExpiry::UntilRemoved)
            .unwrap();
        assert_eq!(dropped, vec![effect]);
        assert!(combat.combatant(victim).unwrap().conditions.is_empty());
        assert!(combat.combatant(caster).unwrap().maintaining.is_empty());
    }

    #[test]
    fn test_weakened_traits_recover_each_turn() {
        let mut combat = Combat::new(RoomId::new(), "Drain");
        let a = combat.add_combatant(combatant("A", 0, 20)).unwrap();
        combat.start().unwrap();
        combat.combatant_mut(a).unwrap().weakened.insert("will".to_string(), 2);

        let dice = ScriptedDice::new([]);
        combat.next_turn(&dice).unwrap();
        assert_eq!(combat.combatant(a).unwrap().weakened.get("will"), Some(&1));
        combat.next_turn(&dice).unwrap();
        assert!(combat.combatant(a).unwrap().weakened.is_empty());
    }

    #[test]
    fn test_removing_maintainer_lifts_effect() {
        let mut combat = Combat::new(RoomId::new(), "Telepaths");
        let caster = combat.add_combatant(combatant("Caster", 0, 20)).unwrap();
        let victim = combat.add_combatant(combatant("Victim", 0, 10)).unwrap();
        let effect = EffectId::new();
        let power = PowerId::new();
        combat.combatant_mut(victim).unwrap().add_condition(
            Condition::Compelled,
            ConditionSource::Affliction { effect, power },
            ConditionExpiry::Recovery { dc: 15, defense: Defense::Will, degree: 1 },
        );
        combat.combatant_mut(caster).unwrap().maintaining.push(MaintainedEffect {
            id: effect,
            power_id: power,
            power_name: "Suggestion".to_string(),
            duration: PowerDuration::Sustained,
            target: victim,
        });

        combat.remove_combatant(caster).unwrap();
        assert!(combat.combatant(victim).unwrap().conditions.is_empty());
    }

    fn weaken(c: &mut Combatant, ability: Ability, ranks: i32) {
        c.weakened.insert(ability.to_string().to_lowercase(), ranks);
    }

    #[test]
    fn test_weakened_stamina_lowers_toughness_and_fortitude() {
        let mut c = combatant("Drained", 4, 10);
        let toughness = c.defense_total(Defense::Toughness);
        let fortitude = c.defense_total(Defense::Fortitude);
        let dodge = c.defense_total(Defense::Dodge);

        weaken(&mut c, Ability::Stamina, 3);

        assert_eq!(c.defense_total(Defense::Toughness), toughness - 3);
        assert_eq!(c.defense_total(Defense::Fortitude), fortitude - 3);
        assert_eq!(c.defense_total(Defense::Dodge), dodge);
    }

    #[test]
    fn test_weakened_fighting_lowers_parry_and_close_attacks() {
        let mut c = combatant("Drained", 4, 10);
        let parry = c.defense_total(Defense::Parry);
        let close = c.attack_bonus(PowerRange::Close).unwrap();
        let will = c.defense_total(Defense::Will);

        weaken(&mut c, Ability::Fighting, 2);

        assert_eq!(c.defense_total(Defense::Parry), parry - 2);
        assert_eq!(c.attack_bonus(PowerRange::Close), Some(close - 2));
        assert_eq!(c.defense_total(Defense::Will), will);
    }

    #[test]
    fn test_weakened_agility_lowers_dodge_and_initiative() {
        let mut c = combatant("Drained", 4, 10);
        let dodge = c.defense_total(Defense::Dodge);
        let initiative = c.initiative_bonus();
        let parry = c.defense_total(Defense::Parry);

        weaken(&mut c, Ability::Agility, 1);

        assert_eq!(c.defense_total(Defense::Dodge), dodge - 1);
        assert_eq!(c.initiative_bonus(), initiative - 1);
        assert_eq!(c.defense_total(Defense::Parry), parry);
    }

    #[test]
    fn test_weakened_awareness_lowers_will() {
        let mut c = combatant("Drained", 4, 10);
        let will = c.defense_total(Defense::Will);
        let toughness = c.defense_total(Defense::Toughness);

        weaken(&mut c, Ability::Awareness, 4);

        assert_eq!(c.defense_total(Defense::Will), will - 4);
        assert_eq!(c.defense_total(Defense::Toughness), toughness);
    }

    #[test]
    fn test_weakened_defense_and_ability_both_count() {
        let mut c = combatant("Drained", 4, 10);
        let will = c.defense_total(Defense::Will);
        c.weakened.insert("will".to_string(), 1);
        c.weakened.insert("awareness".to_string(), 2);
        assert_eq!(c.defense_total(Defense::Will), will - 3);
    }

    #[test]
    fn test_sustained_effect_drops_when_maintainer_is_incapacitated() {
        let mut combat = Combat::new(RoomId::new(), "Telepaths");
        let caster = combat.add_combatant(combatant("Caster", 0, 20)).unwrap();
        let victim = combat.add_combatant(combatant("Victim", 0, 10)).unwrap();
        combat.start().unwrap();

        let effect = EffectId::new();
        let power = PowerId::new();
        combat.combatant_mut(victim).unwrap().add_condition(
            Condition::Compelled,
            ConditionSource::Affliction { effect, power },
            ConditionExpiry::Recovery { dc: 15, defense: Defense::Will, degree: 1 },
        );
        combat.combatant_mut(caster).unwrap().maintaining.push(MaintainedEffect {
            id: effect,
            power_id: power,
            power_name: "Suggestion".to_string(),
            duration: PowerDuration::Sustained,
            target: victim,
        });

        // Stunned is not enough to break a sustained effect
        let dropped = combat
            .apply_condition(caster, Condition::Stunned, ConditionExpiry::UntilRemoved)
            .unwrap();
        assert!(dropped.is_empty());
        assert!(combat.combatant(victim).unwrap().has_condition(Condition::Compelled));

        let dropped = combat
            .apply_condition(caster, Condition::Incapacitated, ConditionExpiry::UntilRemoved)
            .unwrap();
        assert_eq!(dropped, vec![effect]);
        assert!(!combat.combatant(victim).unwrap().has_condition(Condition::Compelled));
        assert!(combat.combatant(caster).unwrap().maintaining.is_empty());
    }
}
