//! Warfare combat entity - a battle between units
//!
//! Engaged units are copies of the domain's units; the application layer
//! writes them back after every resolved action so casualties persist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Unit, UnitStatus};
use crate::domain::value_objects::{
    Dice, RoomId, TurnChange, TurnEntry, TurnOrder, TurnOrderError, TurnState, UnitId,
    WarfareCombatId,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WarfareError {
    #[error(transparent)]
    TurnOrder(#[from] TurnOrderError),
    #[error("battle is not in progress")]
    NotActive,
    #[error("unit not engaged in this battle: {0}")]
    UnknownUnit(UnitId),
    #[error("unit already engaged: {0}")]
    AlreadyEngaged(UnitId),
    #[error("{0} is incapacitated")]
    Incapacitated(String),
    #[error("it is not {0}'s turn")]
    NotYourTurn(String),
    #[error("{0} is not diminished")]
    NotDiminished(String),
    #[error("{0} is already breached")]
    AlreadyBreached(String),
    #[error("treasury holds {available}, upkeep needs {needed}")]
    InsufficientTreasury { needed: i32, available: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagedUnit {
    pub unit: Unit,
    pub initiative: Option<i32>,
}

impl TurnEntry for EngagedUnit {
    type Id = UnitId;

    fn turn_id(&self) -> UnitId {
        self.unit.id
    }

    fn initiative(&self) -> Option<i32> {
        self.initiative
    }

    fn set_initiative(&mut self, initiative: i32) {
        self.initiative = Some(initiative);
    }

    fn tiebreaker(&self) -> i32 {
        self.unit.stats().command
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarfareCombat {
    pub id: WarfareCombatId,
    pub room_id: RoomId,
    pub name: String,
    pub order: TurnOrder<EngagedUnit>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WarfareCombat {
    pub fn new(room_id: RoomId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: WarfareCombatId::new(),
            room_id,
            name: name.into(),
            order: TurnOrder::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn state(&self) -> TurnState {
        self.order.state()
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.order.entries().map(|e| &e.unit)
    }

    pub fn unit(&self, id: UnitId) -> Result<&Unit, WarfareError> {
        self.order
            .get(id)
            .map(|e| &e.unit)
            .ok_or(WarfareError::UnknownUnit(id))
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit, WarfareError> {
        self.order
            .get_mut(id)
            .map(|e| &mut e.unit)
            .ok_or(WarfareError::UnknownUnit(id))
    }

    pub fn current_unit(&self) -> Option<&Unit> {
        self.order.current().map(|e| &e.unit)
    }

    pub fn add_unit(&mut self, unit: Unit) -> Result<UnitId, WarfareError> {
        self.engage(EngagedUnit { unit, initiative: None })
    }

    /// Units joining a running battle need their initiative up front
    pub fn add_unit_with_initiative(&mut self, unit: Unit, initiative: i32) -> Result<UnitId, WarfareError> {
        self.engage(EngagedUnit { unit, initiative: Some(initiative) })
    }

    fn engage(&mut self, entry: EngagedUnit) -> Result<UnitId, WarfareError> {
        let id = entry.unit.id;
        if self.order.get(id).is_some() {
            return Err(WarfareError::AlreadyEngaged(id));
        }
        self.order.add(entry)?;
        Ok(id)
    }

    pub fn remove_unit(&mut self, id: UnitId) -> Result<Unit, WarfareError> {
        Ok(self.order.remove(id)?.unit)
    }

    /// Roll d20 + Command for every unit without initiative
    pub fn roll_initiative(&mut self, dice: &dyn Dice) -> Result<Vec<(UnitId, i32)>, WarfareError> {
        let pending: Vec<(UnitId, i32)> = self
            .order
            .entries()
            .filter(|e| e.initiative.is_none())
            .map(|e| (e.unit.id, e.unit.stats().command))
            .collect();

        let mut rolled = Vec::with_capacity(pending.len());
        for (id, command) in pending {
            let initiative = dice.d20() + command;
            self.order.set_initiative(id, initiative)?;
            rolled.push((id, initiative));
        }
        Ok(rolled)
    }

    pub fn set_initiative(&mut self, id: UnitId, initiative: i32) -> Result<(), WarfareError> {
        Ok(self.order.set_initiative(id, initiative)?)
    }

    /// Start with the first unit still standing
    pub fn start(&mut self) -> Result<TurnChange<UnitId>, WarfareError> {
        Ok(self.order.start_where(out_of_action)?)
    }

    /// Pass the turn on, skipping incapacitated units
    pub fn next_turn(&mut self) -> Result<TurnChange<UnitId>, WarfareError> {
        Ok(self.order.advance_where(out_of_action)?)
    }

    /// Step back to the previous unit still standing
    pub fn previous_turn(&mut self) -> Result<TurnChange<UnitId>, WarfareError> {
        Ok(self.order.previous_where(out_of_action)?)
    }

    pub fn end(&mut self) -> Result<u32, WarfareError> {
        Ok(self.order.end()?)
    }

    /// The unit may act now: the battle is running, it is its turn and it still stands
    pub fn ensure_can_act(&self, id: UnitId) -> Result<&Unit, WarfareError> {
        if !self.order.is_active() {
            return Err(WarfareError::NotActive);
        }
        let unit = self.unit(id)?;
        if self.order.current_id() != Some(id) {
            return Err(WarfareError::NotYourTurn(unit.name.clone()));
        }
        if unit.is_incapacitated() {
            return Err(WarfareError::Incapacitated(unit.name.clone()));
        }
        Ok(unit)
    }
}

fn out_of_action(entry: &EngagedUnit) -> bool {
    entry.unit.status() == UnitStatus::Incapacitated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{
        Ancestry, CasualtyDie, DomainId, Equipment, Experience, ScriptedDice, UnitType,
    };

    fn unit(name: &str, experience: Experience) -> Unit {
        Unit::new(
            DomainId::new(),
            name,
            Ancestry::Human,
            UnitType::Infantry,
            experience,
            Equipment::Light,
            CasualtyDie::D6,
        )
    }

    #[test]
    fn test_initiative_uses_command() {
        let mut battle = WarfareCombat::new(RoomId::new(), "Field");
        let elite = battle.add_unit(unit("Elite", Experience::Elite)).unwrap();
        let levy = battle.add_unit(unit("Levy", Experience::Levy)).unwrap();

        let dice = ScriptedDice::new([5, 5]);
        let rolled = battle.roll_initiative(&dice).unwrap();
        // Human +1 command, Elite +4
        assert_eq!(rolled, vec![(elite, 10), (levy, 6)]);

        let change = battle.start().unwrap();
        assert_eq!(change.started, elite);
    }

    #[test]
    fn test_duplicate_unit_rejected() {
        let mut battle = WarfareCombat::new(RoomId::new(), "Field");
        let u = unit("Guard", Experience::Regular);
        battle.add_unit(u.clone()).unwrap();
        assert_eq!(battle.add_unit(u.clone()), Err(WarfareError::AlreadyEngaged(u.id)));
    }

    #[test]
    fn test_incapacitated_units_are_skipped() {
        let mut battle = WarfareCombat::new(RoomId::new(), "Field");
        let a = battle.add_unit(unit("A", Experience::Regular)).unwrap();
        let b = battle.add_unit(unit("B", Experience::Regular)).unwrap();
        let c = battle.add_unit(unit("C", Experience::Regular)).unwrap();
        battle.set_initiative(a, 20).unwrap();
        battle.set_initiative(b, 15).unwrap();
        battle.set_initiative(c, 10).unwrap();
        battle.start().unwrap();

        battle.unit_mut(b).unwrap().take_casualties(6);
        let change = battle.next_turn().unwrap();
        assert_eq!(change.started, c);
        assert_eq!(battle.ensure_can_act(b), Err(WarfareError::NotYourTurn("B".to_string())));
        assert!(battle.ensure_can_act(c).is_ok());
    }

    #[test]
    fn test_reinforcements_join_running_battle() {
        let mut battle = WarfareCombat::new(RoomId::new(), "Field");
        let a = battle.add_unit(unit("A", Experience::Regular)).unwrap();
        battle.set_initiative(a, 12).unwrap();
        battle.start().unwrap();

        let late = unit("Late", Experience::Regular);
        assert!(matches!(
            battle.add_unit(late.clone()),
            Err(WarfareError::TurnOrder(TurnOrderError::MissingInitiative(_)))
        ));
        let late = battle.add_unit_with_initiative(late, 8).unwrap();
        assert_eq!(battle.current_unit().map(|u| u.id), Some(a));
        assert_eq!(battle.next_turn().unwrap().started, late);
    }

    #[test]
    fn test_actions_need_active_battle() {
        let mut battle = WarfareCombat::new(RoomId::new(), "Field");
        let a = battle.add_unit(unit("A", Experience::Regular)).unwrap();
        assert_eq!(battle.ensure_can_act(a), Err(WarfareError::NotActive));
    }

    #[test]
    fn test_start_and_previous_pass_over_incapacitated_units() {
        let mut battle = WarfareCombat::new(RoomId::new(), "Field");
        let fallen = battle.add_unit(unit("Fallen", Experience::Regular)).unwrap();
        let standing = battle.add_unit(unit("Standing", Experience::Regular)).unwrap();
        battle.set_initiative(fallen, 20).unwrap();
        battle.set_initiative(standing, 5).unwrap();
        battle.unit_mut(fallen).unwrap().take_casualties(6);

        let change = battle.start().unwrap();
        assert_eq!(change.started, standing);

        battle.next_turn().unwrap();
        battle.next_turn().unwrap();
        assert_eq!(battle.order.round(), 3);
        let change = battle.previous_turn().unwrap();
        assert_eq!(change.started, standing);
        assert_eq!(battle.order.round(), 2);
    }
}
