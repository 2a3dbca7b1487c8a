use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::entities::{Combat, Combatant, ConditionExpiry};
use crate::domain::value_objects::{
    CharacterId, Condition, Defense, EffectId, ParticipantId, PowerId, TurnState,
};

#[derive(Debug, Deserialize)]
pub struct CreateCombatRequestDto {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddCombatantRequestDto {
    pub character_id: CharacterId,
    #[serde(default)]
    pub initiative: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SetInitiativeRequestDto {
    pub initiative: i32,
}

#[derive(Debug, Deserialize)]
pub struct HealRequestDto {
    pub healer: ParticipantId,
    pub target: ParticipantId,
    pub power_id: PowerId,
}

#[derive(Debug, Deserialize)]
pub struct ApplyConditionRequestDto {
    pub target: ParticipantId,
    pub condition: Condition,
    #[serde(default = "until_removed")]
    pub expiry: ConditionExpiry,
}

fn until_removed() -> ConditionExpiry {
    ConditionExpiry::UntilRemoved
}

#[derive(Debug, Deserialize)]
pub struct RemoveConditionRequestDto {
    pub target: ParticipantId,
    pub condition: Condition,
}

#[derive(Debug, Deserialize)]
pub struct DropEffectRequestDto {
    pub maintainer: ParticipantId,
    pub effect: EffectId,
}

/// A combatant with its current defense totals and effective conditions
#[derive(Debug, Serialize)]
pub struct CombatantResponseDto {
    #[serde(flatten)]
    pub combatant: Combatant,
    pub effective_conditions: Vec<Condition>,
    pub defense_totals: BTreeMap<Defense, i32>,
    pub can_act: bool,
}

impl From<&Combatant> for CombatantResponseDto {
    fn from(combatant: &Combatant) -> Self {
        let conditions = combatant.condition_set();
        let defense_totals = [
            Defense::Dodge,
            Defense::Parry,
            Defense::Fortitude,
            Defense::Toughness,
            Defense::Will,
        ]
        .into_iter()
        .map(|d| (d, combatant.defense_total(d)))
        .collect();
        Self {
            effective_conditions: conditions.effective().copied().collect(),
            can_act: conditions.can_act(),
            defense_totals,
            combatant: combatant.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CombatResponseDto {
    pub id: String,
    pub room_id: String,
    pub name: String,
    pub state: TurnState,
    pub round: u32,
    pub current: Option<ParticipantId>,
    /// In turn order
    pub combatants: Vec<CombatantResponseDto>,
    pub updated_at: String,
}

impl From<Combat> for CombatResponseDto {
    fn from(combat: Combat) -> Self {
        Self {
            id: combat.id.to_string(),
            room_id: combat.room_id.to_string(),
            name: combat.name.clone(),
            state: combat.state(),
            round: combat.round(),
            current: combat.order.current_id(),
            combatants: combat.combatants().map(CombatantResponseDto::from).collect(),
            updated_at: combat.updated_at.to_rfc3339(),
        }
    }
}
