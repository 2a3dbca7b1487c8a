use serde::{Deserialize, Serialize};

use crate::domain::entities::{UnitStatus, WarfareCombat};
use crate::domain::value_objects::{FortificationId, TurnState, UnitId};

#[derive(Debug, Deserialize)]
pub struct CreateBattleRequestDto {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct EngageUnitRequestDto {
    pub unit_id: UnitId,
    #[serde(default)]
    pub initiative: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UnitAttackRequestDto {
    pub attacker: UnitId,
    pub target: UnitId,
}

#[derive(Debug, Deserialize)]
pub struct SiegeRequestDto {
    pub attacker: UnitId,
    pub fortification: FortificationId,
}

#[derive(Debug, Deserialize)]
pub struct RallyRequestDto {
    pub unit_id: UnitId,
}

#[derive(Debug, Serialize)]
pub struct EngagedUnitResponseDto {
    pub unit_id: UnitId,
    pub name: String,
    pub initiative: Option<i32>,
    pub hp: i32,
    pub max_hp: i32,
    pub status: UnitStatus,
}

#[derive(Debug, Serialize)]
pub struct BattleResponseDto {
    pub id: String,
    pub room_id: String,
    pub name: String,
    pub state: TurnState,
    pub round: u32,
    pub current: Option<UnitId>,
    /// In turn order
    pub units: Vec<EngagedUnitResponseDto>,
    pub updated_at: String,
}

impl From<WarfareCombat> for BattleResponseDto {
    fn from(battle: WarfareCombat) -> Self {
        let units = battle
            .order
            .entries()
            .map(|engaged| EngagedUnitResponseDto {
                unit_id: engaged.unit.id,
                name: engaged.unit.name.clone(),
                initiative: engaged.initiative,
                hp: engaged.unit.hp,
                max_hp: engaged.unit.max_hp(),
                status: engaged.unit.status(),
            })
            .collect();
        Self {
            id: battle.id.to_string(),
            room_id: battle.room_id.to_string(),
            name: battle.name.clone(),
            state: battle.state(),
            round: battle.order.round(),
            current: battle.order.current_id(),
            units,
            updated_at: battle.updated_at.to_rfc3339(),
        }
    }
}
