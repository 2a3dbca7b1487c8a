//! Value objects - Immutable objects defined by their attributes

mod abilities;
mod conditions;
mod dice;
mod ids;
mod settings;
mod turn_order;
mod warfare;

pub use abilities::{Ability, AbilityScores, Advantage, Defense, DefenseRanks, Skill};
pub use conditions::{Condition, ConditionSet};
#[cfg(test)]
pub use dice::ScriptedDice;
pub use dice::{CheckOutcome, CheckRoll, Dice, MAX_FAILURE_DEGREES};
pub use ids::*;
pub use settings::AppSettings;
pub use turn_order::{TurnChange, TurnEntry, TurnOrder, TurnOrderError, TurnState};
pub use warfare::{
    unit_cost, unit_upkeep, Ancestry, CasualtyDie, Equipment, Experience, FortificationKind,
    FortificationProfile, UnitStats, UnitType,
};
