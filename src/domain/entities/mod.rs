//! Domain entities - Core business objects with identity

mod character;
mod combat;
mod fortification;
mod item;
mod power;
mod realm;
mod room;
mod unit;
mod warfare_combat;

pub use character::{
    Character, LimitViolation, PointBreakdown, MAX_POWER_LEVEL, MIN_ABILITY_RANK, MIN_POWER_LEVEL,
};
pub use combat::{
    AppliedCondition, Combat, CombatError, Combatant, CombatantStats, ConditionExpiry,
    ConditionSource, MaintainedEffect, RecoveryReport, TurnReport,
};
pub use fortification::Fortification;
pub use item::{Item, ItemKind};
pub use power::{AfflictionTiers, EffectKind, Power, PowerAction, PowerDuration, PowerRange};
pub use realm::{
    DefenseTrack, Domain, DomainDefense, DomainDefenses, DomainSkill, DomainSkills,
    ValidationError, MAX_DOMAIN_SIZE, MIN_DOMAIN_SIZE, MIN_DOMAIN_SKILL,
};
pub use room::{Room, RoomMember, RoomRole};
pub use unit::{CasualtyResult, Unit, UnitStatus};
pub use warfare_combat::{EngagedUnit, WarfareCombat, WarfareError};
