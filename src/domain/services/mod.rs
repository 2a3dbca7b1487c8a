//! Domain services - Pure rules resolution with no I/O

pub mod combat_resolution;
pub mod warfare_resolution;

pub use combat_resolution::{
    resolve_attack, resolve_healing, AttackReport, AttackRequest, EffectOutcome, EffectReport,
    HealingReport,
};
pub use warfare_resolution::{
    intrigue, morale_check, pay_upkeep, rally, siege, unit_attack, IntrigueReport, MoraleReport,
    RallyReport, SiegeReport, UnitAttackReport, WarfareRules,
};
