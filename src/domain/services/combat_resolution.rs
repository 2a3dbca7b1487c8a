//! Attack, resistance and healing resolution
//!
//! Operates on a [`Combat`] so that every change to combatants goes through
//! one place and maintained effects are re-checked afterwards.

use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    Combat, CombatError, Combatant, ConditionExpiry, ConditionSource, EffectKind,
    MaintainedEffect, Power, PowerAction, PowerRange,
};
use crate::domain::value_objects::{
    CheckRoll, Condition, Defense, Dice, EffectId, ParticipantId, PowerId,
};

/// Effect rank bonus on a critical hit
pub const CRITICAL_RANK_BONUS: i32 = 5;
/// Attack modifier against a prone target (close) or penalty (ranged)
pub const PRONE_MODIFIER: i32 = 5;
pub const HEALING_DC: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRequest {
    pub attacker: ParticipantId,
    pub target: ParticipantId,
    pub power_id: PowerId,
    #[serde(default)]
    pub situational_modifier: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EffectOutcome {
    Immune,
    Impervious { rank: i32, impervious: i32 },
    Resisted { roll: CheckRoll },
    Damaged { roll: CheckRoll, degrees: u8, wounds: i32, conditions: Vec<Condition> },
    Afflicted { roll: CheckRoll, degrees: u8, conditions: Vec<Condition> },
    /// A stronger result of the same affliction already holds
    AlreadyAfflicted { roll: CheckRoll, degrees: u8 },
    Weakened { roll: CheckRoll, trait_name: String, ranks: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectReport {
    pub power_id: PowerId,
    pub power_name: String,
    pub rank: i32,
    pub outcome: EffectOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackReport {
    pub attacker: ParticipantId,
    pub target: ParticipantId,
    pub power_name: String,
    /// Absent for perception attacks
    pub attack_roll: Option<CheckRoll>,
    pub hit: bool,
    pub critical: bool,
    pub effects: Vec<EffectReport>,
    pub dropped_effects: Vec<EffectId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealingReport {
    pub healer: ParticipantId,
    pub target: ParticipantId,
    pub roll: CheckRoll,
    pub removed: Vec<Condition>,
    pub wounds_removed: i32,
}

/// Resolve an attack and every power linked to it
pub fn resolve_attack(
    combat: &mut Combat,
    request: AttackRequest,
    dice: &dyn Dice,
) -> Result<AttackReport, CombatError> {
    if !combat.order.is_active() {
        return Err(CombatError::NotActive);
    }

    let attacker = combat.combatant(request.attacker)?;
    let power = attacker
        .stats
        .find_power(request.power_id)
        .cloned()
        .ok_or(CombatError::UnknownPower(request.power_id))?;
    ensure_can_use(combat, attacker, &power)?;
    if !power.effect.is_attack() {
        return Err(CombatError::NotAnAttack(power.name.clone()));
    }

    let attacker_conditions = attacker.condition_set();
    let attack_bonus = attacker.attack_bonus(power.range);
    let attacker_modifier = attacker.check_modifier();
    let target = combat.combatant(request.target)?;

    let (attack_roll, hit, critical) = match attack_bonus {
        None => (None, true, false),
        Some(bonus) => {
            let target_conditions = target.condition_set();
            let (defense, prone) = match power.range {
                PowerRange::Close => {
                    let mut prone = 0;
                    if target_conditions.is_prone() {
                        prone += PRONE_MODIFIER;
                    }
                    if attacker_conditions.is_prone() {
                        prone -= PRONE_MODIFIER;
                    }
                    (Defense::Parry, prone)
                }
                _ => {
                    let prone = if target_conditions.is_prone() { -PRONE_MODIFIER } else { 0 };
                    (Defense::Dodge, prone)
                }
            };
            let modifier = bonus + attacker_modifier + request.situational_modifier + prone;
            let roll = CheckRoll::roll(dice, modifier, 10 + target.defense_total(defense));
            let hit = roll.is_natural_20() || (!roll.is_natural_1() && roll.succeeds());
            (Some(roll), hit, roll.is_natural_20())
        }
    };

    let target_acting = combat.is_acting(request.target);
    let mut effects = Vec::new();
    if hit {
        let target = combat.combatant_mut(request.target)?;
        let rank_bonus = if critical { CRITICAL_RANK_BONUS } else { 0 };
        for linked in power.chain() {
            if !linked.effect.is_attack() {
                continue;
            }
            let rank = linked.rank + rank_bonus;
            let outcome = resist(target, linked, rank, target_acting, dice);
            effects.push(EffectReport {
                power_id: linked.id,
                power_name: linked.name.clone(),
                rank,
                outcome,
            });
        }
        register_maintained(combat, request, &power);
    }

    let dropped_effects = combat.enforce_maintenance();
    combat.touch();

    Ok(AttackReport {
        attacker: request.attacker,
        target: request.target,
        power_name: power.name,
        attack_roll,
        hit,
        critical,
        effects,
        dropped_effects,
    })
}

/// Heal a combatant; each degree of success lifts the worst damage condition or a wound
pub fn resolve_healing(
    combat: &mut Combat,
    healer: ParticipantId,
    target: ParticipantId,
    power_id: PowerId,
    dice: &dyn Dice,
) -> Result<HealingReport, CombatError> {
    if !combat.order.is_active() {
        return Err(CombatError::NotActive);
    }
    let combatant = combat.combatant(healer)?;
    let power = combatant
        .stats
        .find_power(power_id)
        .cloned()
        .ok_or(CombatError::UnknownPower(power_id))?;
    ensure_can_use(combat, combatant, &power)?;
    if !matches!(power.effect, EffectKind::Healing) {
        return Err(CombatError::NotHealing(power.name));
    }

    let roll = CheckRoll::roll(dice, power.rank, HEALING_DC);
    let degrees = roll.outcome().success_degrees();

    let patient = combat.combatant_mut(target)?;
    let mut removed = Vec::new();
    let mut wounds_removed = 0;
    for _ in 0..degrees {
        let worst = [
            Condition::Dying,
            Condition::Incapacitated,
            Condition::Staggered,
            Condition::Dazed,
        ]
        .into_iter()
        .find(|c| {
            patient
                .conditions
                .iter()
                .any(|a| a.condition == *c && a.source == ConditionSource::Damage)
        });

        match worst {
            Some(condition) => {
                patient
                    .conditions
                    .retain(|a| !(a.condition == condition && a.source == ConditionSource::Damage));
                removed.push(condition);
            }
            None if patient.wounds > 0 => {
                patient.wounds -= 1;
                wounds_removed += 1;
            }
            None => break,
        }
    }
    combat.touch();

    Ok(HealingReport {
        healer,
        target,
        roll,
        removed,
        wounds_removed,
    })
}

fn ensure_can_use(combat: &Combat, user: &Combatant, power: &Power) -> Result<(), CombatError> {
    if !user.can_act() {
        return Err(CombatError::CannotAct(user.name.clone()));
    }
    if !combat.is_acting(user.id) && power.action != PowerAction::Reaction {
        return Err(CombatError::NotYourTurn(user.name.clone()));
    }
    Ok(())
}

/// Resistance check for one effect against the target
fn resist(
    target: &mut Combatant,
    power: &Power,
    rank: i32,
    target_acting: bool,
    dice: &dyn Dice,
) -> EffectOutcome {
    if target.is_immune_to(power) {
        return EffectOutcome::Immune;
    }
    let impervious = target.impervious(power.resisted_by);
    if impervious > 0 && rank <= impervious / 2 {
        return EffectOutcome::Impervious { rank, impervious };
    }

    let dc = power.effect.resistance_base() + rank;
    let modifier = target.defense_total(power.resisted_by) + target.check_modifier();
    let roll = CheckRoll::roll(dice, modifier, dc);
    let degrees = roll.outcome().failure_degrees();
    if degrees == 0 {
        return EffectOutcome::Resisted { roll };
    }

    match &power.effect {
        EffectKind::Damage => {
            let conditions = apply_damage(target, degrees, target_acting);
            EffectOutcome::Damaged {
                roll,
                degrees,
                wounds: target.wounds,
                conditions,
            }
        }
        EffectKind::Affliction { tiers } => {
            let degree = degrees.min(3);
            if let Some((_, held)) = target.affliction_degree(power.id) {
                if held >= degree {
                    return EffectOutcome::AlreadyAfflicted { roll, degrees };
                }
            }
            let previous: Vec<EffectId> = target
                .conditions
                .iter()
                .filter_map(|c| match c.source {
                    ConditionSource::Affliction { effect, power: p } if p == power.id => Some(effect),
                    _ => None,
                })
                .collect();
            for effect in previous {
                target.remove_effect_conditions(effect);
            }

            let effect = EffectId::new();
            let conditions = tiers.for_degree(degree).to_vec();
            for condition in &conditions {
                target.add_condition(
                    *condition,
                    ConditionSource::Affliction { effect, power: power.id },
                    ConditionExpiry::Recovery { dc, defense: power.resisted_by, degree },
                );
            }
            EffectOutcome::Afflicted { roll, degrees, conditions }
        }
        EffectKind::Weaken { trait_name } => {
            let ranks = i32::from(degrees);
            *target.weakened.entry(trait_name.to_lowercase()).or_insert(0) += ranks;
            EffectOutcome::Weakened {
                roll,
                trait_name: trait_name.clone(),
                ranks,
            }
        }
        _ => EffectOutcome::Resisted { roll },
    }
}

/// Wound and damage conditions for a failed Toughness check
fn apply_damage(target: &mut Combatant, degrees: u8, target_acting: bool) -> Vec<Condition> {
    target.wounds += 1;
    let conditions = target.condition_set();
    let mut added = Vec::new();

    if conditions.is_incapacitated() {
        if !conditions.is_dying() {
            target.add_condition(Condition::Dying, ConditionSource::Damage, ConditionExpiry::UntilRemoved);
            added.push(Condition::Dying);
        }
        return added;
    }

    let condition = match degrees {
        1 => None,
        2 => Some(Condition::Dazed),
        3 if target.has_condition(Condition::Staggered) => Some(Condition::Incapacitated),
        3 => Some(Condition::Staggered),
        _ => Some(Condition::Incapacitated),
    };

    if let Some(condition) = condition {
        let expiry = if condition == Condition::Dazed {
            // Lasts until the end of the target's next turn
            let remaining = if target_acting { 2 } else { 1 };
            ConditionExpiry::EndOfTurns { remaining }
        } else {
            ConditionExpiry::UntilRemoved
        };
        if condition == Condition::Incapacitated {
            target.remove_condition(Condition::Staggered);
        }
        target.add_condition(condition, ConditionSource::Damage, expiry);
        added.push(condition);
    }
    added
}

/// Record a maintained affliction on the attacker if it took hold
fn register_maintained(combat: &mut Combat, request: AttackRequest, power: &Power) {
    let maintained: Vec<(EffectId, &Power)> = power
        .chain()
        .into_iter()
        .filter(|p| p.duration.is_maintained())
        .filter_map(|p| {
            combat
                .order
                .get(request.target)
                .and_then(|t| t.affliction_degree(p.id))
                .map(|(effect, _)| (effect, p))
        })
        .collect();

    if let Some(attacker) = combat.order.get_mut(request.attacker) {
        for (effect, p) in maintained {
            attacker.maintaining.retain(|m| !(m.power_id == p.id && m.target == request.target));
            attacker.maintaining.push(MaintainedEffect {
                id: effect,
                power_id: p.id,
                power_name: p.name.clone(),
                duration: p.duration,
                target: request.target,
            });
        }
    }
}
