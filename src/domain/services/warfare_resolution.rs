//! Unit attacks, morale, sieges, rallies and domain intrigue

use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    CasualtyResult, Domain, DomainDefense, DomainSkill, Fortification, Unit, UnitStatus,
    WarfareError,
};
use crate::domain::value_objects::{AppSettings, CheckRoll, Dice};

/// DCs for warfare checks, taken from the game settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarfareRules {
    pub morale_dc: i32,
    pub rally_dc: i32,
}

impl Default for WarfareRules {
    fn default() -> Self {
        Self::from(&AppSettings::default())
    }
}

impl From<&AppSettings> for WarfareRules {
    fn from(settings: &AppSettings) -> Self {
        Self {
            morale_dc: settings.morale_dc,
            rally_dc: settings.rally_dc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoraleReport {
    pub roll: CheckRoll,
    pub held: bool,
    pub hp: i32,
    pub status: UnitStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAttackReport {
    pub attack_roll: CheckRoll,
    pub hit: bool,
    pub power_roll: Option<CheckRoll>,
    pub casualties: i32,
    pub hp: i32,
    pub status: UnitStatus,
    pub morale: Option<MoraleReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiegeReport {
    pub attack_roll: CheckRoll,
    pub hit: bool,
    pub power_roll: Option<CheckRoll>,
    pub damage: i32,
    pub hp: i32,
    pub breached: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RallyReport {
    pub roll: CheckRoll,
    pub rallied: bool,
    pub hp: i32,
    pub status: UnitStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrigueReport {
    pub skill: DomainSkill,
    pub defense: DomainDefense,
    pub roll: CheckRoll,
    pub success: bool,
    pub defense_level: i32,
    pub in_crisis: bool,
}

/// d20 + bonus vs a target number; natural 20 always lands, natural 1 never does
fn opposed(dice: &dyn Dice, bonus: i32, target: i32) -> (CheckRoll, bool) {
    let roll = CheckRoll::roll(dice, bonus, target);
    let hit = roll.is_natural_20() || (!roll.is_natural_1() && roll.succeeds());
    (roll, hit)
}

/// Attack one unit with another
///
/// `garrison` is the fortification the target is stationed in, if any; it
/// only helps while intact.
pub fn unit_attack(
    attacker: &Unit,
    target: &mut Unit,
    garrison: Option<&Fortification>,
    rules: WarfareRules,
    dice: &dyn Dice,
) -> Result<UnitAttackReport, WarfareError> {
    if attacker.is_incapacitated() {
        return Err(WarfareError::Incapacitated(attacker.name.clone()));
    }
    if target.is_incapacitated() {
        return Err(WarfareError::Incapacitated(target.name.clone()));
    }

    let offense = attacker.stats();
    let defense = target.stats();
    let (defense_bonus, toughness_bonus) = garrison
        .map(|f| (f.defense_bonus(), f.toughness_bonus()))
        .unwrap_or((0, 0));

    let (attack_roll, hit) = opposed(dice, offense.attack, defense.defense + defense_bonus);
    if !hit {
        return Ok(UnitAttackReport {
            attack_roll,
            hit,
            power_roll: None,
            casualties: 0,
            hp: target.hp,
            status: target.status(),
            morale: None,
        });
    }

    let (power_roll, wounded) = opposed(dice, offense.power, defense.toughness + toughness_bonus);
    let casualties = match (wounded, power_roll.is_natural_20()) {
        (false, _) => 0,
        (true, true) => 2,
        (true, false) => 1,
    };

    let result = target.take_casualties(casualties);
    let morale = morale_check(target, result, rules, dice);

    Ok(UnitAttackReport {
        attack_roll,
        hit,
        power_roll: Some(power_roll),
        casualties,
        hp: target.hp,
        status: target.status(),
        morale,
    })
}

/// Morale test on first becoming diminished; failure costs one more casualty
pub fn morale_check(
    unit: &mut Unit,
    result: CasualtyResult,
    rules: WarfareRules,
    dice: &dyn Dice,
) -> Option<MoraleReport> {
    if !result.newly_diminished || !unit.ancestry.checks_morale() {
        return None;
    }
    let roll = CheckRoll::roll(dice, unit.stats().morale, rules.morale_dc);
    let held = roll.succeeds();
    if !held {
        unit.take_casualties(1);
    }
    Some(MoraleReport {
        roll,
        held,
        hp: unit.hp,
        status: unit.status(),
    })
}

/// Attack a fortification's walls
pub fn siege(
    attacker: &Unit,
    fortification: &mut Fortification,
    dice: &dyn Dice,
) -> Result<SiegeReport, WarfareError> {
    if attacker.is_incapacitated() {
        return Err(WarfareError::Incapacitated(attacker.name.clone()));
    }
    if fortification.is_breached() {
        return Err(WarfareError::AlreadyBreached(fortification.name.clone()));
    }

    let profile = fortification.profile();
    let offense = attacker.stats();
    let (attack_roll, hit) = opposed(dice, offense.attack, profile.defense);
    let (power_roll, damage) = if hit {
        let (roll, landed) = opposed(dice, offense.power, profile.toughness);
        let damage = if landed { attacker.unit_type.siege_damage() } else { 0 };
        (Some(roll), damage)
    } else {
        (None, 0)
    };

    let breached = fortification.take_damage(damage);
    Ok(SiegeReport {
        attack_roll,
        hit,
        power_roll,
        damage,
        hp: fortification.hp,
        breached,
    })
}

/// A diminished unit regroups; success recovers one hit point
pub fn rally(unit: &mut Unit, rules: WarfareRules, dice: &dyn Dice) -> Result<RallyReport, WarfareError> {
    match unit.status() {
        UnitStatus::Incapacitated => return Err(WarfareError::Incapacitated(unit.name.clone())),
        UnitStatus::Healthy => return Err(WarfareError::NotDiminished(unit.name.clone())),
        UnitStatus::Diminished => {}
    }
    let roll = CheckRoll::roll(dice, unit.stats().command, rules.rally_dc);
    let rallied = roll.succeeds();
    if rallied {
        unit.recover(1);
    }
    Ok(RallyReport {
        roll,
        rallied,
        hp: unit.hp,
        status: unit.status(),
    })
}

/// One domain works against another's defense
pub fn intrigue(
    actor: &Domain,
    skill: DomainSkill,
    target: &mut Domain,
    defense: DomainDefense,
    dice: &dyn Dice,
) -> IntrigueReport {
    let dc = 10 + target.defenses.get(defense).level + target.size;
    let roll = CheckRoll::roll(dice, actor.skills.get(skill), dc);
    let success = roll.succeeds();
    let defense_level = if success {
        target.lower_defense(defense)
    } else {
        target.defenses.get(defense).level
    };
    IntrigueReport {
        skill,
        defense,
        roll,
        success,
        defense_level,
        in_crisis: target.is_in_crisis(),
    }
}

/// Pay every unit's upkeep from the treasury, all or nothing
pub fn pay_upkeep(domain: &mut Domain, units: &[Unit]) -> Result<i32, WarfareError> {
    let needed: i32 = units
        .iter()
        .filter(|u| u.domain_id == domain.id)
        .map(Unit::upkeep)
        .sum();
    domain
        .spend(needed)
        .map_err(|available| WarfareError::InsufficientTreasury { needed, available })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::DomainSkills;
    use crate::domain::value_objects::{
        Ancestry, CasualtyDie, DomainId, Equipment, Experience, FortificationKind, RoomId,
        ScriptedDice, UnitType,
    };

    /// Human regular infantry, light gear: Atk 3 Def 12 Pow 1 Tou 12 Mor 2 Com 2
    fn infantry(ancestry: Ancestry) -> Unit {
        Unit::new(
            DomainId::new(),
            "Spears",
            ancestry,
            UnitType::Infantry,
            Experience::Regular,
            Equipment::Light,
            CasualtyDie::D6,
        )
    }

    fn artillery() -> Unit {
        Unit::new(
            DomainId::new(),
            "Trebuchets",
            Ancestry::Human,
            UnitType::Artillery,
            Experience::Regular,
            Equipment::Light,
            CasualtyDie::D4,
        )
    }

    #[test]
    fn test_hit_and_wound_costs_one_casualty() {
        let attacker = infantry(Ancestry::Human);
        let mut target = infantry(Ancestry::Human);
        // 10 + 3 vs Def 12, then 12 + 1 vs Tou 12
        let dice = ScriptedDice::new([10, 12]);
        let report = unit_attack(&attacker, &mut target, None, WarfareRules::default(), &dice).unwrap();
        assert!(report.hit);
        assert_eq!(report.casualties, 1);
        assert_eq!(target.hp, 5);
        assert!(report.morale.is_none());
    }

    #[test]
    fn test_natural_twenty_power_roll_doubles_casualties() {
        let attacker = infantry(Ancestry::Human);
        let mut target = infantry(Ancestry::Human);
        let dice = ScriptedDice::new([10, 20]);
        let report = unit_attack(&attacker, &mut target, None, WarfareRules::default(), &dice).unwrap();
        assert_eq!(report.casualties, 2);
    }

    #[test]
    fn test_intact_garrison_raises_defense() {
        let attacker = infantry(Ancestry::Human);
        let mut target = infantry(Ancestry::Human);
        let keep = Fortification::new(target.domain_id, "Keep", FortificationKind::Keep);
        // 10 + 3 = 13 beats Def 12 but not 12 + 3
        let dice = ScriptedDice::new([10]);
        let report =
            unit_attack(&attacker, &mut target, Some(&keep), WarfareRules::default(), &dice).unwrap();
        assert!(!report.hit);
        assert_eq!(report.attack_roll.dc, 15);

        let mut breached = keep.clone();
        breached.take_damage(100);
        let dice = ScriptedDice::new([10, 1]);
        let report =
            unit_attack(&attacker, &mut target, Some(&breached), WarfareRules::default(), &dice).unwrap();
        assert!(report.hit);
        assert_eq!(report.casualties, 0);
    }

    #[test]
    fn test_failed_morale_costs_extra_casualty() {
        let attacker = infantry(Ancestry::Human);
        let mut target = infantry(Ancestry::Human);
        target.take_casualties(2);
        // Drops to 3 of 6: diminished, morale 2 + 5 = 7 fails DC 15
        let dice = ScriptedDice::new([10, 12, 5]);
        let report = unit_attack(&attacker, &mut target, None, WarfareRules::default(), &dice).unwrap();
        let morale = report.morale.unwrap();
        assert!(!morale.held);
        assert_eq!(target.hp, 2);
        assert_eq!(report.hp, 2);

        // Only the first drop to diminished tests morale
        let dice = ScriptedDice::new([10, 12]);
        let report = unit_attack(&attacker, &mut target, None, WarfareRules::default(), &dice).unwrap();
        assert!(report.morale.is_none());
        assert_eq!(target.hp, 1);
    }

    #[test]
    fn test_undead_never_test_morale() {
        let attacker = infantry(Ancestry::Human);
        let mut target = infantry(Ancestry::Undead);
        target.take_casualties(2);
        let dice = ScriptedDice::new([15, 15]);
        let report = unit_attack(&attacker, &mut target, None, WarfareRules::default(), &dice).unwrap();
        assert_eq!(report.status, UnitStatus::Diminished);
        assert!(report.morale.is_none());
    }

    #[test]
    fn test_incapacitated_units_cannot_fight() {
        let mut attacker = infantry(Ancestry::Human);
        attacker.take_casualties(6);
        let mut target = infantry(Ancestry::Human);
        let dice = ScriptedDice::new([]);
        let err = unit_attack(&attacker, &mut target, None, WarfareRules::default(), &dice).unwrap_err();
        assert_eq!(err, WarfareError::Incapacitated("Spears".to_string()));
    }

    #[test]
    fn test_artillery_siege_damage() {
        let guns = artillery();
        let mut wall = Fortification::new(DomainId::new(), "Palisade", FortificationKind::Palisade);
        // Atk 4 + 12 vs Def 12, Pow 2 + 12 vs Tou 12
        let dice = ScriptedDice::new([12, 12, 12, 12]);
        let first = siege(&guns, &mut wall, &dice).unwrap();
        assert_eq!(first.damage, 2);
        assert!(!first.breached);
        let second = siege(&guns, &mut wall, &dice).unwrap();
        assert!(second.breached);
        assert_eq!(second.hp, 0);

        let dice = ScriptedDice::new([]);
        assert_eq!(
            siege(&guns, &mut wall, &dice).unwrap_err(),
            WarfareError::AlreadyBreached("Palisade".to_string())
        );
    }

    #[test]
    fn test_rally_only_when_diminished() {
        let mut unit = infantry(Ancestry::Human);
        let dice = ScriptedDice::new([]);
        assert!(matches!(
            rally(&mut unit, WarfareRules::default(), &dice),
            Err(WarfareError::NotDiminished(_))
        ));

        unit.take_casualties(4);
        let dice = ScriptedDice::new([13]);
        let report = rally(&mut unit, WarfareRules::default(), &dice).unwrap();
        assert!(report.rallied);
        assert_eq!(report.hp, 3);
    }

    #[test]
    fn test_intrigue_lowers_defense_until_crisis() {
        let spies = Domain::new(RoomId::new(), "Shadow", 3)
            .with_skills(DomainSkills { espionage: 6, ..Default::default() });
        let mut rival = Domain::new(RoomId::new(), "Rival", 1);
        // Rival defense 3, size 1: DC 14
        let dice = ScriptedDice::new([8, 8, 8, 1]);
        let first = intrigue(&spies, DomainSkill::Espionage, &mut rival, DomainDefense::Resolve, &dice);
        assert!(first.success);
        assert_eq!(first.defense_level, 2);
        intrigue(&spies, DomainSkill::Espionage, &mut rival, DomainDefense::Resolve, &dice);
        let third = intrigue(&spies, DomainSkill::Espionage, &mut rival, DomainDefense::Resolve, &dice);
        assert_eq!(third.defense_level, 0);
        assert!(third.in_crisis);

        let failed = intrigue(&spies, DomainSkill::Espionage, &mut rival, DomainDefense::Resolve, &dice);
        assert!(!failed.success);
    }

    #[test]
    fn test_upkeep_is_all_or_nothing() {
        let mut domain = Domain::new(RoomId::new(), "Avalon", 2).with_treasury(100);
        let mut unit = infantry(Ancestry::Human);
        unit.domain_id = domain.id;
        let upkeep = unit.upkeep();

        assert_eq!(pay_upkeep(&mut domain, &[unit.clone()]), Ok(100 - upkeep));
        domain.treasury = 1;
        assert_eq!(
            pay_upkeep(&mut domain, &[unit]),
            Err(WarfareError::InsufficientTreasury { needed: upkeep, available: 1 })
        );
        assert_eq!(domain.treasury, 1);
    }
}
