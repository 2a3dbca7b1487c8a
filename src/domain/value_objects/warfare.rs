//! Warfare stat tables
//!
//! A unit's stat block is the base block plus one modifier per axis: type,
//! ancestry, experience and equipment.

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// The six unit attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    pub attack: i32,
    pub defense: i32,
    pub power: i32,
    pub toughness: i32,
    pub morale: i32,
    pub command: i32,
}

impl UnitStats {
    pub const BASE: UnitStats = UnitStats {
        attack: 0,
        defense: 10,
        power: 0,
        toughness: 10,
        morale: 0,
        command: 0,
    };

    /// Sum of bonuses over the base block, the basis for cost
    pub fn bonus_total(&self) -> i32 {
        self.attack
            + self.power
            + (self.defense - Self::BASE.defense)
            + (self.toughness - Self::BASE.toughness)
            + self.morale
            + self.command
    }
}

impl Add for UnitStats {
    type Output = UnitStats;

    fn add(self, other: UnitStats) -> UnitStats {
        UnitStats {
            attack: self.attack + other.attack,
            defense: self.defense + other.defense,
            power: self.power + other.power,
            toughness: self.toughness + other.toughness,
            morale: self.morale + other.morale,
            command: self.command + other.command,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Infantry,
    Artillery,
    Cavalry,
    Aerial,
}

impl UnitType {
    pub fn modifiers(&self) -> UnitStats {
        let zero = UnitStats::default();
        match self {
            Self::Infantry => UnitStats { defense: 1, toughness: 1, ..zero },
            Self::Artillery => UnitStats { attack: 1, power: 1, ..zero },
            Self::Cavalry => UnitStats { attack: 1, power: 1, morale: 2, ..zero },
            Self::Aerial => UnitStats { morale: 3, ..zero },
        }
    }

    /// Structure damage dealt when attacking a fortification
    pub fn siege_damage(&self) -> i32 {
        match self {
            Self::Artillery => 2,
            _ => 1,
        }
    }

    /// Multiplier applied to the unit's cost
    fn cost_factor(&self) -> i32 {
        match self {
            Self::Infantry => 1,
            Self::Artillery | Self::Aerial => 2,
            Self::Cavalry => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Experience {
    Levy,
    Regular,
    Seasoned,
    Veteran,
    Elite,
    SuperElite,
}

impl Experience {
    pub fn modifiers(&self) -> UnitStats {
        let step = match self {
            Self::Levy => 0,
            Self::Regular => 1,
            Self::Seasoned => 2,
            Self::Veteran => 3,
            Self::Elite => 4,
            Self::SuperElite => 5,
        };
        let morale = if matches!(self, Self::Levy) { -1 } else { step };
        UnitStats {
            attack: step,
            toughness: step,
            morale,
            command: step,
            ..UnitStats::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Equipment {
    Light,
    Medium,
    Heavy,
    SuperHeavy,
}

impl Equipment {
    pub fn modifiers(&self) -> UnitStats {
        let bonus = match self {
            Self::Light => 1,
            Self::Medium => 2,
            Self::Heavy => 4,
            Self::SuperHeavy => 6,
        };
        UnitStats {
            power: bonus,
            defense: bonus,
            ..UnitStats::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ancestry {
    Human,
    Dwarf,
    Elf,
    Orc,
    Goblin,
    Hobgoblin,
    Undead,
}

impl Ancestry {
    pub fn modifiers(&self) -> UnitStats {
        let zero = UnitStats::default();
        match self {
            Self::Human => UnitStats { attack: 2, morale: 1, command: 1, ..zero },
            Self::Dwarf => UnitStats { attack: 3, power: 1, defense: 1, toughness: 1, morale: 2, ..zero },
            Self::Elf => UnitStats { attack: 2, morale: 1, command: 2, ..zero },
            Self::Orc => UnitStats { attack: 2, power: 1, morale: 2, ..zero },
            Self::Goblin => UnitStats { attack: -1, defense: 1, morale: -1, ..zero },
            Self::Hobgoblin => UnitStats { attack: 2, defense: 1, toughness: 1, command: 1, ..zero },
            Self::Undead => UnitStats { attack: 1, toughness: 1, ..zero },
        }
    }

    pub fn checks_morale(&self) -> bool {
        !matches!(self, Self::Undead)
    }
}

/// Unit size, expressed as the casualty die
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasualtyDie {
    D4,
    D6,
    D8,
    D10,
    D12,
}

impl CasualtyDie {
    pub fn sides(&self) -> i32 {
        match self {
            Self::D4 => 4,
            Self::D6 => 6,
            Self::D8 => 8,
            Self::D10 => 10,
            Self::D12 => 12,
        }
    }
}

impl fmt::Display for CasualtyDie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// Gold cost to raise a unit; upkeep per turn is a tenth of it
pub fn unit_cost(unit_type: UnitType, stats: &UnitStats, size: CasualtyDie) -> i32 {
    let per_die = stats.bonus_total().max(1) * unit_type.cost_factor();
    per_die * size.sides() / 2 * 10
}

pub fn unit_upkeep(cost: i32) -> i32 {
    (cost / 10).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FortificationKind {
    Palisade,
    Tower,
    Keep,
    Castle,
    Fortress,
}

/// Numbers a fortification contributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FortificationProfile {
    /// Added to a garrisoned unit's Defense
    pub defense_bonus: i32,
    /// Added to a garrisoned unit's Toughness
    pub toughness_bonus: i32,
    /// Defense against siege attacks
    pub defense: i32,
    /// Toughness against siege attacks
    pub toughness: i32,
    pub max_hp: i32,
}

impl FortificationKind {
    pub fn profile(&self) -> FortificationProfile {
        let (defense_bonus, toughness_bonus, defense, toughness, max_hp) = match self {
            Self::Palisade => (1, 1, 12, 12, 3),
            Self::Tower => (2, 2, 14, 14, 5),
            Self::Keep => (3, 3, 16, 16, 8),
            Self::Castle => (4, 4, 18, 18, 12),
            Self::Fortress => (5, 5, 20, 20, 16),
        };
        FortificationProfile {
            defense_bonus,
            toughness_bonus,
            defense,
            toughness,
            max_hp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_stack_onto_base() {
        let stats = UnitStats::BASE
            + UnitType::Infantry.modifiers()
            + Ancestry::Human.modifiers()
            + Experience::Regular.modifiers()
            + Equipment::Medium.modifiers();
        assert_eq!(
            stats,
            UnitStats { attack: 3, defense: 13, power: 2, toughness: 12, morale: 2, command: 2 }
        );
    }

    #[test]
    fn test_levy_is_shaky() {
        assert_eq!(Experience::Levy.modifiers().morale, -1);
        assert_eq!(Experience::Levy.modifiers().attack, 0);
        assert_eq!(Experience::SuperElite.modifiers().command, 5);
    }

    #[test]
    fn test_undead_skip_morale() {
        assert!(!Ancestry::Undead.checks_morale());
        assert!(Ancestry::Goblin.checks_morale());
    }

    #[test]
    fn test_cost_scales_with_size_and_type() {
        let stats = UnitStats { attack: 2, ..UnitStats::BASE };
        let small = unit_cost(UnitType::Infantry, &stats, CasualtyDie::D4);
        let large = unit_cost(UnitType::Infantry, &stats, CasualtyDie::D8);
        let cavalry = unit_cost(UnitType::Cavalry, &stats, CasualtyDie::D4);
        assert_eq!(small, 40);
        assert_eq!(large, 80);
        assert_eq!(cavalry, 120);
        assert_eq!(unit_upkeep(small), 4);
        assert_eq!(unit_upkeep(5), 1);
    }

    #[test]
    fn test_fortifications_grow_sturdier() {
        assert!(FortificationKind::Fortress.profile().max_hp > FortificationKind::Keep.profile().max_hp);
        assert_eq!(CasualtyDie::D10.to_string(), "d10");
    }
}
