//! Character entity - point-buy sheet with power level limits

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{EffectKind, Power, PowerRange};
use crate::domain::value_objects::{
    Ability, AbilityScores, Advantage, CharacterId, Defense, DefenseRanks, PowerId, RoomId, Skill,
    UserId,
};

pub const MIN_POWER_LEVEL: i32 = 1;
pub const MAX_POWER_LEVEL: i32 = 20;
pub const MIN_ABILITY_RANK: i32 = -5;

/// A rule the sheet breaks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum LimitViolation {
    #[error("power level {value} is outside 1..=20")]
    PowerLevelOutOfRange { value: i32 },
    #[error("{ability} rank {value} exceeds the limit of {limit}")]
    AbilityAboveLimit { ability: Ability, value: i32, limit: i32 },
    #[error("{ability} rank {value} is below -5")]
    AbilityBelowMinimum { ability: Ability, value: i32 },
    #[error("{defense} has negative purchased ranks")]
    NegativeDefenseRanks { defense: Defense },
    #[error("{first} + {second} = {total} exceeds {limit}")]
    DefensePairAboveLimit {
        first: Defense,
        second: Defense,
        total: i32,
        limit: i32,
    },
    #[error("{power}: attack {attack} + rank {rank} exceeds {limit}")]
    AttackAboveLimit {
        power: String,
        attack: i32,
        rank: i32,
        limit: i32,
    },
    #[error("{power}: perception rank {rank} exceeds {limit}")]
    PerceptionRankAboveLimit { power: String, rank: i32, limit: i32 },
    #[error("{power}: rank must be at least 1")]
    InvalidPowerRank { power: String },
    #[error("{skill} bonus {bonus} exceeds {limit}")]
    SkillAboveLimit { skill: Skill, bonus: i32, limit: i32 },
    #[error("{skill} has negative ranks")]
    NegativeSkillRanks { skill: Skill },
    #[error("advantage ranks must be at least 1")]
    InvalidAdvantageRanks,
    #[error("spent {spent} power points of {budget}")]
    PointsOverBudget { spent: i32, budget: i32 },
}

/// Power points spent per part of the sheet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointBreakdown {
    pub abilities: i32,
    pub defenses: i32,
    pub skills: i32,
    pub advantages: i32,
    pub powers: i32,
    pub total: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub room_id: RoomId,
    /// Player controlling the character; `None` for GM-run characters
    pub owner: Option<UserId>,
    pub name: String,
    pub description: String,
    pub is_npc: bool,
    pub power_level: i32,
    pub abilities: AbilityScores,
    pub defenses: DefenseRanks,
    pub skills: BTreeMap<Skill, i32>,
    pub advantages: Vec<Advantage>,
    pub powers: Vec<Power>,
    pub hero_points: u32,
    /// Extra power points awarded on top of the level budget
    pub bonus_points: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Character {
    pub fn new(room_id: RoomId, name: impl Into<String>, power_level: i32) -> Self {
        let now = Utc::now();
        Self {
            id: CharacterId::new(),
            room_id,
            owner: None,
            name: name.into(),
            description: String::new(),
            is_npc: false,
            power_level,
            abilities: AbilityScores::default(),
            defenses: DefenseRanks::default(),
            skills: BTreeMap::new(),
            advantages: Vec::new(),
            powers: Vec::new(),
            hero_points: 1,
            bonus_points: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn as_npc(mut self) -> Self {
        self.is_npc = true;
        self.owner = None;
        self
    }

    pub fn with_abilities(mut self, abilities: AbilityScores) -> Self {
        self.abilities = abilities;
        self
    }

    pub fn with_defenses(mut self, defenses: DefenseRanks) -> Self {
        self.defenses = defenses;
        self
    }

    pub fn with_skill(mut self, skill: Skill, ranks: i32) -> Self {
        self.skills.insert(skill, ranks);
        self
    }

    pub fn with_advantage(mut self, advantage: Advantage) -> Self {
        self.advantages.push(advantage);
        self
    }

    pub fn with_power(mut self, power: Power) -> Self {
        self.powers.push(power);
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn advantage_ranks(&self, pick: impl Fn(&Advantage) -> bool) -> i32 {
        self.advantages.iter().filter(|a| pick(a)).map(Advantage::ranks).sum()
    }

    pub fn defensive_roll(&self) -> i32 {
        self.advantage_ranks(|a| matches!(a, Advantage::DefensiveRoll { .. }))
    }

    pub fn initiative_bonus(&self) -> i32 {
        let improved = self.advantage_ranks(|a| matches!(a, Advantage::ImprovedInitiative { .. }));
        self.abilities.agility + 4 * improved
    }

    pub fn skill_ranks(&self, skill: Skill) -> i32 {
        self.skills.get(&skill).copied().unwrap_or(0)
    }

    pub fn skill_bonus(&self, skill: Skill) -> i32 {
        self.abilities.get(skill.ability()) + self.skill_ranks(skill)
    }

    /// Every power including chained ones
    pub fn all_powers(&self) -> impl Iterator<Item = &Power> {
        self.powers.iter().flat_map(|p| p.chain())
    }

    pub fn find_power(&self, id: PowerId) -> Option<&Power> {
        self.powers.iter().find_map(|p| p.find(id))
    }

    pub fn protection(&self) -> i32 {
        self.all_powers()
            .filter(|p| matches!(p.effect, EffectKind::Protection))
            .map(|p| p.rank)
            .sum()
    }

    /// Defense total; `armor` is Toughness from worn equipment
    pub fn defense(&self, defense: Defense, armor: i32) -> i32 {
        let base = self.abilities.get(defense.base_ability()) + self.defenses.purchased(defense);
        match defense {
            Defense::Toughness => base + self.protection() + armor + self.defensive_roll(),
            _ => base,
        }
    }

    /// Attack bonus for a range; perception effects make no attack roll
    pub fn attack_bonus(&self, range: PowerRange) -> Option<i32> {
        match range {
            PowerRange::Close => Some(
                self.abilities.fighting
                    + self.skill_ranks(Skill::CloseCombat)
                    + self.advantage_ranks(|a| matches!(a, Advantage::CloseAttack { .. })),
            ),
            PowerRange::Ranged => Some(
                self.abilities.dexterity
                    + self.skill_ranks(Skill::RangedCombat)
                    + self.advantage_ranks(|a| matches!(a, Advantage::RangedAttack { .. })),
            ),
            PowerRange::Perception => None,
        }
    }

    pub fn immunities(&self) -> Vec<String> {
        self.all_powers()
            .filter_map(|p| match &p.effect {
                EffectKind::Immunity { descriptors } => Some(descriptors.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Highest impervious rank covering a defense
    pub fn impervious(&self, defense: Defense) -> i32 {
        self.all_powers()
            .filter_map(|p| match p.effect {
                EffectKind::Impervious { defense: covered } if covered == defense => Some(p.rank),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    pub fn point_costs(&self) -> PointBreakdown {
        let abilities = self.abilities.iter().map(|(_, rank)| rank * 2).sum();
        let defenses = self.defenses.total_ranks();
        let skill_ranks: i32 = self.skills.values().map(|r| (*r).max(0)).sum();
        let skills = (skill_ranks + 1) / 2;
        let advantages = self.advantages.iter().map(Advantage::ranks).sum();
        let powers = self.powers.iter().map(Power::cost).sum();
        PointBreakdown {
            abilities,
            defenses,
            skills,
            advantages,
            powers,
            total: abilities + defenses + skills + advantages + powers,
        }
    }

    pub fn point_budget(&self, points_per_level: i32) -> i32 {
        self.power_level * points_per_level + self.bonus_points
    }

    /// Check the sheet against its power level; an empty list means valid
    pub fn limit_violations(&self, points_per_level: i32) -> Vec<LimitViolation> {
        let mut violations = Vec::new();
        let pl = self.power_level;

        if !(MIN_POWER_LEVEL..=MAX_POWER_LEVEL).contains(&pl) {
            violations.push(LimitViolation::PowerLevelOutOfRange { value: pl });
        }

        for (ability, value) in self.abilities.iter() {
            if value > pl {
                violations.push(LimitViolation::AbilityAboveLimit { ability, value, limit: pl });
            }
            if value < MIN_ABILITY_RANK {
                violations.push(LimitViolation::AbilityBelowMinimum { ability, value });
            }
        }

        for defense in [Defense::Dodge, Defense::Parry, Defense::Fortitude, Defense::Will] {
            if self.defenses.purchased(defense) < 0 {
                violations.push(LimitViolation::NegativeDefenseRanks { defense });
            }
        }

        let pair_limit = 2 * pl;
        for (first, second) in [
            (Defense::Dodge, Defense::Toughness),
            (Defense::Parry, Defense::Toughness),
            (Defense::Fortitude, Defense::Will),
        ] {
            let total = self.defense(first, 0) + self.defense(second, 0);
            if total > pair_limit {
                violations.push(LimitViolation::DefensePairAboveLimit {
                    first,
                    second,
                    total,
                    limit: pair_limit,
                });
            }
        }

        for power in self.all_powers() {
            if power.rank < 1 {
                violations.push(LimitViolation::InvalidPowerRank { power: power.name.clone() });
                continue;
            }
            if !power.effect.is_attack() {
                continue;
            }
            match self.attack_bonus(power.range) {
                Some(attack) if attack + power.rank > pair_limit => {
                    violations.push(LimitViolation::AttackAboveLimit {
                        power: power.name.clone(),
                        attack,
                        rank: power.rank,
                        limit: pair_limit,
                    });
                }
                None if power.rank > pl => {
                    violations.push(LimitViolation::PerceptionRankAboveLimit {
                        power: power.name.clone(),
                        rank: power.rank,
                        limit: pl,
                    });
                }
                _ => {}
            }
        }

        let skill_limit = pl + 10;
        for (&skill, &ranks) in &self.skills {
            if ranks < 0 {
                violations.push(LimitViolation::NegativeSkillRanks { skill });
            }
            let bonus = self.skill_bonus(skill);
            if bonus > skill_limit {
                violations.push(LimitViolation::SkillAboveLimit { skill, bonus, limit: skill_limit });
            }
        }

        if self.advantages.iter().any(|a| a.ranks() < 1) {
            violations.push(LimitViolation::InvalidAdvantageRanks);
        }

        let spent = self.point_costs().total;
        let budget = self.point_budget(points_per_level);
        if spent > budget {
            violations.push(LimitViolation::PointsOverBudget { spent, budget });
        }

        violations
    }
}
