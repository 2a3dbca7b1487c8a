//! Abilities, defenses and skills of a character sheet

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    Strength,
    Stamina,
    Agility,
    Dexterity,
    Fighting,
    Intellect,
    Awareness,
    Presence,
}

impl Ability {
    pub const ALL: [Ability; 8] = [
        Ability::Strength,
        Ability::Stamina,
        Ability::Agility,
        Ability::Dexterity,
        Ability::Fighting,
        Ability::Intellect,
        Ability::Awareness,
        Ability::Presence,
    ];
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Strength => "Strength",
            Self::Stamina => "Stamina",
            Self::Agility => "Agility",
            Self::Dexterity => "Dexterity",
            Self::Fighting => "Fighting",
            Self::Intellect => "Intellect",
            Self::Awareness => "Awareness",
            Self::Presence => "Presence",
        };
        f.write_str(name)
    }
}

/// Ability ranks; every ability defaults to 0 (human average)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityScores {
    pub strength: i32,
    pub stamina: i32,
    pub agility: i32,
    pub dexterity: i32,
    pub fighting: i32,
    pub intellect: i32,
    pub awareness: i32,
    pub presence: i32,
}

impl AbilityScores {
    pub fn get(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Stamina => self.stamina,
            Ability::Agility => self.agility,
            Ability::Dexterity => self.dexterity,
            Ability::Fighting => self.fighting,
            Ability::Intellect => self.intellect,
            Ability::Awareness => self.awareness,
            Ability::Presence => self.presence,
        }
    }

    pub fn set(&mut self, ability: Ability, rank: i32) {
        let slot = match ability {
            Ability::Strength => &mut self.strength,
            Ability::Stamina => &mut self.stamina,
            Ability::Agility => &mut self.agility,
            Ability::Dexterity => &mut self.dexterity,
            Ability::Fighting => &mut self.fighting,
            Ability::Intellect => &mut self.intellect,
            Ability::Awareness => &mut self.awareness,
            Ability::Presence => &mut self.presence,
        };
        *slot = rank;
    }

    pub fn with(mut self, ability: Ability, rank: i32) -> Self {
        self.set(ability, rank);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Ability, i32)> + '_ {
        Ability::ALL.into_iter().map(move |a| (a, self.get(a)))
    }
}

/// The five defenses used to resist effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Defense {
    Dodge,
    Parry,
    Fortitude,
    Toughness,
    Will,
}

impl Defense {
    /// Ability a defense is based on
    pub fn base_ability(&self) -> Ability {
        match self {
            Self::Dodge => Ability::Agility,
            Self::Parry => Ability::Fighting,
            Self::Fortitude | Self::Toughness => Ability::Stamina,
            Self::Will => Ability::Awareness,
        }
    }

    /// Active defenses are the ones affected by vulnerable/defenseless
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Dodge | Self::Parry)
    }
}

impl fmt::Display for Defense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dodge => "Dodge",
            Self::Parry => "Parry",
            Self::Fortitude => "Fortitude",
            Self::Toughness => "Toughness",
            Self::Will => "Will",
        };
        f.write_str(name)
    }
}

/// Purchased defense ranks. Toughness cannot be bought directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseRanks {
    pub dodge: i32,
    pub parry: i32,
    pub fortitude: i32,
    pub will: i32,
}

impl DefenseRanks {
    pub fn purchased(&self, defense: Defense) -> i32 {
        match defense {
            Defense::Dodge => self.dodge,
            Defense::Parry => self.parry,
            Defense::Fortitude => self.fortitude,
            Defense::Will => self.will,
            Defense::Toughness => 0,
        }
    }

    pub fn total_ranks(&self) -> i32 {
        self.dodge + self.parry + self.fortitude + self.will
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Skill {
    Acrobatics,
    Athletics,
    CloseCombat,
    Deception,
    Expertise,
    Insight,
    Intimidation,
    Investigation,
    Perception,
    Persuasion,
    RangedCombat,
    SleightOfHand,
    Stealth,
    Technology,
    Treatment,
    Vehicles,
}

impl Skill {
    pub fn ability(&self) -> Ability {
        match self {
            Self::Acrobatics | Self::Stealth => Ability::Agility,
            Self::Athletics => Ability::Strength,
            Self::CloseCombat => Ability::Fighting,
            Self::Deception | Self::Intimidation | Self::Persuasion => Ability::Presence,
            Self::Expertise | Self::Investigation | Self::Technology | Self::Treatment => {
                Ability::Intellect
            }
            Self::Insight | Self::Perception => Ability::Awareness,
            Self::RangedCombat | Self::SleightOfHand | Self::Vehicles => Ability::Dexterity,
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Advantages with a mechanical hook, plus free-form ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advantage {
    ImprovedInitiative { ranks: i32 },
    DefensiveRoll { ranks: i32 },
    CloseAttack { ranks: i32 },
    RangedAttack { ranks: i32 },
    Other { name: String, ranks: i32 },
}

impl Advantage {
    pub fn ranks(&self) -> i32 {
        match self {
            Self::ImprovedInitiative { ranks }
            | Self::DefensiveRoll { ranks }
            | Self::CloseAttack { ranks }
            | Self::RangedAttack { ranks }
            | Self::Other { ranks, .. } => *ranks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ability_scores_get_set() {
        let scores = AbilityScores::default()
            .with(Ability::Agility, 4)
            .with(Ability::Presence, -1);
        assert_eq!(scores.get(Ability::Agility), 4);
        assert_eq!(scores.get(Ability::Presence), -1);
        assert_eq!(scores.iter().map(|(_, r)| r).sum::<i32>(), 3);
    }

    #[test]
    fn test_toughness_cannot_be_purchased() {
        let ranks = DefenseRanks { dodge: 2, parry: 3, fortitude: 1, will: 4 };
        assert_eq!(ranks.purchased(Defense::Toughness), 0);
        assert_eq!(ranks.total_ranks(), 10);
    }
}
