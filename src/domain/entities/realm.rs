//! Domain entity - a realm that fields units and holds fortifications

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{DomainId, RoomId, UserId};

pub const MIN_DOMAIN_SIZE: i32 = 1;
pub const MAX_DOMAIN_SIZE: i32 = 5;
pub const MIN_DOMAIN_SKILL: i32 = -5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainSkill {
    Diplomacy,
    Espionage,
    Lore,
    Operations,
}

impl fmt::Display for DomainSkill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Diplomacy => "Diplomacy",
            Self::Espionage => "Espionage",
            Self::Lore => "Lore",
            Self::Operations => "Operations",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainDefense {
    Communications,
    Resolve,
    Resources,
}

impl DomainDefense {
    pub const ALL: [DomainDefense; 3] = [Self::Communications, Self::Resolve, Self::Resources];
}

impl fmt::Display for DomainDefense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Communications => "Communications",
            Self::Resolve => "Resolve",
            Self::Resources => "Resources",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("name exceeds {0} characters")]
    NameTooLong(usize),
    #[error("description exceeds {0} characters")]
    DescriptionTooLong(usize),
    #[error("domain size {0} is outside 1..=5")]
    SizeOutOfRange(i32),
    #[error("{skill} {value} is outside {min}..={max}")]
    SkillOutOfRange { skill: DomainSkill, value: i32, min: i32, max: i32 },
    #[error("{defense} maximum {max} exceeds {limit}")]
    DefenseMaxTooHigh { defense: DomainDefense, max: i32, limit: i32 },
    #[error("{defense} level {level} is outside 0..={max}")]
    DefenseLevelOutOfRange { defense: DomainDefense, level: i32, max: i32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainSkills {
    pub diplomacy: i32,
    pub espionage: i32,
    pub lore: i32,
    pub operations: i32,
}

impl DomainSkills {
    pub fn get(&self, skill: DomainSkill) -> i32 {
        match skill {
            DomainSkill::Diplomacy => self.diplomacy,
            DomainSkill::Espionage => self.espionage,
            DomainSkill::Lore => self.lore,
            DomainSkill::Operations => self.operations,
        }
    }

    fn iter(&self) -> impl Iterator<Item = (DomainSkill, i32)> + '_ {
        [
            DomainSkill::Diplomacy,
            DomainSkill::Espionage,
            DomainSkill::Lore,
            DomainSkill::Operations,
        ]
        .into_iter()
        .map(|s| (s, self.get(s)))
    }
}

/// Current level of a defense and the level it recovers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseTrack {
    pub level: i32,
    pub max: i32,
}

impl DefenseTrack {
    pub fn full(max: i32) -> Self {
        Self { level: max, max }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainDefenses {
    pub communications: DefenseTrack,
    pub resolve: DefenseTrack,
    pub resources: DefenseTrack,
}

impl DomainDefenses {
    pub fn uniform(max: i32) -> Self {
        Self {
            communications: DefenseTrack::full(max),
            resolve: DefenseTrack::full(max),
            resources: DefenseTrack::full(max),
        }
    }

    pub fn get(&self, defense: DomainDefense) -> DefenseTrack {
        match defense {
            DomainDefense::Communications => self.communications,
            DomainDefense::Resolve => self.resolve,
            DomainDefense::Resources => self.resources,
        }
    }

    fn get_mut(&mut self, defense: DomainDefense) -> &mut DefenseTrack {
        match defense {
            DomainDefense::Communications => &mut self.communications,
            DomainDefense::Resolve => &mut self.resolve,
            DomainDefense::Resources => &mut self.resources,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub room_id: RoomId,
    pub owner: Option<UserId>,
    pub name: String,
    pub description: String,
    pub size: i32,
    pub skills: DomainSkills,
    pub defenses: DomainDefenses,
    pub treasury: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Domain {
    /// A new domain starts with every defense at size + 2
    pub fn new(room_id: RoomId, name: impl Into<String>, size: i32) -> Self {
        let now = Utc::now();
        Self {
            id: DomainId::new(),
            room_id,
            owner: None,
            name: name.into(),
            description: String::new(),
            size,
            skills: DomainSkills::default(),
            defenses: DomainDefenses::uniform(size + 2),
            treasury: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_skills(mut self, skills: DomainSkills) -> Self {
        self.skills = skills;
        self
    }

    pub fn with_defenses(mut self, defenses: DomainDefenses) -> Self {
        self.defenses = defenses;
        self
    }

    pub fn with_treasury(mut self, treasury: i32) -> Self {
        self.treasury = treasury;
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !(MIN_DOMAIN_SIZE..=MAX_DOMAIN_SIZE).contains(&self.size) {
            return Err(ValidationError::SizeOutOfRange(self.size));
        }

        let skill_max = 2 * self.size;
        if let Some((skill, value)) = self
            .skills
            .iter()
            .find(|(_, v)| !(MIN_DOMAIN_SKILL..=skill_max).contains(v))
        {
            return Err(ValidationError::SkillOutOfRange {
                skill,
                value,
                min: MIN_DOMAIN_SKILL,
                max: skill_max,
            });
        }

        let defense_limit = self.size + 5;
        for defense in DomainDefense::ALL {
            let track = self.defenses.get(defense);
            if track.max > defense_limit {
                return Err(ValidationError::DefenseMaxTooHigh {
                    defense,
                    max: track.max,
                    limit: defense_limit,
                });
            }
            if track.level < 0 || track.level > track.max {
                return Err(ValidationError::DefenseLevelOutOfRange {
                    defense,
                    level: track.level,
                    max: track.max,
                });
            }
        }
        Ok(())
    }

    /// Drop a defense one level, never below zero; returns the new level
    pub fn lower_defense(&mut self, defense: DomainDefense) -> i32 {
        let track = self.defenses.get_mut(defense);
        track.level = (track.level - 1).max(0);
        track.level
    }

    /// Raise a defense one level, never above its maximum; returns the new level
    pub fn restore_defense(&mut self, defense: DomainDefense) -> i32 {
        let track = self.defenses.get_mut(defense);
        track.level = (track.level + 1).min(track.max);
        track.level
    }

    pub fn is_in_crisis(&self) -> bool {
        DomainDefense::ALL
            .iter()
            .any(|d| self.defenses.get(*d).level == 0)
    }

    /// Pay from the treasury; nothing is spent when funds are short
    pub fn spend(&mut self, amount: i32) -> Result<i32, i32> {
        if amount > self.treasury {
            return Err(self.treasury);
        }
        self.treasury -= amount;
        Ok(self.treasury)
    }
}
