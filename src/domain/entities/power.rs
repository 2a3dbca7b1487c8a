//! Power entity - effects bought with power points

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Condition, Defense, PowerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerRange {
    Close,
    Ranged,
    /// Hits automatically, no attack roll
    Perception,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerAction {
    Standard,
    Move,
    Free,
    Reaction,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerDuration {
    Instant,
    /// Lasts while the user spends a standard action each turn
    Concentration,
    /// Lasts while the user spends a free action each turn
    Sustained,
    Continuous,
    Permanent,
}

impl PowerDuration {
    /// Whether the user has to keep the effect going
    pub fn is_maintained(&self) -> bool {
        matches!(self, Self::Concentration | Self::Sustained)
    }
}

/// Conditions imposed by an affliction at each degree of failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AfflictionTiers {
    pub first: Vec<Condition>,
    pub second: Vec<Condition>,
    pub third: Vec<Condition>,
}

impl AfflictionTiers {
    pub fn for_degree(&self, degree: u8) -> &[Condition] {
        match degree {
            0 => &[],
            1 => &self.first,
            2 => &self.second,
            _ => &self.third,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectKind {
    Damage,
    Affliction { tiers: AfflictionTiers },
    /// Lowers a named trait (ability, defense or skill) of the target
    Weaken { trait_name: String },
    Healing,
    /// Adds its rank to Toughness
    Protection,
    /// Ignores effects carrying any of these descriptors or effect names
    Immunity { descriptors: Vec<String> },
    /// Ignores effects of rank up to half this power's rank against one defense
    Impervious { defense: Defense },
    Enhanced { trait_name: String },
    Feature,
}

impl EffectKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Damage => "damage",
            Self::Affliction { .. } => "affliction",
            Self::Weaken { .. } => "weaken",
            Self::Healing => "healing",
            Self::Protection => "protection",
            Self::Immunity { .. } => "immunity",
            Self::Impervious { .. } => "impervious",
            Self::Enhanced { .. } => "enhanced",
            Self::Feature => "feature",
        }
    }

    pub fn base_cost(&self) -> i32 {
        match self {
            Self::Healing => 2,
            _ => 1,
        }
    }

    /// Effects resolved against a target with a resistance check
    pub fn is_attack(&self) -> bool {
        matches!(self, Self::Damage | Self::Affliction { .. } | Self::Weaken { .. })
    }

    /// Base DC of the resistance check before adding rank
    pub fn resistance_base(&self) -> i32 {
        match self {
            Self::Damage => 15,
            _ => 10,
        }
    }

    pub fn default_defense(&self) -> Defense {
        match self {
            Self::Damage => Defense::Toughness,
            Self::Weaken { .. } => Defense::Fortitude,
            _ => Defense::Will,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Power {
    pub id: PowerId,
    pub name: String,
    pub effect: EffectKind,
    pub rank: i32,
    pub range: PowerRange,
    pub action: PowerAction,
    pub duration: PowerDuration,
    pub resisted_by: Defense,
    #[serde(default)]
    pub descriptors: Vec<String>,
    /// Net per-rank cost of extras minus flaws
    #[serde(default)]
    pub per_rank_modifier: i32,
    #[serde(default)]
    pub flat_modifier: i32,
    /// Chained effects that resolve alongside this one
    #[serde(default)]
    pub linked: Vec<Power>,
}

impl Power {
    pub fn new(name: impl Into<String>, effect: EffectKind, rank: i32) -> Self {
        let resisted_by = effect.default_defense();
        let (range, duration) = match effect {
            EffectKind::Damage => (PowerRange::Close, PowerDuration::Instant),
            EffectKind::Affliction { .. } | EffectKind::Weaken { .. } => {
                (PowerRange::Ranged, PowerDuration::Instant)
            }
            EffectKind::Healing => (PowerRange::Close, PowerDuration::Instant),
            _ => (PowerRange::Close, PowerDuration::Permanent),
        };
        Self {
            id: PowerId::new(),
            name: name.into(),
            effect,
            rank,
            range,
            action: PowerAction::Standard,
            duration,
            resisted_by,
            descriptors: Vec::new(),
            per_rank_modifier: 0,
            flat_modifier: 0,
            linked: Vec::new(),
        }
    }

    pub fn with_range(mut self, range: PowerRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_duration(mut self, duration: PowerDuration) -> Self {
        self.duration = duration;
        self
    }

    pub fn resisted_by(mut self, defense: Defense) -> Self {
        self.resisted_by = defense;
        self
    }

    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.descriptors.push(descriptor.into());
        self
    }

    pub fn with_modifiers(mut self, per_rank: i32, flat: i32) -> Self {
        self.per_rank_modifier = per_rank;
        self.flat_modifier = flat;
        self
    }

    pub fn linked_with(mut self, power: Power) -> Self {
        self.linked.push(power);
        self
    }

    /// Power point cost including linked effects, never below 1
    pub fn cost(&self) -> i32 {
        let per_rank = self.effect.base_cost() + self.per_rank_modifier;
        let rank = self.rank.max(0);
        let ranked = if per_rank >= 1 {
            per_rank * rank
        } else {
            // Fractional costs: one point buys (2 - cost) ranks
            let ranks_per_point = 2 - per_rank;
            (rank + ranks_per_point - 1) / ranks_per_point
        };
        let linked: i32 = self.linked.iter().map(Power::cost).sum();
        (ranked + self.flat_modifier + linked).max(1)
    }

    /// This power followed by every chained power, depth first
    pub fn chain(&self) -> Vec<&Power> {
        let mut out = vec![self];
        for linked in &self.linked {
            out.extend(linked.chain());
        }
        out
    }

    pub fn has_descriptor(&self, descriptor: &str) -> bool {
        self.descriptors.iter().any(|d| d.eq_ignore_ascii_case(descriptor))
    }

    pub fn find(&self, id: PowerId) -> Option<&Power> {
        if self.id == id {
            return Some(self);
        }
        self.linked.iter().find_map(|p| p.find(id))
    }
}
