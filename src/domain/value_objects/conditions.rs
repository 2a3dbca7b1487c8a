//! Conditions and the modifiers they impose
//!
//! Combined conditions (Staggered, Incapacitated, ...) are shorthand for a set
//! of basic conditions. A [`ConditionSet`] keeps both the names that were
//! applied and the effective basic conditions after expansion and
//! supersession, since a few rules (prone attacks, dying) look at the names.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    // Basic conditions
    Compelled,
    Controlled,
    Dazed,
    Debilitated,
    Defenseless,
    Disabled,
    Fatigued,
    Hindered,
    Immobile,
    Impaired,
    Stunned,
    Transformed,
    Unaware,
    Vulnerable,
    Weakened,
    // Combined conditions
    Asleep,
    Blind,
    Bound,
    Dying,
    Entranced,
    Exhausted,
    Incapacitated,
    Paralyzed,
    Prone,
    Restrained,
    Staggered,
    Surprised,
}

use Condition::*;

impl Condition {
    pub fn is_combined(&self) -> bool {
        !self.components().is_empty()
    }

    /// Basic conditions a combined condition stands for; empty for basic ones
    pub fn components(&self) -> &'static [Condition] {
        match self {
            Asleep => &[Defenseless, Stunned, Unaware],
            Blind => &[Hindered, Unaware, Vulnerable],
            Bound => &[Defenseless, Immobile, Impaired],
            Dying => &[Defenseless, Stunned, Unaware],
            Entranced => &[Stunned],
            Exhausted => &[Impaired, Hindered],
            Incapacitated => &[Defenseless, Stunned, Unaware],
            Paralyzed => &[Defenseless, Immobile, Stunned],
            Prone => &[Hindered],
            Restrained => &[Hindered, Vulnerable],
            Staggered => &[Dazed, Hindered],
            Surprised => &[Stunned, Vulnerable],
            _ => &[],
        }
    }

    /// Lesser condition made redundant by this one
    pub fn supersedes(&self) -> Option<Condition> {
        match self {
            Defenseless => Some(Vulnerable),
            Disabled => Some(Impaired),
            Stunned => Some(Dazed),
            Immobile => Some(Hindered),
            Controlled => Some(Compelled),
            Exhausted => Some(Fatigued),
            _ => None,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Applied conditions plus their effective basic expansion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionSet {
    named: BTreeSet<Condition>,
    effective: BTreeSet<Condition>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_conditions(conditions: impl IntoIterator<Item = Condition>) -> Self {
        let named: BTreeSet<Condition> = conditions.into_iter().collect();

        let mut effective = BTreeSet::new();
        for condition in &named {
            if condition.is_combined() {
                effective.extend(condition.components().iter().copied());
            } else {
                effective.insert(*condition);
            }
        }

        let superseded: Vec<Condition> = named
            .iter()
            .chain(effective.iter())
            .filter_map(|c| c.supersedes())
            .collect();
        for lesser in superseded {
            effective.remove(&lesser);
        }

        Self { named, effective }
    }

    /// True when the condition was applied by name or is part of the effective set
    pub fn has(&self, condition: Condition) -> bool {
        self.named.contains(&condition) || self.effective.contains(&condition)
    }

    pub fn named(&self) -> impl Iterator<Item = &Condition> {
        self.named.iter()
    }

    pub fn effective(&self) -> impl Iterator<Item = &Condition> {
        self.effective.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }

    /// Penalty applied to every check the affected character makes
    pub fn check_modifier(&self) -> i32 {
        if self.effective.contains(&Disabled) {
            -5
        } else if self.effective.contains(&Impaired) {
            -2
        } else {
            0
        }
    }

    /// Dodge and Parry after vulnerable/defenseless
    pub fn active_defense(&self, value: i32) -> i32 {
        if self.effective.contains(&Defenseless) {
            0
        } else if self.effective.contains(&Vulnerable) {
            // Halved, rounding up
            (value + 1).div_euclid(2)
        } else {
            value
        }
    }

    /// Whether active-defense bonuses such as Defensive Roll still apply
    pub fn keeps_active_bonuses(&self) -> bool {
        !self.effective.contains(&Defenseless) && !self.effective.contains(&Vulnerable)
    }

    pub fn can_act(&self) -> bool {
        !self.effective.contains(&Stunned)
    }

    pub fn is_prone(&self) -> bool {
        self.named.contains(&Prone)
    }

    pub fn is_incapacitated(&self) -> bool {
        self.named.contains(&Incapacitated) || self.named.contains(&Dying)
    }

    pub fn is_dying(&self) -> bool {
        self.named.contains(&Dying)
    }
}

#[cfg(test)]
mod tests {
    use super::Condition::*;
    use super::*;

    #[test]
    fn test_combined_conditions_expand() {
        let set = ConditionSet::from_conditions([Staggered]);
        assert!(set.has(Dazed));
        assert!(set.has(Hindered));
        assert!(set.can_act());
    }

    #[test]
    fn test_superseding_conditions() {
        let set = ConditionSet::from_conditions([Vulnerable, Defenseless]);
        assert_eq!(set.active_defense(9), 0);

        let set = ConditionSet::from_conditions([Impaired, Disabled]);
        assert_eq!(set.check_modifier(), -5);

        // Stunned swallows the dazed half of staggered
        let set = ConditionSet::from_conditions([Staggered, Stunned]);
        assert!(!set.effective().any(|c| *c == Dazed));
        assert!(!set.can_act());
    }

    #[test]
    fn test_vulnerable_halves_rounding_up() {
        let set = ConditionSet::from_conditions([Vulnerable]);
        assert_eq!(set.active_defense(9), 5);
        assert_eq!(set.active_defense(8), 4);
        assert!(!set.keeps_active_bonuses());
    }

    #[test]
    fn test_incapacitated_cannot_act() {
        let set = ConditionSet::from_conditions([Incapacitated]);
        assert!(!set.can_act());
        assert!(set.is_incapacitated());
        assert_eq!(set.active_defense(12), 0);
    }

    #[test]
    fn test_exhausted_supersedes_fatigued() {
        let set = ConditionSet::from_conditions([Fatigued, Exhausted]);
        assert!(!set.effective().any(|c| *c == Fatigued));
        assert_eq!(set.check_modifier(), -2);
    }
}
