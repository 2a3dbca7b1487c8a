//! Fortification entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{DomainId, FortificationId, FortificationKind, FortificationProfile};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fortification {
    pub id: FortificationId,
    pub domain_id: DomainId,
    pub name: String,
    pub kind: FortificationKind,
    pub hp: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fortification {
    pub fn new(domain_id: DomainId, name: impl Into<String>, kind: FortificationKind) -> Self {
        let now = Utc::now();
        Self {
            id: FortificationId::new(),
            domain_id,
            name: name.into(),
            kind,
            hp: kind.profile().max_hp,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn profile(&self) -> FortificationProfile {
        self.kind.profile()
    }

    pub fn max_hp(&self) -> i32 {
        self.profile().max_hp
    }

    pub fn is_breached(&self) -> bool {
        self.hp <= 0
    }

    /// Defense bonus for garrisoned units; nothing once breached
    pub fn defense_bonus(&self) -> i32 {
        if self.is_breached() {
            0
        } else {
            self.profile().defense_bonus
        }
    }

    pub fn toughness_bonus(&self) -> i32 {
        if self.is_breached() {
            0
        } else {
            self.profile().toughness_bonus
        }
    }

    /// Returns true when this damage breaches the walls
    pub fn take_damage(&mut self, damage: i32) -> bool {
        let was_breached = self.is_breached();
        self.hp = (self.hp - damage.max(0)).max(0);
        !was_breached && self.is_breached()
    }

    /// Restore structure points; `None` repairs fully
    pub fn repair(&mut self, amount: Option<i32>) -> i32 {
        let max = self.max_hp();
        self.hp = match amount {
            Some(amount) => (self.hp + amount.max(0)).min(max),
            None => max,
        };
        self.hp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breach_removes_bonuses() {
        let mut wall = Fortification::new(DomainId::new(), "Old Wall", FortificationKind::Palisade);
        assert_eq!(wall.defense_bonus(), 1);
        assert!(!wall.take_damage(2));
        assert!(wall.take_damage(2));
        assert!(!wall.take_damage(1));
        assert_eq!(wall.hp, 0);
        assert_eq!(wall.defense_bonus(), 0);
        assert_eq!(wall.toughness_bonus(), 0);
    }

    #[test]
    fn test_repair() {
        let mut keep = Fortification::new(DomainId::new(), "Keep", FortificationKind::Keep);
        keep.take_damage(5);
        assert_eq!(keep.repair(Some(2)), 5);
        assert_eq!(keep.repair(Some(100)), 8);
        keep.take_damage(8);
        assert_eq!(keep.repair(None), 8);
    }
}
