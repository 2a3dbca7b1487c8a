//! Unit entity - a military formation raised by a domain

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{
    unit_cost, unit_upkeep, Ancestry, CasualtyDie, DomainId, Equipment, Experience,
    FortificationId, UnitId, UnitStats, UnitType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Healthy,
    Diminished,
    Incapacitated,
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Healthy => "healthy",
            Self::Diminished => "diminished",
            Self::Incapacitated => "incapacitated",
        };
        f.write_str(name)
    }
}

/// What a round of casualties did to a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasualtyResult {
    pub hp: i32,
    pub status: UnitStatus,
    /// Set the first time the unit drops to Diminished
    pub newly_diminished: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub domain_id: DomainId,
    pub name: String,
    pub ancestry: Ancestry,
    pub unit_type: UnitType,
    pub experience: Experience,
    pub equipment: Equipment,
    pub size: CasualtyDie,
    pub hp: i32,
    pub garrison: Option<FortificationId>,
    /// Whether the unit has already tested morale for being diminished
    #[serde(default)]
    pub morale_tested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Unit {
    pub fn new(
        domain_id: DomainId,
        name: impl Into<String>,
        ancestry: Ancestry,
        unit_type: UnitType,
        experience: Experience,
        equipment: Equipment,
        size: CasualtyDie,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UnitId::new(),
            domain_id,
            name: name.into(),
            ancestry,
            unit_type,
            experience,
            equipment,
            size,
            hp: size.sides(),
            garrison: None,
            morale_tested: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn garrisoned_in(mut self, fortification: FortificationId) -> Self {
        self.garrison = Some(fortification);
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn stats(&self) -> UnitStats {
        UnitStats::BASE
            + self.unit_type.modifiers()
            + self.ancestry.modifiers()
            + self.experience.modifiers()
            + self.equipment.modifiers()
    }

    pub fn max_hp(&self) -> i32 {
        self.size.sides()
    }

    pub fn status(&self) -> UnitStatus {
        if self.hp <= 0 {
            UnitStatus::Incapacitated
        } else if self.hp * 2 <= self.max_hp() {
            UnitStatus::Diminished
        } else {
            UnitStatus::Healthy
        }
    }

    pub fn is_incapacitated(&self) -> bool {
        self.status() == UnitStatus::Incapacitated
    }

    pub fn cost(&self) -> i32 {
        unit_cost(self.unit_type, &self.stats(), self.size)
    }

    pub fn upkeep(&self) -> i32 {
        unit_upkeep(self.cost())
    }

    pub fn take_casualties(&mut self, casualties: i32) -> CasualtyResult {
        let before = self.status();
        self.hp = (self.hp - casualties.max(0)).max(0);
        let status = self.status();
        let newly_diminished =
            before == UnitStatus::Healthy && status == UnitStatus::Diminished && !self.morale_tested;
        if newly_diminished {
            self.morale_tested = true;
        }
        CasualtyResult {
            hp: self.hp,
            status,
            newly_diminished,
        }
    }

    /// Recover hit points up to the casualty die; a healthy unit may test morale again
    pub fn recover(&mut self, amount: i32) -> i32 {
        self.hp = (self.hp + amount.max(0)).min(self.max_hp());
        if self.status() == UnitStatus::Healthy {
            self.morale_tested = false;
        }
        self.hp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regiment(size: CasualtyDie) -> Unit {
        Unit::new(
            DomainId::new(),
            "Royal Guard",
            Ancestry::Human,
            UnitType::Infantry,
            Experience::Regular,
            Equipment::Medium,
            size,
        )
    }

    #[test]
    fn test_new_unit_at_full_strength() {
        let unit = regiment(CasualtyDie::D6);
        assert_eq!(unit.hp, 6);
        assert_eq!(unit.status(), UnitStatus::Healthy);
        assert_eq!(unit.stats().defense, 13);
    }

    #[test]
    fn test_status_thresholds() {
        let mut unit = regiment(CasualtyDie::D6);
        let first = unit.take_casualties(2);
        assert_eq!(first.status, UnitStatus::Healthy);
        assert!(!first.newly_diminished);

        let second = unit.take_casualties(1);
        assert_eq!(second.status, UnitStatus::Diminished);
        assert!(second.newly_diminished);

        let third = unit.take_casualties(1);
        assert!(!third.newly_diminished);

        let last = unit.take_casualties(5);
        assert_eq!(last.hp, 0);
        assert_eq!(last.status, UnitStatus::Incapacitated);
    }

    #[test]
    fn test_recovery_caps_and_resets_morale() {
        let mut unit = regiment(CasualtyDie::D4);
        unit.take_casualties(3);
        assert!(unit.morale_tested);
        assert_eq!(unit.recover(10), 4);
        assert!(!unit.morale_tested);
    }

    #[test]
    fn test_upkeep_derives_from_cost() {
        let unit = regiment(CasualtyDie::D4);
        // bonuses: atk 3 + pow 2 + def 3 + tou 2 + mor 2 + com 2 = 14
        assert_eq!(unit.cost(), 14 * 4 / 2 * 10);
        assert_eq!(unit.upkeep(), 28);
    }
}
