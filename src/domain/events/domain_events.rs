//! Domain events - Notifications of state changes pushed to room members
//!
//! Events carry ids and a short summary; clients re-fetch full state over
//! the REST API when they need it.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{
    CharacterId, CombatId, DomainId, FortificationId, ItemId, ParticipantId, UnitId,
    WarfareCombatId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    CharacterSaved {
        character_id: CharacterId,
        name: String,
    },
    CharacterDeleted {
        character_id: CharacterId,
    },
    ItemSaved {
        item_id: ItemId,
        name: String,
        owner: Option<CharacterId>,
    },
    ItemDeleted {
        item_id: ItemId,
    },
    /// Something happened in a combat; `action` names what
    CombatUpdated {
        combat_id: CombatId,
        action: String,
        round: u32,
        current: Option<ParticipantId>,
    },
    CombatEnded {
        combat_id: CombatId,
        rounds: u32,
    },
    WarfareUpdated {
        battle_id: WarfareCombatId,
        action: String,
        round: u32,
        current: Option<UnitId>,
    },
    WarfareEnded {
        battle_id: WarfareCombatId,
        rounds: u32,
    },
    DomainSaved {
        domain_id: DomainId,
        name: String,
        in_crisis: bool,
    },
    UnitSaved {
        unit_id: UnitId,
        domain_id: DomainId,
        hp: i32,
    },
    FortificationSaved {
        fortification_id: FortificationId,
        hp: i32,
        breached: bool,
    },
}

impl DomainEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CharacterSaved { .. } => "character_saved",
            Self::CharacterDeleted { .. } => "character_deleted",
            Self::ItemSaved { .. } => "item_saved",
            Self::ItemDeleted { .. } => "item_deleted",
            Self::CombatUpdated { .. } => "combat_updated",
            Self::CombatEnded { .. } => "combat_ended",
            Self::WarfareUpdated { .. } => "warfare_updated",
            Self::WarfareEnded { .. } => "warfare_ended",
            Self::DomainSaved { .. } => "domain_saved",
            Self::UnitSaved { .. } => "unit_saved",
            Self::FortificationSaved { .. } => "fortification_saved",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_tag_matches_kind() {
        let event = DomainEvent::CombatEnded {
            combat_id: CombatId::new(),
            rounds: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
        assert_eq!(json["rounds"], 3);
    }
}
