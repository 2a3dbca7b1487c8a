//! Item entity - equipment carried by characters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{EffectKind, Power, PowerRange};
use crate::domain::value_objects::{CharacterId, ItemId, PowerId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    Weapon { damage_rank: i32, range: PowerRange },
    Armor { protection: i32 },
    Gear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub room_id: RoomId,
    /// Character carrying the item, if any
    pub owner: Option<CharacterId>,
    pub name: String,
    pub description: String,
    pub kind: ItemKind,
    pub quantity: u32,
    pub equipped: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(room_id: RoomId, name: impl Into<String>, kind: ItemKind) -> Self {
        let now = Utc::now();
        Self {
            id: ItemId::new(),
            room_id,
            owner: None,
            name: name.into(),
            description: String::new(),
            kind,
            quantity: 1,
            equipped: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn carried_by(mut self, owner: CharacterId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Toughness granted while worn
    pub fn protection(&self) -> i32 {
        match (&self.kind, self.equipped) {
            (ItemKind::Armor { protection }, true) => *protection,
            _ => 0,
        }
    }

    /// An equipped weapon as a usable damage attack
    ///
    /// The power id is derived from the item id so the same weapon always
    /// resolves to the same attack.
    pub fn as_attack(&self) -> Option<Power> {
        match (&self.kind, self.equipped) {
            (ItemKind::Weapon { damage_rank, range }, true) => {
                let mut power = Power::new(&self.name, EffectKind::Damage, *damage_rank)
                    .with_range(*range)
                    .with_descriptor("weapon");
                power.id = PowerId::from_uuid(*self.id.as_uuid());
                Some(power)
            }
            _ => None,
        }
    }

    /// Hand the item to another character, or drop it with `None`
    pub fn transfer(&mut self, owner: Option<CharacterId>) {
        if self.owner != owner {
            self.equipped = false;
        }
        self.owner = owner;
        self.updated_at = Utc::now();
    }

    pub fn set_equipped(&mut self, equipped: bool) -> bool {
        if equipped && (self.owner.is_none() || matches!(self.kind, ItemKind::Gear)) {
            return false;
        }
        self.equipped = equipped;
        self.updated_at = Utc::now();
        true
    }
}
