use serde::{Deserialize, Serialize};

use crate::application::services::{CreateItemRequest, UpdateItemRequest};
use crate::domain::entities::{Item, ItemKind};
use crate::domain::value_objects::{CharacterId, RoomId};

#[derive(Debug, Deserialize)]
pub struct CreateItemRequestDto {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: ItemKind,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub owner: Option<CharacterId>,
}

impl CreateItemRequestDto {
    pub fn into_request(self, room_id: RoomId) -> CreateItemRequest {
        CreateItemRequest {
            room_id,
            name: self.name,
            description: self.description,
            kind: self.kind,
            quantity: self.quantity,
            owner: self.owner,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateItemRequestDto {
    pub name: Option<String>,
    pub description: Option<String>,
    pub kind: Option<ItemKind>,
    pub quantity: Option<u32>,
}

impl From<UpdateItemRequestDto> for UpdateItemRequest {
    fn from(dto: UpdateItemRequestDto) -> Self {
        Self {
            name: dto.name,
            description: dto.description,
            kind: dto.kind,
            quantity: dto.quantity,
        }
    }
}

/// `owner: null` drops the item in the room
#[derive(Debug, Deserialize)]
pub struct TransferItemRequestDto {
    pub owner: Option<CharacterId>,
}

#[derive(Debug, Deserialize)]
pub struct EquipItemRequestDto {
    pub equipped: bool,
}

#[derive(Debug, Serialize)]
pub struct ItemResponseDto {
    #[serde(flatten)]
    pub item: Item,
    /// Toughness granted while worn
    pub protection: i32,
}

impl From<Item> for ItemResponseDto {
    fn from(item: Item) -> Self {
        Self {
            protection: item.protection(),
            item,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PowerRange;

    #[test]
    fn test_create_item_reads_inline_kind() {
        let dto: CreateItemRequestDto = serde_json::from_str(
            r#"{"name": "Longbow", "kind": "weapon", "damage_rank": 3, "range": "ranged"}"#,
        )
        .unwrap();
        assert_eq!(
            dto.kind,
            ItemKind::Weapon { damage_rank: 3, range: PowerRange::Ranged }
        );
        assert!(dto.owner.is_none());
    }
}
