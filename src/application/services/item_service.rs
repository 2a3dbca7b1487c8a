//! Item Service - Application service for room inventory

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument};

use super::error::{validate_text, ServiceError, ServiceResult};
use super::settings_service::SettingsService;
use crate::application::ports::outbound::{
    CharacterRepository, ItemRepository, RoomBroadcastPort, RoomRepository,
};
use crate::domain::entities::{Item, ItemKind};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{CharacterId, ItemId, RoomId};

#[derive(Debug, Clone)]
pub struct CreateItemRequest {
    pub room_id: RoomId,
    pub name: String,
    pub description: Option<String>,
    pub kind: ItemKind,
    pub quantity: Option<u32>,
    pub owner: Option<CharacterId>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub kind: Option<ItemKind>,
    pub quantity: Option<u32>,
}

#[async_trait]
pub trait ItemService: Send + Sync {
    async fn create_item(&self, request: CreateItemRequest) -> ServiceResult<Item>;

    async fn get_item(&self, id: ItemId) -> ServiceResult<Item>;

    async fn list_items(&self, room_id: RoomId) -> ServiceResult<Vec<Item>>;

    async fn update_item(&self, id: ItemId, request: UpdateItemRequest) -> ServiceResult<Item>;

    async fn delete_item(&self, id: ItemId) -> ServiceResult<()>;

    /// Give the item to a character in the same room, or drop it with `None`
    async fn transfer_item(&self, id: ItemId, owner: Option<CharacterId>) -> ServiceResult<Item>;

    async fn set_equipped(&self, id: ItemId, equipped: bool) -> ServiceResult<Item>;
}

pub struct ItemServiceImpl {
    items: Arc<dyn ItemRepository>,
    characters: Arc<dyn CharacterRepository>,
    rooms: Arc<dyn RoomRepository>,
    settings: Arc<SettingsService>,
    broadcast: Arc<dyn RoomBroadcastPort>,
}

impl ItemServiceImpl {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        characters: Arc<dyn CharacterRepository>,
        rooms: Arc<dyn RoomRepository>,
        settings: Arc<SettingsService>,
        broadcast: Arc<dyn RoomBroadcastPort>,
    ) -> Self {
        Self {
            items,
            characters,
            rooms,
            settings,
            broadcast,
        }
    }

    async fn load(&self, id: ItemId) -> ServiceResult<Item> {
        self.items
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item", id))
    }

    /// The new owner has to exist and sit in the item's room
    async fn check_owner(&self, room_id: RoomId, owner: Option<CharacterId>) -> ServiceResult<()> {
        let Some(owner) = owner else {
            return Ok(());
        };
        let character = self
            .characters
            .get(owner)
            .await?
            .ok_or_else(|| ServiceError::not_found("Character", owner))?;
        if character.room_id != room_id {
            return Err(ServiceError::validation(format!(
                "{} is not in the item's room",
                character.name
            )));
        }
        Ok(())
    }

    fn validate_kind(kind: &ItemKind) -> ServiceResult<()> {
        match kind {
            ItemKind::Weapon { damage_rank, .. } if *damage_rank < 1 => {
                Err(ServiceError::validation("Weapon damage rank must be at least 1"))
            }
            ItemKind::Armor { protection } if *protection < 1 => {
                Err(ServiceError::validation("Armor protection must be at least 1"))
            }
            _ => Ok(()),
        }
    }

    async fn announce(&self, item: &Item) {
        self.broadcast.publish(
            item.room_id,
            DomainEvent::ItemSaved {
                item_id: item.id,
                name: item.name.clone(),
                owner: item.owner,
            },
        ).await;
    }
}

#[async_trait]
impl ItemService for ItemServiceImpl {
    #[instrument(skip(self, request), fields(room_id = %request.room_id, name = %request.name))]
    async fn create_item(&self, request: CreateItemRequest) -> ServiceResult<Item> {
        let settings = self.settings.get().await;
        validate_text(
            "Item",
            &request.name,
            request.description.as_deref(),
            settings.max_name_length,
            settings.max_description_length,
        )?;
        Self::validate_kind(&request.kind)?;

        self.rooms
            .get(request.room_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Room", request.room_id))?;
        self.check_owner(request.room_id, request.owner).await?;

        let mut item = Item::new(request.room_id, request.name.trim(), request.kind);
        if let Some(description) = request.description {
            item = item.with_description(description);
        }
        if let Some(owner) = request.owner {
            item = item.carried_by(owner);
        }
        if let Some(quantity) = request.quantity {
            item.quantity = quantity;
        }

        self.items.save(&item).await?;
        self.announce(&item).await;
        info!(item_id = %item.id, "Created item: {}", item.name);
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn get_item(&self, id: ItemId) -> ServiceResult<Item> {
        self.load(id).await
    }

    #[instrument(skip(self))]
    async fn list_items(&self, room_id: RoomId) -> ServiceResult<Vec<Item>> {
        let items = self.items.list_in_room(room_id).await?;
        debug!(room_id = %room_id, count = items.len(), "Listed items");
        Ok(items)
    }

    #[instrument(skip(self, request), fields(item_id = %id))]
    async fn update_item(&self, id: ItemId, request: UpdateItemRequest) -> ServiceResult<Item> {
        let settings = self.settings.get().await;
        let mut item = self.load(id).await?;

        if let Some(name) = request.name {
            item.name = name.trim().to_string();
        }
        if let Some(description) = request.description {
            item.description = description;
        }
        if let Some(kind) = request.kind {
            Self::validate_kind(&kind)?;
            // Changing what the item is takes it off
            if kind != item.kind {
                item.equipped = false;
            }
            item.kind = kind;
        }
        if let Some(quantity) = request.quantity {
            item.quantity = quantity;
        }
        validate_text(
            "Item",
            &item.name,
            Some(&item.description),
            settings.max_name_length,
            settings.max_description_length,
        )?;
        item.updated_at = Utc::now();

        self.items.save(&item).await?;
        self.announce(&item).await;
        info!(item_id = %id, "Updated item: {}", item.name);
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, id: ItemId) -> ServiceResult<()> {
        let item = self.load(id).await?;
        self.items.delete(id).await?;
        self.broadcast
            .publish(item.room_id, DomainEvent::ItemDeleted { item_id: id })
            .await;
        info!(item_id = %id, "Deleted item: {}", item.name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn transfer_item(&self, id: ItemId, owner: Option<CharacterId>) -> ServiceResult<Item> {
        let mut item = self.load(id).await?;
        self.check_owner(item.room_id, owner).await?;

        item.transfer(owner);
        self.items.save(&item).await?;
        self.announce(&item).await;
        info!(item_id = %id, owner = ?owner, "Transferred item");
        Ok(item)
    }

    #[instrument(skip(self))]
    async fn set_equipped(&self, id: ItemId, equipped: bool) -> ServiceResult<Item> {
        let mut item = self.load(id).await?;
        if !item.set_equipped(equipped) {
            return Err(ServiceError::validation(format!(
                "{} cannot be equipped",
                item.name
            )));
        }
        self.items.save(&item).await?;
        self.announce(&item).await;
        debug!(item_id = %id, equipped, "Changed equipped state");
        Ok(item)
    }
}
