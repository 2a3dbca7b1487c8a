//! Character Service - Application service for character sheets
//!
//! Sheets are checked against their power level before every save; an
//! invalid sheet is rejected with the full list of broken limits.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::error::{validate_text, ServiceError, ServiceResult};
use super::settings_service::SettingsService;
use crate::application::ports::outbound::{
    CharacterRepository, ItemRepository, RoomBroadcastPort, RoomRepository,
};
use crate::domain::entities::{Character, LimitViolation, PointBreakdown, Power};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{
    AbilityScores, Advantage, CharacterId, DefenseRanks, RoomId, Skill, UserId,
};

/// Request to create a new character
#[derive(Debug, Clone, Default)]
pub struct CreateCharacterRequest {
    pub room_id: RoomId,
    pub owner: Option<UserId>,
    pub name: String,
    pub description: Option<String>,
    pub is_npc: bool,
    /// Falls back to the configured default
    pub power_level: Option<i32>,
    pub abilities: AbilityScores,
    pub defenses: DefenseRanks,
    pub skills: BTreeMap<Skill, i32>,
    pub advantages: Vec<Advantage>,
    pub powers: Vec<Power>,
    pub hero_points: Option<u32>,
    pub bonus_points: i32,
}

/// Request to update an existing character; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct UpdateCharacterRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub owner: Option<Option<UserId>>,
    pub is_npc: Option<bool>,
    pub power_level: Option<i32>,
    pub abilities: Option<AbilityScores>,
    pub defenses: Option<DefenseRanks>,
    pub skills: Option<BTreeMap<Skill, i32>>,
    pub advantages: Option<Vec<Advantage>>,
    pub powers: Option<Vec<Power>>,
    pub hero_points: Option<u32>,
    pub bonus_points: Option<i32>,
}

/// Point spend and limit check for a stored sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetReport {
    pub costs: PointBreakdown,
    pub budget: i32,
    pub violations: Vec<LimitViolation>,
}

/// Character service trait defining the application use cases
#[async_trait]
pub trait CharacterService: Send + Sync {
    async fn create_character(&self, request: CreateCharacterRequest) -> ServiceResult<Character>;

    async fn get_character(&self, id: CharacterId) -> ServiceResult<Character>;

    async fn list_characters(&self, room_id: RoomId) -> ServiceResult<Vec<Character>>;

    async fn update_character(
        &self,
        id: CharacterId,
        request: UpdateCharacterRequest,
    ) -> ServiceResult<Character>;

    /// Delete a character; items it carried are dropped in the room
    async fn delete_character(&self, id: CharacterId) -> ServiceResult<()>;

    async fn check_sheet(&self, id: CharacterId) -> ServiceResult<SheetReport>;
}

pub struct CharacterServiceImpl {
    characters: Arc<dyn CharacterRepository>,
    rooms: Arc<dyn RoomRepository>,
    items: Arc<dyn ItemRepository>,
    settings: Arc<SettingsService>,
    broadcast: Arc<dyn RoomBroadcastPort>,
}

impl CharacterServiceImpl {
    pub fn new(
        characters: Arc<dyn CharacterRepository>,
        rooms: Arc<dyn RoomRepository>,
        items: Arc<dyn ItemRepository>,
        settings: Arc<SettingsService>,
        broadcast: Arc<dyn RoomBroadcastPort>,
    ) -> Self {
        Self {
            characters,
            rooms,
            items,
            settings,
            broadcast,
        }
    }

    async fn load(&self, id: CharacterId) -> ServiceResult<Character> {
        self.characters
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Character", id))
    }

    /// Text limits plus power-level limits
    async fn validate_sheet(&self, character: &Character) -> ServiceResult<()> {
        let settings = self.settings.get().await;
        validate_text(
            "Character",
            &character.name,
            Some(&character.description),
            settings.max_name_length,
            settings.max_description_length,
        )?;

        let violations = character.limit_violations(settings.points_per_level);
        if !violations.is_empty() {
            warn!(
                character_id = %character.id,
                count = violations.len(),
                "Character sheet rejected"
            );
            return Err(ServiceError::LimitViolations(violations));
        }
        Ok(())
    }

    async fn announce(&self, character: &Character) {
        self.broadcast.publish(
            character.room_id,
            DomainEvent::CharacterSaved {
                character_id: character.id,
                name: character.name.clone(),
            },
        ).await;
    }
}

#[async_trait]
impl CharacterService for CharacterServiceImpl {
    #[instrument(skip(self, request), fields(room_id = %request.room_id, name = %request.name))]
    async fn create_character(&self, request: CreateCharacterRequest) -> ServiceResult<Character> {
        self.rooms
            .get(request.room_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Room", request.room_id))?;

        let power_level = match request.power_level {
            Some(level) => level,
            None => self.settings.get().await.default_power_level,
        };

        let mut character = Character::new(request.room_id, request.name.trim(), power_level)
            .with_abilities(request.abilities)
            .with_defenses(request.defenses);
        if let Some(owner) = request.owner {
            character = character.with_owner(owner);
        }
        if let Some(description) = request.description {
            character = character.with_description(description);
        }
        if request.is_npc {
            character = character.as_npc();
        }
        if let Some(hero_points) = request.hero_points {
            character.hero_points = hero_points;
        }
        character.skills = request.skills;
        character.advantages = request.advantages;
        character.powers = request.powers;
        character.bonus_points = request.bonus_points;

        self.validate_sheet(&character).await?;
        self.characters.save(&character).await?;
        self.announce(&character).await;

        info!(
            character_id = %character.id,
            power_level = character.power_level,
            "Created character: {}",
            character.name
        );
        Ok(character)
    }

    #[instrument(skip(self))]
    async fn get_character(&self, id: CharacterId) -> ServiceResult<Character> {
        debug!(character_id = %id, "Fetching character");
        self.load(id).await
    }

    #[instrument(skip(self))]
    async fn list_characters(&self, room_id: RoomId) -> ServiceResult<Vec<Character>> {
        let characters = self.characters.list_in_room(room_id).await?;
        debug!(room_id = %room_id, count = characters.len(), "Listed characters");
        Ok(characters)
    }

    #[instrument(skip(self, request), fields(character_id = %id))]
    async fn update_character(
        &self,
        id: CharacterId,
        request: UpdateCharacterRequest,
    ) -> ServiceResult<Character> {
        let mut character = self.load(id).await?;

        if let Some(name) = request.name {
            character.name = name.trim().to_string();
        }
        if let Some(description) = request.description {
            character.description = description;
        }
        if let Some(owner) = request.owner {
            character.owner = owner;
        }
        if let Some(is_npc) = request.is_npc {
            character.is_npc = is_npc;
        }
        if let Some(power_level) = request.power_level {
            character.power_level = power_level;
        }
        if let Some(abilities) = request.abilities {
            character.abilities = abilities;
        }
        if let Some(defenses) = request.defenses {
            character.defenses = defenses;
        }
        if let Some(skills) = request.skills {
            character.skills = skills;
        }
        if let Some(advantages) = request.advantages {
            character.advantages = advantages;
        }
        if let Some(powers) = request.powers {
            character.powers = powers;
        }
        if let Some(hero_points) = request.hero_points {
            character.hero_points = hero_points;
        }
        if let Some(bonus_points) = request.bonus_points {
            character.bonus_points = bonus_points;
        }
        character.touch();

        self.validate_sheet(&character).await?;
        self.characters.save(&character).await?;
        self.announce(&character).await;

        info!(character_id = %id, "Updated character: {}", character.name);
        Ok(character)
    }

    #[instrument(skip(self))]
    async fn delete_character(&self, id: CharacterId) -> ServiceResult<()> {
        let character = self.load(id).await?;

        for mut item in self.items.list_carried_by(id).await? {
            item.transfer(None);
            self.items.save(&item).await?;
        }
        self.characters.delete(id).await?;
        self.broadcast.publish(
            character.room_id,
            DomainEvent::CharacterDeleted { character_id: id },
        ).await;

        info!(character_id = %id, "Deleted character: {}", character.name);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn check_sheet(&self, id: CharacterId) -> ServiceResult<SheetReport> {
        let character = self.load(id).await?;
        let points_per_level = self.settings.get().await.points_per_level;
        Ok(SheetReport {
            costs: character.point_costs(),
            budget: character.point_budget(points_per_level),
            violations: character.limit_violations(points_per_level),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::{
        MockCharacterRepository, MockItemRepository, MockRoomBroadcastPort, MockRoomRepository,
    };
    use crate::application::services::settings_service::default_settings;
    use crate::domain::entities::{Item, ItemKind, Room};

    struct Mocks {
        characters: MockCharacterRepository,
        rooms: MockRoomRepository,
        items: MockItemRepository,
        broadcast: MockRoomBroadcastPort,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                characters: MockCharacterRepository::new(),
                rooms: MockRoomRepository::new(),
                items: MockItemRepository::new(),
                broadcast: MockRoomBroadcastPort::new(),
            }
        }

        fn build(self) -> CharacterServiceImpl {
            CharacterServiceImpl::new(
                Arc::new(self.characters),
                Arc::new(self.rooms),
                Arc::new(self.items),
                default_settings(),
                Arc::new(self.broadcast),
            )
        }
    }

    fn room() -> Room {
        Room::new("Tavern", UserId::from("gm"))
    }

    #[tokio::test]
    async fn test_create_uses_default_power_level() {
        let room = room();
        let room_id = room.id;
        let mut mocks = Mocks::new();
        mocks.rooms.expect_get().returning(move |_| Ok(Some(room.clone())));
        mocks
            .characters
            .expect_save()
            .withf(|c| c.power_level == 10 && c.name == "Nova")
            .times(1)
            .returning(|_| Ok(()));
        mocks
            .broadcast
            .expect_publish()
            .withf(move |id, event| {
                *id == room_id && matches!(event, DomainEvent::CharacterSaved { .. })
            })
            .times(1)
            .return_const(());

        let character = mocks
            .build()
            .create_character(CreateCharacterRequest {
                room_id,
                name: "Nova".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(character.hero_points, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_sheet_over_limits() {
        let room = room();
        let room_id = room.id;
        let mut mocks = Mocks::new();
        mocks.rooms.expect_get().returning(move |_| Ok(Some(room.clone())));
        mocks.characters.expect_save().never();

        let result = mocks
            .build()
            .create_character(CreateCharacterRequest {
                room_id,
                name: "Overpowered".to_string(),
                power_level: Some(4),
                abilities: AbilityScores { strength: 9, ..Default::default() },
                ..Default::default()
            })
            .await;
        match result {
            Err(ServiceError::LimitViolations(violations)) => {
                assert!(violations
                    .iter()
                    .any(|v| matches!(v, LimitViolation::AbilityAboveLimit { .. })));
            }
            other => panic!("expected limit violations, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_in_unknown_room() {
        let mut mocks = Mocks::new();
        mocks.rooms.expect_get().returning(|_| Ok(None));
        let result = mocks
            .build()
            .create_character(CreateCharacterRequest {
                name: "Lost".to_string(),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound { entity: "Room", .. })));
    }

    #[tokio::test]
    async fn test_update_applies_only_given_fields() {
        let stored = Character::new(RoomId::new(), "Nova", 10).with_description("Flier");
        let id = stored.id;
        let mut mocks = Mocks::new();
        mocks
            .characters
            .expect_get()
            .returning(move |_| Ok(Some(stored.clone())));
        mocks.characters.expect_save().returning(|_| Ok(()));
        mocks.broadcast.expect_publish().return_const(());

        let updated = mocks
            .build()
            .update_character(
                id,
                UpdateCharacterRequest {
                    power_level: Some(8),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.power_level, 8);
        assert_eq!(updated.description, "Flier");
    }

    #[tokio::test]
    async fn test_delete_drops_carried_items() {
        let character = Character::new(RoomId::new(), "Nova", 10);
        let id = character.id;
        let sword = Item::new(character.room_id, "Sword", ItemKind::Gear).carried_by(id);

        let mut mocks = Mocks::new();
        mocks
            .characters
            .expect_get()
            .returning(move |_| Ok(Some(character.clone())));
        mocks
            .items
            .expect_list_carried_by()
            .returning(move |_| Ok(vec![sword.clone()]));
        mocks
            .items
            .expect_save()
            .withf(|item| item.owner.is_none())
            .times(1)
            .returning(|_| Ok(()));
        mocks.characters.expect_delete().times(1).returning(|_| Ok(()));
        mocks.broadcast.expect_publish().times(1).return_const(());

        mocks.build().delete_character(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_check_sheet_reports_budget() {
        let stored = Character::new(RoomId::new(), "Nova", 10);
        let id = stored.id;
        let mut mocks = Mocks::new();
        mocks
            .characters
            .expect_get()
            .returning(move |_| Ok(Some(stored.clone())));

        let report = mocks.build().check_sheet(id).await.unwrap();
        assert_eq!(report.budget, 150);
        assert_eq!(report.costs.total, 0);
        assert!(report.violations.is_empty());
    }
}
