use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::application::services::{CreateCharacterRequest, UpdateCharacterRequest};
use crate::domain::entities::{Character, Power};
use crate::domain::value_objects::{
    AbilityScores, Advantage, Defense, DefenseRanks, RoomId, Skill, UserId,
};

#[derive(Debug, Deserialize)]
pub struct CreateCharacterRequestDto {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub is_npc: bool,
    #[serde(default)]
    pub power_level: Option<i32>,
    #[serde(default)]
    pub abilities: AbilityScores,
    #[serde(default)]
    pub defenses: DefenseRanks,
    #[serde(default)]
    pub skills: BTreeMap<Skill, i32>,
    #[serde(default)]
    pub advantages: Vec<Advantage>,
    #[serde(default)]
    pub powers: Vec<Power>,
    #[serde(default)]
    pub hero_points: Option<u32>,
    #[serde(default)]
    pub bonus_points: i32,
}

impl CreateCharacterRequestDto {
    pub fn into_request(self, room_id: RoomId) -> CreateCharacterRequest {
        CreateCharacterRequest {
            room_id,
            owner: self.owner.map(UserId::new),
            name: self.name,
            description: self.description,
            is_npc: self.is_npc,
            power_level: self.power_level,
            abilities: self.abilities,
            defenses: self.defenses,
            skills: self.skills,
            advantages: self.advantages,
            powers: self.powers,
            hero_points: self.hero_points,
            bonus_points: self.bonus_points,
        }
    }
}

/// Partial update; absent fields are left alone and `"owner": null` clears the owner
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCharacterRequestDto {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "super::present")]
    pub owner: Option<Option<String>>,
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

impl From<UpdateCharacterRequestDto> for UpdateCharacterRequest {
    fn from(dto: UpdateCharacterRequestDto) -> Self {
        Self {
            name: dto.name,
            description: dto.description,
            owner: dto.owner.map(|owner| owner.map(UserId::new)),
            is_npc: dto.is_npc,
            power_level: dto.power_level,
            abilities: dto.abilities,
            defenses: dto.defenses,
            skills: dto.skills,
            advantages: dto.advantages,
            powers: dto.powers,
            hero_points: dto.hero_points,
            bonus_points: dto.bonus_points,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CharacterResponseDto {
    #[serde(flatten)]
    pub character: Character,
    /// Defense totals without worn armor
    pub defense_totals: BTreeMap<Defense, i32>,
    pub initiative_bonus: i32,
    pub points_spent: i32,
}

impl From<Character> for CharacterResponseDto {
    fn from(character: Character) -> Self {
        let defense_totals = [
            Defense::Dodge,
            Defense::Parry,
            Defense::Fortitude,
            Defense::Toughness,
            Defense::Will,
        ]
        .into_iter()
        .map(|d| (d, character.defense(d, 0)))
        .collect();
        Self {
            initiative_bonus: character.initiative_bonus(),
            points_spent: character.point_costs().total,
            defense_totals,
            character,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_distinguishes_null_owner_from_missing() {
        let cleared: UpdateCharacterRequestDto = serde_json::from_str(r#"{"owner": null}"#).unwrap();
        assert_eq!(cleared.owner, Some(None));

        let untouched: UpdateCharacterRequestDto = serde_json::from_str(r#"{"name": "Nova"}"#).unwrap();
        assert_eq!(untouched.owner, None);
        assert_eq!(untouched.name.as_deref(), Some("Nova"));
    }

    #[test]
    fn test_create_defaults_to_empty_sheet() {
        let dto: CreateCharacterRequestDto = serde_json::from_str(r#"{"name": "Nova"}"#).unwrap();
        let request = dto.into_request(RoomId::new());
        assert!(request.power_level.is_none());
        assert!(request.powers.is_empty());
        assert_eq!(request.abilities, AbilityScores::default());
    }
}
