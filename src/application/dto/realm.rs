use serde::{Deserialize, Serialize};

use crate::application::services::{
    CreateDomainRequest, CreateUnitRequest, UpdateDomainRequest, UpdateUnitRequest,
};
use crate::domain::entities::{
    Domain, DomainDefense, DomainDefenses, DomainSkill, DomainSkills, Fortification, Unit,
    UnitStatus,
};
use crate::domain::value_objects::{
    Ancestry, CasualtyDie, DomainId, Equipment, Experience, FortificationId, FortificationKind,
    RoomId, UnitStats, UnitType, UserId,
};

#[derive(Debug, Deserialize)]
pub struct CreateDomainRequestDto {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    pub size: i32,
    #[serde(default)]
    pub skills: Option<DomainSkills>,
    #[serde(default)]
    pub defenses: Option<DomainDefenses>,
    #[serde(default)]
    pub treasury: i32,
}

impl CreateDomainRequestDto {
    pub fn into_request(self, room_id: RoomId) -> CreateDomainRequest {
        CreateDomainRequest {
            room_id,
            owner: self.owner.map(UserId::new),
            name: self.name,
            description: self.description,
            size: self.size,
            skills: self.skills,
            defenses: self.defenses,
            treasury: self.treasury,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateDomainRequestDto {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "super::present")]
    pub owner: Option<Option<String>>,
    pub size: Option<i32>,
    pub skills: Option<DomainSkills>,
    pub defenses: Option<DomainDefenses>,
    pub treasury: Option<i32>,
}

impl From<UpdateDomainRequestDto> for UpdateDomainRequest {
    fn from(dto: UpdateDomainRequestDto) -> Self {
        Self {
            name: dto.name,
            description: dto.description,
            owner: dto.owner.map(|owner| owner.map(UserId::new)),
            size: dto.size,
            skills: dto.skills,
            defenses: dto.defenses,
            treasury: dto.treasury,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IntrigueRequestDto {
    pub skill: DomainSkill,
    pub target: DomainId,
    pub defense: DomainDefense,
}

#[derive(Debug, Deserialize)]
pub struct RestoreDefenseRequestDto {
    pub defense: DomainDefense,
}

#[derive(Debug, Serialize)]
pub struct DomainResponseDto {
    #[serde(flatten)]
    pub domain: Domain,
    pub in_crisis: bool,
}

impl From<Domain> for DomainResponseDto {
    fn from(domain: Domain) -> Self {
        Self {
            in_crisis: domain.is_in_crisis(),
            domain,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUnitRequestDto {
    pub name: String,
    pub ancestry: Ancestry,
    pub unit_type: UnitType,
    #[serde(default = "default_experience")]
    pub experience: Experience,
    #[serde(default = "default_equipment")]
    pub equipment: Equipment,
    #[serde(default = "default_size")]
    pub size: CasualtyDie,
    #[serde(default)]
    pub garrison: Option<FortificationId>,
    #[serde(default)]
    pub purchase: bool,
}

fn default_experience() -> Experience {
    Experience::Regular
}

fn default_equipment() -> Equipment {
    Equipment::Light
}

fn default_size() -> CasualtyDie {
    CasualtyDie::D6
}

impl CreateUnitRequestDto {
    pub fn into_request(self, domain_id: DomainId) -> CreateUnitRequest {
        CreateUnitRequest {
            domain_id,
            name: self.name,
            ancestry: self.ancestry,
            unit_type: self.unit_type,
            experience: self.experience,
            equipment: self.equipment,
            size: self.size,
            garrison: self.garrison,
            purchase: self.purchase,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUnitRequestDto {
    pub name: Option<String>,
    pub experience: Option<Experience>,
    pub equipment: Option<Equipment>,
    pub hp: Option<i32>,
}

impl From<UpdateUnitRequestDto> for UpdateUnitRequest {
    fn from(dto: UpdateUnitRequestDto) -> Self {
        Self {
            name: dto.name,
            experience: dto.experience,
            equipment: dto.equipment,
            hp: dto.hp,
        }
    }
}

/// `fortification: null` withdraws the unit to the field
#[derive(Debug, Deserialize)]
pub struct GarrisonRequestDto {
    pub fortification: Option<FortificationId>,
}

#[derive(Debug, Serialize)]
pub struct UnitResponseDto {
    #[serde(flatten)]
    pub unit: Unit,
    pub stats: UnitStats,
    pub max_hp: i32,
    pub status: UnitStatus,
    pub cost: i32,
    pub upkeep: i32,
}

impl From<Unit> for UnitResponseDto {
    fn from(unit: Unit) -> Self {
        Self {
            stats: unit.stats(),
            max_hp: unit.max_hp(),
            status: unit.status(),
            cost: unit.cost(),
            upkeep: unit.upkeep(),
            unit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFortificationRequestDto {
    pub name: String,
    pub kind: FortificationKind,
}

/// Omit `amount` to repair fully
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RepairRequestDto {
    pub amount: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct FortificationResponseDto {
    #[serde(flatten)]
    pub fortification: Fortification,
    pub max_hp: i32,
    pub breached: bool,
    pub defense_bonus: i32,
    pub toughness_bonus: i32,
}

impl From<Fortification> for FortificationResponseDto {
    fn from(fortification: Fortification) -> Self {
        Self {
            max_hp: fortification.max_hp(),
            breached: fortification.is_breached(),
            defense_bonus: fortification.defense_bonus(),
            toughness_bonus: fortification.toughness_bonus(),
            fortification,
        }
    }
}
