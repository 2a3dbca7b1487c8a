//! Application services - Use case implementations
//!
//! Each service accepts its repository and broadcast dependencies as port
//! trait objects and returns domain entities or rules reports.

pub mod character_service;
pub mod combat_service;
pub mod error;
pub mod item_service;
pub mod realm_service;
pub mod room_service;
pub mod settings_service;
pub mod warfare_service;

pub use character_service::{
    CharacterService, CharacterServiceImpl, CreateCharacterRequest, SheetReport,
    UpdateCharacterRequest,
};
pub use combat_service::{CombatService, CombatServiceImpl};
pub use error::{ServiceError, ServiceResult};
pub use item_service::{CreateItemRequest, ItemService, ItemServiceImpl, UpdateItemRequest};
pub use realm_service::{
    CreateDomainRequest, CreateUnitRequest, RealmService, RealmServiceImpl, UpdateDomainRequest,
    UpdateUnitRequest,
};
pub use room_service::{
    CreateRoomRequest, RoomService, RoomServiceImpl, UpdateRoomRequest,
};
pub use settings_service::SettingsService;
pub use warfare_service::{WarfareService, WarfareServiceImpl};
