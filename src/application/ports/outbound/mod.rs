//! Outbound ports - Interfaces that the application requires from external systems

mod broadcast_port;
mod repository_port;
mod settings_port;

pub use broadcast_port::RoomBroadcastPort;
pub use repository_port::{
    CharacterRepository, CombatRepository, DomainRepository, FortificationRepository,
    ItemRepository, RepoError, RoomRepository, UnitRepository, WarfareRepository,
};
pub use settings_port::SettingsRepositoryPort;

#[cfg(test)]
pub use broadcast_port::MockRoomBroadcastPort;
#[cfg(test)]
pub use repository_port::{
    MockCharacterRepository, MockCombatRepository, MockDomainRepository,
    MockFortificationRepository, MockItemRepository, MockRoomRepository, MockUnitRepository,
    MockWarfareRepository,
};
#[cfg(test)]
pub use settings_port::MockSettingsRepositoryPort;
