//! Shared application state

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;

use crate::application::ports::outbound::RoomBroadcastPort;
use crate::application::services::{
    CharacterService, CharacterServiceImpl, CombatService, CombatServiceImpl, ItemService,
    ItemServiceImpl, RealmService, RealmServiceImpl, RoomService, RoomServiceImpl,
    SettingsService, WarfareService, WarfareServiceImpl,
};
use crate::domain::value_objects::Dice;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::dice::SystemDice;
use crate::infrastructure::persistence::SqliteDatabase;
use crate::infrastructure::session::{SessionManager, SharedSessions};
use crate::infrastructure::session_adapter::RoomBroadcaster;

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    /// Connected WebSocket clients, grouped by room
    pub sessions: SharedSessions,
    pub settings_service: Arc<SettingsService>,
    pub room_service: Arc<dyn RoomService>,
    pub character_service: Arc<dyn CharacterService>,
    pub item_service: Arc<dyn ItemService>,
    pub combat_service: Arc<dyn CombatService>,
    pub realm_service: Arc<dyn RealmService>,
    pub warfare_service: Arc<dyn WarfareService>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let database =
            SqliteDatabase::connect(&config.database_url, config.database_max_connections).await?;
        tracing::info!(url = %config.database_url, "Database ready");
        Ok(Self::with_database(config, &database))
    }

    /// Wire every service against one database
    pub fn with_database(config: AppConfig, database: &SqliteDatabase) -> Self {
        let rooms = Arc::new(database.rooms());
        let characters = Arc::new(database.characters());
        let items = Arc::new(database.items());
        let combats = Arc::new(database.combats());
        let domains = Arc::new(database.domains());
        let units = Arc::new(database.units());
        let fortifications = Arc::new(database.fortifications());
        let battles = Arc::new(database.battles());

        let sessions: SharedSessions = Arc::new(RwLock::new(SessionManager::new()));
        let broadcast: Arc<dyn RoomBroadcastPort> =
            Arc::new(RoomBroadcaster::new(sessions.clone()));
        let dice: Arc<dyn Dice> = Arc::new(SystemDice);
        let settings_service = Arc::new(SettingsService::new(Arc::new(database.settings())));

        let room_service = Arc::new(RoomServiceImpl::new(rooms.clone(), settings_service.clone()));
        let character_service = Arc::new(CharacterServiceImpl::new(
            characters.clone(),
            rooms.clone(),
            items.clone(),
            settings_service.clone(),
            broadcast.clone(),
        ));
        let item_service = Arc::new(ItemServiceImpl::new(
            items.clone(),
            characters.clone(),
            rooms.clone(),
            settings_service.clone(),
            broadcast.clone(),
        ));
        let combat_service = Arc::new(CombatServiceImpl::new(
            combats,
            characters,
            items,
            rooms.clone(),
            settings_service.clone(),
            broadcast.clone(),
            dice.clone(),
        ));
        let realm_service = Arc::new(RealmServiceImpl::new(
            domains.clone(),
            units.clone(),
            fortifications.clone(),
            rooms.clone(),
            settings_service.clone(),
            broadcast.clone(),
            dice.clone(),
        ));
        let warfare_service = Arc::new(WarfareServiceImpl::new(
            battles,
            units,
            fortifications,
            domains,
            rooms,
            settings_service.clone(),
            broadcast,
            dice,
        ));

        Self {
            config,
            sessions,
            settings_service,
            room_service,
            character_service,
            item_service,
            combat_service,
            realm_service,
            warfare_service,
        }
    }
}
