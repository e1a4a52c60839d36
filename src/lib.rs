pub mod backend;
pub mod client;
pub mod common;
pub mod seed;

use std::sync::Arc;

use backend::auth::AuthService;
use backend::config::PortalConfig;
use backend::database::Database;
use backend::live::ChangeBus;
use client::chat_sync::ChatSync;
use client::notifications::NotificationFeed;
use client::session::SessionStore;
use common::error::Result;
use common::models::User;

/// Composition root. Constructed once per process; every session store,
/// chat sync and feed is built from the shared references it hands out,
/// so there is no global mutable state.
pub struct Portal {
    pub db: Arc<Database>,
    pub bus: ChangeBus,
    pub config: PortalConfig,
    pub auth: Arc<AuthService>,
}

impl Portal {
    pub async fn open(config: PortalConfig) -> Result<Self> {
        let db = Arc::new(Database::connect(&config.database_url).await?);
        db.migrate().await?;
        Ok(Self::assemble(db, config))
    }

    /// Fresh in-memory store, for tests and the scenario binary.
    pub async fn open_in_memory(config: PortalConfig) -> Result<Self> {
        let db = Arc::new(Database::connect_in_memory().await?);
        db.migrate().await?;
        Ok(Self::assemble(db, config))
    }

    fn assemble(db: Arc<Database>, config: PortalConfig) -> Self {
        let bus = ChangeBus::new();
        let auth = Arc::new(AuthService::new(db.clone(), bus.clone(), config.clone()));
        Self {
            db,
            bus,
            config,
            auth,
        }
    }

    pub fn session(&self) -> SessionStore {
        SessionStore::new(self.auth.clone())
    }

    pub fn chat_sync(&self, user: User) -> ChatSync {
        ChatSync::start(self.db.clone(), self.bus.clone(), self.config.clone(), user)
    }

    pub fn notifications(&self, user_id: &str) -> NotificationFeed {
        NotificationFeed::new(self.db.clone(), self.bus.clone(), user_id.to_string())
    }
}
