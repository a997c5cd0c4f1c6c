use std::sync::Arc;
use tracing::info;

use super::error::Result;
use super::store::LocalStore;

pub const AI_ENABLED_KEY: &str = "ai_enabled";
pub const ADMIN_SESSION_KEY: &str = "admin_logged_in";

/// Global flags. Each lives under its own key; there is no aggregate record.
pub struct SettingsRepository {
    store: Arc<LocalStore>,
}

impl SettingsRepository {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    /// AI responses are on unless explicitly switched off.
    pub fn ai_enabled(&self) -> bool {
        self.store.get(AI_ENABLED_KEY, true)
    }

    pub fn set_ai_enabled(&self, enabled: bool) -> Result<()> {
        self.store.set(AI_ENABLED_KEY, &enabled)?;
        info!(enabled, "AI responses toggled");
        Ok(())
    }

    pub fn admin_session(&self) -> bool {
        self.store.get(ADMIN_SESSION_KEY, false)
    }

    pub fn set_admin_session(&self, logged_in: bool) -> Result<()> {
        self.store.set(ADMIN_SESSION_KEY, &logged_in)
    }
}
