pub mod chat;
pub mod error;
pub mod relationship;
pub mod settings;
pub mod store;
pub mod user;

use std::path::PathBuf;
use std::sync::Arc;

pub use chat::{ChatLog, ChatMessage, ChatRepository, Sender};
pub use error::{LoveMatchError, Result};
pub use relationship::{CompatibilityResult, PredictionResult, Relationship, RelationshipRepository};
pub use settings::SettingsRepository;
pub use store::{Loaded, LocalStore, StoreEvent};
pub use user::{User, UserRepository};

/// The four repositories over one shared store.
pub struct Repositories {
    pub store: Arc<LocalStore>,
    pub users: UserRepository,
    pub relationships: RelationshipRepository,
    pub chats: ChatRepository,
    pub settings: SettingsRepository,
}

impl Repositories {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            users: UserRepository::new(store.clone()),
            relationships: RelationshipRepository::new(store.clone()),
            chats: ChatRepository::new(store.clone()),
            settings: SettingsRepository::new(store.clone()),
            store,
        }
    }

    pub fn open(dir: impl Into<PathBuf>, prefix: &str) -> Result<Self> {
        Ok(Self::new(Arc::new(LocalStore::open(dir, prefix)?)))
    }
}
