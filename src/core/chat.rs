use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::error::{LoveMatchError, Result};
use super::store::LocalStore;

pub const CHATS_KEY: &str = "chats";

pub const ADMIN_REPLY_SENTIMENT: &str = "supportive";
pub const ADMIN_REPLY_TOPIC: &str = "general";

/// Chat transcripts keyed by owning user id.
pub type ChatLog = BTreeMap<String, Vec<ChatMessage>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Specialist,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Specialist => write!(f, "specialist"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            text: text.to_string(),
            timestamp: Utc::now(),
            sentiment: None,
            topic: None,
        }
    }

    pub fn from_user(text: &str) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn from_specialist(text: &str, sentiment: Option<String>, topic: Option<String>) -> Self {
        Self {
            sentiment,
            topic,
            ..Self::new(Sender::Specialist, text)
        }
    }
}

/// Append-only access to per-user chat transcripts.
pub struct ChatRepository {
    store: Arc<LocalStore>,
}

impl ChatRepository {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    pub fn all(&self) -> ChatLog {
        self.store.get(CHATS_KEY, ChatLog::new())
    }

    pub fn list_for_user(&self, user_id: &str) -> Vec<ChatMessage> {
        self.all().remove(user_id).unwrap_or_default()
    }

    pub fn count_for_user(&self, user_id: &str) -> usize {
        self.all().get(user_id).map_or(0, Vec::len)
    }

    pub fn total_messages(&self) -> usize {
        self.all().values().map(Vec::len).sum()
    }

    /// Append `message` to the user's transcript and return the new length.
    pub fn append_message(&self, user_id: &str, message: ChatMessage) -> Result<usize> {
        if message.text.trim().is_empty() {
            return Err(LoveMatchError::InvalidInput(
                "Message cannot be empty".to_string(),
            ));
        }

        let len = self.store.update(CHATS_KEY, ChatLog::new(), |log| {
            let messages = log.entry(user_id.to_string()).or_default();
            messages.push(message);
            Ok(messages.len())
        })?;

        debug!(user_id, len, "appended chat message");
        Ok(len)
    }

    /// Append a manual specialist reply written by the admin.
    pub fn append_admin_reply(&self, user_id: &str, text: &str) -> Result<ChatMessage> {
        let message = ChatMessage::from_specialist(
            text.trim(),
            Some(ADMIN_REPLY_SENTIMENT.to_string()),
            Some(ADMIN_REPLY_TOPIC.to_string()),
        );
        self.append_message(user_id, message.clone())?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, ChatRepository) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalStore::open(dir.path(), "").unwrap());
        (dir, ChatRepository::new(store))
    }

    #[test]
    fn test_empty_transcript() {
        let (_dir, repo) = create_test_repo();
        assert!(repo.list_for_user("u1").is_empty());
        assert_eq!(repo.count_for_user("u1"), 0);
        assert_eq!(repo.total_messages(), 0);
    }

    #[test]
    fn test_append_preserves_order_and_history() {
        let (_dir, repo) = create_test_repo();

        let first = ChatMessage::from_user("hello");
        repo.append_message("u1", first.clone()).unwrap();
        let reply = repo.append_admin_reply("u1", "  hi there ").unwrap();
        let third = ChatMessage::from_user("how are we doing?");
        let len = repo.append_message("u1", third.clone()).unwrap();

        assert_eq!(len, 3);
        let messages = repo.list_for_user("u1");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], first);
        assert_eq!(messages[1], reply);
        assert_eq!(messages[2], third);
    }

    #[test]
    fn test_admin_reply_tags() {
        let (_dir, repo) = create_test_repo();
        let reply = repo.append_admin_reply("u1", "be patient").unwrap();

        assert_eq!(reply.sender, Sender::Specialist);
        assert_eq!(reply.text, "be patient");
        assert_eq!(reply.sentiment.as_deref(), Some("supportive"));
        assert_eq!(reply.topic.as_deref(), Some("general"));
    }

    #[test]
    fn test_transcripts_are_per_user() {
        let (_dir, repo) = create_test_repo();
        repo.append_message("u1", ChatMessage::from_user("a")).unwrap();
        repo.append_message("u2", ChatMessage::from_user("b")).unwrap();
        repo.append_message("u2", ChatMessage::from_user("c")).unwrap();

        assert_eq!(repo.count_for_user("u1"), 1);
        assert_eq!(repo.count_for_user("u2"), 2);
        assert_eq!(repo.total_messages(), 3);
        assert_eq!(repo.all().len(), 2);
    }

    #[test]
    fn test_blank_message_rejected() {
        let (_dir, repo) = create_test_repo();
        assert!(repo.append_message("u1", ChatMessage::from_user("  ")).is_err());
        assert!(repo.append_admin_reply("u1", "").is_err());
        assert_eq!(repo.total_messages(), 0);
    }

    #[test]
    fn test_sender_wire_format() {
        let msg = ChatMessage::from_user("hey");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["sender"], "user");
        assert!(json.get("sentiment").is_none());
    }
}
