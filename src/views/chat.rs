use std::sync::Mutex;
use tracing::debug;

use super::{AppContext, BusyFlag};
use crate::agent::parse::decode_specialist_reply;
use crate::agent::{prompts, AgentKind};
use crate::core::error::{LoveMatchError, Result};
use crate::core::{ChatMessage, User};
use crate::core::chat::CHATS_KEY;
use crate::sync::{watch_store, Fingerprint, PollHandle, Poller};

#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    /// The specialist agent answered.
    Replied(ChatMessage),
    /// Manual mode: the admin answers later.
    AwaitingSpecialist,
    /// The agent produced nothing; only the user's message was stored.
    AgentFailed(String),
}

/// Conversation with the specialist for one signed-in user.
pub struct ChatController {
    ctx: AppContext,
    user: User,
    messages: Mutex<Vec<ChatMessage>>,
    sending: BusyFlag,
}

impl ChatController {
    pub fn new(ctx: AppContext, user: User) -> Self {
        let messages = ctx.repos.chats.list_for_user(&user.id);
        Self {
            ctx,
            user,
            messages: Mutex::new(messages),
            sending: BusyFlag::default(),
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().clone()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.is_busy()
    }

    pub async fn send(&self, text: &str) -> Result<ChatOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LoveMatchError::InvalidInput(
                "Message cannot be empty".to_string(),
            ));
        }
        let _busy = self.sending.try_acquire()?;

        self.ctx
            .repos
            .chats
            .append_message(&self.user.id, ChatMessage::from_user(text))?;
        self.reload();

        if !self.ctx.ai_enabled() {
            return Ok(ChatOutcome::AwaitingSpecialist);
        }

        let outcome = match self
            .ctx
            .ask(AgentKind::Chat, &self.user.id, prompts::chat_prompt(text))
            .await
        {
            Ok(result) => {
                let reply = decode_specialist_reply(&result);
                let message = ChatMessage::from_specialist(&reply.text, reply.sentiment, reply.topic);
                self.ctx
                    .repos
                    .chats
                    .append_message(&self.user.id, message.clone())?;
                ChatOutcome::Replied(message)
            }
            Err(e) if e.is_agent_failure() => ChatOutcome::AgentFailed(e.user_message()),
            Err(e) => return Err(e),
        };

        self.reload();
        Ok(outcome)
    }

    /// Adopt the stored transcript when its length differs from the local one.
    pub fn refresh(&self) -> bool {
        let stored = self.ctx.repos.chats.list_for_user(&self.user.id);
        let mut local = self.lock();
        if stored.len() == local.len() {
            return false;
        }
        debug!(user_id = %self.user.id, from = local.len(), to = stored.len(), "chat refreshed");
        *local = stored;
        true
    }

    /// Poll for manual replies, dirty-checking on message count only.
    pub fn watch(&self) -> PollHandle<Vec<ChatMessage>> {
        let repos = self.ctx.repos.clone();
        let user_id = self.user.id.clone();
        let watcher = watch_store(&self.ctx.repos.store, &[CHATS_KEY]);
        Poller::spawn_watching(
            self.ctx.config.polling.chat(),
            watcher,
            move || repos.chats.list_for_user(&user_id),
            |messages| messages.len() as Fingerprint,
        )
    }

    /// The manual-reply poll, started only while AI responses are off.
    pub fn watch_if_manual(&self) -> Option<PollHandle<Vec<ChatMessage>>> {
        if self.ctx.ai_enabled() {
            return None;
        }
        Some(self.watch())
    }

    fn reload(&self) {
        let stored = self.ctx.repos.chats.list_for_user(&self.user.id);
        *self.lock() = stored;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ChatMessage>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
