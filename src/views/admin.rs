use serde::Serialize;
use tracing::{info, warn};

use super::AppContext;
use crate::agent::parse::{clamp_percentage, parse_leading_int};
use crate::core::error::{LoveMatchError, Result};
use crate::core::chat::CHATS_KEY;
use crate::core::relationship::{
    DEFAULT_COMPATIBILITY_LEVEL, DEFAULT_EMOTIONAL_TRAJECTORY, DEFAULT_OVERALL_OUTLOOK,
    RELATIONSHIPS_KEY,
};
use crate::core::settings::AI_ENABLED_KEY;
use crate::core::user::USERS_KEY;
use crate::core::{
    ChatLog, ChatMessage, CompatibilityResult, PredictionResult, Relationship, Repositories, User,
};
use crate::sync::{fingerprint, watch_store, PollHandle, Poller};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminStats {
    pub users: usize,
    pub relationships: usize,
    pub pending: usize,
    pub messages: usize,
}

/// Everything the admin panel shows, read in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminSnapshot {
    pub users: Vec<User>,
    pub relationships: Vec<Relationship>,
    pub chats: ChatLog,
    pub ai_enabled: bool,
    pub stats: AdminStats,
}

impl AdminSnapshot {
    pub fn load(repos: &Repositories) -> Self {
        let users = repos.users.find_all();
        let relationships = repos.relationships.list_all();
        let chats = repos.chats.all();
        let stats = AdminStats {
            users: users.len(),
            relationships: relationships.len(),
            pending: relationships.iter().filter(|r| r.is_pending()).count(),
            messages: chats.values().map(Vec::len).sum(),
        };
        Self {
            users,
            relationships,
            chats,
            ai_enabled: repos.settings.ai_enabled(),
            stats,
        }
    }

    /// Display name for a user id, falling back to the id itself.
    pub fn user_name<'a>(&'a self, user_id: &'a str) -> &'a str {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .map_or(user_id, |u| u.name.as_str())
    }
}

/// The admin's edit form. Every field is free text, as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideForm {
    pub match_percentage: String,
    pub compatibility_level: String,
    pub advice: String,
    pub strengths: String,
    pub areas_to_work_on: String,
    pub short_term_prediction: String,
    pub long_term_prediction: String,
    pub potential_challenges: String,
    pub emotional_trajectory: String,
    pub key_advice: String,
    pub overall_outlook: String,
}

impl OverrideForm {
    /// Pre-fill from what is currently stored.
    pub fn from_relationship(rel: &Relationship) -> Self {
        let mut form = Self::default();
        if let Some(c) = &rel.compatibility {
            form.match_percentage = c.match_percentage.to_string();
            form.compatibility_level = c.compatibility_level.clone();
            form.advice = c.advice.clone();
            form.strengths = c.strengths.clone();
            form.areas_to_work_on = c.areas_to_work_on.clone();
        }
        if let Some(p) = &rel.prediction {
            form.short_term_prediction = p.short_term_prediction.clone();
            form.long_term_prediction = p.long_term_prediction.clone();
            form.potential_challenges = p.potential_challenges.clone();
            form.emotional_trajectory = p.emotional_trajectory.clone();
            form.key_advice = p.key_advice.clone();
            form.overall_outlook = p.overall_outlook.clone();
        }
        form
    }

    pub fn compatibility(&self) -> CompatibilityResult {
        CompatibilityResult {
            match_percentage: clamp_percentage(parse_leading_int(&self.match_percentage).unwrap_or(0)),
            compatibility_level: or_default(&self.compatibility_level, DEFAULT_COMPATIBILITY_LEVEL),
            advice: self.advice.clone(),
            strengths: self.strengths.clone(),
            areas_to_work_on: self.areas_to_work_on.clone(),
        }
    }

    /// A prediction is only produced when a short- or long-term text was entered.
    pub fn prediction(&self) -> Option<PredictionResult> {
        if self.short_term_prediction.is_empty() && self.long_term_prediction.is_empty() {
            return None;
        }
        Some(PredictionResult {
            short_term_prediction: self.short_term_prediction.clone(),
            long_term_prediction: self.long_term_prediction.clone(),
            potential_challenges: self.potential_challenges.clone(),
            emotional_trajectory: or_default(&self.emotional_trajectory, DEFAULT_EMOTIONAL_TRAJECTORY),
            key_advice: self.key_advice.clone(),
            overall_outlook: or_default(&self.overall_outlook, DEFAULT_OVERALL_OUTLOOK),
        })
    }
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

pub struct AdminController {
    ctx: AppContext,
}

impl AdminController {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub fn login(&self, username: &str, password: &str) -> Result<()> {
        let admin = &self.ctx.config.admin;
        if username != admin.username || password != admin.password {
            warn!("rejected admin login");
            return Err(LoveMatchError::InvalidAdminCredentials);
        }
        self.ctx.repos.settings.set_admin_session(true)?;
        info!("admin logged in");
        Ok(())
    }

    /// End the admin session, handing back the remembered user if there is one.
    pub fn logout(&self) -> Result<Option<User>> {
        self.ctx.repos.settings.set_admin_session(false)?;
        Ok(self.ctx.repos.users.current())
    }

    pub fn is_logged_in(&self) -> bool {
        self.ctx.repos.settings.admin_session()
    }

    pub fn set_ai_enabled(&self, enabled: bool) -> Result<()> {
        self.require_session()?;
        self.ctx.repos.settings.set_ai_enabled(enabled)
    }

    pub fn snapshot(&self) -> Result<AdminSnapshot> {
        self.require_session()?;
        Ok(AdminSnapshot::load(&self.ctx.repos))
    }

    /// Answer a user's chat by hand.
    pub fn reply(&self, user_id: &str, text: &str) -> Result<ChatMessage> {
        self.require_session()?;
        if text.trim().is_empty() {
            return Err(LoveMatchError::InvalidInput("Reply cannot be empty".to_string()));
        }
        if self.ctx.repos.users.find_by_id(user_id).is_none() {
            return Err(LoveMatchError::UnknownUser(user_id.to_string()));
        }
        let message = self.ctx.repos.chats.append_admin_reply(user_id, text)?;
        info!(user_id, "admin replied in chat");
        Ok(message)
    }

    pub fn override_relationship(&self, relationship_id: &str, form: &OverrideForm) -> Result<Relationship> {
        self.require_session()?;
        self.ctx.repos.relationships.apply_admin_override(
            relationship_id,
            form.compatibility(),
            form.prediction(),
        )
    }

    /// Coarse full refresh at the admin poll interval.
    pub fn watch(&self) -> Result<PollHandle<AdminSnapshot>> {
        self.require_session()?;
        let repos = self.ctx.repos.clone();
        let watcher = watch_store(
            &self.ctx.repos.store,
            &[USERS_KEY, RELATIONSHIPS_KEY, CHATS_KEY, AI_ENABLED_KEY],
        );
        Ok(Poller::spawn_watching(
            self.ctx.config.polling.admin(),
            watcher,
            move || AdminSnapshot::load(&repos),
            fingerprint::<AdminSnapshot>,
        ))
    }

    fn require_session(&self) -> Result<()> {
        if !self.is_logged_in() {
            return Err(LoveMatchError::NotAuthenticated);
        }
        Ok(())
    }
}
