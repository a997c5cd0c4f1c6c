use std::sync::Mutex;
use tracing::{debug, info};

use super::{AppContext, BusyFlag, MANUAL_MODE_HINT};
use crate::agent::parse::{decode_compatibility, decode_prediction};
use crate::agent::{prompts, AgentKind};
use crate::core::error::{LoveMatchError, Result};
use crate::core::{Relationship, User};
use crate::core::relationship::RELATIONSHIPS_KEY;
use crate::sync::{fingerprint, watch_store, PollHandle, Poller};

/// What became of a compatibility or prediction request.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The agent answered and the result was stored.
    Analyzed(Relationship),
    /// AI responses are off; the admin will fill the result in.
    AwaitingAdmin(Relationship),
    /// The agent call failed; the relationship stays pending.
    AgentFailed {
        relationship: Relationship,
        message: String,
    },
}

impl AnalysisOutcome {
    pub fn relationship(&self) -> &Relationship {
        match self {
            AnalysisOutcome::Analyzed(rel) | AnalysisOutcome::AwaitingAdmin(rel) => rel,
            AnalysisOutcome::AgentFailed { relationship, .. } => relationship,
        }
    }

    /// Inline text to show under the form, if any.
    pub fn hint(&self) -> Option<&str> {
        match self {
            AnalysisOutcome::Analyzed(_) => None,
            AnalysisOutcome::AwaitingAdmin(_) => Some(MANUAL_MODE_HINT),
            AnalysisOutcome::AgentFailed { message, .. } => Some(message),
        }
    }
}

#[derive(Default)]
struct DashboardState {
    relationships: Vec<Relationship>,
    selected: Option<String>,
}

/// Compatibility checks and predictions for one signed-in user.
pub struct DashboardController {
    ctx: AppContext,
    user: User,
    state: Mutex<DashboardState>,
    checking: BusyFlag,
    predicting: BusyFlag,
}

impl DashboardController {
    pub fn new(ctx: AppContext, user: User) -> Self {
        let relationships = ctx.repos.relationships.list_for_user(&user.id);
        let selected = relationships.last().map(|r| r.id.clone());
        Self {
            ctx,
            user,
            state: Mutex::new(DashboardState {
                relationships,
                selected,
            }),
            checking: BusyFlag::default(),
            predicting: BusyFlag::default(),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn is_checking(&self) -> bool {
        self.checking.is_busy()
    }

    pub fn is_predicting(&self) -> bool {
        self.predicting.is_busy()
    }

    /// Submit a name pair. The relationship is stored pending first, then
    /// filled from the compatibility agent when AI responses are enabled.
    pub async fn check_compatibility(&self, your_name: &str, partner_name: &str) -> Result<AnalysisOutcome> {
        let _busy = self.checking.try_acquire()?;
        let relationship = self
            .ctx
            .repos
            .relationships
            .create(&self.user.id, your_name, partner_name)?;

        let outcome = if !self.ctx.ai_enabled() {
            info!(relationship_id = %relationship.id, "manual mode, awaiting admin");
            AnalysisOutcome::AwaitingAdmin(relationship)
        } else {
            let prompt = prompts::compatibility_prompt(&relationship.user_name, &relationship.partner_name);
            match self.ctx.ask(AgentKind::Compatibility, &self.user.id, prompt).await {
                Ok(result) => {
                    let compatibility = decode_compatibility(&result);
                    let updated = self
                        .ctx
                        .repos
                        .relationships
                        .set_compatibility(&relationship.id, compatibility)?;
                    AnalysisOutcome::Analyzed(updated)
                }
                Err(e) if e.is_agent_failure() => AnalysisOutcome::AgentFailed {
                    relationship,
                    message: e.user_message(),
                },
                Err(e) => return Err(e),
            }
        };

        let id = outcome.relationship().id.clone();
        self.reload(Some(id));
        Ok(outcome)
    }

    /// Ask for a future prediction on `relationship_id`, or on the selected relationship.
    pub async fn request_prediction(&self, relationship_id: Option<&str>) -> Result<AnalysisOutcome> {
        let id = match relationship_id {
            Some(id) => id.to_string(),
            None => self.selected_id().ok_or_else(|| {
                LoveMatchError::InvalidInput("No compatibility check to predict from".to_string())
            })?,
        };
        let relationship = self.owned_relationship(&id)?;
        let compatibility = relationship
            .compatibility
            .clone()
            .ok_or_else(|| LoveMatchError::CompatibilityPending(id.clone()))?;

        if relationship.prediction.is_some() {
            debug!(relationship_id = %id, "prediction already present");
            return Ok(AnalysisOutcome::Analyzed(relationship));
        }
        if !self.ctx.ai_enabled() {
            return Ok(AnalysisOutcome::AwaitingAdmin(relationship));
        }

        let _busy = self.predicting.try_acquire()?;
        let prompt = prompts::prediction_prompt(
            &relationship.user_name,
            &relationship.partner_name,
            &compatibility,
        );
        let outcome = match self.ctx.ask(AgentKind::Prediction, &self.user.id, prompt).await {
            Ok(result) => {
                let updated = self
                    .ctx
                    .repos
                    .relationships
                    .set_prediction(&id, decode_prediction(&result))?;
                AnalysisOutcome::Analyzed(updated)
            }
            Err(e) if e.is_agent_failure() => AnalysisOutcome::AgentFailed {
                relationship,
                message: e.user_message(),
            },
            Err(e) => return Err(e),
        };

        self.reload(None);
        Ok(outcome)
    }

    /// This user's relationships, oldest first, as of the last load or refresh.
    pub fn relationships(&self) -> Vec<Relationship> {
        self.lock().relationships.clone()
    }

    /// The selected relationship, defaulting to the most recent one.
    pub fn current(&self) -> Option<Relationship> {
        let state = self.lock();
        state
            .selected
            .as_ref()
            .and_then(|id| state.relationships.iter().find(|r| &r.id == id))
            .or_else(|| state.relationships.last())
            .cloned()
    }

    pub fn select(&self, relationship_id: &str) -> Result<()> {
        let mut state = self.lock();
        if !state.relationships.iter().any(|r| r.id == relationship_id) {
            return Err(LoveMatchError::RelationshipNotFound(relationship_id.to_string()));
        }
        state.selected = Some(relationship_id.to_string());
        Ok(())
    }

    /// Re-read from the store. Returns whether anything changed.
    pub fn refresh(&self) -> bool {
        let fresh = self.ctx.repos.relationships.list_for_user(&self.user.id);
        let mut state = self.lock();
        if state.relationships == fresh {
            return false;
        }
        state.relationships = fresh;
        true
    }

    /// Poll this user's relationships so admin overrides show up.
    pub fn watch(&self) -> PollHandle<Vec<Relationship>> {
        let repos = self.ctx.repos.clone();
        let user_id = self.user.id.clone();
        let watcher = watch_store(&self.ctx.repos.store, &[RELATIONSHIPS_KEY]);
        Poller::spawn_watching(
            self.ctx.config.polling.dashboard(),
            watcher,
            move || repos.relationships.list_for_user(&user_id),
            fingerprint::<Vec<Relationship>>,
        )
    }

    fn owned_relationship(&self, id: &str) -> Result<Relationship> {
        self.ctx
            .repos
            .relationships
            .get(id)
            .filter(|r| r.user_id == self.user.id)
            .ok_or_else(|| LoveMatchError::RelationshipNotFound(id.to_string()))
    }

    fn selected_id(&self) -> Option<String> {
        self.current().map(|r| r.id)
    }

    fn reload(&self, select: Option<String>) {
        let fresh = self.ctx.repos.relationships.list_for_user(&self.user.id);
        let mut state = self.lock();
        state.relationships = fresh;
        if select.is_some() {
            state.selected = select;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DashboardState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
